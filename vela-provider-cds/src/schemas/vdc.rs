//! VDC resource schema definitions

use vela_core::resource::Value;
use vela_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

/// Keys a public_network block must carry
const PUBLIC_NETWORK_REQUIRED: &[&str] = &[
    "ipnum",
    "qos",
    "floatbandwidth",
    "billingmethod",
    "autorenew",
    "type",
];

/// Public network block type
///
/// The block is a map with a fixed shape: `ipnum`, `qos` and `autorenew`
/// are integers, everything else is a string, `name` is optional.
pub fn public_network_block() -> AttributeType {
    AttributeType::Custom {
        name: "PublicNetwork".to_string(),
        base: Box::new(AttributeType::Map(Box::new(AttributeType::String))),
        validate: |value| {
            let Value::Map(block) = value else {
                return Err("public_network must be a block of attributes".to_string());
            };

            for key in PUBLIC_NETWORK_REQUIRED {
                if !block.contains_key(*key) {
                    return Err(format!("public_network is missing required field '{key}'"));
                }
            }

            for (key, field) in block {
                match key.as_str() {
                    "ipnum" => match field {
                        Value::Int(n) if *n > 0 => {}
                        Value::Int(_) => return Err("ipnum must be positive".to_string()),
                        _ => return Err("ipnum must be an integer".to_string()),
                    },
                    "qos" => match field {
                        Value::Int(n) if *n > 0 => {}
                        Value::Int(_) => return Err("qos must be positive".to_string()),
                        _ => return Err("qos must be an integer".to_string()),
                    },
                    "autorenew" => match field {
                        Value::Int(0) | Value::Int(1) => {}
                        _ => return Err("autorenew must be 0 or 1".to_string()),
                    },
                    "name" | "floatbandwidth" | "billingmethod" | "type" => {
                        if !matches!(field, Value::String(_)) {
                            return Err(format!("{key} must be a string"));
                        }
                    }
                    other => {
                        return Err(format!("unknown public_network field '{other}'"));
                    }
                }
            }

            Ok(())
        },
    }
}

/// Returns the schema for the vdc resource
pub fn vdc_schema() -> ResourceSchema {
    ResourceSchema::new("vdc")
        .with_description("A Virtual Data Center on the CDS cloud")
        .attribute(
            AttributeSchema::new("vdc_name", types::string_length(1, 36))
                .required()
                .with_description("VDC name, 1 to 36 characters. Immutable after creation"),
        )
        .attribute(
            AttributeSchema::new("region_id", AttributeType::String)
                .required()
                .with_description("Region to create the VDC in. Immutable after creation"),
        )
        .attribute(
            AttributeSchema::new("public_network", public_network_block())
                .with_description("Public network to attach to the VDC"),
        )
        .attribute(
            AttributeSchema::new("public_id", AttributeType::String)
                .computed()
                .with_description("Id of the attached public network (read-only)"),
        )
}

/// Returns the schema for the vdc lookup data source
pub fn vdc_lookup_schema() -> ResourceSchema {
    ResourceSchema::new("vdc_lookup")
        .with_description("Look up VDCs by id or name keyword")
        .attribute(
            AttributeSchema::new("vdc_id", AttributeType::String)
                .with_description("Filter by exact VDC id"),
        )
        .attribute(
            AttributeSchema::new("vdc_name", AttributeType::String)
                .with_description("Filter by name keyword"),
        )
        .attribute(
            AttributeSchema::new("result_output_file", AttributeType::String)
                .with_description("Write the raw results to this file as JSON"),
        )
        .attribute(
            AttributeSchema::new(
                "vdc",
                AttributeType::List(Box::new(AttributeType::Map(Box::new(
                    AttributeType::String,
                )))),
            )
            .computed()
            .with_description("Matching VDCs: vdc_id, vdc_name, region_id (read-only)"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_public_network() -> Value {
        Value::Map(HashMap::from([
            ("ipnum".to_string(), Value::Int(4)),
            ("name".to_string(), Value::String("public".to_string())),
            ("qos".to_string(), Value::Int(10)),
            ("floatbandwidth".to_string(), Value::String("200".to_string())),
            (
                "billingmethod".to_string(),
                Value::String("Bandwidth".to_string()),
            ),
            ("autorenew".to_string(), Value::Int(1)),
            ("type".to_string(), Value::String("Classic".to_string())),
        ]))
    }

    #[test]
    fn valid_vdc_minimal() {
        let schema = vdc_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vdc_name".to_string(), Value::String("main".to_string()));
        attrs.insert(
            "region_id".to_string(),
            Value::String("CN_Beijing_A".to_string()),
        );

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn valid_vdc_with_public_network() {
        let schema = vdc_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vdc_name".to_string(), Value::String("main".to_string()));
        attrs.insert(
            "region_id".to_string(),
            Value::String("CN_Beijing_A".to_string()),
        );
        attrs.insert("public_network".to_string(), valid_public_network());

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn vdc_name_length_is_enforced() {
        let schema = vdc_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vdc_name".to_string(), Value::String("v".repeat(37)));
        attrs.insert(
            "region_id".to_string(),
            Value::String("CN_Beijing_A".to_string()),
        );

        assert!(schema.validate(&attrs).is_err());

        attrs.insert("vdc_name".to_string(), Value::String(String::new()));
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn vdc_missing_region() {
        let schema = vdc_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vdc_name".to_string(), Value::String("main".to_string()));

        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn public_network_missing_qos() {
        let block = public_network_block();
        let Value::Map(mut fields) = valid_public_network() else {
            unreachable!()
        };
        fields.remove("qos");

        let err = block.validate(&Value::Map(fields)).unwrap_err();
        assert!(err.to_string().contains("qos"));
    }

    #[test]
    fn public_network_rejects_bad_field_types() {
        let block = public_network_block();

        let Value::Map(mut fields) = valid_public_network() else {
            unreachable!()
        };
        fields.insert("ipnum".to_string(), Value::Int(0));
        assert!(block.validate(&Value::Map(fields)).is_err());

        let Value::Map(mut fields) = valid_public_network() else {
            unreachable!()
        };
        fields.insert("autorenew".to_string(), Value::Int(2));
        assert!(block.validate(&Value::Map(fields)).is_err());

        let Value::Map(mut fields) = valid_public_network() else {
            unreachable!()
        };
        fields.insert("billingmethod".to_string(), Value::Int(3));
        assert!(block.validate(&Value::Map(fields)).is_err());
    }

    #[test]
    fn public_network_rejects_unknown_fields() {
        let block = public_network_block();
        let Value::Map(mut fields) = valid_public_network() else {
            unreachable!()
        };
        fields.insert("bandwidth_mode".to_string(), Value::Int(3));
        assert!(block.validate(&Value::Map(fields)).is_err());
    }

    #[test]
    fn lookup_schema_accepts_filters() {
        let schema = vdc_lookup_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vdc_id".to_string(), Value::String("vdc-1".to_string()));
        attrs.insert(
            "result_output_file".to_string(),
            Value::String("out.json".to_string()),
        );

        assert!(schema.validate(&attrs).is_ok());
    }
}
