//! Wire types for the CDS VDC API
//!
//! Request and response bodies exchanged with the platform's network
//! endpoint. Field names on the wire are PascalCase.

use serde::{Deserialize, Serialize};

/// Filters for listing VDCs
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeVdcRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vdc_id: Option<String>,
    /// Matches against VDC names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

/// A VDC as reported by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VdcInfo {
    pub vdc_id: String,
    pub vdc_name: String,
    pub region_id: String,
    #[serde(default)]
    pub public_network: Vec<PublicNetworkInfo>,
}

/// A public network attached to a VDC
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicNetworkInfo {
    pub public_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub qos: Option<i64>,
    #[serde(default)]
    pub ip_num: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Parameters describing a public network to attach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicNetworkSpec {
    pub ip_num: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Bandwidth limit in Mbps
    pub qos: i64,
    pub float_bandwidth: String,
    pub billing_method: String,
    /// 1 to renew automatically at the end of the billing period, 0 otherwise
    pub auto_renew: i64,
    #[serde(rename = "Type")]
    pub network_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateVdcRequest {
    pub region_id: String,
    pub vdc_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_network: Option<PublicNetworkSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteVdcRequest {
    pub vdc_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddPublicNetworkRequest {
    pub vdc_id: String,
    #[serde(flatten)]
    pub network: PublicNetworkSpec,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeletePublicNetworkRequest {
    pub public_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyPublicNetworkRequest {
    pub public_id: String,
    pub qos: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenewPublicNetworkRequest {
    pub public_id: String,
    pub auto_renew: i64,
}

/// Progress of an asynchronous platform task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Doing,
    Finished,
    Failed,
}

/// Result of a DescribeTask call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskInfo {
    pub status: TaskStatus,
    /// Id of the resource the task produced, present once finished
    #[serde(default, rename = "ResourceID")]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_serializes_pascal_case() {
        let request = CreateVdcRequest {
            region_id: "CN_Beijing_A".to_string(),
            vdc_name: "vdc-main".to_string(),
            public_network: Some(PublicNetworkSpec {
                ip_num: 4,
                name: Some("public".to_string()),
                qos: 10,
                float_bandwidth: "200".to_string(),
                billing_method: "Bandwidth".to_string(),
                auto_renew: 1,
                network_type: "Classic".to_string(),
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["VdcName"], "vdc-main");
        assert_eq!(json["RegionId"], "CN_Beijing_A");
        assert_eq!(json["PublicNetwork"]["IpNum"], 4);
        assert_eq!(json["PublicNetwork"]["Type"], "Classic");
        assert_eq!(json["PublicNetwork"]["AutoRenew"], 1);
    }

    #[test]
    fn create_request_omits_absent_public_network() {
        let request = CreateVdcRequest {
            region_id: "CN_Beijing_A".to_string(),
            vdc_name: "vdc-main".to_string(),
            public_network: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("PublicNetwork").is_none());
    }

    #[test]
    fn add_public_network_request_flattens_spec() {
        let request = AddPublicNetworkRequest {
            vdc_id: "vdc-1".to_string(),
            network: PublicNetworkSpec {
                ip_num: 8,
                name: None,
                qos: 50,
                float_bandwidth: "0".to_string(),
                billing_method: "Traffic".to_string(),
                auto_renew: 0,
                network_type: "Classic".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["VdcId"], "vdc-1");
        assert_eq!(json["IpNum"], 8);
        assert!(json.get("Name").is_none());
    }

    #[test]
    fn vdc_info_deserializes_with_and_without_networks() {
        let with: VdcInfo = serde_json::from_str(
            r#"{
                "VdcId": "vdc-1",
                "VdcName": "main",
                "RegionId": "CN_Beijing_A",
                "PublicNetwork": [{"PublicId": "pn-1", "Qos": 10}]
            }"#,
        )
        .unwrap();
        assert_eq!(with.public_network.len(), 1);
        assert_eq!(with.public_network[0].public_id, "pn-1");

        let without: VdcInfo = serde_json::from_str(
            r#"{"VdcId": "vdc-2", "VdcName": "empty", "RegionId": "CN_Beijing_A"}"#,
        )
        .unwrap();
        assert!(without.public_network.is_empty());
    }

    #[test]
    fn task_info_deserializes() {
        let task: TaskInfo = serde_json::from_str(
            r#"{"Status": "finished", "ResourceID": "vdc-9"}"#,
        )
        .unwrap();
        assert_eq!(task.status, TaskStatus::Finished);
        assert_eq!(task.resource_id.as_deref(), Some("vdc-9"));

        let pending: TaskInfo = serde_json::from_str(r#"{"Status": "doing"}"#).unwrap();
        assert_eq!(pending.status, TaskStatus::Doing);
        assert!(pending.resource_id.is_none());
    }
}
