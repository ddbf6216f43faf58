use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

use vela_core::provider::Provider;
use vela_core::resource::{Resource, ResourceId, Value};
use vela_provider_cds::CdsProvider;
use vela_provider_cds::client::CdsClient;
use vela_provider_cds::lookup::VdcLookup;
use vela_provider_cds::schemas;

#[derive(Parser)]
#[command(name = "vela")]
#[command(about = "Manage Virtual Data Centers on the CDS cloud", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// VDC management commands
    Vdc {
        #[command(subcommand)]
        command: VdcCommands,
    },
}

#[derive(Subcommand)]
enum VdcCommands {
    /// List VDCs, optionally filtered by id or name keyword
    List {
        /// Filter by exact VDC id
        #[arg(long)]
        vdc_id: Option<String>,

        /// Filter by name keyword
        #[arg(long)]
        name: Option<String>,

        /// Write the raw results to this file as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show a single VDC
    Show {
        /// VDC id
        vdc_id: String,
    },
    /// Create a VDC
    Create {
        /// VDC name, 1 to 36 characters
        #[arg(long)]
        name: String,

        /// Region to create the VDC in
        #[arg(long)]
        region: String,

        /// Public network block as JSON, e.g.
        /// '{"ipnum": 4, "qos": 10, "floatbandwidth": "200", "billingmethod": "Bandwidth", "autorenew": 1, "type": "Classic"}'
        #[arg(long)]
        public_network: Option<String>,
    },
    /// Delete a VDC and its attached public network
    Delete {
        /// VDC id
        vdc_id: String,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Vdc { command } => run_vdc_command(command).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn get_provider() -> Result<CdsProvider<CdsClient>, String> {
    CdsProvider::from_env().map_err(|e| e.to_string())
}

async fn run_vdc_command(command: VdcCommands) -> Result<(), String> {
    match command {
        VdcCommands::List {
            vdc_id,
            name,
            output,
        } => run_list(vdc_id, name, output).await,
        VdcCommands::Show { vdc_id } => run_show(&vdc_id).await,
        VdcCommands::Create {
            name,
            region,
            public_network,
        } => run_create(&name, &region, public_network.as_deref()).await,
        VdcCommands::Delete {
            vdc_id,
            auto_approve,
        } => run_delete(&vdc_id, auto_approve).await,
    }
}

async fn run_list(
    vdc_id: Option<String>,
    name: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), String> {
    let provider = get_provider()?;

    let mut lookup = VdcLookup::new();
    if let Some(vdc_id) = vdc_id {
        lookup = lookup.by_id(vdc_id);
    }
    if let Some(name) = name {
        lookup = lookup.by_keyword(name);
    }
    if let Some(path) = output {
        lookup = lookup.with_output_file(path);
    }

    let vdcs = lookup.run(provider.api()).await.map_err(|e| e.to_string())?;

    if vdcs.is_empty() {
        println!("{}", "No VDCs found.".yellow());
        return Ok(());
    }

    for vdc in &vdcs {
        println!(
            "  {} {} ({})",
            vdc.vdc_id.cyan().bold(),
            vdc.vdc_name,
            vdc.region_id
        );
    }
    println!();
    println!("{} VDC(s).", vdcs.len().to_string().green());

    Ok(())
}

async fn run_show(vdc_id: &str) -> Result<(), String> {
    let provider = get_provider()?;
    let id = ResourceId::new("vdc", vdc_id);

    let state = provider
        .read(&id, Some(vdc_id))
        .await
        .map_err(|e| e.to_string())?;

    if !state.exists {
        return Err(format!("VDC {} not found", vdc_id));
    }

    println!("{}", "VDC".cyan().bold());
    let mut keys: Vec<_> = state.attributes.keys().collect();
    keys.sort();
    for key in keys {
        println!("  {}: {}", key.bold(), format_value(&state.attributes[key]));
    }

    Ok(())
}

async fn run_create(
    name: &str,
    region: &str,
    public_network: Option<&str>,
) -> Result<(), String> {
    let provider = get_provider()?;

    let mut resource = Resource::new("vdc", name)
        .with_attribute("vdc_name", Value::String(name.to_string()))
        .with_attribute("region_id", Value::String(region.to_string()));

    if let Some(json) = public_network {
        let parsed: serde_json::Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid public network JSON: {}", e))?;
        let block =
            json_to_value(&parsed).map_err(|e| format!("Invalid public network JSON: {}", e))?;
        resource = resource.with_attribute("public_network", block);
    }

    validate_resource(&resource)?;

    println!("{}", format!("Creating VDC {}...", name).cyan());
    let state = provider.create(&resource).await.map_err(|e| e.to_string())?;

    let vdc_id = state.identifier.as_deref().unwrap_or("unknown");
    println!(
        "{}",
        format!("✓ VDC created with id {}.", vdc_id).green().bold()
    );

    Ok(())
}

async fn run_delete(vdc_id: &str, auto_approve: bool) -> Result<(), String> {
    let provider = get_provider()?;
    let id = ResourceId::new("vdc", vdc_id);

    if !auto_approve {
        println!(
            "{}",
            format!("Do you really want to delete VDC {}?", vdc_id)
                .yellow()
                .bold()
        );
        println!(
            "  {}",
            "This action cannot be undone. Type 'yes' to confirm.".yellow()
        );
        print!("\n  Enter a value: ");
        std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| e.to_string())?;

        if input.trim() != "yes" {
            println!();
            println!("{}", "Delete cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    println!("{}", format!("Deleting VDC {}...", vdc_id).red().bold());
    provider
        .delete(&id, vdc_id)
        .await
        .map_err(|e| e.to_string())?;

    println!("{}", "✓ VDC deleted.".green().bold());
    Ok(())
}

fn validate_resource(resource: &Resource) -> Result<(), String> {
    let mut all_errors = Vec::new();

    for schema in schemas::all_schemas() {
        if schema.resource_type == resource.id.resource_type
            && let Err(errors) = schema.validate(&resource.attributes)
        {
            for error in errors {
                all_errors.push(format!(
                    "{}.{}: {}",
                    resource.id.resource_type, resource.id.name, error
                ));
            }
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors.join("\n"))
    }
}

fn json_to_value(json: &serde_json::Value) -> Result<Value, String> {
    match json {
        serde_json::Value::String(s) => Ok(Value::String(s.clone())),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| format!("expected an integer, got {}", n)),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Array(items) => Ok(Value::List(
            items
                .iter()
                .map(json_to_value)
                .collect::<Result<Vec<_>, _>>()?,
        )),
        serde_json::Value::Object(map) => {
            let m = map
                .iter()
                .map(|(k, v)| Ok((k.clone(), json_to_value(v)?)))
                .collect::<Result<HashMap<_, _>, String>>()?;
            Ok(Value::Map(m))
        }
        serde_json::Value::Null => Err("null is not a valid attribute value".to_string()),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            let strs: Vec<_> = keys
                .iter()
                .map(|k| format!("{}: {}", k, format_value(&map[*k])))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_to_value_rejects_floats_and_null() {
        assert!(json_to_value(&serde_json::json!(1.5)).is_err());
        assert!(json_to_value(&serde_json::json!(null)).is_err());
        assert!(json_to_value(&serde_json::json!({"qos": null})).is_err());
    }

    #[test]
    fn json_to_value_converts_blocks() {
        let value = json_to_value(&serde_json::json!({"ipnum": 4, "type": "Classic"})).unwrap();
        let Value::Map(block) = value else {
            panic!("expected a map")
        };
        assert_eq!(block.get("ipnum"), Some(&Value::Int(4)));
        assert_eq!(
            block.get("type"),
            Some(&Value::String("Classic".to_string()))
        );
    }
}
