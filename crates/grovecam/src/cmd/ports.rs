use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use grovecam_transport::{list_ports, PortInfo};
use serde::Serialize;

use crate::cmd::PortsArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    description: Option<&'a str>,
}

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports = list_ports().map_err(|err| transport_error("port enumeration failed", err))?;
    print_ports(&ports, format);
    Ok(SUCCESS)
}

fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|p| PortOutput {
                    name: &p.name,
                    kind: p.kind,
                    description: p.description.as_deref(),
                })
                .collect();
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "TYPE", "DESCRIPTION"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.to_string(),
                    port.description.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in ports {
                match &port.description {
                    Some(desc) => println!("{} ({}, {desc})", port.name, port.kind),
                    None => println!("{} ({})", port.name, port.kind),
                }
            }
        }
    }
}
