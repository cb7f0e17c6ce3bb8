use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use shellyrpc::{DeviceInfo, MethodList};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print the `result` of a response frame. `Raw` writes the frame untouched.
pub fn print_result(frame: &[u8], format: OutputFormat) {
    if let OutputFormat::Raw = format {
        print_raw(frame);
        println!();
        return;
    }

    let result = serde_json::from_slice::<Value>(frame)
        .ok()
        .and_then(|mut value| value.get_mut("result").map(Value::take))
        .unwrap_or(Value::Null);

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Pretty => println!(
            "{}",
            serde_json::to_string_pretty(&result).unwrap_or_else(|_| "null".to_string())
        ),
        OutputFormat::Table => match result {
            Value::Object(fields) => {
                let mut table = new_table(vec!["FIELD", "VALUE"]);
                for (key, value) in fields {
                    table.add_row(vec![key, scalar(&value)]);
                }
                println!("{table}");
            }
            other => println!("{}", scalar(&other)),
        },
        OutputFormat::Raw => {}
    }
}

pub fn print_device_info(info: &DeviceInfo, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(info),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            for (field, value) in device_rows(info) {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Device Info:");
            for (field, value) in device_rows(info) {
                println!("  {:<13} {value}", format!("{field}:"));
            }
        }
        OutputFormat::Raw => println!("{}", info.id),
    }
}

pub fn print_methods(list: &MethodList, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(list),
        OutputFormat::Table => {
            let mut table = new_table(vec!["METHOD"]);
            for method in &list.methods {
                table.add_row(vec![method.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for method in &list.methods {
                println!("{method}");
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn device_rows(info: &DeviceInfo) -> Vec<(&'static str, String)> {
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    vec![
        ("ID", info.id.clone()),
        ("Name", or_dash(&info.name)),
        ("Model", or_dash(&info.model)),
        (
            "Generation",
            info.generation
                .map_or_else(|| "-".to_string(), |g| g.to_string()),
        ),
        ("MAC", or_dash(&info.mac)),
        ("App", or_dash(&info.app)),
        ("Firmware", or_dash(&info.version)),
        ("Firmware ID", or_dash(&info.fw_id)),
        ("Profile", or_dash(&info.profile)),
        ("Auth", auth_summary(info)),
    ]
}

fn auth_summary(info: &DeviceInfo) -> String {
    match (info.auth_enabled, &info.auth_domain) {
        (true, Some(domain)) => format!("enabled ({domain})"),
        (true, None) => "enabled".to_string(),
        (false, _) => "disabled".to_string(),
    }
}

/// Strings unquoted, everything else as compact JSON.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_unquotes_strings_only() {
        assert_eq!(scalar(&Value::String("on".into())), "on");
        assert_eq!(scalar(&serde_json::json!(true)), "true");
        assert_eq!(scalar(&serde_json::json!({"a":1})), r#"{"a":1}"#);
    }

    #[test]
    fn device_rows_fill_gaps() {
        let info = DeviceInfo {
            id: "shellyplus1-abc".into(),
            auth_enabled: true,
            auth_domain: Some("shellyplus1-abc".into()),
            ..DeviceInfo::default()
        };
        let rows = device_rows(&info);
        assert_eq!(rows[0], ("ID", "shellyplus1-abc".to_string()));
        assert_eq!(rows[1], ("Name", "-".to_string()));
        assert_eq!(rows.last().unwrap().1, "enabled (shellyplus1-abc)");
    }
}
