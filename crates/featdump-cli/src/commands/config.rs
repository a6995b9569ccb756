use anyhow::Result;
use featdump_core::config::ConfigSource;
use serde::Serialize;
use std::collections::BTreeMap;
use tabled::Tabled;

use crate::cli::Cli;
use crate::config_loader::load_settings;
use crate::output::OutputWriter;

#[derive(Serialize)]
struct SettingEntry {
    value: String,
    source: ConfigSource,
}

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

/// Execute the config command
pub fn execute(cli: &Cli, output: &OutputWriter) -> Result<()> {
    let inspection_map = load_settings(cli)?.to_inspection_map();

    if output.is_json() {
        let entries: BTreeMap<String, SettingEntry> = inspection_map
            .into_iter()
            .map(|(key, (value, source))| (key, SettingEntry { value, source }))
            .collect();
        output.result(entries)?;
    } else {
        output.section("Configuration Values");

        let rows: Vec<ConfigRow> = inspection_map
            .into_iter()
            .map(|(key, (value, source))| ConfigRow {
                key,
                value,
                source: format!("{:?}", source),
            })
            .collect();
        output.table(rows);

        output.section("Configuration Precedence");
        output.kv("Order", "CLI arguments > Environment variables > Config file > Defaults");
    }

    Ok(())
}
