//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use featdump_core::config::{ExtractSettings, SettingsOverrides};
use featdump_core::transport::{parse_header, RequestOptions};

use crate::cli::{Cli, ExtractArgs};

/// Default and file layers plus environment; no CLI flags yet
pub fn load_base_settings(cli: &Cli) -> Result<ExtractSettings> {
    let mut settings = ExtractSettings::with_defaults();
    if let Some(path) = &cli.config {
        settings = settings
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }
    Ok(settings.load_from_env())
}

/// Overrides carried by global flags
fn global_overrides(cli: &Cli) -> SettingsOverrides {
    SettingsOverrides {
        request_timeout: cli.request_timeout,
        verify_tls: cli.no_ssl_verify.then_some(false),
        ..SettingsOverrides::default()
    }
}

/// Fully layered settings for `featdump config`
pub fn load_settings(cli: &Cli) -> Result<ExtractSettings> {
    let mut settings = load_base_settings(cli)?;
    settings.update_from_cli(global_overrides(cli));
    settings.validate()?;
    Ok(settings)
}

/// Fully layered settings for an extraction
pub fn load_extract_settings(cli: &Cli, args: &ExtractArgs) -> Result<ExtractSettings> {
    let mut settings = load_base_settings(cli)?;
    settings.update_from_cli(global_overrides(cli));
    settings.update_from_cli(SettingsOverrides {
        batch_size: args.batch_size,
        requests_to_pause: args.requests_to_pause,
        pause_seconds: args.pause_seconds,
        max_attempts: args.max_attempts,
        retry_delay: args.retry_delay,
        geometry_precision: args.geometry_precision,
        out_srs: args.out_srs.clone(),
        ..SettingsOverrides::default()
    });
    settings.validate()?;
    Ok(settings)
}

/// HTTP options from settings and `--header` flags
pub fn request_options(cli: &Cli, settings: &ExtractSettings) -> Result<RequestOptions> {
    let headers = cli
        .headers
        .iter()
        .map(|h| parse_header(h))
        .collect::<featdump_core::Result<Vec<_>>>()?;

    Ok(RequestOptions {
        timeout: settings.timeout(),
        verify_tls: settings.verify_tls.value,
        headers,
    })
}
