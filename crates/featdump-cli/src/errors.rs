use console::style;
use featdump_core::{ExtractError, ServerErrorKind};
use std::fmt;

/// Enhanced error type with suggestions
#[derive(Clone)]
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Failure whose message has already been shown to the user
#[derive(Debug)]
pub struct Reported(pub ExtractError);

impl fmt::Display for Reported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for Reported {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Neither endpoint option was given
pub fn missing_endpoint() -> CliError {
    CliError::new("No service endpoint given")
        .with_suggestion("Pass the endpoint directly: --service-url https://host/geoserver/ows")
        .with_suggestion("Or pass a GeoServer base url: --geoserver-url https://host/geoserver")
        .with_help("Run: featdump extract --help")
}

/// Message and suggestions for a server condition
fn server_error(kind: ServerErrorKind, message: &str, service: &str) -> CliError {
    let base = CliError::new(format!("Server rejected the request: {}", kind))
        .with_context(format!("Server message: {}", message));

    match kind {
        ServerErrorKind::SortKeyRequired => base
            .with_suggestion("Failed to iterate over records as no sorting key is specified")
            .with_suggestion("Pick a unique property from the sample records below and pass --sort-key"),
        ServerErrorKind::InvalidSortKey => base
            .with_suggestion("The sort key is not a property of this layer")
            .with_suggestion("Pick a property from the sample records below and pass --sort-key"),
        ServerErrorKind::WfsUnsupported => base.with_suggestion("WFS is switched off here, try --service WMS"),
        ServerErrorKind::ServiceUnsupported => {
            let alternative = if service.eq_ignore_ascii_case("WFS") { "WMS" } else { "WFS" };
            base.with_suggestion(format!(
                "{} is not supported on this endpoint, try --service {}",
                service.to_uppercase(),
                alternative
            ))
        }
        ServerErrorKind::KmlUnsupported => {
            base.with_suggestion("KML is not supported on this endpoint, try --getmap-format GEORSS")
        }
        ServerErrorKind::GeoRssUnsupported => {
            base.with_suggestion("GeoRSS is not supported on this endpoint, try --getmap-format KML")
        }
        ServerErrorKind::LayerMissing => base
            .with_suggestion("Check the layer name against the service capabilities")
            .with_suggestion("With --geoserver-url, use \"namespace:layer\" for namespaced layers"),
        ServerErrorKind::ZeroArea => base.with_suggestion("Check --bounds and --max-box-dims"),
    }
}

/// Convert a core error into a user-facing message
pub fn from_extract_error(error: &ExtractError, service: &str) -> CliError {
    if let Some(kind) = error.kind() {
        let message = match error {
            ExtractError::RetriesExhausted { source, .. } => source.to_string(),
            other => other.to_string(),
        };
        return server_error(kind, &message, service);
    }

    match error {
        ExtractError::InconsistentFiles { existing, missing } => {
            CliError::new("Output and state files are out of step")
                .with_context(format!(
                    "{} exists but {} does not.",
                    existing.display(),
                    missing.display()
                ))
                .with_suggestion(format!("Delete {} to start over", existing.display()))
        }
        ExtractError::StateMismatch(reason) | ExtractError::StateValidation(reason) => {
            CliError::new("Cannot resume from the existing state file")
                .with_context(format!("Reason: {}", reason))
                .with_suggestion("Rerun with the same arguments as the interrupted run")
                .with_suggestion("Or delete the output file and its .state file to start over")
        }
        ExtractError::ConfigInvalid { key, reason } => CliError::new(format!("Invalid configuration: {}", key))
            .with_context(format!("Reason: {}", reason))
            .with_help("Run: featdump extract --help"),
        ExtractError::RetriesExhausted { attempts, source } => {
            CliError::new(format!("Giving up after {} attempts", attempts))
                .with_context(format!("Last error: {}", source))
                .with_suggestion("Progress is saved, rerun the same command to resume")
                .with_suggestion("Raise --max-attempts or --retry-delay for a flaky server")
        }
        other => CliError::new(other.to_string())
            .with_suggestion("Progress is saved, rerun the same command to resume"),
    }
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: &anyhow::Error, service: &str) -> CliError {
    if let Some(extract) = error.downcast_ref::<ExtractError>() {
        return from_extract_error(extract, service);
    }
    if let Some(cli) = error.downcast_ref::<CliError>() {
        return cli.clone();
    }

    let message = error.to_string();
    if message.contains("permission denied") || message.contains("Permission denied") {
        CliError::new("Permission denied")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check file permissions")
    } else {
        CliError::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_service_unsupported_suggests_alternative() {
        let err = ExtractError::Server {
            kind: ServerErrorKind::ServiceUnsupported,
            message: "No service: ( wfs )".to_string(),
        };
        let cli = from_extract_error(&err, "wfs");
        assert!(cli.suggestions[0].contains("--service WMS"));
    }

    #[test]
    fn test_kind_seen_through_retries() {
        let err = ExtractError::RetriesExhausted {
            attempts: 5,
            source: Box::new(ExtractError::Server {
                kind: ServerErrorKind::KmlUnsupported,
                message: "no kml".to_string(),
            }),
        };
        let cli = from_extract_error(&err, "WMS");
        assert!(cli.suggestions[0].contains("GEORSS"));
    }

    #[test]
    fn test_inconsistent_files_names_existing_file() {
        let err = ExtractError::InconsistentFiles {
            existing: PathBuf::from("roads.geojsonl.state"),
            missing: PathBuf::from("roads.geojsonl"),
        };
        let cli = from_extract_error(&err, "WFS");
        assert!(cli.suggestions[0].contains("roads.geojsonl.state"));
    }
}
