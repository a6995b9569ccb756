use anyhow::Result;
use featdump_core::client::FeatureClient;
use featdump_core::extract::{self, default_output_name, service_url_for_geoserver, ExtractJob};
use featdump_core::models::{
    bounds_for_crs, parse_bounds, parse_box_dims, GetMapFormat, Operation, RetrievalMode, Service,
};
use featdump_core::transport::{HttpTransport, Pacer, Retrying};
use featdump_core::{ExtractError, ServerErrorKind};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::{Cli, ExtractArgs};
use crate::config_loader::{load_extract_settings, request_options};
use crate::errors::{from_extract_error, missing_endpoint, Reported};
use crate::output::OutputWriter;
use crate::progress::ExtractProgress;

#[derive(Serialize)]
struct ExtractOutput {
    output: PathBuf,
    written: u64,
    resumed: bool,
}

/// Endpoint url and layer name to request
fn resolve_endpoint(args: &ExtractArgs) -> Result<(String, String)> {
    match (&args.geoserver_url, &args.service_url) {
        (Some(geoserver), _) => Ok(service_url_for_geoserver(geoserver, &args.layername)?),
        (None, Some(url)) => Ok((url.clone(), args.layername.clone())),
        (None, None) => Err(missing_endpoint().into()),
    }
}

fn resolve_output(args: &ExtractArgs, output: &OutputWriter) -> PathBuf {
    match &args.output_file {
        Some(path) => path.clone(),
        None => {
            let path = args.output_dir.join(default_output_name(&args.layername));
            output.info(format!("Output file not specified, writing to {}", path.display()));
            path
        }
    }
}

/// Execute the extract command
pub fn execute(cli: &Cli, args: &ExtractArgs, output: &OutputWriter) -> Result<()> {
    let settings = load_extract_settings(cli, args)?;
    let options = request_options(cli, &settings)?;

    let service: Service = args.service.parse()?;
    let operation: Operation = args.operation.parse()?;
    let mode: RetrievalMode = args.retrieval_mode.parse()?;
    let getmap_format: GetMapFormat = args.getmap_format.parse()?;
    let version = args
        .service_version
        .clone()
        .unwrap_or_else(|| service.default_version().to_string());

    if args.skip_index < 0 {
        return Err(ExtractError::config("skip_index", "skip index can't be negative").into());
    }

    let (url, layername) = resolve_endpoint(args)?;
    let out_srs = settings.out_srs.value.clone();

    let bounds = match &args.bounds {
        Some(text) => parse_bounds(text, &out_srs)?,
        None => {
            let bounds = bounds_for_crs(&out_srs)?;
            tracing::info!("Working with bounds: {}", bounds.to_bbox_string(None));
            bounds
        }
    };
    let max_box = match (&args.max_box_dims, mode) {
        (Some(text), RetrievalMode::Extent) => Some(parse_box_dims(text)?),
        _ => None,
    };

    let job = ExtractJob {
        url,
        layername,
        service,
        version,
        operation,
        mode,
        sort_key: args.sort_key.clone(),
        out_srs,
        getmap_format,
        output: resolve_output(args, output),
        bounds,
        max_box,
        skip_index: args.skip_index as u64,
        batch_size: settings.batch_size.value,
    }
    .normalized();

    let transport = Retrying::new(
        HttpTransport::new(job.url.clone(), &options)?,
        settings.max_attempts.value,
        settings.retry_delay(),
    );
    let mut client = FeatureClient::new(transport, job.query(), job.bounds)
        .with_precision(settings.geometry_precision.value)
        .with_pacer(Pacer::new(settings.requests_to_pause.value, settings.pause()))
        .with_kml_strip_points(args.kml_strip_point);

    let progress = ExtractProgress::new(&job.layername);
    let result = extract::run(&job, &mut client, |written| progress.update(written));

    match result {
        Ok(summary) => {
            progress.finish(summary.written, summary.resumed);
            if output.is_json() {
                output.result(ExtractOutput {
                    output: summary.output,
                    written: summary.written,
                    resumed: summary.resumed,
                })?;
            } else {
                output.success(format!("Done, output written to {}", summary.output.display()));
            }
            Ok(())
        }
        Err(err) => {
            progress.fail();
            let kind = err.kind();
            from_extract_error(&err, service.as_str()).display();

            if matches!(
                kind,
                Some(ServerErrorKind::SortKeyRequired) | Some(ServerErrorKind::InvalidSortKey)
            ) {
                dump_samples(&mut client, output);
            }
            Err(Reported(err).into())
        }
    }
}

/// Print a couple of records so a sort key can be picked
fn dump_samples<T: featdump_core::transport::Transport>(
    client: &mut FeatureClient<T>,
    output: &OutputWriter,
) {
    output.info("Dumping a couple of records to inspect and pick a sorting key");
    match extract::sample_properties(client) {
        Ok(samples) => {
            for properties in samples {
                if let Err(e) = output.result(properties) {
                    tracing::warn!("Could not print sample record: {}", e);
                }
            }
        }
        Err(e) => tracing::warn!("Could not fetch sample records: {}", e),
    }
}
