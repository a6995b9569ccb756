use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// featdump - extract every feature of a layer from a WMS/WFS service
#[derive(Parser, Debug)]
#[command(name = "featdump")]
#[command(about = "Resumable bulk extraction of vector features from OGC WMS/WFS services", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Log level filter (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub no_ssl_verify: bool,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub request_timeout: Option<f64>,

    /// Extra request header, "Name: value" (repeatable)
    #[arg(long = "header", global = true, value_name = "HEADER")]
    pub headers: Vec<String>,

    /// TOML file with default settings
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract all features of a layer into a GeoJSON Lines file
    Extract(ExtractArgs),

    /// Show the effective settings and where each value comes from
    Config,
}

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Layer to extract; "namespace:layer" with --geoserver-url selects the namespace endpoint
    pub layername: String,

    /// Output file (defaults to the layer name with a .geojsonl extension)
    pub output_file: Option<PathBuf>,

    /// Directory for the default output file
    #[arg(long, short = 'd', default_value = ".")]
    pub output_dir: PathBuf,

    /// GeoServer base url; the service url becomes <url>/[<namespace>/]ows
    #[arg(long, short = 'g', conflicts_with = "service_url")]
    pub geoserver_url: Option<String>,

    /// Full url of the WMS/WFS endpoint
    #[arg(long, short = 'u')]
    pub service_url: Option<String>,

    /// Service to use (WMS or WFS)
    #[arg(long, short = 's', default_value = "WFS")]
    pub service: String,

    /// Service version (defaults to 1.1.1 for WMS, 1.0.0 for WFS)
    #[arg(long, short = 'v')]
    pub service_version: Option<String>,

    /// Pagination strategy (OFFSET or EXTENT)
    #[arg(long, short = 'm', default_value = "OFFSET")]
    pub retrieval_mode: String,

    /// WMS operation (GetMap or GetFeatureInfo); WFS always uses GetFeature
    #[arg(long, short = 'o', default_value = "GetMap")]
    pub operation: String,

    /// Property used to order records in OFFSET mode
    #[arg(long, short = 'k')]
    pub sort_key: Option<String>,

    /// Records requested per page
    #[arg(long, short = 'b')]
    pub batch_size: Option<usize>,

    /// Seconds to pause after every --requests-to-pause requests
    #[arg(long)]
    pub pause_seconds: Option<f64>,

    /// Requests between pauses; 0 disables pausing
    #[arg(long)]
    pub requests_to_pause: Option<u32>,

    /// Attempts per request before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Base delay in seconds between attempts, multiplied by the attempt number
    #[arg(long)]
    pub retry_delay: Option<f64>,

    /// Decimal digits kept in coordinates; -1 keeps full precision
    #[arg(long, short = 'p', allow_hyphen_values = true)]
    pub geometry_precision: Option<i32>,

    /// GetMap response format (GEORSS or KML)
    #[arg(long, short = 'f', default_value = "GEORSS")]
    pub getmap_format: String,

    /// Drop the representative point KML adds to each placemark geometry
    #[arg(long)]
    pub kml_strip_point: bool,

    /// CRS requested for output coordinates
    #[arg(long)]
    pub out_srs: Option<String>,

    /// Restrict extraction to "xmin,ymin,xmax,ymax" (defaults to the CRS bounds)
    #[arg(long, allow_hyphen_values = true)]
    pub bounds: Option<String>,

    /// Largest box requested in EXTENT mode, "dx,dy"
    #[arg(long)]
    pub max_box_dims: Option<String>,

    /// Skip this many records before paging (OFFSET mode only)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub skip_index: i64,
}
