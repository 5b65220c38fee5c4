use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Café Map Viewer - headless driver for the café clustering and
/// reconciliation engine
pub struct Settings {
    /// JSON dataset of café records to load
    #[clap(short, long, value_name = "FILE")]
    pub dataset: PathBuf,

    /// Initial map center longitude
    #[clap(long, default_value = "130.546634")]
    pub lng: f64,

    /// Initial map center latitude
    #[clap(long, default_value = "31.570480")]
    pub lat: f64,

    /// Initial zoom level
    #[clap(short, long, default_value = "14.0")]
    pub zoom: f64,

    /// Visible longitude span in degrees at the initial zoom
    #[clap(long, default_value = "0.04")]
    pub lng_span: f64,

    /// Visible latitude span in degrees at the initial zoom
    #[clap(long, default_value = "0.03")]
    pub lat_span: f64,

    /// Map container width in pixels
    #[clap(long, default_value = "1280.0")]
    pub width: f64,

    /// At or below this zoom the map renders clusters instead of markers
    #[clap(long, default_value = "14.0")]
    pub zoom_threshold: f64,

    /// Search for a café by name or address and select the first match
    #[clap(short, long)]
    pub query: Option<String>,

    /// Path of the persisted-state file (defaults to the per-user config dir)
    #[clap(long, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// Ignore previously persisted state and start fresh
    #[clap(long, default_value = "false")]
    pub ignore_persisted: bool,
}
