// Error types for rallyboard

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum RallyboardError {
    // Errors talking to the timing backend
    #[snafu(display("Error sending query to the timing backend"))]
    TransportRequest { source: reqwest::Error },
    #[snafu(display("Timing backend rejected the query with status {status}"))]
    TransportStatus { status: u16 },
    #[snafu(display("Error decoding timing backend response"))]
    TransportDecode { source: reqwest::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIO { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerialize { source: serde_json::Error },
}
