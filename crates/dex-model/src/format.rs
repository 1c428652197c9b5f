use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output formats a dataset can be requested in.
///
/// `Hyper` and `Pbix` are recognised tokens, but no renderer produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Xlsx,
    Info,
    Tdsx,
    Json,
    Hyper,
    Pbix,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 7] = [
        OutputFormat::Csv,
        OutputFormat::Xlsx,
        OutputFormat::Info,
        OutputFormat::Tdsx,
        OutputFormat::Json,
        OutputFormat::Hyper,
        OutputFormat::Pbix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Xlsx => "xlsx",
            OutputFormat::Info => "info",
            OutputFormat::Tdsx => "tdsx",
            OutputFormat::Json => "json",
            OutputFormat::Hyper => "hyper",
            OutputFormat::Pbix => "pbix",
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Info => "xlsx",
            other => other.as_str(),
        }
    }

    /// Spreadsheet outputs are bounded by the worksheet row limit.
    pub fn is_spreadsheet(&self) -> bool {
        matches!(self, OutputFormat::Xlsx | OutputFormat::Info)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == token)
            .ok_or_else(|| format!("unknown output format: {s}"))
    }
}
