//! Output sink configuration.

use serde::{Deserialize, Serialize};

fn default_directory() -> String {
    "lakehouse".to_string()
}

const fn default_parquet() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Directory the record tables are written to.
    #[serde(default = "default_directory")]
    pub directory: String,

    /// Write one Parquet file per record table.
    #[serde(default = "default_parquet")]
    pub parquet: bool,

    /// Also write pretty JSON copies under `<directory>/json/`.
    #[serde(default)]
    pub json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            parquet: default_parquet(),
            json: false,
        }
    }
}
