//! Endpoint configuration.
//!
//! ```toml
//! endpoint = "http://data.nobelprize.org/sparql"
//!
//! [prefixes]
//! nobel = "http://data.nobelprize.org/terms/"
//! foaf = "http://xmlns.com/foaf/0.1/"
//! ```
//!
//! Keys left out fall back to the Nobel Prize endpoint and its prefixes.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::ast::PrefixTable;
use crate::nobel;

pub const CONFIG_FILENAME: &str = "sparqlgen.toml";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub endpoint: String,
    pub prefixes: PrefixTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: nobel::ENDPOINT.to_owned(),
            prefixes: nobel::prefixes(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid configuration in {}", path.display()))
    }
}
