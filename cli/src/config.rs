//! `tarn.toml`-style configuration file.
//!
//! ```toml
//! [vm]
//! max_call_depth = 256
//! heap_size_bytes = 65536
//! max_steps = 1000000
//! ```

use std::fs;

use anyhow::{Context, Result};
use serde::Deserialize;
use vm::VmConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub vm: VmConfig,
}

pub fn parse(text: &str) -> Result<VmConfig> {
    let file: ConfigFile = toml::from_str(text).context("invalid configuration")?;
    Ok(file.vm)
}

/// Defaults when `path` is `None`.
pub fn load(path: Option<&str>) -> Result<VmConfig> {
    let Some(path) = path else {
        return Ok(VmConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?;
    parse(&text).with_context(|| format!("in {path}"))
}
