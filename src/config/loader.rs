// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::config::model::RawConfigFile;
use crate::errors::Result;

/// Load a configuration file and return the raw, unvalidated sections.
///
/// Only TOML deserialization happens here. Required values may still be
/// missing; they can come from the command line.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;

    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

pub fn load_from_str(contents: &str) -> Result<RawConfigFile> {
    Ok(toml::from_str(contents)?)
}
