// FILE: src/cli/config.rs

use crate::error::{CompilerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub layout: Option<String>,
    pub resources: Option<String>,
    pub output: Option<String>,
    pub default_delay: Option<u32>,
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    let config_content = fs::read_to_string(config_path).map_err(|e| {
        CompilerError::FileNotFound {
            path: format!("Config file {}: {}", config_path, e),
        }
    })?;

    let config = if config_path.ends_with(".json") {
        serde_json::from_str(&config_content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })?
    } else if config_path.ends_with(".toml") {
        toml::from_str(&config_content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })?
    } else {
        return Err(CompilerError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        });
    };

    log::info!("Loaded configuration from {}", config_path);
    Ok(config)
}
