use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::is_local_endpoint_url;

pub const DEFAULT_API_BASE: &str = "http://localhost:8002";
pub const DEFAULT_EDITOR_PATH: &str = "memory/MEMORY.md";
pub const SKILLS_SNAPSHOT_PATH: &str = "workspace/SKILLS_SNAPSHOT.md";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_base: String,
    pub editor_path: String,
    pub working_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_base = std::env::var("WORKDECK_API_BASE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let editor_path = std::env::var("WORKDECK_EDITOR_PATH")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_EDITOR_PATH.to_string());

        Ok(Self {
            api_base,
            editor_path,
            working_dir: std::env::current_dir()?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            bail!(
                "Invalid WORKDECK_API_BASE '{}': expected http:// or https:// URL",
                self.api_base
            );
        }

        if !is_local_endpoint_url(&self.api_base) {
            eprintln!(
                "⚠️  WARNING: WORKDECK_API_BASE '{}' is not a local endpoint; the backend is expected to run locally",
                self.api_base
            );
        }

        Ok(())
    }
}
