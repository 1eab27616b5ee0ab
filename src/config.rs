use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::sim::DataValues;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    Basic,
    Transition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOp {
    Assign,
    Finish,
    Cancel,
    Fire,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Step {
    pub op: StepOp,
    /// Ignored for `reset`.
    #[serde(default)]
    pub transition: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RunConfig {
    #[serde(default)]
    pub engine: EngineKind,
    #[serde(default)]
    pub data: DataValues,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default = "default_stop_on_error")]
    pub stop_on_error: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            data: DataValues::new(),
            steps: Vec::new(),
            stop_on_error: default_stop_on_error(),
        }
    }
}

impl RunConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(content)?;
        Ok(config)
    }
}

fn default_stop_on_error() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let config = RunConfig::load_from_file("/nonexistent/pnsim.toml").unwrap();
        assert_eq!(config, RunConfig::default());
        assert!(config.stop_on_error);
    }

    #[test]
    fn parses_engine_data_and_steps() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
engine = "transition"
stop_on_error = false

[data]
x = 7
ratio = 0.5

[[steps]]
op = "fire"
transition = "t1"

[[steps]]
op = "reset"
"#
        )
        .unwrap();
        let config = RunConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.engine, EngineKind::Transition);
        assert!(!config.stop_on_error);
        assert_eq!(config.data.get("x"), Some(&7.0));
        assert_eq!(config.data.get("ratio"), Some(&0.5));
        assert_eq!(config.steps.len(), 2);
        assert_eq!(config.steps[0].op, StepOp::Fire);
        assert_eq!(config.steps[1].transition, "");
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(RunConfig::from_toml_str("engine = \"quantum\"").is_err());
    }
}
