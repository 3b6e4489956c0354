// Single source of truth for compile options
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Options recognised by a single component compile.
///
/// Field names follow the inventory `compile` block, so the same struct can be
/// deserialized from target parameters or filled in from the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    #[serde(alias = "output_type")]
    pub output: String,
    pub prune: bool,
    pub reveal: bool,
    pub target_name: Option<String>,
    pub inventory_path: Option<PathBuf>,
    pub indent: usize,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            output: OutputType::default().to_string(),
            prune: false,
            reveal: false,
            target_name: None,
            inventory_path: None,
            indent: 2,
        }
    }
}

/// Serialization used for every output item of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputType {
    Json,
    #[default]
    Yaml,
    Yml,
    Plain,
}

impl OutputType {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            OutputType::Json => Some("json"),
            OutputType::Yaml => Some("yaml"),
            OutputType::Yml => Some("yml"),
            OutputType::Plain => None,
        }
    }

    /// File name for an output item: `<key>.<ext>`, or the bare key for plain text.
    pub fn file_name(&self, item_key: &str) -> String {
        match self.extension() {
            Some(ext) => format!("{item_key}.{ext}"),
            None => item_key.to_string(),
        }
    }
}

impl FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputType::Json),
            "yaml" => Ok(OutputType::Yaml),
            "yml" => Ok(OutputType::Yml),
            "plain" => Ok(OutputType::Plain),
            other => Err(format!("unknown output type: {other}")),
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputType::Json => "json",
            OutputType::Yaml => "yaml",
            OutputType::Yml => "yml",
            OutputType::Plain => "plain",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompileConfig::default();
        assert_eq!(config.output, "yaml");
        assert_eq!(config.indent, 2);
        assert!(!config.prune);
        assert!(!config.reveal);
    }

    #[test]
    fn test_config_from_inventory_block() {
        let config: CompileConfig = serde_json::from_value(serde_json::json!({
            "output_type": "json",
            "prune": true,
            "target_name": "minikube"
        }))
        .unwrap();

        assert_eq!(config.output, "json");
        assert!(config.prune);
        assert_eq!(config.target_name.as_deref(), Some("minikube"));
        assert_eq!(config.indent, 2);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(OutputType::Json.file_name("a"), "a.json");
        assert_eq!(OutputType::Yml.file_name("a"), "a.yml");
        assert_eq!(OutputType::Plain.file_name("README"), "README");
    }

    #[test]
    fn test_unknown_output_type() {
        assert!("toml".parse::<OutputType>().is_err());
        assert_eq!("yml".parse::<OutputType>().unwrap(), OutputType::Yml);
    }
}
