//! `.kml-elevate.toml` configuration files

use anyhow::{Context, Result};
use colored::Colorize;
use kml_elevate::ExtrudeMode;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the home and current directories
pub const CONFIG_FILE_NAME: &str = ".kml-elevate.toml";

/// Configuration file structure for .kml-elevate.toml
///
/// Configuration files can be placed in:
/// - User home directory: ~/.kml-elevate.toml (user defaults)
/// - Project directory: ./.kml-elevate.toml (project defaults)
/// - Custom location via --config flag (replaces both)
///
/// Precedence order (highest to lowest):
/// 1. Command-line arguments (--delta, --color, etc.)
/// 2. Project config (./.kml-elevate.toml)
/// 3. User config (~/.kml-elevate.toml)
/// 4. Built-in defaults
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default transform parameters
    pub transform: Option<TransformConfig>,

    /// Default output settings
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    /// Elevation delta in meters
    pub delta: Option<f64>,

    /// Line color, `#RRGGBB`
    pub color: Option<String>,

    /// `follow-color`, `always` or `never`
    pub extrude: Option<ExtrudeMode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Suffix inserted before the extension (default `_elevated`)
    pub suffix: Option<String>,

    /// Overwrite existing output files
    pub force: Option<bool>,
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find and load configuration files
    /// Returns (`user_config`, `project_config`)
    pub fn discover_configs() -> (Option<Self>, Option<Self>) {
        let user_config = dirs::home_dir()
            .and_then(|home| Self::load_optional(&home.join(CONFIG_FILE_NAME), "user"));
        let project_config = Self::load_optional(&PathBuf::from(CONFIG_FILE_NAME), "project");
        (user_config, project_config)
    }

    /// Load a config that may be absent; a broken one is reported and skipped
    fn load_optional(path: &Path, kind: &str) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(config) => {
                log::debug!("loaded {kind} config from {}", path.display());
                Some(config)
            }
            Err(e) => {
                eprintln!(
                    "{} Failed to load {kind} config from {}: {e:#}",
                    "Warning:".yellow().bold(),
                    path.display(),
                );
                None
            }
        }
    }

    /// Merge configs field by field
    /// CLI args > project config > user config > defaults
    pub fn merge(user_config: Option<Self>, project_config: Option<Self>) -> Self {
        let mut merged = user_config.unwrap_or_default();

        if let Some(project) = project_config {
            if let Some(transform) = project.transform {
                let mut merged_transform = merged.transform.unwrap_or_default();
                if let Some(delta) = transform.delta {
                    merged_transform.delta = Some(delta);
                }
                if let Some(color) = transform.color {
                    merged_transform.color = Some(color);
                }
                if let Some(extrude) = transform.extrude {
                    merged_transform.extrude = Some(extrude);
                }
                merged.transform = Some(merged_transform);
            }

            if let Some(output) = project.output {
                let mut merged_output = merged.output.unwrap_or_default();
                if let Some(suffix) = output.suffix {
                    merged_output.suffix = Some(suffix);
                }
                if let Some(force) = output.force {
                    merged_output.force = Some(force);
                }
                merged.output = Some(merged_output);
            }
        }

        merged
    }

    /// `[transform]` section, or empty defaults
    pub fn transform(&self) -> TransformConfig {
        self.transform.clone().unwrap_or_default()
    }

    /// `[output]` section, or empty defaults
    pub fn output(&self) -> OutputConfig {
        self.output.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r##"
            [transform]
            delta = -12.5
            color = "#ff8800"
            extrude = "always"

            [output]
            suffix = "_raised"
            force = true
            "##,
        )
        .unwrap();

        let transform = config.transform();
        assert_eq!(transform.delta, Some(-12.5));
        assert_eq!(transform.color.as_deref(), Some("#ff8800"));
        assert_eq!(transform.extrude, Some(ExtrudeMode::Always));
        assert_eq!(config.output().suffix.as_deref(), Some("_raised"));
        assert_eq!(config.output().force, Some(true));
    }

    #[test]
    fn test_extrude_names() {
        let config: Config = toml::from_str("[transform]\nextrude = \"follow-color\"").unwrap();
        assert_eq!(config.transform().extrude, Some(ExtrudeMode::FollowLineColor));
        assert!(toml::from_str::<Config>("[transform]\nextrude = \"sometimes\"").is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<Config>("[transform]\ndelt = 3").is_err());
    }

    #[test]
    fn test_project_overrides_user_per_field() {
        let user: Config = toml::from_str(
            "[transform]\ndelta = 5.0\ncolor = \"#000000\"\n[output]\nforce = true",
        )
        .unwrap();
        let project: Config = toml::from_str("[transform]\ndelta = 7.0").unwrap();

        let merged = Config::merge(Some(user), Some(project));
        assert_eq!(merged.transform().delta, Some(7.0));
        assert_eq!(merged.transform().color.as_deref(), Some("#000000"));
        assert_eq!(merged.output().force, Some(true));
    }

    #[test]
    fn test_merge_of_nothing_is_default() {
        assert_eq!(Config::merge(None, None), Config::default());
    }

    #[test]
    fn test_load_from_file_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[transform\n").unwrap();
        let err = Config::load_from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains(CONFIG_FILE_NAME));
    }
}
