use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default root folder for commands that are not given one explicitly.
    pub root_folder: Option<String>,
    /// Name of the folder created under the root for merge output.
    pub output_folder_name: String,
    /// Confirm overwrite prompts without asking.
    pub assume_yes: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            output_folder_name: "Output".to_string(),
            assume_yes: false,
        }
    }
}

impl AppConfig {
    /// Output folder for a given root.
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.output_folder_name)
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("SEBASTIAN"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.output_folder_name, "Output");
        assert!(config.root_folder.is_none());
        assert!(!config.assume_yes);
    }

    #[test]
    fn test_output_dir_under_root() {
        let config = AppConfig::default();
        let dir = config.output_dir(Path::new("/data/ly"));
        assert_eq!(dir, PathBuf::from("/data/ly/Output"));
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("assume_yes", true)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(config.assume_yes);
        assert_eq!(config.output_folder_name, "Output");
    }
}
