//! Configuration (ambient stack §10.4): layered config via `figment`,
//! `hikolang.toml` overridden by CLI flags, with `HKC_*` environment
//! variables as the lowest-precedence layer.

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub build_type: Option<String>,
    #[serde(default)]
    pub optimize_level: Option<u8>,
    #[serde(default)]
    pub fetch: bool,
    #[serde(default)]
    pub test_recursive: bool,
    #[serde(default)]
    pub build_recursive: bool,
    #[serde(default)]
    pub local_repositories: Vec<String>,
    #[serde(default)]
    pub library_paths: Vec<String>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub max_workers: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            build_type: None,
            optimize_level: None,
            fetch: false,
            test_recursive: false,
            build_recursive: false,
            local_repositories: Vec::new(),
            library_paths: Vec::new(),
            defines: Vec::new(),
            max_workers: None,
        }
    }
}

/// Loads configuration from, in increasing precedence order: `HKC_*`
/// environment variables, `hikolang.toml` in `config_dir`, and finally
/// `overrides` (typically parsed CLI flags).
pub fn load(config_dir: &std::path::Path, overrides: Config) -> Result<Config, figment::Error> {
    let toml_path = config_dir.join("hikolang.toml");
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("HKC_").split("_"))
        .merge(Toml::file(toml_path))
        .merge(Serialized::defaults(overrides))
        .extract()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_forced_recursion() {
        let config = Config::default();
        assert!(!config.test_recursive);
        assert!(!config.build_recursive);
    }

    #[test]
    fn load_without_toml_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path(), Config::default()).unwrap();
        assert_eq!(config.build_type, None);
    }
}
