use crate::result::{BuildError, Result};
use std::path::PathBuf;

pub struct CliParser;

impl CliParser {
    pub fn validate_config_path(path: &str) -> Result<PathBuf> {
        let config_path = PathBuf::from(path);

        if !config_path.exists() {
            return Err(BuildError::not_found(format!(
                "Config file not found: {}",
                path
            )));
        }

        if !config_path.is_file() {
            return Err(BuildError::config("Config path is not a file"));
        }

        Ok(config_path)
    }

    /// Package names become directory and file name components.
    pub fn validate_package_name(name: &str) -> Result<&str> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'));

        if valid {
            Ok(name)
        } else {
            Err(BuildError::config(format!("Invalid package name: '{}'", name)))
        }
    }
}
