pub mod file;

pub use file::{ConfigFile, DirectoryOverrides, ManifestSource, ManifestSpec, RecipeKind};

use crate::result::{BuildError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const BUILD_NUMBER_VAR: &str = "BUILD_BUILDNUMBER";
pub const ARTIFACT_STAGING_VAR: &str = "BUILD_ARTIFACTSTAGINGDIRECTORY";
pub const VS_VERSION_VAR: &str = "BUILD_VS_VERSION";
pub const SYSTEM_ARTIFACTS_VAR: &str = "SYSTEM_ARTIFACTSDIRECTORY";
pub const CONFIG_PATH_VAR: &str = "TPBUILD_CONFIG";

/** Immutable snapshot of everything the build reads from its surroundings
 *
 * # Contents
 * - Every process environment variable at startup (forwarded to children)
 * - The parsed configuration file (directory overrides, manifest packages)
 *
 * # Notes
 * - Built once in `main` and passed down by reference
 * - Tests build it from explicit maps with [`Settings::from_vars`]
 */
#[derive(Debug, Clone, Default)]
pub struct Settings {
    vars: BTreeMap<String, String>,
    config: ConfigFile,
}

impl Settings {
    /** Snapshots the process environment and loads the configuration file
     *
     * # Resolution Order
     * 1. `explicit` path (from `--config`), which must exist
     * 2. `TPBUILD_CONFIG` environment variable, which must exist
     * 3. `<config dir>/tpbuild/tpbuild.toml` when present
     * 4. Built-in defaults
     */
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let vars: BTreeMap<String, String> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();

        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => vars.get(CONFIG_PATH_VAR).map(PathBuf::from),
        };

        let config = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(BuildError::not_found(format!(
                        "Configuration file not found: {}",
                        path.display()
                    )));
                }
                ConfigFile::from_file(&path).await?
            }
            None => match ConfigFile::default_path() {
                Some(path) if path.exists() => ConfigFile::from_file(&path).await?,
                _ => ConfigFile::default(),
            },
        };

        log::info!("Loaded settings with {} environment variables", vars.len());
        Ok(Self { vars, config })
    }

    pub fn from_vars<I, K, V>(vars: I, config: ConfigFile) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            config,
        }
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Variable a package cannot be built without.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.var(key)
            .ok_or_else(|| BuildError::config(format!("Environment variable {} is not set", key)))
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn build_number(&self) -> Option<&str> {
        self.var(BUILD_NUMBER_VAR)
    }

    pub fn vs_version(&self) -> Option<&str> {
        self.var(VS_VERSION_VAR)
    }

    pub fn artifact_staging_directory(&self) -> Option<PathBuf> {
        self.var(ARTIFACT_STAGING_VAR).map(PathBuf::from)
    }

    pub fn system_artifacts_directory(&self) -> Option<PathBuf> {
        self.var(SYSTEM_ARTIFACTS_VAR).map(PathBuf::from)
    }

    /// Externally supplied compiler or linker flags (`CFLAGS`, `CXXFLAGS`, `LDFLAGS`).
    pub fn external_flags(&self, key: &str) -> Vec<String> {
        self.var(key)
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Login name of the invoking user, looked up the way `getpass` does.
    pub fn user(&self) -> Option<&str> {
        ["LOGNAME", "USER", "LNAME", "USERNAME"]
            .iter()
            .find_map(|key| self.var(key).filter(|v| !v.is_empty()))
    }
}
