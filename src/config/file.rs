use crate::result::{BuildError, Result};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub directories: DirectoryOverrides,
    pub packages: BTreeMap<SmolStr, ManifestSpec>,
}

/// Replacements for the platform default directory layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryOverrides {
    pub toolbase: Option<PathBuf>,
    pub downloads: Option<PathBuf>,
    pub extracted: Option<PathBuf>,
    pub builds: Option<PathBuf>,
    pub logs: Option<PathBuf>,
}

/// A package declared in the configuration file instead of in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestSpec {
    pub version: SmolStr,
    #[serde(default)]
    pub recipe: RecipeKind,
    #[serde(default = "default_true")]
    pub archive: bool,
    #[serde(default)]
    pub distribution_in_name: bool,
    #[serde(default = "default_true")]
    pub vs_version_in_name: bool,
    #[serde(default)]
    pub configure_script: Option<String>,
    #[serde(default)]
    pub configure_args: Option<Vec<String>>,
    #[serde(default)]
    pub extra_cflags: Vec<String>,
    #[serde(default)]
    pub extra_cxxflags: Vec<String>,
    #[serde(default)]
    pub extra_ldflags: Vec<String>,
    #[serde(default)]
    pub sources: Vec<ManifestSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestSource {
    pub filename: String,
    pub url: String,
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecipeKind {
    #[default]
    None,
    GnuMake,
    Make,
    Autoconf,
    Cmake,
}

fn default_true() -> bool {
    true
}

impl ConfigFile {
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: ConfigFile = toml::from_str(&content).map_err(|e| {
            BuildError::config(format!(
                "Invalid configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tpbuild").join("tpbuild.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, spec) in &self.packages {
            if name.is_empty() {
                return Err(BuildError::config("Package name cannot be empty"));
            }

            if spec.version.is_empty() {
                return Err(BuildError::config(format!(
                    "Package {} has an empty version",
                    name
                )));
            }

            for source in &spec.sources {
                if source.filename.is_empty() || source.filename.contains(['/', '\\']) {
                    return Err(BuildError::config(format!(
                        "Package {} declares an invalid source filename '{}'",
                        name, source.filename
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[directories]
toolbase = "/srv/tools"
logs = "/srv/logs"

[packages.zlib]
version = "1.2.11"
recipe = "autoconf"

[[packages.zlib.sources]]
filename = "zlib-1.2.11.tar.gz"
url = "https://zlib.net/zlib-1.2.11.tar.gz"

[packages.fmt]
version = "7.1.3"
recipe = "cmake"
archive = false
configure_args = ["-G", "{vs_generator}", "{source_dir}"]
"#;

    #[test]
    fn parses_directories_and_manifests() {
        let config: ConfigFile = toml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(
            config.directories.toolbase,
            Some(PathBuf::from("/srv/tools"))
        );
        assert!(config.directories.downloads.is_none());

        let zlib = &config.packages["zlib"];
        assert_eq!(zlib.recipe, RecipeKind::Autoconf);
        assert!(zlib.archive);
        assert!(zlib.vs_version_in_name);
        assert!(!zlib.distribution_in_name);
        assert_eq!(zlib.sources.len(), 1);
        assert!(zlib.sources[0].sha256.is_none());

        let fmt = &config.packages["fmt"];
        assert_eq!(fmt.recipe, RecipeKind::Cmake);
        assert!(!fmt.archive);
        assert_eq!(fmt.configure_args.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn rejects_unknown_keys() {
        let result: std::result::Result<ConfigFile, _> =
            toml::from_str("[directories]\ntoolbas = \"/x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_source_filename_with_separator() {
        let config: ConfigFile = toml::from_str(
            r#"
[packages.bad]
version = "1"
[[packages.bad.sources]]
filename = "../escape.tar.gz"
url = "https://example.invalid/escape.tar.gz"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tpbuild.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = ConfigFile::from_file(&path).await.unwrap();
        assert_eq!(config.packages.len(), 2);
    }
}
