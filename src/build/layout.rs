use crate::build::platform::Platform;
use crate::config::Settings;
use crate::result::{BuildError, Result};
use crate::utils::process::{capture, CommandSpec};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Canonical directories shared by every package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub toolbase: PathBuf,
    pub downloads: PathBuf,
    pub extracted: PathBuf,
    pub builds: PathBuf,
    pub logs: PathBuf,
}

impl Layout {
    /** Resolves the layout for a platform
     *
     * # Defaults
     * - Unix: `/opt/ccdc/third-party` and `/opt/ccdc/third-party-sources/{downloads,extracted,builds,logs}`
     * - Windows: `D:\x_mirror\buildman\tools` and `D:\tp\{downloads,extracted,builds,logs}`, with downloads
     *   redirected to `SYSTEM_ARTIFACTSDIRECTORY` when set
     *
     * Each directory may be replaced by the `[directories]` table of the configuration file.
     */
    pub fn resolve(platform: &Platform, settings: &Settings) -> Self {
        let defaults = if platform.windows() {
            let sources = PathBuf::from(r"D:\tp");
            Layout {
                toolbase: PathBuf::from(r"D:\x_mirror\buildman\tools"),
                downloads: settings
                    .system_artifacts_directory()
                    .unwrap_or_else(|| sources.join("downloads")),
                extracted: sources.join("extracted"),
                builds: sources.join("builds"),
                logs: sources.join("logs"),
            }
        } else {
            let sources = PathBuf::from("/opt/ccdc/third-party-sources");
            Layout {
                toolbase: PathBuf::from("/opt/ccdc/third-party"),
                downloads: sources.join("downloads"),
                extracted: sources.join("extracted"),
                builds: sources.join("builds"),
                logs: sources.join("logs"),
            }
        };

        let overrides = &settings.config().directories;
        Layout {
            toolbase: overrides.toolbase.clone().unwrap_or(defaults.toolbase),
            downloads: overrides.downloads.clone().unwrap_or(defaults.downloads),
            extracted: overrides.extracted.clone().unwrap_or(defaults.extracted),
            builds: overrides.builds.clone().unwrap_or(defaults.builds),
            logs: overrides.logs.clone().unwrap_or(defaults.logs),
        }
    }

    /** Creates every base directory
     *
     * # Escalation
     * On non-Windows hosts a permission failure is retried after
     * `sudo mkdir -p <parent>` and `sudo chown <user> <parent>`.
     */
    pub async fn prepare(&self, platform: &Platform, settings: &Settings) -> Result<()> {
        for dir in [
            &self.toolbase,
            &self.downloads,
            &self.extracted,
            &self.builds,
            &self.logs,
        ] {
            ensure_directory(dir, platform, settings).await?;
        }
        Ok(())
    }
}

async fn ensure_directory(dir: &Path, platform: &Platform, settings: &Settings) -> Result<()> {
    match fs::create_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied && !platform.windows() => {
            let root = dir.parent().unwrap_or(dir);
            escalate(root, settings).await?;
            fs::create_dir_all(dir).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn escalate(root: &Path, settings: &Settings) -> Result<()> {
    let user = settings.user().ok_or_else(|| {
        BuildError::Permission(
            format!(
                "Cannot create {} and the current user is unknown",
                root.display()
            )
            .into(),
        )
    })?;

    println!("Creating {} with elevated privileges", root.display());
    log::warn!("Escalating to create {} for {}", root.display(), user);

    capture(&CommandSpec::new("sudo").args(["mkdir", "-p"]).path_arg(root))
        .await
        .map_err(|e| BuildError::Permission(format!("sudo mkdir failed: {}", e).into()))?;
    capture(&CommandSpec::new("sudo").arg("chown").arg(user).path_arg(root))
        .await
        .map_err(|e| BuildError::Permission(format!("sudo chown failed: {}", e).into()))?;
    Ok(())
}
