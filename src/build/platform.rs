use crate::result::{BuildError, Result};
use crate::utils::process::{capture, CommandSpec};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const MACOS_DEPLOYMENT_TARGET: &str = "10.12";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Macos,
    Windows,
    Linux,
}

impl Os {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::Macos
        } else {
            Os::Linux
        }
    }

    /// Platform identifier used in artifact names (`darwin`, `win32`, `linux`).
    pub fn platform_id(&self) -> &'static str {
        match self {
            Os::Macos => "darwin",
            Os::Windows => "win32",
            Os::Linux => "linux",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Distribution {
    Centos { major: String },
    Ubuntu { version: String },
    Other,
}

impl Distribution {
    pub fn naming_component(&self) -> Option<String> {
        match self {
            Distribution::Centos { major } => Some(format!("centos{}", major)),
            Distribution::Ubuntu { version } => Some(format!("ubuntu{}", version)),
            Distribution::Other => None,
        }
    }
}

/** Host platform facts gathered once at startup
 *
 * # Notes
 * - On macOS the SDK root is queried with `xcrun --show-sdk-path` and must exist
 * - Linux distribution probing is deferred until a package asks for it
 */
#[derive(Debug, Clone)]
pub struct Platform {
    os: Os,
    macos_sdkroot: Option<PathBuf>,
}

impl Platform {
    pub async fn detect() -> Result<Self> {
        let os = Os::current();
        let macos_sdkroot = if os == Os::Macos {
            let sdk = capture(&CommandSpec::new("xcrun").arg("--show-sdk-path")).await?;
            let sdk = PathBuf::from(sdk);
            if !sdk.exists() {
                return Err(BuildError::not_found(format!(
                    "macOS SDK root does not exist: {}",
                    sdk.display()
                )));
            }
            Some(sdk)
        } else {
            None
        };

        log::info!("Detected platform {:?}", os);
        Ok(Self { os, macos_sdkroot })
    }

    pub fn new(os: Os, macos_sdkroot: Option<PathBuf>) -> Self {
        Self { os, macos_sdkroot }
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn macos(&self) -> bool {
        self.os == Os::Macos
    }

    pub fn windows(&self) -> bool {
        self.os == Os::Windows
    }

    pub fn linux(&self) -> bool {
        self.os == Os::Linux
    }

    pub fn macos_sdkroot(&self) -> Option<&Path> {
        self.macos_sdkroot.as_deref()
    }

    /// Flags shared by CFLAGS, CXXFLAGS and LDFLAGS on macOS.
    pub fn macos_flags(&self) -> Vec<String> {
        if !self.macos() {
            return Vec::new();
        }
        let mut flags = vec!["-arch".to_string(), "x86_64".to_string()];
        if let Some(sdk) = &self.macos_sdkroot {
            flags.push("-isysroot".to_string());
            flags.push(sdk.to_string_lossy().into_owned());
        }
        flags.push(format!("-mmacosx-version-min={}", MACOS_DEPLOYMENT_TARGET));
        flags
    }

    pub async fn distribution(&self) -> Result<Distribution> {
        if !self.linux() {
            return Ok(Distribution::Other);
        }
        detect_distribution(Path::new("/")).await
    }

    /** Platform component of an output base name
     *
     * # Returns
     * - The platform id unless `with_distribution` is set on Linux
     * - `centos<major>` / `ubuntu<version>` for recognized distributions
     * - The platform id for any other distribution
     */
    pub async fn naming_component(&self, with_distribution: bool) -> Result<String> {
        if !with_distribution || !self.linux() {
            return Ok(self.os.platform_id().to_string());
        }

        let distribution = self.distribution().await?;
        Ok(distribution
            .naming_component()
            .unwrap_or_else(|| self.os.platform_id().to_string()))
    }

    /// Parallel job count for `make -j`.
    pub fn cpu_count(&self) -> usize {
        match std::thread::available_parallelism() {
            Ok(n) => n.get(),
            Err(e) => {
                log::warn!("Could not detect CPU count ({}), using 4 jobs", e);
                4
            }
        }
    }
}

async fn detect_distribution(root: &Path) -> Result<Distribution> {
    if root.join("etc/centos-release").exists() {
        let major = capture(&CommandSpec::new("rpm").args(["-E", "%{rhel}"])).await?;
        return Ok(Distribution::Centos { major });
    }

    if root.join("etc/debian_version").exists() {
        let id = capture(&CommandSpec::new("lsb_release").args(["-i", "-s"])).await?;
        if id == "Ubuntu" {
            let version = capture(&CommandSpec::new("lsb_release").args(["-r", "-s"])).await?;
            return Ok(Distribution::Ubuntu { version });
        }
    }

    Ok(Distribution::Other)
}
