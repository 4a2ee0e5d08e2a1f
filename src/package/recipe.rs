//! Configure/build/install/archive strategies.
//!
//! A package picks one strategy per step and returns them as a [`Recipe`].
//! The presets mirror the common build systems:
//!
//! - [`Recipe::gnu_make`] / [`Recipe::make_install`] - plain Makefiles
//! - [`Recipe::autoconf`] - `./configure && make -jN && make install`
//! - [`Recipe::cmake`] - `cmake`, `cmake --build`, `cmake --install`
//! - [`Recipe::no_archive`] - skip artifact staging

use crate::result::{BuildError, Result};
use crate::utils::process::CommandSpec;
use std::path::{Path, PathBuf};

pub const DEFAULT_VS_GENERATOR: &str = "Visual Studio 16 2019";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigureStrategy {
    #[default]
    None,
    Autoconf,
    CMake,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildStrategy {
    #[default]
    None,
    GnuMake,
    CMake,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstallStrategy {
    #[default]
    None,
    MakeInstall,
    CMake,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArchiveStrategy {
    #[default]
    Tarball,
    NoArchive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recipe {
    pub configure: ConfigureStrategy,
    pub build: BuildStrategy,
    pub install: InstallStrategy,
    pub archive: ArchiveStrategy,
}

impl Recipe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gnu_make(mut self) -> Self {
        self.build = BuildStrategy::GnuMake;
        self
    }

    pub fn make_install(mut self) -> Self {
        self.install = InstallStrategy::MakeInstall;
        self
    }

    pub fn autoconf() -> Self {
        Self {
            configure: ConfigureStrategy::Autoconf,
            ..Self::new().gnu_make().make_install()
        }
    }

    pub fn cmake() -> Self {
        Self {
            configure: ConfigureStrategy::CMake,
            build: BuildStrategy::CMake,
            install: InstallStrategy::CMake,
            archive: ArchiveStrategy::Tarball,
        }
    }

    pub fn no_archive(mut self) -> Self {
        self.archive = ArchiveStrategy::NoArchive;
        self
    }
}

impl ConfigureStrategy {
    /// Configuration script for this strategy, `None` when the stage is skipped.
    pub fn script(&self, main_source_directory: &Path) -> Result<Option<PathBuf>> {
        match self {
            ConfigureStrategy::None => Ok(None),
            ConfigureStrategy::Autoconf => Ok(Some(main_source_directory.join("configure"))),
            ConfigureStrategy::CMake => cmake_executable().map(Some),
        }
    }
}

impl BuildStrategy {
    /// Program and arguments, without working directory or environment.
    pub fn command(&self, jobs: usize) -> Result<Option<CommandSpec>> {
        match self {
            BuildStrategy::None => Ok(None),
            BuildStrategy::GnuMake => Ok(Some(CommandSpec::new("make").arg(format!("-j{}", jobs)))),
            BuildStrategy::CMake => Ok(Some(
                CommandSpec::new(cmake_executable()?.to_string_lossy())
                    .args(["--build", ".", "--config", "Release"]),
            )),
        }
    }
}

impl InstallStrategy {
    pub fn command(&self) -> Result<Option<CommandSpec>> {
        match self {
            InstallStrategy::None => Ok(None),
            InstallStrategy::MakeInstall => Ok(Some(CommandSpec::new("make").arg("install"))),
            InstallStrategy::CMake => Ok(Some(
                CommandSpec::new(cmake_executable()?.to_string_lossy()).args(["--install", "."]),
            )),
        }
    }
}

pub fn cmake_executable() -> Result<PathBuf> {
    which::which("cmake")
        .map_err(|_| BuildError::not_found("Executable not found: cmake"))
}

/** Visual Studio generator name for a `BUILD_VS_VERSION` value
 *
 * # Returns
 * - `2019` or unset: `Visual Studio 16 2019`
 * - `2017`: `Visual Studio 15 2017`
 *
 * # Errors
 * - [`BuildError::InvalidToolset`] for any other value
 */
pub fn visual_studio_generator_for_build(vs_version: Option<&str>) -> Result<&'static str> {
    match vs_version {
        None => {
            println!("BUILD_VS_VERSION not set, defaulting to VS 2019");
            Ok(DEFAULT_VS_GENERATOR)
        }
        Some("2019") => Ok(DEFAULT_VS_GENERATOR),
        Some("2017") => Ok("Visual Studio 15 2017"),
        Some(other) => Err(BuildError::InvalidToolset(other.to_string())),
    }
}
