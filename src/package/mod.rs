//! Package definitions and the pipeline that builds them.
//!
//! A [`Package`] describes what to build: identity, source archives and the
//! hooks it wants to customise. [`PackageBuilder`] owns everything derived
//! from the host (paths, flags, environment) and runs the fixed pipeline.

pub mod archive;
pub mod builder;
pub mod extract;
pub mod fetch;
pub mod naming;
pub mod recipe;

pub use builder::PackageBuilder;
pub use fetch::{FetchOutcome, SourceArchive, SourceFetcher};
pub use naming::NamingOptions;
pub use recipe::Recipe;

use crate::build::Platform;
use crate::result::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

/** A third-party library definition
 *
 * # Required
 * - `name` and `version`, which form the package identity
 *
 * # Hooks
 * Every other method has a default matching a plain source tarball with
 * no configure step. Hooks receive the [`PackageBuilder`] so they can use
 * the computed paths and run commands through the task logs.
 */
#[async_trait]
pub trait Package: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    fn recipe(&self) -> Recipe {
        Recipe::new()
    }

    fn naming(&self) -> NamingOptions {
        NamingOptions::default()
    }

    /// Archives fetched into the downloads directory before extraction.
    fn source_archives(&self) -> Vec<SourceArchive> {
        Vec::new()
    }

    async fn extract_source_archives(&self, builder: &PackageBuilder<'_>) -> Result<()> {
        builder.extract_declared_archives().await
    }

    async fn patch_sources(&self, _builder: &PackageBuilder<'_>) -> Result<()> {
        Ok(())
    }

    /// Script run in the build directory, `None` to skip configuration.
    fn configuration_script(&self, builder: &PackageBuilder<'_>) -> Result<Option<PathBuf>> {
        self.recipe()
            .configure
            .script(&builder.main_source_directory_path())
    }

    fn configuration_arguments(&self, builder: &PackageBuilder<'_>) -> Result<Vec<String>> {
        Ok(vec![format!(
            "--prefix={}",
            builder.install_directory().display()
        )])
    }

    fn extra_cflags(&self, _platform: &Platform) -> Vec<String> {
        Vec::new()
    }

    fn extra_cxxflags(&self, _platform: &Platform) -> Vec<String> {
        Vec::new()
    }

    fn extra_ldflags(&self, _platform: &Platform) -> Vec<String> {
        Vec::new()
    }

    /// Applied on top of the configuration environment for build and install.
    fn adjust_build_environment(&self, _env: &mut BTreeMap<String, String>) {}

    /// Checks the install produced something usable.
    async fn verify(&self, _builder: &PackageBuilder<'_>) -> Result<()> {
        Ok(())
    }

    /// Directories removed by `clean` besides the install, source and build directories.
    fn extra_clean_paths(&self, _builder: &PackageBuilder<'_>) -> Vec<PathBuf> {
        Vec::new()
    }
}
