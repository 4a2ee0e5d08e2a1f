use crate::build::{BuildContext, Platform};
use crate::package::archive::verify_tarball_layout;
use crate::package::extract::extraction_plan;
use crate::package::fetch::{FetchOutcome, SourceFetcher};
use crate::package::naming::{output_base_name, NamingOptions};
use crate::package::recipe::{ArchiveStrategy, Recipe};
use crate::package::Package;
use crate::result::{BuildError, Result};
use crate::utils::process::{CommandRunner, CommandSpec, Task};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/** Drives one package through the build pipeline
 *
 * # Pipeline
 * 1. `cleanup` - remove previous extracted sources and build directory
 * 2. `fetch_source_archives` - download anything not already cached
 * 3. `extract_source_archives` - package hook, unpacks declared archives by default
 * 4. `patch_sources` - package hook
 * 5. `run_configuration_script`
 * 6. `run_build_command` / `run_install_command` - recipe strategies
 * 7. `verify` - package hook
 * 8. `create_archive` - tarball of the install directory
 *
 * The first failing stage aborts the build.
 */
pub struct PackageBuilder<'a> {
    package: &'a dyn Package,
    ctx: &'a BuildContext,
    recipe: Recipe,
    base_name: String,
    runner: CommandRunner,
    fetcher: SourceFetcher,
}

impl<'a> PackageBuilder<'a> {
    /// Resolves the platform naming component, probing the distribution if the package asks for it.
    pub async fn new(package: &'a dyn Package, ctx: &'a BuildContext) -> Result<Self> {
        let naming = package.naming();
        let platform_name = ctx
            .platform
            .naming_component(naming.use_distribution)
            .await?;
        Ok(Self::with_platform_name(package, ctx, &platform_name))
    }

    pub fn with_platform_name(
        package: &'a dyn Package,
        ctx: &'a BuildContext,
        platform_name: &str,
    ) -> Self {
        let naming: NamingOptions = package.naming();
        let base_name = output_base_name(
            package.name(),
            package.version(),
            ctx.settings.build_number(),
            platform_name,
            ctx.settings.vs_version(),
            naming,
        );

        Self {
            package,
            ctx,
            recipe: package.recipe(),
            base_name,
            runner: CommandRunner::new(&ctx.layout.logs, package.name(), package.version()),
            fetcher: SourceFetcher::new(),
        }
    }

    pub fn package(&self) -> &dyn Package {
        self.package
    }

    pub fn context(&self) -> &BuildContext {
        self.ctx
    }

    pub fn platform(&self) -> &Platform {
        &self.ctx.platform
    }

    pub fn output_base_name(&self) -> &str {
        &self.base_name
    }

    /// `<toolbase>/<name>`, the directory archives are created from.
    pub fn package_root(&self) -> PathBuf {
        self.ctx.layout.toolbase.join(self.package.name())
    }

    pub fn install_directory(&self) -> PathBuf {
        self.package_root().join(&self.base_name)
    }

    pub fn output_archive_filename(&self) -> String {
        format!("{}.tar.gz", self.base_name)
    }

    pub fn archive_output_directory(&self) -> PathBuf {
        self.ctx
            .settings
            .artifact_staging_directory()
            .unwrap_or_else(|| self.ctx.layout.builds.clone())
    }

    pub fn include_directories(&self) -> Vec<PathBuf> {
        vec![self.install_directory().join("include")]
    }

    pub fn library_link_directories(&self) -> Vec<PathBuf> {
        vec![self.install_directory().join("lib")]
    }

    pub fn source_downloads(&self) -> PathBuf {
        self.ctx.layout.downloads.join(self.package.name())
    }

    pub fn source_extracted(&self) -> PathBuf {
        self.ctx.layout.extracted.join(self.package.name())
    }

    pub fn main_source_directory_path(&self) -> PathBuf {
        self.source_extracted().join(format!(
            "{}-{}",
            self.package.name(),
            self.package.version()
        ))
    }

    pub fn build_directory_path(&self) -> PathBuf {
        self.ctx.layout.builds.join(self.package.name())
    }

    pub fn logfile_path(&self, task: Task) -> PathBuf {
        self.runner.logfile_path(task)
    }

    pub fn cflags(&self) -> Vec<String> {
        let platform = &self.ctx.platform;
        let mut flags = vec!["-O2".to_string()];
        flags.extend(platform.macos_flags());
        flags.extend(self.package.extra_cflags(platform));
        flags.extend(self.ctx.settings.external_flags("CFLAGS"));
        flags
    }

    pub fn cxxflags(&self) -> Vec<String> {
        let platform = &self.ctx.platform;
        let mut flags = vec!["-O2".to_string()];
        flags.extend(platform.macos_flags());
        flags.extend(self.package.extra_cxxflags(platform));
        flags.extend(self.ctx.settings.external_flags("CXXFLAGS"));
        flags
    }

    pub fn ldflags(&self) -> Vec<String> {
        let platform = &self.ctx.platform;
        let mut flags = platform.macos_flags();
        flags.extend(self.package.extra_ldflags(platform));
        flags.extend(self.ctx.settings.external_flags("LDFLAGS"));
        flags
    }

    /// Process environment snapshot with the computed compiler and linker flags.
    pub fn environment_for_configuration_script(&self) -> BTreeMap<String, String> {
        let mut env = self.ctx.settings.vars().clone();
        for (key, flags) in [
            ("CFLAGS", self.cflags()),
            ("CXXFLAGS", self.cxxflags()),
            ("LDFLAGS", self.ldflags()),
        ] {
            if !flags.is_empty() {
                env.insert(key.to_string(), flags.join(" "));
            }
        }
        env
    }

    pub fn environment_for_build_command(&self) -> BTreeMap<String, String> {
        let mut env = self.environment_for_configuration_script();
        self.package.adjust_build_environment(&mut env);
        env
    }

    /// Runs every stage in order; see the type documentation.
    pub async fn build(&self) -> Result<()> {
        log::info!(
            "Building {} {} as {}",
            self.package.name(),
            self.package.version(),
            self.base_name
        );

        self.cleanup().await;
        self.fetch_source_archives().await?;
        self.package.extract_source_archives(self).await?;
        self.package.patch_sources(self).await?;
        self.run_configuration_script().await?;
        self.run_build_command().await?;
        self.run_install_command().await?;
        self.package.verify(self).await?;
        self.create_archive().await?;

        log::info!("Finished building {}", self.base_name);
        Ok(())
    }

    pub async fn cleanup(&self) {
        for dir in [self.source_extracted(), self.build_directory_path()] {
            remove_tree(&dir).await;
        }
    }

    /// Best-effort removal of everything a build leaves behind, including the install directory.
    pub async fn clean_installation(&self) {
        let mut paths = vec![
            self.install_directory(),
            self.source_extracted(),
            self.build_directory_path(),
        ];
        paths.extend(self.package.extra_clean_paths(self));
        for path in paths {
            remove_tree(&path).await;
        }
    }

    pub async fn fetch_source_archives(&self) -> Result<()> {
        let downloads = &self.ctx.layout.downloads;
        for archive in self.package.source_archives() {
            let destination = downloads.join(&archive.filename);
            match self.fetcher.fetch(&archive, &destination).await? {
                FetchOutcome::Skipped => {
                    println!("Skipping download of existing {}", destination.display())
                }
                FetchOutcome::Downloaded => {
                    println!("Fetched {} to {}", archive.url, destination.display())
                }
            }
        }
        Ok(())
    }

    /// Extracts every declared source archive into [`Self::source_extracted`].
    pub async fn extract_declared_archives(&self) -> Result<()> {
        let destination = self.source_extracted();
        for archive in self.package.source_archives() {
            let path = self.ctx.layout.downloads.join(&archive.filename);
            self.extract_archive(&path, &destination).await?;
        }
        Ok(())
    }

    /** Unpacks `path` into `destination`, creating it first
     *
     * # Errors
     * - [`BuildError::UnsupportedArchive`] for unrecognized suffixes, and for a
     *   bare `.7z` once 7z has run
     * - [`BuildError::CommandFailed`] when the tool fails and no fallback applies
     */
    pub async fn extract_archive(&self, path: &Path, destination: &Path) -> Result<()> {
        println!("Extracting {} to {}", path.display(), destination.display());
        let plan = extraction_plan(path, destination, self.ctx.platform.os())?;
        fs::create_dir_all(destination).await?;

        for step in plan.steps {
            let result = self.runner.run(Task::ExtractArchive, &step.primary).await;
            match (result, &step.fallback) {
                (Err(BuildError::CommandFailed { .. }), Some(fallback)) => {
                    log::warn!("`{}` failed, retrying with `{}`", step.primary, fallback);
                    self.runner.run(Task::ExtractArchive, fallback).await?;
                }
                (result, _) => {
                    result?;
                }
            }
        }

        if plan.unsupported_after {
            return Err(BuildError::UnsupportedArchive(path.to_path_buf()));
        }
        Ok(())
    }

    pub async fn run_configuration_script(&self) -> Result<()> {
        let Some(script) = self.package.configuration_script(self)? else {
            println!("Skipping configuration script for {}", self.package.name());
            return Ok(());
        };
        if !script.exists() {
            return Err(BuildError::not_found(format!(
                "{}: {}",
                BuildError::MISSING_CONFIGURE_SCRIPT,
                script.display()
            )));
        }
        ensure_executable(&script).await?;

        let build_dir = self.build_directory_path();
        fs::create_dir_all(&build_dir).await?;

        let spec = CommandSpec::new(script.to_string_lossy())
            .args(self.package.configuration_arguments(self)?)
            .current_dir(build_dir)
            .envs(self.environment_for_configuration_script());
        self.runner.run(Task::RunConfigurationScript, &spec).await?;
        Ok(())
    }

    pub async fn run_build_command(&self) -> Result<()> {
        let jobs = self.ctx.platform.cpu_count();
        match self.recipe.build.command(jobs)? {
            Some(spec) => self.run_in_build_directory(Task::RunBuildCommand, spec).await,
            None => Ok(()),
        }
    }

    pub async fn run_install_command(&self) -> Result<()> {
        match self.recipe.install.command()? {
            Some(spec) => self.run_in_build_directory(Task::RunInstallCommand, spec).await,
            None => Ok(()),
        }
    }

    async fn run_in_build_directory(&self, task: Task, spec: CommandSpec) -> Result<()> {
        let build_dir = self.build_directory_path();
        fs::create_dir_all(&build_dir).await?;
        let spec = spec
            .current_dir(build_dir)
            .envs(self.environment_for_build_command());
        self.runner.run(task, &spec).await?;
        Ok(())
    }

    /** Packs the install directory into `<output_base_name>.tar.gz`
     *
     * # Notes
     * - The archive is created from `<toolbase>/<name>` so it holds only the
     *   output base name directory
     * - Written to `BUILD_ARTIFACTSTAGINGDIRECTORY` when set, else the builds directory
     * - The finished tarball is reopened and its layout checked
     */
    pub async fn create_archive(&self) -> Result<()> {
        if self.recipe.archive == ArchiveStrategy::NoArchive {
            log::info!("Archive step disabled for {}", self.package.name());
            return Ok(());
        }

        // tar runs from the package root; resolve relative output paths against ours first
        let out_dir = std::path::absolute(self.archive_output_directory())?;
        fs::create_dir_all(&out_dir).await?;
        let archive_path = out_dir.join(self.output_archive_filename());
        println!(
            "Creating {} in {}",
            self.output_archive_filename(),
            out_dir.display()
        );

        let spec = CommandSpec::new("tar")
            .arg("-zcf")
            .path_arg(&archive_path)
            .arg(self.base_name.as_str())
            .current_dir(self.package_root());

        let first = self.runner.run(Task::CreateArchive, &spec).await;
        match first {
            Err(BuildError::CommandFailed { .. }) if self.ctx.platform.windows() => {
                let retry = spec.insert_arg(0, "--force-local");
                self.runner.run(Task::CreateArchive, &retry).await?;
            }
            result => {
                result?;
            }
        }

        let entries = verify_tarball_layout(&archive_path, &self.base_name)?;
        log::info!("{} holds {} entries", archive_path.display(), entries);
        Ok(())
    }

    /// macOS: `install_name_tool -id <new_id> <library>`.
    pub async fn update_dylib_id(&self, library: &Path, new_id: &str) -> Result<()> {
        self.runner
            .run(Task::UpdateDylibId, &dylib_id_command(library, new_id))
            .await?;
        Ok(())
    }

    /// macOS: `install_name_tool -change <from> <to> <library>`.
    pub async fn change_dylib_lookup(&self, library: &Path, from: &str, to: &str) -> Result<()> {
        self.runner
            .run(Task::ChangeDylibLookup, &dylib_lookup_command(library, from, to))
            .await?;
        Ok(())
    }
}

fn dylib_id_command(library: &Path, new_id: &str) -> CommandSpec {
    CommandSpec::new("install_name_tool")
        .args(["-id", new_id])
        .path_arg(library)
}

fn dylib_lookup_command(library: &Path, from: &str, to: &str) -> CommandSpec {
    CommandSpec::new("install_name_tool")
        .args(["-change", from, to])
        .path_arg(library)
}

async fn remove_tree(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Could not remove {}: {}", path.display(), e);
        }
    }
    println!("Cleaned up {}", path.display());
}

#[cfg(unix)]
async fn ensure_executable(script: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(script).await?.permissions();
    let mode = permissions.mode();
    if mode & 0o111 != 0o111 {
        permissions.set_mode(mode | 0o111);
        fs::set_permissions(script, permissions).await?;
    }
    Ok(())
}

#[cfg(not(unix))]
async fn ensure_executable(_script: &Path) -> Result<()> {
    Ok(())
}
