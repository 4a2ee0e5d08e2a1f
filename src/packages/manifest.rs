use crate::build::Platform;
use crate::config::{ManifestSpec, RecipeKind};
use crate::package::recipe::visual_studio_generator_for_build;
use crate::package::{NamingOptions, Package, PackageBuilder, Recipe, SourceArchive};
use crate::result::{BuildError, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use smol_str::SmolStr;
use std::path::PathBuf;

static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]*)\}").unwrap());

/// A package declared under `[packages.<name>]` in the configuration file.
#[derive(Debug, Clone)]
pub struct ManifestPackage {
    name: SmolStr,
    spec: ManifestSpec,
}

impl ManifestPackage {
    pub fn new(name: SmolStr, spec: ManifestSpec) -> Self {
        Self { name, spec }
    }

    pub fn spec(&self) -> &ManifestSpec {
        &self.spec
    }

    /** Substitutes `{placeholder}` tokens in a configure argument
     *
     * # Placeholders
     * - `{install_dir}`, `{source_dir}`, `{build_dir}`, `{toolbase}`
     * - `{vs_generator}`: generator for `BUILD_VS_VERSION`
     *
     * # Errors
     * - [`BuildError::Config`] for any other placeholder
     */
    pub fn expand(&self, arg: &str, builder: &PackageBuilder<'_>) -> Result<String> {
        let mut expanded = String::with_capacity(arg.len());
        let mut last = 0;

        for caps in PLACEHOLDER_REGEX.captures_iter(arg) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let value = match &caps[1] {
                "install_dir" => builder.install_directory().to_string_lossy().into_owned(),
                "source_dir" => builder
                    .main_source_directory_path()
                    .to_string_lossy()
                    .into_owned(),
                "build_dir" => builder.build_directory_path().to_string_lossy().into_owned(),
                "toolbase" => builder
                    .context()
                    .layout
                    .toolbase
                    .to_string_lossy()
                    .into_owned(),
                "vs_generator" => {
                    visual_studio_generator_for_build(builder.context().settings.vs_version())?
                        .to_string()
                }
                other => {
                    return Err(BuildError::config(format!(
                        "Package {} uses unknown placeholder {{{}}}",
                        self.name, other
                    )))
                }
            };

            expanded.push_str(&arg[last..whole.start()]);
            expanded.push_str(&value);
            last = whole.end();
        }

        expanded.push_str(&arg[last..]);
        Ok(expanded)
    }
}

#[async_trait]
impl Package for ManifestPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.spec.version
    }

    fn recipe(&self) -> Recipe {
        let recipe = match self.spec.recipe {
            RecipeKind::None => Recipe::new(),
            RecipeKind::GnuMake => Recipe::new().gnu_make(),
            RecipeKind::Make => Recipe::new().gnu_make().make_install(),
            RecipeKind::Autoconf => Recipe::autoconf(),
            RecipeKind::Cmake => Recipe::cmake(),
        };
        if self.spec.archive {
            recipe
        } else {
            recipe.no_archive()
        }
    }

    fn naming(&self) -> NamingOptions {
        NamingOptions {
            use_vs_version: self.spec.vs_version_in_name,
            use_distribution: self.spec.distribution_in_name,
        }
    }

    fn source_archives(&self) -> Vec<SourceArchive> {
        self.spec
            .sources
            .iter()
            .map(|source| SourceArchive {
                filename: source.filename.clone(),
                url: source.url.clone(),
                sha256: source.sha256.clone(),
            })
            .collect()
    }

    fn configuration_script(&self, builder: &PackageBuilder<'_>) -> Result<Option<PathBuf>> {
        match &self.spec.configure_script {
            Some(script) => Ok(Some(builder.main_source_directory_path().join(script))),
            None => self
                .recipe()
                .configure
                .script(&builder.main_source_directory_path()),
        }
    }

    fn configuration_arguments(&self, builder: &PackageBuilder<'_>) -> Result<Vec<String>> {
        match &self.spec.configure_args {
            Some(args) => args.iter().map(|arg| self.expand(arg, builder)).collect(),
            None => Ok(vec![format!(
                "--prefix={}",
                builder.install_directory().display()
            )]),
        }
    }

    fn extra_cflags(&self, _platform: &Platform) -> Vec<String> {
        self.spec.extra_cflags.clone()
    }

    fn extra_cxxflags(&self, _platform: &Platform) -> Vec<String> {
        self.spec.extra_cxxflags.clone()
    }

    fn extra_ldflags(&self, _platform: &Platform) -> Vec<String> {
        self.spec.extra_ldflags.clone()
    }
}
