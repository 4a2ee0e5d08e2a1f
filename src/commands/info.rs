use crate::build::{BuildContext, Layout, Os};
use crate::package::PackageBuilder;
use crate::packages;
use crate::result::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub os: Os,
    pub output_base_name: String,
    pub install_directory: PathBuf,
    pub output_archive: PathBuf,
    pub source_directory: PathBuf,
    pub build_directory: PathBuf,
    pub include_directories: Vec<PathBuf>,
    pub library_link_directories: Vec<PathBuf>,
    pub layout: Layout,
}

impl PackageInfo {
    pub fn describe(builder: &PackageBuilder<'_>) -> Self {
        let package = builder.package();
        Self {
            name: package.name().to_string(),
            version: package.version().to_string(),
            os: builder.platform().os(),
            output_base_name: builder.output_base_name().to_string(),
            install_directory: builder.install_directory(),
            output_archive: builder
                .archive_output_directory()
                .join(builder.output_archive_filename()),
            source_directory: builder.main_source_directory_path(),
            build_directory: builder.build_directory_path(),
            include_directories: builder.include_directories(),
            library_link_directories: builder.library_link_directories(),
            layout: builder.context().layout.clone(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}", self.name, self.version);
        let _ = writeln!(out, "  Platform: {}", self.os.platform_id());
        let _ = writeln!(out, "  Output base name: {}", self.output_base_name);
        let _ = writeln!(out, "  Install directory: {}", self.install_directory.display());
        let _ = writeln!(out, "  Archive: {}", self.output_archive.display());
        let _ = writeln!(out, "  Sources: {}", self.source_directory.display());
        let _ = writeln!(out, "  Build directory: {}", self.build_directory.display());
        for dir in &self.include_directories {
            let _ = writeln!(out, "  Include: {}", dir.display());
        }
        for dir in &self.library_link_directories {
            let _ = writeln!(out, "  Library: {}", dir.display());
        }
        out
    }
}

pub async fn execute(config_path: Option<&Path>, package: &str, json: bool) -> Result<()> {
    let ctx = BuildContext::load(config_path).await?;
    let package = packages::resolve(package, &ctx.settings)?;
    let builder = PackageBuilder::new(package.as_ref(), &ctx).await?;

    let info = PackageInfo::describe(&builder);
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", info.render_text());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Platform;
    use crate::config::{ConfigFile, Settings};
    use crate::packages::ManifestPackage;

    fn context() -> BuildContext {
        let settings = Settings::from_vars([("BUILD_BUILDNUMBER", "77")], ConfigFile::default());
        let layout = Layout {
            toolbase: PathBuf::from("/tools"),
            downloads: PathBuf::from("/src/downloads"),
            extracted: PathBuf::from("/src/extracted"),
            builds: PathBuf::from("/src/builds"),
            logs: PathBuf::from("/src/logs"),
        };
        BuildContext::new(settings, Platform::new(Os::Linux, None), layout)
    }

    #[test]
    fn describes_computed_paths() {
        let ctx = context();
        let spec = toml::from_str("version = \"1.2.11\"").unwrap();
        let package = ManifestPackage::new("zlib".into(), spec);
        let builder = PackageBuilder::with_platform_name(&package, &ctx, "linux");

        let info = PackageInfo::describe(&builder);
        assert_eq!(info.output_base_name, "zlib-1.2.11-77-linux");
        assert_eq!(
            info.install_directory,
            PathBuf::from("/tools/zlib/zlib-1.2.11-77-linux")
        );
        assert_eq!(
            info.output_archive,
            PathBuf::from("/src/builds/zlib-1.2.11-77-linux.tar.gz")
        );
        assert_eq!(
            info.library_link_directories,
            vec![PathBuf::from("/tools/zlib/zlib-1.2.11-77-linux/lib")]
        );

        let text = info.render_text();
        assert!(text.starts_with("zlib 1.2.11\n"));
        assert!(text.contains("Include: /tools/zlib/zlib-1.2.11-77-linux/include"));

        let json: serde_json::Value = serde_json::to_value(&info).unwrap();
        assert_eq!(json["output_base_name"], "zlib-1.2.11-77-linux");
        assert_eq!(json["os"], "linux");
        assert_eq!(json["layout"]["toolbase"], "/tools");
    }
}
