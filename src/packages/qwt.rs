use crate::build::{Os, Platform};
use crate::config::Settings;
use crate::package::{Package, PackageBuilder, Recipe};
use crate::result::Result;
use crate::utils::text;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const QWT_VERSION_VAR: &str = "QWT_VERSION";
pub const QT_BUILD_VAR: &str = "QT_BUILD";
pub const QT_ARCHIVE_SUFFIX_VAR: &str = "QT_ARCHIVE_SUFFIX";

const QWT_PREFIX_PLACEHOLDER: &str = "/usr/local/qwt-$$QWT_VERSION";
const QMAKE_FLAG_FORWARDING: &str = "
QMAKE_CXXFLAGS += $$(CXXFLAGS)
QMAKE_CFLAGS += $$(CFLAGS)
QMAKE_LFLAGS += $$(LDFLAGS)
";

/** Qwt, built with qmake against a prebuilt Qt SDK
 *
 * # Environment
 * - `QWT_VERSION`: Qwt release, expects `qwt-<version>.zip` in the downloads directory
 * - `QT_BUILD`: Qt build identifier such as `5.12.3-1`
 * - `QT_ARCHIVE_SUFFIX`: rest of the Qt archive name after `qt-<QT_BUILD>-`
 *
 * Both archives are staged in the downloads directory ahead of time.
 */
#[derive(Debug, Clone)]
pub struct QwtPackage {
    version: String,
    qt_build: String,
    qt_archive_suffix: String,
}

impl QwtPackage {
    pub const NAME: &'static str = "qwt";

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            version: settings.require(QWT_VERSION_VAR)?.to_string(),
            qt_build: settings.require(QT_BUILD_VAR)?.to_string(),
            qt_archive_suffix: settings.require(QT_ARCHIVE_SUFFIX_VAR)?.to_string(),
        })
    }

    /// `QT_BUILD` up to the first `-`.
    pub fn qt_version(&self) -> &str {
        self.qt_build
            .split('-')
            .next()
            .unwrap_or(self.qt_build.as_str())
    }

    pub fn qt_buildtype(os: Os) -> &'static str {
        match os {
            Os::Windows => "msvc2017_64",
            Os::Linux => "gcc_64",
            Os::Macos => "clang_64",
        }
    }

    pub fn qt_root(builder: &PackageBuilder<'_>) -> PathBuf {
        builder.context().layout.toolbase.join("qt")
    }

    /// `<toolbase>/qt/qt-<QT_BUILD>/<qt_version>/<buildtype>`
    pub fn qt_install_dir(&self, builder: &PackageBuilder<'_>) -> PathBuf {
        Self::qt_root(builder)
            .join(format!("qt-{}", self.qt_build))
            .join(self.qt_version())
            .join(Self::qt_buildtype(builder.platform().os()))
    }

    pub fn qwt_archive_filename(&self) -> String {
        format!("qwt-{}.zip", self.version)
    }

    pub fn qt_archive_filename(&self) -> String {
        format!("qt-{}-{}", self.qt_build, self.qt_archive_suffix)
    }
}

#[async_trait]
impl Package for QwtPackage {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn recipe(&self) -> Recipe {
        Recipe::new().gnu_make().make_install()
    }

    async fn extract_source_archives(&self, builder: &PackageBuilder<'_>) -> Result<()> {
        let downloads = &builder.context().layout.downloads;
        builder
            .extract_archive(
                &downloads.join(self.qwt_archive_filename()),
                &builder.source_extracted(),
            )
            .await?;

        tokio::fs::create_dir_all(self.qt_install_dir(builder)).await?;
        builder
            .extract_archive(
                &downloads.join(self.qt_archive_filename()),
                &Self::qt_root(builder),
            )
            .await
    }

    /// Points `qwtconfig.pri` at the install directory and forwards the compiler flags to qmake.
    async fn patch_sources(&self, builder: &PackageBuilder<'_>) -> Result<()> {
        let config = builder.main_source_directory_path().join("qwtconfig.pri");
        let install_dir = builder.install_directory();
        let install_dir = install_dir.to_string_lossy();
        text::patch(&config, &[(QWT_PREFIX_PLACEHOLDER, &*install_dir)]).await?;
        text::append(&config, QMAKE_FLAG_FORWARDING).await
    }

    fn configuration_script(&self, builder: &PackageBuilder<'_>) -> Result<Option<PathBuf>> {
        let qmake = if builder.platform().windows() {
            "qmake.exe"
        } else {
            "qmake"
        };
        Ok(Some(self.qt_install_dir(builder).join("bin").join(qmake)))
    }

    fn configuration_arguments(&self, builder: &PackageBuilder<'_>) -> Result<Vec<String>> {
        Ok(vec![
            "-makefile".to_string(),
            builder
                .main_source_directory_path()
                .join("qwt.pro")
                .to_string_lossy()
                .into_owned(),
        ])
    }

    fn extra_cxxflags(&self, platform: &Platform) -> Vec<String> {
        if platform.linux() {
            vec!["-Wno-deprecated-copy".to_string()]
        } else {
            Vec::new()
        }
    }

    fn adjust_build_environment(&self, env: &mut BTreeMap<String, String>) {
        env.insert("VERBOSE".to_string(), "1".to_string());
    }

    fn extra_clean_paths(&self, builder: &PackageBuilder<'_>) -> Vec<PathBuf> {
        vec![
            Self::qt_root(builder),
            builder.context().layout.extracted.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BuildContext, Layout};
    use crate::config::ConfigFile;
    use crate::result::BuildError;
    use std::path::Path;

    const VARS: [(&str, &str); 3] = [
        (QWT_VERSION_VAR, "6.1.4"),
        (QT_BUILD_VAR, "5.12.3-2"),
        (QT_ARCHIVE_SUFFIX_VAR, "linux.tar.gz"),
    ];

    fn context(root: &Path, os: Os) -> BuildContext {
        let settings = Settings::from_vars(VARS, ConfigFile::default());
        let layout = Layout {
            toolbase: root.join("tools"),
            downloads: root.join("downloads"),
            extracted: root.join("extracted"),
            builds: root.join("builds"),
            logs: root.join("logs"),
        };
        BuildContext::new(settings, Platform::new(os, None), layout)
    }

    #[test]
    fn each_variable_is_required() {
        for missing in [QWT_VERSION_VAR, QT_BUILD_VAR, QT_ARCHIVE_SUFFIX_VAR] {
            let vars = VARS.iter().filter(|(k, _)| *k != missing).copied();
            let settings = Settings::from_vars(vars, ConfigFile::default());
            match QwtPackage::from_settings(&settings) {
                Err(BuildError::Config(msg)) => assert!(msg.contains(missing)),
                other => panic!("expected config error for {}, got {:?}", missing, other),
            }
        }
    }

    #[test]
    fn qt_paths_follow_build_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Os::Linux);
        let qwt = QwtPackage::from_settings(&ctx.settings).unwrap();
        let builder = PackageBuilder::with_platform_name(&qwt, &ctx, "linux");

        assert_eq!(qwt.qt_version(), "5.12.3");
        assert_eq!(
            qwt.qt_install_dir(&builder),
            dir.path().join("tools/qt/qt-5.12.3-2/5.12.3/gcc_64")
        );
        assert_eq!(qwt.qt_archive_filename(), "qt-5.12.3-2-linux.tar.gz");
        assert_eq!(qwt.qwt_archive_filename(), "qwt-6.1.4.zip");
        assert_eq!(
            builder.output_base_name(),
            "qwt-6.1.4-do-not-use-me-developer-version-linux"
        );
    }

    #[test]
    fn qt_version_without_dash_is_whole_build() {
        let settings = Settings::from_vars(
            [
                (QWT_VERSION_VAR, "6.1.4"),
                (QT_BUILD_VAR, "5.15.2"),
                (QT_ARCHIVE_SUFFIX_VAR, "x.7z"),
            ],
            ConfigFile::default(),
        );
        let qwt = QwtPackage::from_settings(&settings).unwrap();
        assert_eq!(qwt.qt_version(), "5.15.2");
    }

    #[test]
    fn build_types_per_platform() {
        assert_eq!(QwtPackage::qt_buildtype(Os::Windows), "msvc2017_64");
        assert_eq!(QwtPackage::qt_buildtype(Os::Linux), "gcc_64");
        assert_eq!(QwtPackage::qt_buildtype(Os::Macos), "clang_64");
    }

    #[test]
    fn qmake_configures_qwt_project() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Os::Windows);
        let qwt = QwtPackage::from_settings(&ctx.settings).unwrap();
        let builder = PackageBuilder::with_platform_name(&qwt, &ctx, "win32");

        let script = qwt.configuration_script(&builder).unwrap().unwrap();
        assert!(script.ends_with("msvc2017_64/bin/qmake.exe"));
        assert_eq!(
            qwt.configuration_arguments(&builder).unwrap(),
            vec![
                "-makefile".to_string(),
                builder
                    .main_source_directory_path()
                    .join("qwt.pro")
                    .to_string_lossy()
                    .into_owned()
            ]
        );
    }

    #[test]
    fn linux_flags_and_verbose_build() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Os::Linux);
        let qwt = QwtPackage::from_settings(&ctx.settings).unwrap();
        let builder = PackageBuilder::with_platform_name(&qwt, &ctx, "linux");

        assert_eq!(builder.cxxflags(), vec!["-O2", "-Wno-deprecated-copy"]);
        assert_eq!(builder.cflags(), vec!["-O2"]);
        let env = builder.environment_for_build_command();
        assert_eq!(env.get("VERBOSE").map(String::as_str), Some("1"));
        assert!(!builder
            .environment_for_configuration_script()
            .contains_key("VERBOSE"));

        let macos = Platform::new(Os::Macos, None);
        assert!(qwt.extra_cxxflags(&macos).is_empty());
    }

    #[tokio::test]
    async fn qwtconfig_points_at_install_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Os::Linux);
        let qwt = QwtPackage::from_settings(&ctx.settings).unwrap();
        let builder = PackageBuilder::with_platform_name(&qwt, &ctx, "linux");

        let source = builder.main_source_directory_path();
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(
            source.join("qwtconfig.pri"),
            "unix {\n    QWT_INSTALL_PREFIX    = /usr/local/qwt-$$QWT_VERSION\n}\n",
        )
        .unwrap();

        qwt.patch_sources(&builder).await.unwrap();

        let patched = std::fs::read_to_string(source.join("qwtconfig.pri")).unwrap();
        let install = builder.install_directory();
        assert!(patched.contains(&format!(
            "QWT_INSTALL_PREFIX    = {}\n",
            install.display()
        )));
        assert!(!patched.contains("/usr/local/qwt-"));
        assert!(patched.ends_with(
            "QMAKE_CXXFLAGS += $$(CXXFLAGS)\nQMAKE_CFLAGS += $$(CFLAGS)\nQMAKE_LFLAGS += $$(LDFLAGS)\n"
        ));
    }

    #[test]
    fn clean_also_removes_qt_sdk_and_extracted_sources() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), Os::Linux);
        let qwt = QwtPackage::from_settings(&ctx.settings).unwrap();
        let builder = PackageBuilder::with_platform_name(&qwt, &ctx, "linux");

        assert_eq!(
            qwt.extra_clean_paths(&builder),
            vec![dir.path().join("tools/qt"), dir.path().join("extracted")]
        );
    }
}
