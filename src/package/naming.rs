pub const DEVELOPER_BUILD_NUMBER: &str = "do-not-use-me-developer-version";

/// Which optional components a package puts into its output base name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingOptions {
    pub use_vs_version: bool,
    pub use_distribution: bool,
}

impl Default for NamingOptions {
    fn default() -> Self {
        Self {
            use_vs_version: true,
            use_distribution: false,
        }
    }
}

/** Deterministic identifier for install directories and archives
 *
 * # Format
 * `<name>-<version>-<build number | placeholder>-<platform>[-vs<ver>]`
 *
 * The `-vs<ver>` suffix is added only when the package opts in and a VS version is set.
 */
pub fn output_base_name(
    name: &str,
    version: &str,
    build_number: Option<&str>,
    platform: &str,
    vs_version: Option<&str>,
    options: NamingOptions,
) -> String {
    let mut components = vec![
        name.to_string(),
        version.to_string(),
        build_number.unwrap_or(DEVELOPER_BUILD_NUMBER).to_string(),
        platform.to_string(),
    ];
    if options.use_vs_version {
        if let Some(vs) = vs_version {
            components.push(format!("vs{}", vs));
        }
    }
    components.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn developer_build_on_linux() {
        assert_eq!(
            output_base_name("qwt", "6.1.4", None, "linux", None, NamingOptions::default()),
            "qwt-6.1.4-do-not-use-me-developer-version-linux"
        );
    }

    #[test]
    fn ci_build_with_toolset() {
        assert_eq!(
            output_base_name(
                "qwt",
                "6.1.4",
                Some("20200311.2"),
                "win32",
                Some("2017"),
                NamingOptions::default()
            ),
            "qwt-6.1.4-20200311.2-win32-vs2017"
        );
    }

    #[test]
    fn toolset_suffix_can_be_disabled() {
        let options = NamingOptions {
            use_vs_version: false,
            ..NamingOptions::default()
        };
        assert_eq!(
            output_base_name("zlib", "1.2.11", Some("7"), "win32", Some("2019"), options),
            "zlib-1.2.11-7-win32"
        );
    }

    #[test]
    fn each_input_changes_the_name() {
        let base = output_base_name("a", "1", Some("1"), "linux", Some("2017"), NamingOptions::default());
        let variants = [
            output_base_name("a", "1", Some("2"), "linux", Some("2017"), NamingOptions::default()),
            output_base_name("a", "1", Some("1"), "darwin", Some("2017"), NamingOptions::default()),
            output_base_name("a", "1", Some("1"), "linux", Some("2019"), NamingOptions::default()),
        ];
        for variant in variants {
            assert_ne!(base, variant);
        }
    }
}
