use crate::build::Os;
use crate::result::{BuildError, Result};
use crate::utils::process::CommandSpec;
use std::path::Path;

/// One extraction command, with the command to try instead if it fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractStep {
    pub primary: CommandSpec,
    pub fallback: Option<CommandSpec>,
}

/// Steps to run in order. `unsupported_after` marks an archive that is
/// still rejected once the steps have run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionPlan {
    pub steps: Vec<ExtractStep>,
    pub unsupported_after: bool,
}

impl ExtractStep {
    fn single(primary: CommandSpec) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }
}

/// Every `.xxx` component of the file name, in order (`foo.tar.gz` → `[".tar", ".gz"]`).
pub fn suffixes(path: &Path) -> Vec<String> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    if name.ends_with('.') {
        return Vec::new();
    }
    name.trim_start_matches('.')
        .split('.')
        .skip(1)
        .map(|s| format!(".{}", s))
        .collect()
}

/** Commands that unpack `archive` into `destination`
 *
 * # Dispatch
 * - `.zip`: `unzip -q -o` run in the destination
 * - `.7z`: `7z x -aoa -o<destination>`, followed by the tar step when a tar
 *   compression suffix is also present. Without one the 7z step still runs
 *   and the archive is then reported as unsupported. Whether a bare `.7z`
 *   should count as extracted is unresolved, so the rejection is kept.
 * - `.bz2` / `.gz` / `.tgz` / `.xz` / `.zst`: `tar` with the matching flags,
 *   run in the destination
 *
 * On Windows the tar step first tries `--force-local` and falls back to the
 * plain invocation.
 *
 * # Errors
 * - [`BuildError::UnsupportedArchive`] when no suffix is recognized
 */
pub fn extraction_plan(archive: &Path, destination: &Path, os: Os) -> Result<ExtractionPlan> {
    let suffixes = suffixes(archive);
    let has = |s: &str| suffixes.iter().any(|x| x == s);

    if has(".zip") {
        return Ok(ExtractionPlan {
            steps: vec![ExtractStep::single(
                CommandSpec::new("unzip")
                    .args(["-q", "-o"])
                    .path_arg(archive)
                    .current_dir(destination),
            )],
            unsupported_after: false,
        });
    }

    let mut steps = Vec::new();
    if has(".7z") {
        steps.push(ExtractStep::single(
            CommandSpec::new("7z")
                .args(["x", "-aoa"])
                .arg(format!("-o{}", destination.display()))
                .path_arg(archive),
        ));
    }

    let flags: Vec<&str> = if has(".bz2") {
        vec!["jxf"]
    } else if has(".gz") || has(".tgz") {
        vec!["zxf"]
    } else if has(".xz") {
        vec!["xf"]
    } else if has(".zst") {
        vec!["--use-compress-program=zstd", "-xf"]
    } else if !steps.is_empty() {
        return Ok(ExtractionPlan {
            steps,
            unsupported_after: true,
        });
    } else {
        return Err(BuildError::UnsupportedArchive(archive.to_path_buf()));
    };

    steps.push(tar_step(&flags, archive, destination, os));
    Ok(ExtractionPlan {
        steps,
        unsupported_after: false,
    })
}

fn tar_step(flags: &[&str], archive: &Path, destination: &Path, os: Os) -> ExtractStep {
    if os != Os::Windows {
        return ExtractStep::single(
            CommandSpec::new("tar")
                .args(flags.iter().copied())
                .path_arg(archive)
                .current_dir(destination),
        );
    }

    let flags: Vec<String> = flags
        .iter()
        .map(|f| {
            if f.starts_with('-') {
                f.to_string()
            } else {
                format!("-{}", f)
            }
        })
        .collect();
    let plain = CommandSpec::new("tar")
        .args(flags)
        .path_arg(archive)
        .current_dir(destination);

    ExtractStep {
        primary: plain.clone().insert_arg(0, "--force-local"),
        fallback: Some(plain),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn plan(name: &str) -> Result<ExtractionPlan> {
        extraction_plan(Path::new(name), Path::new("/work"), Os::Linux)
    }

    fn only_command(name: &str) -> CommandSpec {
        let plan = plan(name).unwrap();
        assert_eq!(plan.steps.len(), 1, "expected a single step for {}", name);
        assert!(plan.steps[0].fallback.is_none());
        assert!(!plan.unsupported_after);
        plan.steps[0].primary.clone()
    }

    #[test]
    fn suffixes_follow_pathlib() {
        assert_eq!(suffixes(Path::new("/d/foo.tar.gz")), vec![".tar", ".gz"]);
        assert_eq!(
            suffixes(Path::new("qwt-6.1.4.zip")),
            vec![".1", ".4", ".zip"]
        );
        assert!(suffixes(Path::new(".bashrc")).is_empty());
        assert!(suffixes(Path::new("trailing.")).is_empty());
        assert!(suffixes(Path::new("plain")).is_empty());
    }

    #[test]
    fn tar_gz_uses_zxf_in_destination() {
        let spec = only_command("foo.tar.gz");
        assert_eq!(spec.program(), "tar");
        assert_eq!(spec.arguments(), &["zxf", "foo.tar.gz"]);
        assert_eq!(spec.cwd(), Some(Path::new("/work")));
    }

    #[test]
    fn tar_flags_per_compression() {
        assert_eq!(only_command("a.tar.bz2").arguments(), &["jxf", "a.tar.bz2"]);
        assert_eq!(only_command("a.tgz").arguments(), &["zxf", "a.tgz"]);
        assert_eq!(only_command("a.tar.xz").arguments(), &["xf", "a.tar.xz"]);
        assert_eq!(
            only_command("a.tar.zst").arguments(),
            &["--use-compress-program=zstd", "-xf", "a.tar.zst"]
        );
    }

    #[test]
    fn zip_uses_unzip_quietly_overwriting() {
        let spec = only_command("qwt-6.1.4.zip");
        assert_eq!(spec.program(), "unzip");
        assert_eq!(spec.arguments(), &["-q", "-o", "qwt-6.1.4.zip"]);
        assert_eq!(spec.cwd(), Some(Path::new("/work")));
    }

    #[test]
    fn bare_seven_zip_runs_then_is_rejected() {
        let plan = plan("qt-5.12.3-linux.7z").unwrap();
        assert!(plan.unsupported_after);
        assert_eq!(plan.steps.len(), 1);

        let spec = &plan.steps[0].primary;
        assert_eq!(spec.program(), "7z");
        assert_eq!(
            spec.arguments(),
            &["x", "-aoa", "-o/work", "qt-5.12.3-linux.7z"]
        );
        assert_eq!(spec.cwd(), None);
    }

    #[test]
    fn seven_zip_with_tar_suffix_runs_both() {
        let plan = plan("bundle.gz.7z").unwrap();
        assert!(!plan.unsupported_after);
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].primary.program(), "7z");
        assert_eq!(plan.steps[1].primary.arguments(), &["zxf", "bundle.gz.7z"]);
    }

    #[test]
    fn unknown_suffix_is_unsupported() {
        for name in ["foo.rar", "foo", "foo.tar"] {
            match plan(name) {
                Err(BuildError::UnsupportedArchive(path)) => {
                    assert_eq!(path, PathBuf::from(name))
                }
                other => panic!("expected unsupported archive for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn windows_tries_force_local_first() {
        let steps = extraction_plan(Path::new("foo.tar.gz"), Path::new("/work"), Os::Windows)
            .unwrap()
            .steps;
        assert_eq!(steps.len(), 1);
        assert_eq!(
            steps[0].primary.arguments(),
            &["--force-local", "-zxf", "foo.tar.gz"]
        );
        let fallback = steps[0].fallback.as_ref().unwrap();
        assert_eq!(fallback.arguments(), &["-zxf", "foo.tar.gz"]);
    }
}
