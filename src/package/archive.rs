use crate::result::{BuildError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Component, Path};
use tar::Archive;

/** Checks that a produced tarball holds exactly one top-level directory
 *
 * # Arguments
 * * `archive` - `.tar.gz` written by `create_archive`
 * * `expected_root` - the output base name every entry must live under
 *
 * # Returns
 * Number of entries in the archive.
 *
 * # Errors
 * - [`BuildError::ArchiveLayout`] for an empty archive or an entry outside `expected_root`
 */
pub fn verify_tarball_layout(archive: &Path, expected_root: &str) -> Result<usize> {
    let file = File::open(archive)?;
    let mut tarball = Archive::new(GzDecoder::new(file));

    let mut count = 0;
    for entry in tarball.entries()? {
        let entry = entry?;
        let path = entry.path()?;
        let root = path.components().find_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        });

        match root {
            Some(root) if root == expected_root => count += 1,
            _ => {
                return Err(BuildError::ArchiveLayout(
                    format!(
                        "{} contains {} outside of {}",
                        archive.display(),
                        path.display(),
                        expected_root
                    )
                    .into(),
                ))
            }
        }
    }

    if count == 0 {
        return Err(BuildError::ArchiveLayout(
            format!("{} is empty", archive.display()).into(),
        ));
    }
    Ok(count)
}
