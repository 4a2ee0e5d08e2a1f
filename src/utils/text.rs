use crate::result::Result;
use std::path::Path;
use tokio::fs;

/// Replace every occurrence of each `old` with its `new`, in order, rewriting the file in place.
pub async fn patch(path: &Path, substitutions: &[(&str, &str)]) -> Result<()> {
    let mut text = fs::read_to_string(path).await?;
    for (old, new) in substitutions {
        text = text.replace(old, new);
    }
    fs::write(path, text).await?;
    log::debug!("Patched {}", path.display());
    Ok(())
}

pub async fn append(path: &Path, extra: &str) -> Result<()> {
    let mut text = fs::read_to_string(path).await?;
    text.push_str(extra);
    fs::write(path, text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn patch_replaces_all_occurrences_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.pri");
        std::fs::write(&file, "PREFIX = /usr/local\nLIBDIR = /usr/local/lib\n").unwrap();

        patch(&file, &[("/usr/local", "/opt/x"), ("/opt/x/lib", "/opt/lib")])
            .await
            .unwrap();

        let result = std::fs::read_to_string(&file).unwrap();
        assert_eq!(result, "PREFIX = /opt/x\nLIBDIR = /opt/lib\n");
    }

    #[tokio::test]
    async fn append_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.pri");
        std::fs::write(&file, "A = 1\n").unwrap();

        append(&file, "B = 2\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&file).unwrap(), "A = 1\nB = 2\n");
    }

    #[tokio::test]
    async fn patch_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = patch(&dir.path().join("missing"), &[("a", "b")])
            .await
            .unwrap_err();
        assert!(matches!(err, crate::result::BuildError::Io(_)));
    }
}
