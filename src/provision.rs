use crate::error::{PullError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Create `root` and `root/<tool>` for every tool.
///
/// Idempotent: existing directories are left as they are. Any failure is
/// fatal since nothing can be downloaded without the tree.
pub fn ensure_layout<S: AsRef<str>>(root: &Path, tools: &[S]) -> Result<Vec<PathBuf>> {
    create_dir(root)?;

    let dirs = tools
        .iter()
        .map(|tool| {
            let dir = root.join(tool.as_ref());
            create_dir(&dir)?;
            Ok(dir)
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!("Local directory structure ready at {}", root.display());
    Ok(dirs)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| PullError::Filesystem {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TOOLS: [&str; 3] = ["ganglia_reg", "ldap_reg", "xCAT_reg"];

    fn snapshot(root: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        entries.sort();
        entries
    }

    #[test]
    fn test_creates_tool_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("registry/container_img_reg");

        let dirs = ensure_layout(&root, &TOOLS).unwrap();
        assert_eq!(dirs.len(), 3);
        for tool in TOOLS {
            assert!(root.join(tool).is_dir());
        }
    }

    #[test]
    fn test_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("reg");

        ensure_layout(&root, &TOOLS).unwrap();
        fs::write(root.join("ganglia_reg/kept.tar"), b"data").unwrap();
        let before = snapshot(&root);

        ensure_layout(&root, &TOOLS).unwrap();
        assert_eq!(snapshot(&root), before);
        assert_eq!(fs::read(root.join("ganglia_reg/kept.tar")).unwrap(), b"data");
    }

    #[test]
    fn test_file_in_the_way_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("reg");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("ldap_reg"), b"not a directory").unwrap();

        let err = ensure_layout(&root, &TOOLS).unwrap_err();
        assert!(err.is_fatal());
        match err {
            PullError::Filesystem { path, .. } => assert_eq!(path, root.join("ldap_reg")),
            other => panic!("Expected Filesystem error, got {other:?}"),
        }
    }
}
