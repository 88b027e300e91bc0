use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced,
    Unchanged,
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Replace the contents of `path` with `new` atomically.
///
/// Steps:
/// - If `new` equals `old` → leave the file alone.
/// - Write `new` to a temporary file next to `path`, copying its permissions.
/// - Rename the temporary file over `path`.
pub fn atomic_replace(path: &Path, old: &str, new: &str) -> Result<ReplaceOutcome> {
    if old == new {
        return Ok(ReplaceOutcome::Unchanged);
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(new.as_bytes())?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(ReplaceOutcome::Replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn replaces_content_and_leaves_no_temp_files() {
        let td = tempdir().unwrap();
        let f = td.path().join("main.py");
        fs::write(&f, "old").unwrap();

        assert_eq!(
            atomic_replace(&f, "old", "new").unwrap(),
            ReplaceOutcome::Replaced
        );
        assert_eq!(fs::read_to_string(&f).unwrap(), "new");
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 1);
    }

    #[test]
    fn identical_content_is_not_rewritten() {
        let td = tempdir().unwrap();
        let f = td.path().join("main.py");
        fs::write(&f, "same").unwrap();
        let before = fs::metadata(&f).unwrap().modified().unwrap();

        assert_eq!(
            atomic_replace(&f, "same", "same").unwrap(),
            ReplaceOutcome::Unchanged
        );
        assert_eq!(fs::metadata(&f).unwrap().modified().unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let td = tempdir().unwrap();
        let f = td.path().join("run.sh");
        fs::write(&f, "echo a").unwrap();
        fs::set_permissions(&f, fs::Permissions::from_mode(0o755)).unwrap();

        atomic_replace(&f, "echo a", "echo b").unwrap();
        let mode = fs::metadata(&f).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
