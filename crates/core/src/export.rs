//! Local download copy of a submitted profile.
//!
//! The plaintext JSON handed to the encryptor is also written to
//! `<data_dir>/exports/<uuid>.json` so the user keeps a readable copy of what was registered.

use healthdid_uuid::ResourceId;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes `json` as `<resource_id>.json` under `exports_dir`, creating the directory if needed.
///
/// An existing export for the same id is never overwritten.
pub fn write_export(
    exports_dir: &Path,
    resource_id: &ResourceId,
    json: &[u8],
) -> std::io::Result<PathBuf> {
    fs::create_dir_all(exports_dir)?;
    let path = exports_dir.join(format!("{resource_id}.json"));

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)?;
    file.write_all(json)?;
    file.sync_all()?;

    tracing::debug!("exported {} bytes to {}", json.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_named_export() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("exports");
        let id = ResourceId::new();

        let path = write_export(&dir, &id, b"{\"resourceType\":\"Patient\"}").unwrap();
        assert_eq!(path, dir.join(format!("{id}.json")));
        assert_eq!(fs::read(&path).unwrap(), b"{\"resourceType\":\"Patient\"}");
    }

    #[test]
    fn refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let id = ResourceId::new();
        write_export(temp.path(), &id, b"{}").unwrap();

        let err = write_export(temp.path(), &id, b"[]").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(temp.path().join(format!("{id}.json"))).unwrap(), b"{}");
    }
}
