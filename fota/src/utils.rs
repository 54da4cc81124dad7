use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::fota_errors::FotaError;

/// Convert array slice to hex string
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Reads a whole input file, reporting a missing path as `FileNotFound`.
pub fn read_input<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    ensure_exists(path)?;
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(FotaError::FileNotFound(path.to_path_buf()).into());
    }
    Ok(())
}

/// Returns the current time as seconds since the UNIX epoch, truncated to u32.
pub fn current_time_as_u32() -> Result<u32> {
    system_time_as_u32(SystemTime::now())
}

/// Returns the last-modified time of a file as seconds since the UNIX epoch, truncated to u32.
pub fn modified_time_as_u32<P: AsRef<Path>>(path: P) -> Result<u32> {
    let path = path.as_ref();
    ensure_exists(path)?;
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("failed to read modification time of {}", path.display()))?;
    system_time_as_u32(modified)
}

fn system_time_as_u32(time: SystemTime) -> Result<u32> {
    if let Ok(time) = time.duration_since(UNIX_EPOCH) {
        return Ok(time.as_secs() as u32);
    }
    Err(anyhow!("Time went backwards"))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    #[test]
    fn test_modified_time_truncates_to_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.bin");
        let file = File::create(&path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_millis(1_700_000_000_999)).unwrap();

        assert_eq!(modified_time_as_u32(&path).unwrap(), 1_700_000_000);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_input("/definitely/not/here.bin").unwrap_err();
        assert!(matches!(err.downcast_ref::<FotaError>(), Some(FotaError::FileNotFound(_))));
    }

    #[test]
    fn test_bytes_to_hex() {
        assert_eq!(bytes_to_hex(&[0x00, 0x0a, 0xff]), "000aff");
    }
}
