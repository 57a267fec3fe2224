use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::token::TokenRecord;

/// Reads and writes the credential file.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when no credential file exists yet.
    pub fn load(&self) -> Result<Option<TokenRecord>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(None)
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_str(&data).map(Some).map_err(Error::Decode)
    }

    /// Replaces the credential file in one rename, so readers see either
    /// the old record or the new one.
    pub fn save(&self, record: &TokenRecord) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        // NamedTempFile is created with mode 0600 on unix.
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, record)
            .map_err(io::Error::from)?;
        file.write_all(b"\n")?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;

        tracing::debug!(path = %self.path.display(), "Saved token record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TokenRecord {
        TokenRecord {
            access_token: "T1".to_string(),
            expires_in: 3599,
            token_type: "Bearer".to_string(),
            scope: "https://www.googleapis.com/auth/youtube.readonly"
                .to_string(),
            refresh_token: "R1".to_string(),
            expires_at: 1_700_003_599_000,
        }
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("tokenResponse.json"));

        store.save(&record()).unwrap();

        assert_eq!(store.load().unwrap(), Some(record()));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("tokenResponse.json"));

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_malformed_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenResponse.json");
        fs::write(&path, "{ \"access_token\": ").unwrap();

        let err = CredentialStore::new(&path).load().unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_reads_file_written_by_hand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenResponse.json");
        fs::write(
            &path,
            r#"{
  "access_token": "T1",
  "expires_in": 3599,
  "token_type": "Bearer",
  "scope": "https://www.googleapis.com/auth/youtube.readonly",
  "refresh_token": "R1",
  "expires_at": 1700003599000
}"#,
        )
        .unwrap();

        let loaded = CredentialStore::new(&path).load().unwrap();

        assert_eq!(loaded, Some(record()));
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("tokenResponse.json"));
        let mut second = record();
        second.access_token = "T2".to_string();

        store.save(&record()).unwrap();
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), Some(second));
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store =
            CredentialStore::new(dir.path().join("nested/tokenResponse.json"));

        store.save(&record()).unwrap();

        assert!(store.path().exists());
    }

    #[test]
    fn test_save_under_a_regular_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        let store = CredentialStore::new(blocker.join("tokenResponse.json"));

        let err = store.save(&record()).unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("tokenResponse.json"));

        store.save(&record()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
