// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-phone credential blobs on the filesystem.
//!
//! Credentials live at `<auth_root>/<phone>/creds.json` as opaque bytes. The
//! directory is created on first save and removed recursively on delete.
//! Each instance owns its directory exclusively; the phone-uniqueness
//! invariant in the manager guarantees no two writers.

use std::path::{Path, PathBuf};

use wahub_core::WahubError;

const CREDS_FILE: &str = "creds.json";

/// Filesystem store for per-phone session credentials.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    root: PathBuf,
}

impl CredentialStore {
    /// Create a store rooted at `root`. The root itself is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The credential directory for one phone.
    pub fn dir_for(&self, phone: &str) -> PathBuf {
        self.root.join(phone)
    }

    /// Whether a credential blob exists for the phone.
    pub fn exists(&self, phone: &str) -> bool {
        self.dir_for(phone).join(CREDS_FILE).is_file()
    }

    /// Persist the credential blob, creating the directory if needed.
    pub async fn save(&self, phone: &str, blob: &[u8]) -> Result<(), WahubError> {
        validate_phone(phone)?;
        let dir = self.dir_for(phone);
        tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;
        tokio::fs::write(dir.join(CREDS_FILE), blob)
            .await
            .map_err(io_err)
    }

    /// Load the credential blob, or `None` when the phone has never
    /// authenticated.
    pub async fn load(&self, phone: &str) -> Result<Option<Vec<u8>>, WahubError> {
        validate_phone(phone)?;
        let path = self.dir_for(phone).join(CREDS_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(e)),
        }
    }

    /// Remove the phone's whole credential directory. Missing directories
    /// are not an error.
    pub async fn delete(&self, phone: &str) -> Result<(), WahubError> {
        validate_phone(phone)?;
        let dir = self.dir_for(phone);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(e)),
        }
    }

    /// The store root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn io_err(e: std::io::Error) -> WahubError {
    WahubError::Storage { source: Box::new(e) }
}

/// Phones name filesystem directories; only digits are acceptable.
fn validate_phone(phone: &str) -> Result<(), WahubError> {
    if phone.is_empty() || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WahubError::BadInput(format!(
            "phone must be digits only, got {phone:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn save_load_delete_roundtrip() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        assert!(!store.exists("628123"));
        assert!(store.load("628123").await.unwrap().is_none());

        store.save("628123", b"{\"noiseKey\":\"...\"}").await.unwrap();
        assert!(store.exists("628123"));
        let blob = store.load("628123").await.unwrap().unwrap();
        assert_eq!(blob, b"{\"noiseKey\":\"...\"}");

        store.delete("628123").await.unwrap();
        assert!(!store.exists("628123"));
        assert!(!store.dir_for("628123").exists());
    }

    #[tokio::test]
    async fn delete_missing_is_ok() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store.delete("628999").await.unwrap();
    }

    #[tokio::test]
    async fn non_digit_phone_is_rejected() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        let err = store.save("../escape", b"x").await.unwrap_err();
        assert_eq!(err.code(), "bad_input");
        let err = store.load("").await.unwrap_err();
        assert_eq!(err.code(), "bad_input");
    }

    #[tokio::test]
    async fn save_overwrites_previous_blob() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        store.save("628123", b"first").await.unwrap();
        store.save("628123", b"second").await.unwrap();
        assert_eq!(store.load("628123").await.unwrap().unwrap(), b"second");
    }
}
