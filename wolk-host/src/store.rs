//! Sealed blob storage
//!
//! Each blob is written as raw bytes to `<name>.sealed` with a JSON sidecar
//! `<name>.sealed.json`. The host never looks inside a blob; the plaintext
//! length it needs for unsealing comes from the sidecar.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;
use wolk_crypto::SEALED_HEADER_SIZE;

use crate::error::{HostError, HostResult};

const BLOB_EXTENSION: &str = "sealed";
const SIDECAR_SUFFIX: &str = ".sealed.json";

/// Out-of-band record stored next to a sealed blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedMetadata {
    /// Plaintext length expected on unseal
    pub plaintext_len: usize,
    /// Seconds since the Unix epoch
    pub created_at: u64,
    pub label: Option<String>,
}

/// Directory of sealed blobs
#[derive(Debug, Clone)]
pub struct SealedStore {
    dir: PathBuf,
}

impl SealedStore {
    /// Open the store, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> HostResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(
        &self,
        name: &str,
        blob: &[u8],
        plaintext_len: usize,
        label: Option<String>,
    ) -> HostResult<SealedMetadata> {
        validate_name(name)?;
        check_length(blob.len(), plaintext_len)?;

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let metadata = SealedMetadata {
            plaintext_len,
            created_at,
            label,
        };

        fs::write(self.blob_path(name), blob)?;
        fs::write(
            self.sidecar_path(name),
            serde_json::to_string_pretty(&metadata)?,
        )?;

        debug!(name, sealed_len = blob.len(), plaintext_len, "stored sealed blob");
        Ok(metadata)
    }

    pub fn load(&self, name: &str) -> HostResult<(Vec<u8>, SealedMetadata)> {
        validate_name(name)?;

        let blob = fs::read(self.blob_path(name))?;
        let metadata: SealedMetadata =
            serde_json::from_str(&fs::read_to_string(self.sidecar_path(name))?)?;
        check_length(blob.len(), metadata.plaintext_len)?;

        Ok((blob, metadata))
    }

    pub fn contains(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.blob_path(name).is_file()
    }

    /// Names of all blobs that have a sidecar, sorted
    pub fn list(&self) -> HostResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name.strip_suffix(SIDECAR_SUFFIX) {
                if self.blob_path(name).is_file() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn remove(&self, name: &str) -> HostResult<()> {
        validate_name(name)?;
        fs::remove_file(self.blob_path(name))?;
        fs::remove_file(self.sidecar_path(name))?;
        Ok(())
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{BLOB_EXTENSION}"))
    }

    fn sidecar_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}{SIDECAR_SUFFIX}"))
    }
}

/// Store names are single path components
fn validate_name(name: &str) -> HostResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(HostError::InvalidInput(format!("invalid sealed blob name {name:?}")))
    }
}

fn check_length(sealed_len: usize, plaintext_len: usize) -> HostResult<()> {
    let expected = plaintext_len.saturating_add(SEALED_HEADER_SIZE);
    if sealed_len != expected {
        return Err(HostError::LengthMismatch {
            expected,
            actual: sealed_len,
        });
    }
    Ok(())
}
