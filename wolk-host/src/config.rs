//! Bridge configuration
//!
//! Loaded from a TOML file. Every section has defaults, so a missing file or
//! a partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wolk_tee::{EnclaveConfig, KeyPolicy};

use crate::error::{HostError, HostResult};
use crate::format;

/// Smallest untrusted region the host will allocate
pub const MIN_REGION_SIZE: usize = 4 * 1024;

/// Largest untrusted region the host will allocate
pub const MAX_REGION_SIZE: usize = 256 * 1024 * 1024;

/// Main bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub enclave: EnclaveSettings,
    pub memory: MemorySettings,
    pub logging: LoggingSettings,
}

/// Sealing policy as written in configuration files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicySetting {
    #[default]
    MrEnclave,
    MrSigner,
}

impl From<PolicySetting> for KeyPolicy {
    fn from(setting: PolicySetting) -> Self {
        match setting {
            PolicySetting::MrEnclave => KeyPolicy::MrEnclave,
            PolicySetting::MrSigner => KeyPolicy::MrSigner,
        }
    }
}

/// Enclave image and identity settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnclaveSettings {
    /// Enclave image; its SHA-256 is the measurement
    pub image_path: PathBuf,
    /// Simulated platform secret, created on first use
    pub platform_key_path: PathBuf,
    /// Directory for sealed blobs
    pub store_dir: PathBuf,
    pub policy: PolicySetting,
    pub isv_svn: u16,
    /// Hex-encoded 32-byte signer measurement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrsigner: Option<String>,
}

impl Default for EnclaveSettings {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from("enclave.signed.so"),
            platform_key_path: PathBuf::from("platform.key"),
            store_dir: PathBuf::from("sealed"),
            policy: PolicySetting::default(),
            isv_svn: 1,
            mrsigner: None,
        }
    }
}

/// Untrusted region sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Bytes reserved for call records and argument buffers
    pub region_size: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            region_size: 1024 * 1024,
        }
    }
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> HostResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> HostResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|err| HostError::Config(format!("failed to parse configuration: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> HostResult<String> {
        toml::to_string_pretty(self)
            .map_err(|err| HostError::Config(format!("failed to serialize configuration: {err}")))
    }

    pub fn validate(&self) -> HostResult<()> {
        if !(MIN_REGION_SIZE..=MAX_REGION_SIZE).contains(&self.memory.region_size) {
            return Err(HostError::Config(format!(
                "region_size must be between {MIN_REGION_SIZE} and {MAX_REGION_SIZE} bytes"
            )));
        }

        if self.enclave.image_path.as_os_str().is_empty() {
            return Err(HostError::Config("image_path cannot be empty".to_string()));
        }

        if self.enclave.platform_key_path.as_os_str().is_empty() {
            return Err(HostError::Config(
                "platform_key_path cannot be empty".to_string(),
            ));
        }

        self.mrsigner()?;
        Ok(())
    }

    fn mrsigner(&self) -> HostResult<[u8; 32]> {
        match &self.enclave.mrsigner {
            Some(text) => format::from_hex_array(text)
                .map_err(|err| HostError::Config(format!("mrsigner: {err}"))),
            None => Ok([0u8; 32]),
        }
    }

    /// Enclave load parameters derived from this configuration
    pub fn enclave_config(&self) -> HostResult<EnclaveConfig> {
        Ok(EnclaveConfig {
            policy: self.enclave.policy.into(),
            isv_svn: self.enclave.isv_svn,
            mrsigner: self.mrsigner()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.memory.region_size, 1024 * 1024);
        assert_eq!(config.enclave_config().unwrap(), EnclaveConfig::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = BridgeConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wolk.toml");
        std::fs::write(
            &path,
            r#"
[enclave]
policy = "mrsigner"
isv_svn = 3
mrsigner = "5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A5A"

[logging]
json = true
"#,
        )
        .unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.memory, MemorySettings::default());

        let enclave = config.enclave_config().unwrap();
        assert_eq!(enclave.policy, KeyPolicy::MrSigner);
        assert_eq!(enclave.isv_svn, 3);
        assert_eq!(enclave.mrsigner, [0x5A; 32]);
    }

    #[test]
    fn test_validation() {
        let mut config = BridgeConfig::default();
        config.memory.region_size = 16;
        assert!(matches!(config.validate(), Err(HostError::Config(_))));

        let mut config = BridgeConfig::default();
        config.enclave.mrsigner = Some("abcd".to_string());
        assert!(matches!(config.validate(), Err(HostError::Config(_))));

        assert!(matches!(
            BridgeConfig::from_toml("[memory]\nregion_size = \"big\""),
            Err(HostError::Config(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = BridgeConfig::default();
        config.enclave.policy = PolicySetting::MrSigner;
        let text = config.to_toml().unwrap();
        assert_eq!(BridgeConfig::from_toml(&text).unwrap(), config);
    }
}
