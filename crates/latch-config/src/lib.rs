//! Console configuration.
//!
//! Everything deployment-specific lives here instead of in compiled
//! constants: which email owns the installation, which rooms the console
//! manages, and which entry codes the physical doors accept. Stored as JSON
//! under `~/.latch/config.json` unless a path is given.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found")]
    NotFound,
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no home directory to resolve the default config path")]
    NoHomeDir,
}

/// One managed room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomEntry {
    pub id: String,
    pub name: String,
}

/// The identity a door entry code resolves to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialEntry {
    pub user_id: String,
    pub user_name: String,
}

/// Console configuration stored in `~/.latch/config.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    /// Email of the single owner identity.
    pub owner_email: String,
    /// The rooms the console manages.
    #[serde(default = "default_rooms")]
    pub rooms: Vec<RoomEntry>,
    /// Door entry codes and who they belong to.
    #[serde(default)]
    pub door_credentials: HashMap<String, CredentialEntry>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        let mut door_credentials = HashMap::new();
        door_credentials.insert(
            "123456".to_string(),
            CredentialEntry {
                user_id: "1".to_string(),
                user_name: "Chủ sở hữu".to_string(),
            },
        );
        Self {
            owner_email: "a@gmail.com".to_string(),
            rooms: default_rooms(),
            door_credentials,
        }
    }
}

fn default_rooms() -> Vec<RoomEntry> {
    [
        ("room1", "Phòng họp chính"),
        ("room2", "Phòng làm việc"),
        ("room3", "Phòng giám đốc"),
        ("room4", "Phòng kỹ thuật"),
    ]
    .into_iter()
    .map(|(id, name)| RoomEntry {
        id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}

impl ConsoleConfig {
    /// Load from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::default_path()?)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save, creating parent directories as needed.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self)?)?;
        Ok(())
    }

    /// `~/.latch/config.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(dirs::home_dir()
            .ok_or(ConfigError::NoHomeDir)?
            .join(".latch")
            .join("config.json"))
    }

    pub fn room_name(&self, room_id: &str) -> Option<&str> {
        self.rooms
            .iter()
            .find(|room| room.id == room_id)
            .map(|room| room.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_console_rooms() {
        let config = ConsoleConfig::default();
        assert_eq!(config.owner_email, "a@gmail.com");
        assert_eq!(config.rooms.len(), 4);
        assert_eq!(config.room_name("room1"), Some("Phòng họp chính"));
        assert_eq!(config.room_name("room9"), None);

        let entry = config.door_credentials.get("123456").expect("default code");
        assert_eq!(entry.user_id, "1");
        assert_eq!(entry.user_name, "Chủ sở hữu");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = ConsoleConfig::default();
        config.owner_email = "owner@example.com".to_string();
        config.save_to(&path).unwrap();

        let loaded = ConsoleConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConsoleConfig::load_from(dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    fn test_minimal_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "ownerEmail": "boss@x.com" }"#).unwrap();

        let config = ConsoleConfig::load_from(&path).unwrap();
        assert_eq!(config.owner_email, "boss@x.com");
        assert_eq!(config.rooms.len(), 4);
        assert!(config.door_credentials.is_empty());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        let result = ConsoleConfig::load_from(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
