//! Server configuration, read from `config.toml` and `POLL_*` environment
//! variables.

use std::path::{Path, PathBuf};

use poll_core::{location::Locations, schema::Generation};
use poll_export::ExportOptions;
use serde::Deserialize;

use crate::error::Result;

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                    String,
  #[serde(default = "default_port")]
  pub port:                    u16,
  pub store_path:              PathBuf,
  /// Schema generation the store is reconciled to at startup.
  #[serde(default)]
  pub generation:              Generation,
  /// Addresses offered on the intake form, in display order.
  #[serde(default)]
  pub locations:               Vec<String>,
  pub admin_username:          String,
  pub admin_password_hash:     String,
  #[serde(default)]
  pub export_utc_offset_hours: i32,
}

impl ServerConfig {
  /// Load `path` (optional) overlaid with `POLL_*` environment variables.
  ///
  /// `POLL_LOCATIONS` takes a `;`-separated list.
  pub fn load(path: &Path) -> Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("POLL")
          .try_parsing(true)
          .list_separator(";")
          .with_list_parse_key("locations"),
      )
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn locations(&self) -> Locations { Locations::new(self.locations.iter().cloned()) }

  pub fn export_options(&self) -> Result<ExportOptions> {
    Ok(ExportOptions::with_offset_hours(self.export_utc_offset_hours)?)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  const EXAMPLE: &str = r#"
store_path          = "/var/lib/poll/survey.db"
generation          = "v3"
locations           = ["Udarnikov 36", "Aviatorov 9", "Udarnikov 36"]
admin_username      = "admin"
admin_password_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA"
export_utc_offset_hours = 3
"#;

  #[test]
  fn loads_toml_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, EXAMPLE).unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.generation, Generation::V3);
    assert_eq!(cfg.locations().len(), 2);
    assert_eq!(cfg.store_path(), PathBuf::from("/var/lib/poll/survey.db"));
    assert_eq!(
      cfg.export_options().unwrap(),
      ExportOptions::with_offset_hours(3).unwrap()
    );
  }

  #[test]
  fn generation_defaults_to_latest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
      &path,
      "store_path = \"survey.db\"\nadmin_username = \"a\"\nadmin_password_hash = \"x\"\n",
    )
    .unwrap();

    let cfg = ServerConfig::load(&path).unwrap();
    assert_eq!(cfg.generation, Generation::default());
    assert!(cfg.locations().is_empty());
  }

  #[test]
  fn missing_required_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 9000\n").unwrap();
    assert!(ServerConfig::load(&path).is_err());
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/poll/survey.db")),
      PathBuf::from(home).join("poll/survey.db")
    );
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
