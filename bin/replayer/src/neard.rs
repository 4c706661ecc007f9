//! Setup of a local validator daemon to replay into.

use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use serde_json::Value;
use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    process::Command,
};
use tracing::info;

/// Gas limit of a single transaction on the set up daemon.
pub const GAS_LIMIT: u64 = 800_000_000_000_000;

/// Features the daemon is built with.
const FEATURES: &str = "protocol_feature_evm,nightly_protocol_features";

/// Where and how the validator daemon is built and initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeardConfig {
    /// The source checkout of the daemon.
    pub source_dir: PathBuf,
    /// The home directory the daemon is initialized into.
    pub home_dir: PathBuf,
    /// Build in release mode.
    pub release: bool,
}

impl NeardConfig {
    /// Returns the path of the built daemon binary.
    pub fn binary(&self) -> PathBuf {
        let profile = if self.release { "release" } else { "debug" };
        self.source_dir.join("target").join(profile).join("neard")
    }

    /// Returns the directory an existing home directory is moved to.
    pub fn backup_dir(&self) -> PathBuf {
        let mut backup = OsString::from(self.home_dir.as_os_str());
        backup.push("_old");
        PathBuf::from(backup)
    }

    /// Builds and initializes the daemon.
    ///
    /// ## Returns
    /// - `Ok(Neard)`: A handle on the set up daemon.
    /// - `Err(_)`: A step failed. Steps already taken are not undone.
    pub fn setup(&self) -> Result<Neard> {
        info!(target: "neard", "setup neard");
        if let Some(head) = self.source_head() {
            info!(target: "neard", "head={head}");
        }
        self.backup_home()?;
        self.build()?;
        self.init()?;
        edit_genesis(&self.home_dir)?;
        Ok(Neard { config: self.clone() })
    }

    fn source_head(&self) -> Option<String> {
        let output = Command::new("git")
            .current_dir(&self.source_dir)
            .args(["rev-parse", "HEAD"])
            .output()
            .ok()?;
        output.status.success().then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn backup_home(&self) -> Result<()> {
        if !self.home_dir.exists() {
            info!(target: "neard", "directory '{}' does not exist", self.home_dir.display());
            return Ok(());
        }
        let backup = self.backup_dir();
        info!(target: "neard", "mv {} {}", self.home_dir.display(), backup.display());
        if backup.exists() {
            fs::remove_dir_all(&backup)?;
        }
        fs::rename(&self.home_dir, &backup)?;
        Ok(())
    }

    fn build(&self) -> Result<()> {
        let mut command = Command::new("cargo");
        command.current_dir(&self.source_dir).args([
            "build",
            "--package",
            "neard",
            "--features",
            FEATURES,
        ]);
        if self.release {
            command.arg("--release");
        }
        run(command)
    }

    fn init(&self) -> Result<()> {
        let mut command = Command::new(self.binary());
        command
            .arg(format!("--home={}", self.home_dir.display()))
            .arg("--verbose=true")
            .arg("init");
        run(command)
    }
}

/// A validator daemon set up by [NeardConfig::setup]. Stops when dropped.
#[derive(Debug)]
pub struct Neard {
    config: NeardConfig,
}

impl Neard {
    /// Returns the configuration the daemon was set up with.
    pub const fn config(&self) -> &NeardConfig {
        &self.config
    }

    /// Stops the daemon.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Neard {
    fn drop(&mut self) {
        info!(target: "neard", "stop neard");
    }
}

fn run(mut command: Command) -> Result<()> {
    let status = command.status().map_err(|e| anyhow!("Error running {command:?}: {e}"))?;
    if !status.success() {
        bail!("{command:?} failed with {status}");
    }
    Ok(())
}

/// Raises the per-transaction gas limits in the `genesis.json` of `home_dir` to [GAS_LIMIT],
/// keeping the original as `genesis_old.json`.
pub fn edit_genesis(home_dir: &Path) -> Result<()> {
    let path = home_dir.join("genesis.json");
    fs::copy(&path, home_dir.join("genesis_old.json"))?;

    let mut genesis: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    let limit_config = genesis
        .pointer_mut("/runtime_config/wasm_config/limit_config")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| anyhow!("{} has no runtime_config.wasm_config.limit_config", path.display()))?;
    limit_config.insert("max_gas_burnt".to_string(), GAS_LIMIT.into());
    limit_config.insert("max_total_prepaid_gas".to_string(), GAS_LIMIT.into());

    fs::write(&path, serde_json::to_string_pretty(&genesis)?)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn genesis() -> Value {
        json!({
            "chain_id": "localnet",
            "runtime_config": {
                "wasm_config": {
                    "limit_config": {
                        "max_gas_burnt": 200_000_000_000_000u64,
                        "max_total_prepaid_gas": 300_000_000_000_000u64,
                        "max_stack_height": 16384,
                    }
                }
            }
        })
    }

    #[test]
    fn test_edit_genesis() {
        let home = tempfile::tempdir().unwrap();
        let original = serde_json::to_string(&genesis()).unwrap();
        fs::write(home.path().join("genesis.json"), &original).unwrap();

        edit_genesis(home.path()).unwrap();

        let edited: Value =
            serde_json::from_str(&fs::read_to_string(home.path().join("genesis.json")).unwrap())
                .unwrap();
        let limits = &edited["runtime_config"]["wasm_config"]["limit_config"];
        assert_eq!(limits["max_gas_burnt"], json!(GAS_LIMIT));
        assert_eq!(limits["max_total_prepaid_gas"], json!(GAS_LIMIT));
        assert_eq!(limits["max_stack_height"], json!(16384));
        assert_eq!(edited["chain_id"], "localnet");
        assert_eq!(fs::read_to_string(home.path().join("genesis_old.json")).unwrap(), original);
    }

    #[test]
    fn test_edit_genesis_without_limits() {
        let home = tempfile::tempdir().unwrap();
        fs::write(home.path().join("genesis.json"), r#"{ "runtime_config": {} }"#).unwrap();
        assert!(edit_genesis(home.path()).is_err());
    }

    #[test]
    fn test_backup_home_replaces_old_backup() {
        let root = tempfile::tempdir().unwrap();
        let config = NeardConfig {
            source_dir: root.path().join("nearcore"),
            home_dir: root.path().join("local"),
            release: false,
        };
        fs::create_dir_all(config.home_dir.join("data")).unwrap();
        fs::create_dir_all(config.backup_dir().join("stale")).unwrap();

        config.backup_home().unwrap();

        assert!(!config.home_dir.exists());
        assert!(config.backup_dir().join("data").exists());
        assert!(!config.backup_dir().join("stale").exists());
        assert_eq!(config.backup_dir(), root.path().join("local_old"));
    }

    #[test]
    fn test_binary_path() {
        let mut config = NeardConfig {
            source_dir: PathBuf::from("/src/nearcore"),
            home_dir: PathBuf::from("/home/near/local"),
            release: true,
        };
        assert_eq!(config.binary(), PathBuf::from("/src/nearcore/target/release/neard"));
        config.release = false;
        assert_eq!(config.binary(), PathBuf::from("/src/nearcore/target/debug/neard"));
    }
}
