use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

use fridge_common::{PersistedState, RuntimeConfig};

/// File-backed persistence for the runtime configuration and the durable
/// state record.
pub struct Store {
    config_path: PathBuf,
    state_path: PathBuf,
    state_tmp_path: PathBuf,
}

impl Store {
    pub fn new() -> Self {
        let data_dir = std::env::var("FRIDGE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.fridge"));
        Self::at(data_dir)
    }

    pub fn at(data_dir: PathBuf) -> Self {
        Self {
            config_path: data_dir.join("config.json"),
            state_path: data_dir.join("state.json"),
            state_tmp_path: data_dir.join("state.json.tmp"),
        }
    }

    pub async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(&self.config_path).await {
            Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Missing, unreadable, unparsable, and wrong-schema records all come
    /// back as `None`: recovery treats every one of them as a first boot.
    pub async fn load_state(&self) -> Option<PersistedState> {
        let raw = match tokio::fs::read(&self.state_path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("state record unreadable: {err}");
                return None;
            }
        };

        match serde_json::from_slice::<PersistedState>(&raw) {
            Ok(state) if state.is_current_schema() => Some(state),
            Ok(state) => {
                warn!(version = state.version, "state record schema mismatch, discarding");
                None
            }
            Err(err) => {
                warn!("state record corrupt, discarding: {err}");
                None
            }
        }
    }

    /// Full overwrite through a temp file + rename, so an interrupted write
    /// leaves either the previous record or a dangling temp file, never a
    /// half-written record under the live name.
    pub async fn checkpoint(&self, state: &PersistedState) -> anyhow::Result<()> {
        if let Some(parent) = self.state_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let payload = serde_json::to_vec(state)?;
        tokio::fs::write(&self.state_tmp_path, payload)
            .await
            .context("writing state temp file")?;
        tokio::fs::rename(&self.state_tmp_path, &self.state_path)
            .await
            .context("renaming state record into place")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fridge_common::SCHEMA_VERSION;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn scratch_store() -> (Store, PathBuf) {
        static SEQ: AtomicU32 = AtomicU32::new(0);
        let dir = std::env::temp_dir().join(format!(
            "fridge-store-test-{}-{}",
            std::process::id(),
            SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        (Store::at(dir.clone()), dir)
    }

    fn sample_state() -> PersistedState {
        PersistedState {
            version: SCHEMA_VERSION,
            last_known_time: Some(1_717_200_000),
            last_checkpoint_time: Some(1_717_200_600),
            relay_on: false,
            cycle_elapsed_seconds: 431,
            total_runtime_seconds: 98_765,
            boot_count: 12,
        }
    }

    #[tokio::test]
    async fn load_right_after_checkpoint_is_identical() {
        let (store, dir) = scratch_store();

        let state = sample_state();
        store.checkpoint(&state).await.unwrap();
        let loaded = store.load_state().await;

        assert_eq!(loaded, Some(state));
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn missing_record_loads_as_none() {
        let (store, _dir) = scratch_store();
        assert_eq!(store.load_state().await, None);
    }

    #[tokio::test]
    async fn corrupt_record_loads_as_none() {
        let (store, dir) = scratch_store();

        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("state.json"), b"{ truncated mid-wri")
            .await
            .unwrap();

        assert_eq!(store.load_state().await, None);
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn schema_mismatch_loads_as_none() {
        let (store, dir) = scratch_store();

        let mut state = sample_state();
        state.version = SCHEMA_VERSION + 1;
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("state.json"), serde_json::to_vec(&state).unwrap())
            .await
            .unwrap();

        assert_eq!(store.load_state().await, None);
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn checkpoint_overwrites_previous_record() {
        let (store, dir) = scratch_store();

        store.checkpoint(&sample_state()).await.unwrap();
        let mut second = sample_state();
        second.relay_on = true;
        second.boot_count = 13;
        store.checkpoint(&second).await.unwrap();

        assert_eq!(store.load_state().await, Some(second));
        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[tokio::test]
    async fn missing_config_falls_back_to_defaults() {
        let (store, _dir) = scratch_store();
        let config = store.load_runtime_config().await.unwrap();
        assert_eq!(config.cycle.duration_on_seconds, 720);
    }
}
