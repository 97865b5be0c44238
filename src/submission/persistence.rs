//! Progress persistence: the durable slot holding one progress snapshot.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::store::Database;

use super::model::ProgressSnapshot;

/// Durable storage for a single progress snapshot.
///
/// `load` never fails: a missing, unreadable, or malformed snapshot all read
/// as `None`, which callers treat as a fresh start.
#[async_trait]
pub trait ProgressPersistence: Send + Sync {
    async fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), PersistenceError>;

    async fn load(&self) -> Option<ProgressSnapshot>;

    async fn clear(&self) -> Result<(), PersistenceError>;
}

/// Stores the snapshot as a JSON setting under `(user_id, key)`.
pub struct SettingsPersistence {
    db: Arc<dyn Database>,
    user_id: String,
    key: String,
}

impl SettingsPersistence {
    pub fn new(db: Arc<dyn Database>, user_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            db,
            user_id: user_id.into(),
            key: key.into(),
        }
    }
}

#[async_trait]
impl ProgressPersistence for SettingsPersistence {
    async fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), PersistenceError> {
        let value = serde_json::to_value(snapshot)?;
        self.db.set_setting(&self.user_id, &self.key, &value).await?;
        tracing::debug!(user = %self.user_id, key = %self.key, "Progress snapshot saved");
        Ok(())
    }

    async fn load(&self) -> Option<ProgressSnapshot> {
        let value = match self.db.get_setting(&self.user_id, &self.key).await {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, "Failed to read progress snapshot: {}", e);
                return None;
            }
        };

        match serde_json::from_value::<ProgressSnapshot>(value) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    "Discarding malformed progress snapshot: {}",
                    e
                );
                None
            }
        }
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        self.db.delete_setting(&self.user_id, &self.key).await?;
        Ok(())
    }
}

/// In-memory slot whose writes can be made to fail.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryPersistence {
    slot: std::sync::Mutex<Option<ProgressSnapshot>>,
    pub fail_save: std::sync::atomic::AtomicBool,
    pub fail_clear: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryPersistence {
    fn write_error() -> PersistenceError {
        PersistenceError::Database(crate::error::DatabaseError::Query("disk full".to_string()))
    }
}

#[cfg(test)]
#[async_trait]
impl ProgressPersistence for MemoryPersistence {
    async fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), PersistenceError> {
        if self.fail_save.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        *self.slot.lock().unwrap() = Some(snapshot.clone());
        Ok(())
    }

    async fn load(&self) -> Option<ProgressSnapshot> {
        self.slot.lock().unwrap().clone()
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        if self.fail_clear.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}
