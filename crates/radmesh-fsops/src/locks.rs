//! Per-workspace advisory locks serialising same-name uploads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::naming::MeshName;

/// Lock table keyed by workspace name.
///
/// Entries hold weak references, so a name's slot disappears once no upload
/// holds or waits for it.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceLocks {
    slots: Arc<Mutex<HashMap<MeshName, Weak<AsyncMutex<()>>>>>,
}

/// Exclusive access to one workspace name; released on drop.
#[derive(Debug)]
pub struct WorkspaceGuard {
    mesh_name: MeshName,
    _guard: OwnedMutexGuard<()>,
}

impl WorkspaceGuard {
    /// Name this guard protects.
    #[must_use]
    pub const fn mesh_name(&self) -> &MeshName {
        &self.mesh_name
    }
}

impl WorkspaceLocks {
    /// Empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`.
    pub async fn acquire(&self, name: &MeshName) -> WorkspaceGuard {
        let slot = self.slot(name);
        let guard = slot.lock_owned().await;
        WorkspaceGuard {
            mesh_name: name.clone(),
            _guard: guard,
        }
    }

    /// Names with a live holder or waiter.
    #[must_use]
    pub fn tracked(&self) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|_, slot| slot.strong_count() > 0);
        slots.len()
    }

    fn slot(&self, name: &MeshName) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.retain(|_, slot| slot.strong_count() > 0);
        if let Some(existing) = slots.get(name).and_then(Weak::upgrade) {
            return existing;
        }
        let fresh = Arc::new(AsyncMutex::new(()));
        slots.insert(name.clone(), Arc::downgrade(&fresh));
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_name_waits_for_release() -> anyhow::Result<()> {
        let locks = WorkspaceLocks::new();
        let name = MeshName::parse("plan42")?;
        let first = locks.acquire(&name).await;
        assert_eq!(first.mesh_name(), &name);

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&name)).await;
        assert!(blocked.is_err());

        drop(first);
        let second =
            tokio::time::timeout(Duration::from_millis(500), locks.acquire(&name)).await?;
        drop(second);
        Ok(())
    }

    #[tokio::test]
    async fn distinct_names_do_not_contend() -> anyhow::Result<()> {
        let locks = WorkspaceLocks::new();
        let first = locks.acquire(&MeshName::parse("a")?).await;
        let second = tokio::time::timeout(
            Duration::from_millis(500),
            locks.acquire(&MeshName::parse("b")?),
        )
        .await?;
        assert_eq!(locks.tracked(), 2);
        drop(first);
        drop(second);
        assert_eq!(locks.tracked(), 0);
        Ok(())
    }
}
