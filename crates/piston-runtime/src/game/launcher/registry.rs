/// Registry of running game processes
use crate::game::launcher::types::GameProcess;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Tracks processes between a successful spawn and their observed exit.
/// Clones share the same map.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    /// Map of pid -> GameProcess
    processes: Arc<RwLock<HashMap<u32, GameProcess>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new running process
    pub async fn register(&self, process: GameProcess) {
        log::info!(
            "Registering process: {} (PID {})",
            process.version_id,
            process.pid
        );
        self.processes.write().await.insert(process.pid, process);
    }

    /// Remove a process, returning it if it was registered
    pub async fn unregister(&self, pid: u32) -> Option<GameProcess> {
        let removed = self.processes.write().await.remove(&pid);
        if removed.is_some() {
            log::info!("Unregistered process: PID {}", pid);
        }
        removed
    }

    pub async fn get(&self, pid: u32) -> Option<GameProcess> {
        self.processes.read().await.get(&pid).cloned()
    }

    /// All running processes
    pub async fn list(&self) -> Vec<GameProcess> {
        let mut processes: Vec<GameProcess> =
            self.processes.read().await.values().cloned().collect();
        processes.sort_by_key(|p| p.started_at);
        processes
    }

    pub async fn is_running(&self, pid: u32) -> bool {
        self.processes.read().await.contains_key(&pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::sync::broadcast;

    fn process(pid: u32) -> GameProcess {
        let (events, _) = broadcast::channel(4);
        GameProcess {
            pid,
            version_id: "1.20.1".to_string(),
            game_dir: std::env::temp_dir(),
            started_at: chrono::Utc::now(),
            started: Instant::now(),
            events,
        }
    }

    #[tokio::test]
    async fn test_registry_memory() {
        let registry = ProcessRegistry::new();
        registry.register(process(42)).await;

        assert!(registry.is_running(42).await);
        assert_eq!(registry.get(42).await.unwrap().version_id, "1.20.1");
        assert_eq!(registry.list().await.len(), 1);

        assert!(registry.unregister(42).await.is_some());
        assert!(!registry.is_running(42).await);
        assert!(registry.unregister(42).await.is_none());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let registry = ProcessRegistry::new();
        let other = registry.clone();
        registry.register(process(7)).await;
        assert!(other.is_running(7).await);
    }
}
