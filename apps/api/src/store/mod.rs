//! Durable key-value storage for the master record.
//!
//! Backends store the exported JSON document under a single key; parsing and
//! id repair happen in `ResumeWorkspace`, so every backend behaves the same on
//! a damaged document.

use anyhow::Result;
use async_trait::async_trait;

pub mod file;
pub mod postgres;
pub mod workspace;

/// Key the master record is stored under.
pub const STORAGE_KEY: &str = "resumecrafter_master_resume";

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// The stored document, or `None` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<String>>;

    /// Replaces the stored document.
    async fn save(&self, document: &str) -> Result<()>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

#[cfg(test)]
pub mod memory {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// In-memory store with a switch for failing saves.
    #[derive(Default)]
    pub struct MemoryStore {
        document: Mutex<Option<String>>,
        fail_saves: AtomicBool,
        saves: AtomicUsize,
    }

    impl MemoryStore {
        pub fn with_document(document: &str) -> Self {
            Self {
                document: Mutex::new(Some(document.to_string())),
                ..Default::default()
            }
        }

        pub fn document(&self) -> Option<String> {
            self.document.lock().unwrap().clone()
        }

        pub fn save_count(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }

        pub fn fail_saves(&self, fail: bool) {
            self.fail_saves.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ResumeStore for MemoryStore {
        async fn load(&self) -> Result<Option<String>> {
            Ok(self.document())
        }

        async fn save(&self, document: &str) -> Result<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            *self.document.lock().unwrap() = Some(document.to_string());
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }
}
