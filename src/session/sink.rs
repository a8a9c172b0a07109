use anyhow::Result;
use async_trait::async_trait;

use crate::models::ActivityRecord;

/// The persistence collaborator's "record activity" operation.
///
/// Implementations must be idempotent per `session_id`: a retried record for
/// a session that was already stored returns the existing activity id.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record_activity(&self, record: &ActivityRecord) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    };

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use super::ActivitySink;
    use crate::models::ActivityRecord;

    /// In-memory sink that fails its first `failures` calls.
    #[derive(Default)]
    pub struct MemorySink {
        failures: AtomicU32,
        pub calls: AtomicU32,
        pub records: Mutex<Vec<ActivityRecord>>,
    }

    impl MemorySink {
        pub fn failing(failures: u32) -> Self {
            Self {
                failures: AtomicU32::new(failures),
                ..Self::default()
            }
        }

        pub fn stored(&self) -> Vec<ActivityRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ActivitySink for MemorySink {
        async fn record_activity(&self, record: &ActivityRecord) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                bail!("activity store offline");
            }
            let mut records = self.records.lock().unwrap();
            records.push(record.clone());
            Ok(format!("activity-{}", records.len()))
        }
    }
}
