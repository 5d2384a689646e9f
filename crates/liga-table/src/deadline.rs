//! Deadline-bounded table loading.
//!
//! The lookup runs on a helper thread; the caller waits on a channel until
//! the deadline and then gives up with [`TableError::Timeout`]. An abandoned
//! lookup finishes in the background and its result is discarded.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::warn;

use crate::error::TableError;
use crate::source::TableSource;
use crate::table::Table;

/// Load `name` from `source`, failing with `Timeout` once `deadline` passes.
pub fn load_before<S>(source: &Arc<S>, name: &str, deadline: Instant) -> Result<Arc<Table>, TableError>
where
    S: TableSource + ?Sized + 'static,
{
    let budget = deadline.saturating_duration_since(Instant::now());
    if budget.is_zero() {
        warn!(table = %name, "Deadline already passed before table lookup");
        return Err(TableError::Timeout(budget));
    }

    let (tx, rx) = mpsc::channel();
    let worker_source = Arc::clone(source);
    let owned_name = name.to_string();
    thread::Builder::new()
        .name("liga-table-load".to_string())
        .spawn(move || {
            // Receiver may be gone after a timeout
            let _ = tx.send(worker_source.load_table(&owned_name));
        })
        .map_err(|e| TableError::DataSource(format!("failed to spawn table loader: {}", e)))?;

    match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(table = %name, budget_ms = budget.as_millis() as u64, "Table lookup timed out");
            Err(TableError::Timeout(budget))
        }
        Err(RecvTimeoutError::Disconnected) => Err(TableError::DataSource(
            "table loader exited without a result".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::source::InMemorySource;
    use crate::table::Value;

    /// Sleeps before delegating.
    struct Slow {
        delay: Duration,
        inner: InMemorySource,
    }

    impl TableSource for Slow {
        fn load_table(&self, name: &str) -> Result<Arc<Table>, TableError> {
            thread::sleep(self.delay);
            self.inner.load_table(name)
        }
    }

    fn slow(delay_ms: u64) -> Arc<Slow> {
        let table = Table::new("T1", vec!["rank".to_string()], vec![vec![Value::from(1_i64)]]).unwrap();
        Arc::new(Slow {
            delay: Duration::from_millis(delay_ms),
            inner: InMemorySource::new().with_table(table),
        })
    }

    fn in_secs(secs: u64) -> Instant {
        Instant::now() + Duration::from_secs(secs)
    }

    #[test]
    fn test_fast_source_within_deadline() {
        assert_eq!(load_before(&slow(0), "T1", in_secs(5)).unwrap().len(), 1);
    }

    #[test]
    fn test_slow_source_times_out() {
        let start = Instant::now();
        let err = load_before(&slow(2_000), "T1", start + Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, TableError::Timeout(budget) if budget <= Duration::from_millis(50)));
        assert!(start.elapsed() < Duration::from_millis(1_500));
    }

    #[test]
    fn test_errors_pass_through() {
        assert_eq!(
            load_before(&slow(0), "T9", in_secs(5)).unwrap_err(),
            TableError::TableNotFound("T9".to_string())
        );
    }

    #[test]
    fn test_trait_object_source() {
        let source: Arc<dyn TableSource> = slow(10);
        assert!(load_before(&source, "T1", in_secs(5)).is_ok());
    }

    #[test]
    fn test_load_before_past_deadline() {
        let source: Arc<dyn TableSource> = slow(0);
        let past = Instant::now() - Duration::from_millis(1);
        assert!(matches!(
            load_before(&source, "T1", past),
            Err(TableError::Timeout(_))
        ));
    }
}
