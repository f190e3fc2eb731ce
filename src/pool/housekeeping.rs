//! Periodic draining of idle encoders.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::Compressors;

/// Drain both pools every `interval` on the current tokio runtime.
///
/// The first drain happens one full interval after spawning. Abort the
/// returned handle to stop.
pub fn spawn_housekeeping(compressors: Compressors, interval: Duration) -> JoinHandle<()> {
    let period = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let evicted = compressors.drain();
            if evicted > 0 {
                tracing::debug!(evicted, "housekeeping drained idle encoders");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Codec;

    #[tokio::test]
    async fn test_housekeeping_drains() {
        let compressors = Compressors::default();
        compressors.compress(Codec::Gzip, b"idle").unwrap();
        assert_eq!(compressors.pool(Codec::Gzip).idle_len(), 1);

        let handle = spawn_housekeeping(compressors.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(compressors.pool(Codec::Gzip).idle_len(), 0);
        assert_eq!(compressors.stats().gzip.drained, 1);
    }
}
