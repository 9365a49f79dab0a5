//! Master liveness poller
//!
//! Parameter servers serve forever, so a parameter server host infers the end
//! of the job from the master: it keeps probing the master's control port and
//! returns once nothing listens there anymore.
//!
//! A refused, unroutable or timed out connection is taken as "master exited".
//! A network partition looks the same and ends the wait early. Without
//! `max_probes`, a master that keeps accepting connections keeps the loop
//! alive indefinitely.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{MasterProbe, Reachability};

/// Errors from the liveness poller
#[derive(Debug, Error)]
pub enum LivenessError {
    /// The probe bound was exhausted while the master was still up
    #[error("master {master} still reachable after {probes} probes, giving up")]
    GaveUp { master: String, probes: u32 },
}

/// Summary of a completed wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSummary {
    /// Probes sent, including the final failing one
    pub probes: u32,

    /// Reason the last probe failed
    pub reason: String,
}

impl PollSummary {
    /// Number of sleeps between probes
    pub fn retries(&self) -> u32 {
        self.probes.saturating_sub(1)
    }
}

/// Polls the master until it stops accepting connections
pub struct LivenessPoller {
    probe: Arc<dyn MasterProbe>,
    interval: Duration,
    max_probes: Option<u32>,
}

impl LivenessPoller {
    /// Creates a new poller
    ///
    /// # Arguments
    /// * `probe` - Reachability check against the master
    /// * `interval` - Sleep between two probes while the master is up
    /// * `max_probes` - Upper bound on probes; `None` waits forever
    pub fn new(probe: Arc<dyn MasterProbe>, interval: Duration, max_probes: Option<u32>) -> Self {
        Self {
            probe,
            interval,
            max_probes,
        }
    }

    /// Blocks until `master` is unreachable
    pub async fn wait_for_master_exit(&self, master: &str) -> Result<PollSummary, LivenessError> {
        debug!(
            "Waiting for master {} to exit (interval: {:?}, max probes: {:?})",
            master, self.interval, self.max_probes
        );

        let mut probes = 0u32;

        loop {
            probes += 1;

            match self.probe.probe(master).await {
                Reachability::Unreachable(reason) => {
                    info!("master {} is down, stopping parameter server", master);
                    debug!("Last probe failed: {}", reason);
                    return Ok(PollSummary { probes, reason });
                }
                Reachability::Reachable => {
                    info!("master {} is still up, waiting for it to exit", master);
                }
            }

            if self.max_probes.is_some_and(|max| probes >= max) {
                warn!("Master {} still up after {} probes", master, probes);
                return Err(LivenessError::GaveUp {
                    master: master.to_string(),
                    probes,
                });
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    /// Master that answers for a fixed number of probes, then goes away
    struct ScriptedMaster {
        up_for: u32,
        probes: AtomicU32,
        hosts: Mutex<Vec<String>>,
    }

    impl ScriptedMaster {
        fn new(up_for: u32) -> Arc<Self> {
            Arc::new(Self {
                up_for,
                probes: AtomicU32::new(0),
                hosts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MasterProbe for ScriptedMaster {
        async fn probe(&self, host: &str) -> Reachability {
            self.hosts.lock().unwrap().push(host.to_string());
            let seen = self.probes.fetch_add(1, Ordering::SeqCst);
            if seen < self.up_for {
                Reachability::Reachable
            } else {
                Reachability::Unreachable("connection refused".to_string())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_after_master_goes_down() {
        let master = ScriptedMaster::new(3);
        let poller = LivenessPoller::new(master.clone(), Duration::from_secs(10), None);

        let started = Instant::now();
        let summary = poller.wait_for_master_exit("algo-1").await.unwrap();

        assert_eq!(summary.probes, 4);
        assert_eq!(summary.retries(), 3);
        assert_eq!(summary.reason, "connection refused");
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert!(master.hosts.lock().unwrap().iter().all(|h| h == "algo-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_master_returns_on_first_probe() {
        let master = ScriptedMaster::new(0);
        let poller = LivenessPoller::new(master.clone(), Duration::from_secs(10), None);

        let started = Instant::now();
        let summary = poller.wait_for_master_exit("algo-1").await.unwrap();

        assert_eq!(summary.probes, 1);
        assert_eq!(summary.retries(), 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_retries_of_empty_summary() {
        let summary = PollSummary {
            probes: 0,
            reason: String::new(),
        };
        assert_eq!(summary.retries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_when_bounded() {
        let master = ScriptedMaster::new(u32::MAX);
        let poller = LivenessPoller::new(master.clone(), Duration::from_secs(10), Some(5));

        let err = poller.wait_for_master_exit("algo-1").await.unwrap_err();
        let LivenessError::GaveUp { probes, .. } = err;
        assert_eq!(probes, 5);
        assert_eq!(master.probes.load(Ordering::SeqCst), 5);
    }
}
