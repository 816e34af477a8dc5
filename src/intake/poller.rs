// file: src/intake/poller.rs
// description: periodic intake loop with graceful shutdown
// reference: https://docs.rs/tokio/latest/tokio/time/fn.interval.html

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

pub struct MailPoller {
    interval: Duration,
}

impl MailPoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs `on_tick` immediately and then once per interval until Ctrl-C.
    pub async fn run_until_ctrl_c<F, Fut>(&self, on_tick: F) -> Result<u64>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        };
        self.run(on_tick, shutdown).await
    }

    /// Returns the number of completed ticks. A failing tick is logged and
    /// the loop carries on.
    pub async fn run<F, Fut, S>(&self, mut on_tick: F, shutdown: S) -> Result<u64>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
        S: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Polling every {}s", self.interval.as_secs());
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping poller after {} tick(s)", ticks);
                    return Ok(ticks);
                }
                _ = ticker.tick() => {
                    if let Err(e) = on_tick().await {
                        error!("Poll cycle failed: {}", e);
                    }
                    ticks += 1;
                }
            }
        }
    }
}
