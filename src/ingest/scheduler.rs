// src/ingest/scheduler.rs
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::radar::Radar;
use crate::results::ResultSet;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval_secs: u64,
}

impl From<crate::config::RefreshCfg> for RefreshSchedulerCfg {
    fn from(c: crate::config::RefreshCfg) -> Self {
        Self {
            interval_secs: c.interval_secs,
        }
    }
}

/// Spawn the periodic refresher. The first tick fires immediately.
///
/// Each tick runs its cycle on its own task, so a slow cycle never delays the
/// next tick; the board drops whichever result turns out stale.
/// `on_publish` sees every accepted snapshot.
pub fn spawn_refresh_scheduler<F>(
    radar: Arc<Radar>,
    cfg: RefreshSchedulerCfg,
    on_publish: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<ResultSet>) + Send + Sync + 'static,
{
    let on_publish = Arc::new(on_publish);
    tokio::spawn(async move {
        let period = Duration::from_secs(cfg.interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            counter!("ingest_runs_total").increment(1);

            let radar = radar.clone();
            let on_publish = on_publish.clone();
            tokio::spawn(async move {
                if let Some(set) = radar.refresh().await {
                    on_publish(set);
                }
            });
        }
    })
}
