use crate::application::commands::{
    AppState, TimerResponse, pause_timer_impl, tick_timer_impl, timer_status_impl,
};
use crate::infrastructure::error::InfraError;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerOutcome {
    pub ticks: u32,
    /// Every event emitted while the ticker ran, in order.
    pub events: Vec<String>,
    pub warnings: Vec<String>,
    /// Set when `shutdown` fired and the timer was paused.
    pub interrupted: bool,
    pub last: Option<TimerResponse>,
}

/// Drives `tick` every `period` until the running interval ends. When
/// `shutdown` resolves first the timer is paused, which records a partial
/// focus session the same way a manual pause does.
pub async fn run_until_interval_ends<F>(
    state: &AppState,
    period: Duration,
    shutdown: F,
) -> Result<TickerOutcome, InfraError>
where
    F: Future<Output = ()>,
{
    let mut outcome = TickerOutcome {
        ticks: 0,
        events: Vec::new(),
        warnings: Vec::new(),
        interrupted: false,
        last: None,
    };
    if !timer_status_impl(state)?.is_running {
        return Ok(outcome);
    }

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                let paused = pause_timer_impl(state).await?;
                outcome.events.extend(paused.events.iter().cloned());
                outcome.warnings.extend(paused.warnings.iter().cloned());
                outcome.interrupted = true;
                outcome.last = Some(paused);
                info!(ticks = outcome.ticks, "ticker interrupted");
                return Ok(outcome);
            }
            _ = ticker.tick() => {
                let response = tick_timer_impl(state).await?;
                outcome.ticks += 1;
                outcome.events.extend(response.events.iter().cloned());
                outcome.warnings.extend(response.warnings.iter().cloned());
                let running = response.timer.is_running;
                outcome.last = Some(response);
                if !running {
                    info!(ticks = outcome.ticks, "interval finished");
                    return Ok(outcome);
                }
            }
        }
    }
}
