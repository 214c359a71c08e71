use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::state::AppState;
use crate::services::attempts;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweeper = tokio::spawn(expiry_sweep_loop(state.clone(), shutdown_rx));

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    if let Err(err) = sweeper.await {
        tracing::error!(error = %err, "Background task join failed");
    }

    Ok(())
}

async fn expiry_sweep_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.settings().attempts().expiry_sweep_interval_seconds);
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => run_sweep(&state).await,
        }
    }
}

/// Drains overdue attempts batch by batch until a pass comes back short.
async fn run_sweep(state: &AppState) {
    let batch = state.settings().attempts().expiry_sweep_batch_size as usize;
    loop {
        match attempts::sweep_expired(state).await {
            Ok(0) => break,
            Ok(closed) => {
                tracing::info!(closed, "Expired overdue quiz attempts");
                if closed < batch {
                    break;
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "sweep_expired failed");
                break;
            }
        }
    }
}
