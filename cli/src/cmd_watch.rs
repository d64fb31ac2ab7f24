//! `chainsync watch` — run sync cycles until interrupted.
//!
//! After a cycle that stopped short of the tip the next one starts
//! immediately; otherwise the loop sleeps `poll_interval_ms`. Retryable
//! failures back off per the retry policy; anything else ends the loop.
//!
//! An interrupt during fetching drops the cycle. Once the cycle is
//! committing it runs to completion before the loop exits.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use chainsync_core::SyncPhase;
use chainsync_engine::SyncEngine;
use chainsync_rpc::RetryPolicy;

pub async fn run(engine: &SyncEngine, policy: &RetryPolicy) -> Result<()> {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    run_until(engine, policy, ctrl_c).await
}

/// The watch loop, stopping when `shutdown` resolves.
async fn run_until(
    engine: &SyncEngine,
    policy: &RetryPolicy,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let interval = Duration::from_millis(engine.config().poll_interval_ms);
    tokio::pin!(shutdown);

    info!(
        address = %engine.address(),
        interval_ms = engine.config().poll_interval_ms,
        "watching"
    );

    let mut failures = 0u32;
    let mut stopping = false;
    loop {
        let cycle = engine.run_sync_cycle();
        tokio::pin!(cycle);
        let result = tokio::select! {
            biased;
            _ = &mut shutdown => {
                if engine.phase() != SyncPhase::Committing {
                    // Nothing written yet; the watermark stays put.
                    break;
                }
                info!("interrupted while committing; finishing the cycle");
                stopping = true;
                cycle.await
            }
            r = &mut cycle => r,
        };

        let delay = match result {
            Ok(outcome) => {
                failures = 0;
                crate::print_outcome(&outcome);
                if let Err(e) = engine.refresh_gas_price().await {
                    warn!(error = %e, "gas price refresh failed");
                }
                if let Err(e) = engine.refresh_balance().await {
                    warn!(error = %e, "balance refresh failed");
                }
                if outcome.has_more() {
                    Duration::ZERO
                } else {
                    interval
                }
            }
            Err(e) if e.is_retryable() => {
                failures += 1;
                match policy.next_delay(failures) {
                    Some(delay) => {
                        warn!(
                            attempt = failures,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "sync cycle failed; retrying"
                        );
                        delay
                    }
                    None => {
                        return Err(e).with_context(|| {
                            format!("giving up after {} retries", policy.config.max_retries)
                        });
                    }
                }
            }
            Err(e) => return Err(e).context("sync cycle failed"),
        };
        if stopping {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut shutdown => break,
        }
    }

    info!("interrupted; stopping");
    Ok(())
}
