//! The Scheduler: a cron-driven background task, independent of the job
//! flow, that prunes object-store artifacts past their TTL (`spec.md`
//! §4.8). Registered at `"* * * * *"`, matching the bundled pruner's
//! cadence.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use cron::Schedule;
use smi_protocol::JobType;
use tracing::{error, info, warn};

use crate::state::AppState;

// The `cron` crate's expressions are seconds-first; `"0 * * * * *"` is the
// 6-field equivalent of the original's 5-field `"* * * * *"` (fire once at
// the top of every minute).
const PRUNE_SCHEDULE: &str = "0 * * * * *";

/// Runs the pruner loop for the lifetime of the process: wakes up on each
/// cron tick and sweeps every job type's bucket for objects older than
/// `storage_ttl_days`. A malformed schedule expression is a startup bug,
/// not a runtime condition, so it panics rather than silently never
/// pruning.
pub fn spawn_scheduler(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let schedule = Schedule::from_str(PRUNE_SCHEDULE).expect("PRUNE_SCHEDULE is a valid cron expression");
    tokio::spawn(async move {
        loop {
            let Some(next) = schedule.upcoming(Utc).next() else {
                error!("cron schedule produced no further occurrences, stopping scheduler");
                return;
            };
            let now = Utc::now();
            if let Ok(delay) = (next - now).to_std() {
                tokio::time::sleep(delay).await;
            }
            prune_tick(&state).await;
        }
    })
}

/// One sweep across every job type's bucket. Failures in one bucket don't
/// stop the others; each is logged and the sweep moves on.
async fn prune_tick(state: &Arc<AppState>) {
    let ttl_days = state.config.storage_ttl_days;
    for job_type in JobType::ALL {
        if let Err(e) = prune_bucket(state, job_type, ttl_days).await {
            warn!(bucket = job_type.bucket_name(), error = %e, "prune sweep failed for bucket");
        }
    }
}

async fn prune_bucket(state: &Arc<AppState>, job_type: JobType, ttl_days: u32) -> Result<(), smi_object_store::ObjectStoreError> {
    let bucket = job_type.bucket_name();
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(ttl_days));
    let objects = state.object_store.list(bucket).await?;
    let mut pruned = 0usize;
    for object in objects {
        if object.last_modified < cutoff {
            state.object_store.delete(bucket, &object.key).await?;
            pruned += 1;
        }
    }
    if pruned > 0 {
        info!(bucket, pruned, "pruned expired objects");
    }
    Ok(())
}
