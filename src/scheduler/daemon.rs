use std::time::Duration;

use chrono::{FixedOffset, Utc, Weekday};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{info, warn};
use uuid::Uuid;

use crate::pipeline::report::RunStatus;
use crate::scheduler::{JobContext, Scheduler, Trigger, cadence::WeeklyCadence};

const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 1800;

/// Spawn the weekly batch loop. The schedule is interpreted in IST.
pub fn spawn_weekly_batch_daemon(
    scheduler: Scheduler,
    weekday: Weekday,
    hour: u32,
    minute: u32,
) -> JoinHandle<()> {
    let tz = FixedOffset::east_opt(IST_OFFSET_SECONDS).expect("valid IST offset");
    let cadence = WeeklyCadence::new(tz, weekday, hour, minute);
    BatchDaemon {
        scheduler,
        cadence,
        tz,
    }
    .spawn()
}

struct BatchDaemon {
    scheduler: Scheduler,
    cadence: WeeklyCadence,
    tz: FixedOffset,
}

impl BatchDaemon {
    fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        loop {
            let now = Utc::now();
            let next = self.cadence.next_run_from(now);
            let wait = duration_until(next, now);
            let next_local = next.with_timezone(&self.tz);
            info!(
                next_run_utc = %next.to_rfc3339(),
                next_run_ist = %next_local.to_rfc3339(),
                wait_seconds = wait.as_secs(),
                "scheduled weekly wallpaper batch"
            );
            sleep(wait).await;

            let job_id = Uuid::new_v4();
            let job = JobContext::new(job_id, Trigger::Scheduled);
            let result = self.scheduler.run_job(job).await;
            match result.status {
                RunStatus::Succeeded => {
                    info!(%job_id, "weekly wallpaper batch completed");
                }
                RunStatus::PartiallySucceeded => {
                    warn!(
                        %job_id,
                        wallpaper_path = ?result.wallpaper_path,
                        "weekly wallpaper batch generated but did not apply"
                    );
                }
                RunStatus::Failed => {
                    warn!(
                        %job_id,
                        error = ?result.error,
                        "weekly wallpaper batch failed"
                    );
                }
            }
        }
    }
}

fn duration_until(next: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) -> Duration {
    (next - now).to_std().unwrap_or(Duration::from_secs(0))
}
