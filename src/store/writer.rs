//! Background checkpoint writer
//!
//! The tick loop never awaits the database. Checkpoints are queued here and
//! written in order, with a short retry on failure.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::ws::protocol::ProgressSnapshot;

use super::progress::{ProgressStore, ProgressUpdate, StoreError};

pub const MAX_WRITE_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// A checkpoint for one account
#[derive(Debug, Clone)]
pub struct ProgressJob {
    pub account_id: Uuid,
    pub progress: ProgressSnapshot,
}

/// Start the writer task. It stops once every sender is dropped.
pub fn spawn_progress_writer(
    store: Arc<ProgressStore>,
) -> (mpsc::UnboundedSender<ProgressJob>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressJob>();

    let handle = tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            // Failures are logged inside
            let _ = write_with_retry(&store, &job, RETRY_BACKOFF).await;
        }
        debug!("Progress writer stopped");
    });

    (tx, handle)
}

pub async fn write_with_retry(
    store: &ProgressStore,
    job: &ProgressJob,
    backoff: Duration,
) -> Result<(), StoreError> {
    let update = ProgressUpdate::from_snapshot(&job.progress);
    let mut attempt = 1;

    loop {
        match store.update(job.account_id, &update).await {
            Ok(()) => {
                debug!(account_id = %job.account_id, attempt, "Progress saved");
                return Ok(());
            }
            Err(e) if attempt < MAX_WRITE_ATTEMPTS => {
                warn!(account_id = %job.account_id, attempt, error = %e, "Progress write failed, retrying");
                tokio::time::sleep(backoff * attempt).await;
                attempt += 1;
            }
            Err(e) => {
                error!(account_id = %job.account_id, attempts = attempt, error = %e, "Giving up on progress write");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::{SkillLevels, WeaponLevels};

    fn job(account_id: Uuid, credits: u64) -> ProgressJob {
        ProgressJob {
            account_id,
            progress: ProgressSnapshot {
                total_kills: 3,
                total_score: 450,
                best_streak: 2,
                total_deaths: 1,
                ship_color: "#00bfff".to_string(),
                normal_matches: 1,
                rank_points: 0,
                rank_label: "Demir 1".to_string(),
                highest_rank_points: 0,
                highest_rank_label: "Demir 1".to_string(),
                level: 2,
                xp: 10,
                credits,
                skills: SkillLevels::default(),
                weapons: WeaponLevels::default(),
            },
        }
    }

    #[tokio::test]
    async fn test_writer_applies_jobs_in_order() {
        let store = Arc::new(ProgressStore::in_memory());
        let account = Uuid::new_v4();
        let (tx, handle) = spawn_progress_writer(store.clone());

        tx.send(job(account, 100)).unwrap();
        tx.send(job(account, 250)).unwrap();
        drop(tx);
        handle.await.unwrap();

        let stored = store.lookup(account).await.unwrap().unwrap();
        assert_eq!(stored.credits, 250);
        assert_eq!(stored.level, 2);
    }

    #[test]
    fn test_memory_write_succeeds_first_try() {
        let store = ProgressStore::in_memory();
        let account = Uuid::new_v4();
        let result = tokio_test::block_on(write_with_retry(
            &store,
            &job(account, 5),
            Duration::from_millis(1),
        ));
        assert!(result.is_ok());
    }
}
