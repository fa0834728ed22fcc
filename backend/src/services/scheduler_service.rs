//! Background task scheduler.
//!
//! Runs the periodic tasks: stale profile refresh and citation cache
//! maintenance.

use sqlx::PgPool;
use tokio::time::{interval, Duration};

use crate::services::profile_sync_service::{ProfileSyncService, SyncOptions};

/// Profiles older than this are picked up by the refresh task.
const STALE_AFTER_HOURS: i32 = 6;
/// How many stale profiles one refresh pass will sync.
const REFRESH_BATCH: i64 = 5;

/// Spawn all background scheduler tasks. Fire-and-forget.
pub fn spawn_all(db: PgPool, sync: ProfileSyncService) {
    // Stale profile refresh (every 30 minutes, small batch per pass)
    {
        let db = db.clone();
        tokio::spawn(async move {
            // Initial delay to let the server start up
            tokio::time::sleep(Duration::from_secs(30)).await;
            let mut ticker = interval(Duration::from_secs(1800));

            loop {
                ticker.tick().await;
                tracing::debug!("Running stale profile refresh");

                let stale = match stale_orcid_ids(&db).await {
                    Ok(ids) => ids,
                    Err(e) => {
                        tracing::warn!("Failed to query stale profiles: {}", e);
                        continue;
                    }
                };

                for orcid_id in stale {
                    if let Err(e) = sync.sync(&orcid_id, &SyncOptions::default()).await {
                        tracing::warn!("Failed to refresh profile {}: {}", orcid_id, e);
                    }
                }
            }
        });
    }

    // Hourly pruning: drop works no longer linked to any author.
    {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let mut ticker = interval(Duration::from_secs(3600));

            loop {
                ticker.tick().await;
                let result = sqlx::query(
                    "DELETE FROM works w
                     WHERE NOT EXISTS (SELECT 1 FROM work_authors wa WHERE wa.work_id = w.id)",
                )
                .execute(&db)
                .await;

                match result {
                    Ok(done) if done.rows_affected() > 0 => {
                        tracing::info!("Pruned {} orphaned works", done.rows_affected());
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Failed to prune orphaned works: {}", e),
                }
            }
        });
    }
}

async fn stale_orcid_ids(db: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT orcid_id FROM users
         WHERE orcid_id IS NOT NULL
           AND (last_orcid_sync IS NULL
                OR last_orcid_sync < NOW() - make_interval(hours => $1))
         ORDER BY last_orcid_sync ASC NULLS FIRST
         LIMIT $2",
    )
    .bind(STALE_AFTER_HOURS)
    .bind(REFRESH_BATCH)
    .fetch_all(db)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
