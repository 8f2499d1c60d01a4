use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Order, Query};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{activity_logs, prelude::*};

/// Retention cap for the audit trail: only the most recent entries are kept.
/// This is a deliberate retention limit, trimmed on every write.
const RETAINED_ENTRIES: u64 = 200;

pub struct ActivityLogRepository {
    conn: DatabaseConnection,
}

impl ActivityLogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Append one entry, then trim everything older than the newest
    /// `RETAINED_ENTRIES` rows.
    pub async fn add(&self, username: &str, action: &str, details: Option<String>) -> Result<()> {
        let active = activity_logs::ActiveModel {
            username: Set(username.to_string()),
            action: Set(action.to_string()),
            details: Set(details),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        };

        active
            .insert(&self.conn)
            .await
            .context("Failed to insert activity log entry")?;

        let newest = Query::select()
            .column(activity_logs::Column::Id)
            .from(ActivityLogs)
            .order_by(activity_logs::Column::Id, Order::Desc)
            .limit(RETAINED_ENTRIES)
            .to_owned();

        ActivityLogs::delete_many()
            .filter(Expr::col(activity_logs::Column::Id).not_in_subquery(newest))
            .exec(&self.conn)
            .await
            .context("Failed to trim activity log")?;

        Ok(())
    }

    /// Newest first, bounded by the retention cap.
    pub async fn recent(&self, limit: u64) -> Result<Vec<activity_logs::Model>> {
        let entries = ActivityLogs::find()
            .order_by_desc(activity_logs::Column::Id)
            .limit(limit.min(RETAINED_ENTRIES))
            .all(&self.conn)
            .await
            .context("Failed to read activity log")?;

        Ok(entries)
    }
}
