//! Cluster-wide serialization via row-level locks.
//!
//! Operations that scan many rows (misfire recovery, cluster recovery)
//! serialize across the cluster by selecting a well-known row from the
//! LOCKS table `FOR UPDATE`. The lock lives for the duration of the
//! enclosing transaction and is released by its commit or rollback.

use sqlx::PgConnection;

use crate::error::StoreResult;
use crate::store::JobStore;

/// Lock row guarding trigger acquisition and misfire scans.
pub const LOCK_TRIGGER_ACCESS: &str = "TRIGGER_ACCESS";
/// Lock row guarding scheduler-state reads and cluster recovery.
pub const LOCK_STATE_ACCESS: &str = "STATE_ACCESS";

impl JobStore {
    /// Block until the named lock row is held by this transaction.
    pub async fn obtain_lock(&self, conn: &mut PgConnection, name: &str) -> StoreResult<()> {
        sqlx::query(&self.sql.select_lock_row)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        tracing::trace!(lock = name, "obtained cluster lock row");
        Ok(())
    }
}
