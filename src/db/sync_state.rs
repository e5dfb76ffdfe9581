use super::*;

impl CrmDb {
    // =========================================================================
    // Sync state: one row per user, overwritten each run (not versioned).
    // Concurrent runs for the same user are last-writer-wins by design.
    // =========================================================================

    /// Read the sync state for a user.
    pub fn get_sync_state(&self, user_id: &str) -> Result<Option<DbSyncState>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, status, meetings_synced, total_meetings_found,
                    last_error, last_synced_at, started_at, updated_at
             FROM sync_state WHERE user_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![user_id], |row| {
            Ok(DbSyncState {
                user_id: row.get(0)?,
                status: row.get(1)?,
                meetings_synced: row.get(2)?,
                total_meetings_found: row.get(3)?,
                last_error: row.get(4)?,
                last_synced_at: row.get(5)?,
                started_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Mark a run as started: status becomes `syncing`, counters reset.
    /// Creates the row on a user's first connection.
    pub fn begin_sync_run(&self, user_id: &str) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sync_state (user_id, status, meetings_synced, total_meetings_found,
                                     last_error, started_at, updated_at)
             VALUES (?1, 'syncing', 0, 0, NULL, ?2, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                status = 'syncing',
                meetings_synced = 0,
                total_meetings_found = 0,
                last_error = NULL,
                started_at = excluded.started_at,
                updated_at = excluded.updated_at",
            params![user_id, now],
        )?;
        Ok(())
    }

    /// Record the outcome of a run. `errors_json` is the serialized error list,
    /// already truncated to the first 10 entries by the orchestrator.
    pub fn finish_sync_run(
        &self,
        user_id: &str,
        status: &str,
        meetings_synced: i64,
        total_meetings_found: i64,
        errors_json: Option<&str>,
    ) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sync_state SET
                status = ?1,
                meetings_synced = ?2,
                total_meetings_found = ?3,
                last_error = ?4,
                last_synced_at = CASE WHEN ?1 = 'idle' THEN ?5 ELSE last_synced_at END,
                updated_at = ?5
             WHERE user_id = ?6",
            params![status, meetings_synced, total_meetings_found, errors_json, now, user_id],
        )?;
        Ok(())
    }
}
