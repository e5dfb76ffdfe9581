use super::*;

impl CrmDb {
    // =========================================================================
    // Meetings
    // =========================================================================

    /// Insert or update the canonical meeting record for a provider recording.
    ///
    /// Keyed on (user_id, recording_id), so a recording is never duplicated no
    /// matter how many sync passes touch it. `duration_seconds` is recomputed
    /// from the timestamps on every write. `company_id` / `primary_contact_id`
    /// merge via COALESCE: an existing non-null value survives unless this
    /// write supplies a new non-null one. Always stamps `last_synced_at` and
    /// `sync_status = 'synced'`.
    ///
    /// Returns the meeting row id (existing on update, fresh on insert).
    pub fn upsert_meeting(
        &self,
        user_id: &str,
        recording_id: &str,
        fields: &MeetingFields,
    ) -> Result<String, DbError> {
        let now = Utc::now().to_rfc3339();
        let duration = derive_duration_seconds(&fields.started_at, fields.ended_at.as_deref());

        self.conn.execute(
            "INSERT INTO meetings (
                id, user_id, recording_id, title, started_at, ended_at,
                duration_seconds, share_url, embed_url, thumbnail_url, summary,
                company_id, primary_contact_id, sync_status, last_synced_at,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                       'synced', ?14, ?15, ?16)
             ON CONFLICT(user_id, recording_id) DO UPDATE SET
                title = excluded.title,
                started_at = excluded.started_at,
                ended_at = excluded.ended_at,
                duration_seconds = excluded.duration_seconds,
                share_url = COALESCE(excluded.share_url, meetings.share_url),
                embed_url = COALESCE(excluded.embed_url, meetings.embed_url),
                thumbnail_url = COALESCE(excluded.thumbnail_url, meetings.thumbnail_url),
                summary = COALESCE(excluded.summary, meetings.summary),
                company_id = COALESCE(excluded.company_id, meetings.company_id),
                primary_contact_id = COALESCE(excluded.primary_contact_id, meetings.primary_contact_id),
                sync_status = 'synced',
                last_synced_at = excluded.last_synced_at,
                updated_at = excluded.updated_at",
            params![
                format!("mt-{}", uuid::Uuid::new_v4()),
                user_id,
                recording_id,
                fields.title,
                fields.started_at,
                fields.ended_at,
                duration,
                fields.share_url,
                fields.embed_url,
                fields.thumbnail_url,
                fields.summary,
                fields.company_id,
                fields.primary_contact_id,
                now,
                now,
                now,
            ],
        )?;

        let id: String = self.conn.query_row(
            "SELECT id FROM meetings WHERE user_id = ?1 AND recording_id = ?2",
            params![user_id, recording_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Look up a meeting by its provider recording id.
    pub fn get_meeting_by_recording_id(
        &self,
        user_id: &str,
        recording_id: &str,
    ) -> Result<Option<DbMeeting>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, recording_id, title, started_at, ended_at,
                    duration_seconds, share_url, embed_url, thumbnail_url, summary,
                    company_id, primary_contact_id, sync_status, last_synced_at,
                    created_at, updated_at
             FROM meetings WHERE user_id = ?1 AND recording_id = ?2",
        )?;
        let mut rows = stmt.query_map(params![user_id, recording_id], Self::map_meeting_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Link a contact to a meeting (INSERT OR IGNORE).
    /// Returns true if the junction row was newly created; callers use this to
    /// bump activity signals at most once per (meeting, contact).
    pub fn link_meeting_contact(
        &self,
        meeting_id: &str,
        contact_id: &str,
    ) -> Result<bool, DbError> {
        let affected = self.conn.execute(
            "INSERT OR IGNORE INTO meeting_contacts (meeting_id, contact_id, is_primary, created_at)
             VALUES (?1, ?2, 0, ?3)",
            params![meeting_id, contact_id, Utc::now().to_rfc3339()],
        )?;
        Ok(affected > 0)
    }

    /// Mark a single contact as the meeting's primary, clearing any previous
    /// flag so at most one junction row carries `is_primary = 1`.
    pub fn set_primary_contact(&self, meeting_id: &str, contact_id: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE meeting_contacts SET is_primary = 0 WHERE meeting_id = ?1",
            params![meeting_id],
        )?;
        self.conn.execute(
            "UPDATE meeting_contacts SET is_primary = 1
             WHERE meeting_id = ?1 AND contact_id = ?2",
            params![meeting_id, contact_id],
        )?;
        Ok(())
    }

    /// Contact ids linked to a meeting, primary first.
    pub fn get_meeting_contact_ids(&self, meeting_id: &str) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT contact_id FROM meeting_contacts
             WHERE meeting_id = ?1 ORDER BY is_primary DESC, contact_id",
        )?;
        let rows = stmt.query_map(params![meeting_id], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub(super) fn map_meeting_row(row: &rusqlite::Row) -> rusqlite::Result<DbMeeting> {
        Ok(DbMeeting {
            id: row.get(0)?,
            user_id: row.get(1)?,
            recording_id: row.get(2)?,
            title: row.get(3)?,
            started_at: row.get(4)?,
            ended_at: row.get(5)?,
            duration_seconds: row.get(6)?,
            share_url: row.get(7)?,
            embed_url: row.get(8)?,
            thumbnail_url: row.get(9)?,
            summary: row.get(10)?,
            company_id: row.get(11)?,
            primary_contact_id: row.get(12)?,
            sync_status: row.get(13)?,
            last_synced_at: row.get(14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }
}

/// Seconds between two RFC 3339 timestamps, when both parse.
fn derive_duration_seconds(started_at: &str, ended_at: Option<&str>) -> Option<i64> {
    let start = chrono::DateTime::parse_from_rfc3339(started_at).ok()?;
    let end = chrono::DateTime::parse_from_rfc3339(ended_at?).ok()?;
    let secs = (end - start).num_seconds();
    (secs >= 0).then_some(secs)
}
