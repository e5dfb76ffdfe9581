use super::*;

impl CrmDb {
    // =========================================================================
    // Contacts
    // =========================================================================

    /// Insert a contact row. Emails are stored lowercase; uniqueness is
    /// enforced per (user_id, email).
    pub fn insert_contact(&self, contact: &DbContact) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO contacts (
                id, user_id, email, name, title, company_id,
                meeting_count, last_meeting_at, created_at, updated_at
             ) VALUES (?1, ?2, LOWER(?3), ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                contact.id,
                contact.user_id,
                contact.email,
                contact.name,
                contact.title,
                contact.company_id,
                contact.meeting_count,
                contact.last_meeting_at,
                contact.created_at,
                contact.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Look up a contact by ID.
    pub fn get_contact(&self, id: &str) -> Result<Option<DbContact>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, email, name, title, company_id,
                    meeting_count, last_meeting_at, created_at, updated_at
             FROM contacts WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_contact_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Look up a contact by email (case-insensitive).
    pub fn get_contact_by_email(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<Option<DbContact>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, email, name, title, company_id,
                    meeting_count, last_meeting_at, created_at, updated_at
             FROM contacts WHERE user_id = ?1 AND email = LOWER(?2)",
        )?;
        let mut rows = stmt.query_map(params![user_id, email], Self::map_contact_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Backfill a contact's company reference, only when none is set.
    /// Returns true if the row was updated.
    pub fn backfill_contact_company(
        &self,
        contact_id: &str,
        company_id: &str,
    ) -> Result<bool, DbError> {
        let affected = self.conn.execute(
            "UPDATE contacts
             SET company_id = ?1, updated_at = ?2
             WHERE id = ?3 AND company_id IS NULL",
            params![company_id, Utc::now().to_rfc3339(), contact_id],
        )?;
        Ok(affected > 0)
    }

    /// Bump a contact's activity signals after linking it to a meeting.
    ///
    /// `meeting_count` increments; `last_meeting_at` only moves forward so that
    /// re-syncing an old recording never regresses recency.
    pub fn bump_contact_meeting_signal(
        &self,
        contact_id: &str,
        meeting_started_at: &str,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE contacts
             SET meeting_count = meeting_count + 1,
                 last_meeting_at = CASE
                     WHEN ?1 > COALESCE(last_meeting_at, '') THEN ?1
                     ELSE last_meeting_at
                 END,
                 updated_at = ?2
             WHERE id = ?3",
            params![meeting_started_at, Utc::now().to_rfc3339(), contact_id],
        )?;
        Ok(())
    }

    pub(super) fn map_contact_row(row: &rusqlite::Row) -> rusqlite::Result<DbContact> {
        Ok(DbContact {
            id: row.get(0)?,
            user_id: row.get(1)?,
            email: row.get(2)?,
            name: row.get(3)?,
            title: row.get(4)?,
            company_id: row.get(5)?,
            meeting_count: row.get(6)?,
            last_meeting_at: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}
