use super::*;

impl CrmDb {
    // =========================================================================
    // Action items
    // =========================================================================

    /// Insert an action item (INSERT OR IGNORE keyed by (meeting_id, source_key)).
    /// Returns true if a row was created; repeated sync passes over the same
    /// recording insert nothing the second time.
    pub fn insert_action_item(&self, item: &DbActionItem) -> Result<bool, DbError> {
        let affected = self.conn.execute(
            "INSERT OR IGNORE INTO action_items (
                id, meeting_id, text, ai_generated, source_key, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.id,
                item.meeting_id,
                item.text,
                item.ai_generated as i32,
                item.source_key,
                item.created_at,
            ],
        )?;
        Ok(affected > 0)
    }

    /// All action items for a meeting, provider-native first.
    pub fn get_action_items(&self, meeting_id: &str) -> Result<Vec<DbActionItem>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, meeting_id, text, ai_generated, source_key, created_at
             FROM action_items WHERE meeting_id = ?1
             ORDER BY ai_generated, created_at",
        )?;
        let rows = stmt.query_map(params![meeting_id], |row| {
            Ok(DbActionItem {
                id: row.get(0)?,
                meeting_id: row.get(1)?,
                text: row.get(2)?,
                ai_generated: row.get::<_, i32>(3)? != 0,
                source_key: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn sample_item(meeting_id: &str, source_key: &str, text: &str) -> DbActionItem {
        DbActionItem {
            id: format!("ai-{}", uuid::Uuid::new_v4()),
            meeting_id: meeting_id.to_string(),
            text: text.to_string(),
            ai_generated: false,
            source_key: source_key.to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_source_key_dedupes_across_passes() {
        let db = test_db();
        assert!(db
            .insert_action_item(&sample_item("mt-1", "it-1", "Send proposal"))
            .unwrap());
        // Same provider item on a second pass: ignored even with a fresh row id
        assert!(!db
            .insert_action_item(&sample_item("mt-1", "it-1", "Send proposal"))
            .unwrap());
        // Same key on a different meeting is a distinct item
        assert!(db
            .insert_action_item(&sample_item("mt-2", "it-1", "Send proposal"))
            .unwrap());

        assert_eq!(db.get_action_items("mt-1").unwrap().len(), 1);
    }
}
