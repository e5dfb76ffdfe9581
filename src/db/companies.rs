use super::*;

impl CrmDb {
    // =========================================================================
    // Companies
    // =========================================================================

    /// Insert a company row. The caller is expected to have checked for an
    /// existing match first (see `get_company_by_domain`).
    pub fn insert_company(&self, company: &DbCompany) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO companies (id, user_id, name, domain, website, created_at, updated_at)
             VALUES (?1, ?2, ?3, LOWER(?4), ?5, ?6, ?7)",
            params![
                company.id,
                company.user_id,
                company.name,
                company.domain,
                company.website,
                company.created_at,
                company.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Look up a company by ID.
    pub fn get_company(&self, id: &str) -> Result<Option<DbCompany>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, domain, website, created_at, updated_at
             FROM companies WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_company_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Look up a company by (user, domain). Domains are stored lowercase.
    pub fn get_company_by_domain(
        &self,
        user_id: &str,
        domain: &str,
    ) -> Result<Option<DbCompany>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, domain, website, created_at, updated_at
             FROM companies WHERE user_id = ?1 AND domain = LOWER(?2)",
        )?;
        let mut rows = stmt.query_map(params![user_id, domain], Self::map_company_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Look up a company by name (case-insensitive). Fallback path for
    /// companies created before a domain was known.
    pub fn get_company_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<DbCompany>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, domain, website, created_at, updated_at
             FROM companies WHERE user_id = ?1 AND LOWER(name) = LOWER(?2)
             LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![user_id, name], Self::map_company_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Backfill missing fields on a company without overwriting existing values.
    /// The sync process never clobbers data a user may have edited.
    pub fn backfill_company(
        &self,
        id: &str,
        domain: Option<&str>,
        website: Option<&str>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE companies
             SET domain = COALESCE(domain, LOWER(?1)),
                 website = COALESCE(website, ?2),
                 updated_at = ?3
             WHERE id = ?4",
            params![domain, website, Utc::now().to_rfc3339(), id],
        )?;
        Ok(())
    }

    pub(super) fn map_company_row(row: &rusqlite::Row) -> rusqlite::Result<DbCompany> {
        Ok(DbCompany {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            domain: row.get(3)?,
            website: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;

    fn sample_company(id: &str, domain: Option<&str>) -> DbCompany {
        let now = Utc::now().to_rfc3339();
        DbCompany {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: "Acme".to_string(),
            domain: domain.map(|d| d.to_string()),
            website: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_lookup_by_domain() {
        let db = test_db();
        db.insert_company(&sample_company("co-1", Some("Acme.com")))
            .unwrap();

        // Stored lowercase, matched case-insensitively
        let found = db.get_company_by_domain("u1", "ACME.COM").unwrap();
        assert_eq!(found.map(|c| c.id), Some("co-1".to_string()));

        assert!(db.get_company_by_domain("u2", "acme.com").unwrap().is_none());
    }

    #[test]
    fn test_backfill_does_not_overwrite() {
        let db = test_db();
        let mut company = sample_company("co-2", None);
        company.website = Some("https://acme.com".to_string());
        db.insert_company(&company).unwrap();

        db.backfill_company("co-2", Some("acme.com"), Some("https://other.example"))
            .unwrap();

        let found = db.get_company("co-2").unwrap().unwrap();
        assert_eq!(found.domain.as_deref(), Some("acme.com"));
        // Existing website is kept
        assert_eq!(found.website.as_deref(), Some("https://acme.com"));
    }
}
