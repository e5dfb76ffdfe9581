//! Entity resolution: match-or-create companies and contacts from attendees.
//!
//! Only externally-scoped participants become CRM rows; the host side of a
//! call is never a contact. Companies key on (user, domain), contacts on
//! (user, email), so resolving the same attendee list any number of times
//! creates nothing after the first pass.

use chrono::Utc;
use uuid::Uuid;

use crate::db::{CrmDb, DbCompany, DbContact, DbError};
use crate::grain::GrainParticipant;

/// Ids an attendee resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub contact_id: String,
    pub company_id: Option<String>,
}

/// Resolve one attendee to canonical ids, creating rows lazily.
///
/// Returns `None` for attendees that never become contacts: internal
/// participants and participants without a usable email. Calling twice with
/// the same attendee returns the existing ids and writes nothing.
pub fn resolve_attendee(
    db: &CrmDb,
    user_id: &str,
    participant: &GrainParticipant,
) -> Result<Option<Resolution>, DbError> {
    if !participant.is_external() {
        return Ok(None);
    }
    let email = match participant.email.as_deref().map(str::trim) {
        Some(e) if e.contains('@') => e.to_lowercase(),
        _ => return Ok(None),
    };
    let domain = match extract_domain(&email) {
        Some(d) => d,
        None => return Ok(None),
    };

    let company_id = resolve_company(db, user_id, participant, &domain)?;

    // Contact by (user, email); create referencing the resolved company,
    // or backfill a missing reference without overwriting an existing one.
    let contact_id = match db.get_contact_by_email(user_id, &email)? {
        Some(existing) => {
            if existing.company_id.is_none() {
                db.backfill_contact_company(&existing.id, &company_id)?;
            }
            existing.id
        }
        None => {
            let now = Utc::now().to_rfc3339();
            let contact = DbContact {
                id: format!("ct-{}", Uuid::new_v4()),
                user_id: user_id.to_string(),
                email: email.clone(),
                name: participant.name.clone().filter(|n| !n.trim().is_empty()),
                title: None,
                company_id: Some(company_id.clone()),
                meeting_count: 0,
                last_meeting_at: None,
                created_at: now.clone(),
                updated_at: now,
            };
            db.insert_contact(&contact)?;
            log::info!("Resolver: created contact {} ({})", contact.id, email);
            contact.id
        }
    };

    Ok(Some(Resolution {
        contact_id,
        company_id: Some(company_id),
    }))
}

/// Company by (user, domain), with a name-match fallback for companies that
/// predate domain knowledge; created when neither matches.
fn resolve_company(
    db: &CrmDb,
    user_id: &str,
    participant: &GrainParticipant,
    domain: &str,
) -> Result<String, DbError> {
    if let Some(existing) = db.get_company_by_domain(user_id, domain)? {
        return Ok(existing.id);
    }

    let name = infer_company_name(participant, domain);

    if let Some(existing) = db.get_company_by_name(user_id, &name)? {
        // Known company, newly learned domain
        db.backfill_company(&existing.id, Some(domain), None)?;
        return Ok(existing.id);
    }

    let now = Utc::now().to_rfc3339();
    let company = DbCompany {
        id: format!("co-{}", Uuid::new_v4()),
        user_id: user_id.to_string(),
        name,
        domain: Some(domain.to_string()),
        website: Some(format!("https://{}", domain)),
        created_at: now.clone(),
        updated_at: now,
    };
    db.insert_company(&company)?;
    log::info!("Resolver: created company {} ({})", company.id, domain);
    Ok(company.id)
}

/// Domain portion of an email, lowercased. `None` for mangled addresses.
pub fn extract_domain(email: &str) -> Option<String> {
    let (local, domain) = email.rsplit_once('@')?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return None;
    }
    Some(domain.to_lowercase())
}

/// Company name from the attendee's display name, else a capitalized domain
/// label ("acme.com" → "Acme").
fn infer_company_name(participant: &GrainParticipant, domain: &str) -> String {
    if let Some(name) = participant.name.as_deref() {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let label = domain.split('.').next().unwrap_or(domain);
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => domain.to_string(),
    }
}
