//! Complaint lifecycle: filing, lookup, status changes, notes and statistics.
use anyhow::{Context as _, Result as AnyResult};
use chrono::{DateTime, Datelike as _, Utc};
use metrics::counter;
use serde::Deserialize;
use tracing::info;

use crate::{
    db::Db,
    error::Error,
    metrics::{COMPLAINTS_FILED, COMPLAINT_NOTES, COMPLAINT_STATUS_UPDATES},
    models::{AdminNote, Category, Complaint, ComplaintStats, ComplaintStatus, Priority},
    policy::UnitScope,
    units::Units,
    validation::Validator,
    Result,
};

pub mod export;
mod id;

/// Raw complaint submission, as decoded from the filing form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintForm {
    pub full_name: String,
    pub contact_number: String,
    #[serde(default)]
    pub email: Option<String>,
    pub category: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, rename = "barangayId")]
    pub unit_id: Option<i64>,
}

/// A submission that passed validation.
#[derive(Debug, Clone)]
pub struct NewComplaint {
    full_name: String,
    contact_number: String,
    email: Option<String>,
    category: Category,
    description: String,
    location: String,
    priority: Priority,
    unit_id: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct ComplaintManager {
    db: Db,
    units: Units,
}

impl ComplaintManager {
    pub fn new(db: Db) -> Self {
        Self {
            units: Units::new(db.clone()),
            db,
        }
    }

    /// Check a submission. `fallback_unit` is used when the form names no unit,
    /// typically the unit of the resident filing it.
    pub async fn validate(
        &self,
        form: ComplaintForm,
        fallback_unit: Option<i64>,
    ) -> Result<NewComplaint> {
        let mut v = Validator::new();
        let full_name = form.full_name.trim();
        let contact_number = form.contact_number.trim();
        let description = form.description.trim();
        let location = form.location.trim();
        let email = form
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty());

        v.min_len("fullName", full_name, 2, "Full name must be at least 2 characters");
        v.min_digits(
            "contactNumber",
            contact_number,
            11,
            "Contact number must be at least 11 digits",
        );
        if let Some(email) = email {
            v.email("email", email, "Please enter a valid email address");
        }
        let category = Category::parse(&form.category).unwrap_or_else(|| {
            v.fail("category", "Please select a valid category");
            Category::Other
        });
        v.min_len(
            "description",
            description,
            20,
            "Description must be at least 20 characters",
        );
        v.max_len(
            "description",
            description,
            500,
            "Description cannot exceed 500 characters",
        );
        v.min_len("location", location, 5, "Location must be at least 5 characters");
        let priority = match form.priority.as_deref().filter(|p| !p.is_empty()) {
            None => Priority::default(),
            Some(p) => Priority::parse(p).unwrap_or_else(|| {
                v.fail("priority", "Priority must be Low, Medium or High");
                Priority::default()
            }),
        };
        if let Some(unit) = form.unit_id {
            if self.units.get_active(unit).await?.is_none() {
                v.fail("barangayId", "Please select a valid barangay");
            }
        }
        v.finish()?;

        Ok(NewComplaint {
            full_name: full_name.to_owned(),
            contact_number: contact_number.to_owned(),
            email: email.map(str::to_owned),
            category,
            description: description.to_owned(),
            location: location.to_owned(),
            priority,
            unit_id: form.unit_id.or(fallback_unit),
        })
    }

    /// Persist a validated complaint with status `Submitted` and a fresh public id.
    pub async fn file(
        &self,
        new: NewComplaint,
        photo_filename: Option<String>,
    ) -> AnyResult<Complaint> {
        let now = Utc::now();
        let mut tx = self.db.begin().await.context("failed to begin transaction")?;

        let complaint_id = id::next(now.year(), &mut *tx).await?;
        let complaint = sqlx::query_as::<_, Complaint>(
            r#"
            INSERT INTO complaints (complaint_id, full_name, contact_number, email, category,
                description, location, priority, status, photo_filename, unit_id,
                created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING *
            "#,
        )
        .bind(&complaint_id)
        .bind(&new.full_name)
        .bind(&new.contact_number)
        .bind(&new.email)
        .bind(new.category)
        .bind(&new.description)
        .bind(&new.location)
        .bind(new.priority)
        .bind(ComplaintStatus::Submitted)
        .bind(&photo_filename)
        .bind(new.unit_id)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert complaint")?;

        tx.commit().await.context("failed to commit transaction")?;

        counter!(COMPLAINTS_FILED).increment(1);
        info!(
            complaint = %complaint.complaint_id,
            unit = ?complaint.unit_id,
            category = complaint.category.as_str(),
            "complaint filed"
        );
        Ok(complaint)
    }

    /// Exact-match lookup by public id. The id itself is the capability.
    pub async fn get(&self, complaint_id: &str) -> AnyResult<Option<Complaint>> {
        sqlx::query_as::<_, Complaint>("SELECT * FROM complaints WHERE complaint_id = ?")
            .bind(complaint_id)
            .fetch_optional(&self.db)
            .await
            .context("failed to fetch complaint")
    }

    /// Lookup restricted to `scope`. Complaints outside it are reported as missing.
    pub async fn get_scoped(&self, complaint_id: &str, scope: UnitScope) -> Result<Complaint> {
        match self.get(complaint_id).await? {
            Some(complaint) if scope.permits(complaint.unit_id) => Ok(complaint),
            _ => Err(Error::not_found("Complaint")),
        }
    }

    /// Every complaint in `scope`, oldest first.
    pub async fn list(&self, scope: UnitScope) -> AnyResult<Vec<Complaint>> {
        match scope.unit() {
            Some(unit) => {
                sqlx::query_as::<_, Complaint>(
                    "SELECT * FROM complaints WHERE unit_id = ? ORDER BY id",
                )
                .bind(unit)
                .fetch_all(&self.db)
                .await
            }
            None => {
                sqlx::query_as::<_, Complaint>("SELECT * FROM complaints ORDER BY id")
                    .fetch_all(&self.db)
                    .await
            }
        }
        .context("failed to list complaints")
    }

    /// Set the status of a complaint. Any status may follow any other; moving
    /// backwards is allowed as a correction and logged.
    pub async fn update_status(
        &self,
        complaint_id: &str,
        status: &str,
        scope: UnitScope,
    ) -> Result<Complaint> {
        let status = ComplaintStatus::parse(status)
            .ok_or_else(|| Error::bad_request("Invalid status"))?;
        let current = self.get_scoped(complaint_id, scope).await?;

        let updated = sqlx::query_as::<_, Complaint>(
            "UPDATE complaints SET status = ?, updated_at = ? WHERE complaint_id = ? RETURNING *",
        )
        .bind(status)
        .bind(Utc::now())
        .bind(complaint_id)
        .fetch_optional(&self.db)
        .await
        .context("failed to update complaint status")?
        .ok_or_else(|| Error::not_found("Complaint"))?;

        counter!(COMPLAINT_STATUS_UPDATES).increment(1);
        if status < current.status {
            info!(
                complaint = complaint_id,
                "status moved back from {} to {}",
                current.status.as_str(),
                status.as_str()
            );
        } else {
            info!(complaint = complaint_id, status = status.as_str(), "status updated");
        }
        Ok(updated)
    }

    /// Append a note. Notes are never edited and never change the status.
    pub async fn add_note(
        &self,
        complaint_id: &str,
        note: &str,
        scope: UnitScope,
    ) -> Result<AdminNote> {
        let note = note.trim();
        let mut v = Validator::new();
        v.min_len("note", note, 1, "Note cannot be empty");
        v.finish()?;

        let complaint = self.get_scoped(complaint_id, scope).await?;
        let note = sqlx::query_as::<_, AdminNote>(
            "INSERT INTO admin_notes (complaint_id, note, created_at) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(&complaint.complaint_id)
        .bind(note)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await
        .context("failed to insert admin note")?;

        counter!(COMPLAINT_NOTES).increment(1);
        Ok(note)
    }

    /// Notes on a complaint in insertion order.
    pub async fn notes(&self, complaint_id: &str) -> AnyResult<Vec<AdminNote>> {
        sqlx::query_as::<_, AdminNote>(
            "SELECT * FROM admin_notes WHERE complaint_id = ? ORDER BY id",
        )
        .bind(complaint_id)
        .fetch_all(&self.db)
        .await
        .context("failed to fetch admin notes")
    }

    /// Aggregate counts over `scope`.
    ///
    /// Recomputed on every call with one pass over the scoped rows, so the cost
    /// grows linearly with the number of complaints.
    pub async fn stats(&self, scope: UnitScope) -> AnyResult<ComplaintStats> {
        self.stats_at(scope, Utc::now()).await
    }

    pub(crate) async fn stats_at(
        &self,
        scope: UnitScope,
        now: DateTime<Utc>,
    ) -> AnyResult<ComplaintStats> {
        let rows: Vec<(ComplaintStatus, DateTime<Utc>)> = match scope.unit() {
            Some(unit) => {
                sqlx::query_as("SELECT status, created_at FROM complaints WHERE unit_id = ?")
                    .bind(unit)
                    .fetch_all(&self.db)
                    .await
            }
            None => {
                sqlx::query_as("SELECT status, created_at FROM complaints")
                    .fetch_all(&self.db)
                    .await
            }
        }
        .context("failed to load complaint stats")?;

        let mut stats = ComplaintStats::default();
        for (status, created_at) in rows {
            stats.total += 1;
            if status.is_pending() {
                stats.pending += 1;
            } else {
                stats.resolved += 1;
            }
            if created_at.year() == now.year() && created_at.month() == now.month() {
                stats.this_month += 1;
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::http::StatusCode;
    use chrono::Duration;

    use super::*;
    use crate::{account_manager::tests::unit, db::memory_pool};

    pub(crate) fn form(description: &str) -> ComplaintForm {
        ComplaintForm {
            full_name: "Juan Dela Cruz".into(),
            contact_number: "09171234567".into(),
            email: None,
            category: "garbage".into(),
            description: description.into(),
            location: "Purok 1, Brgy. San Antonio".into(),
            priority: Some("Medium".into()),
            unit_id: None,
        }
    }

    const DESCRIPTION: &str = "Garbage has not been collected for two weeks in our street.";

    async fn file(complaints: &ComplaintManager, form: ComplaintForm) -> Complaint {
        let new = complaints.validate(form, None).await.unwrap();
        complaints.file(new, None).await.unwrap()
    }

    #[tokio::test]
    async fn filing_assigns_public_id() {
        let complaints = ComplaintManager::new(memory_pool().await);
        let first = file(&complaints, form(DESCRIPTION)).await;
        let second = file(&complaints, form(DESCRIPTION)).await;

        assert_eq!(first.status, ComplaintStatus::Submitted);
        assert_eq!(first.priority, Priority::Medium);
        assert_ne!(first.complaint_id, second.complaint_id);

        let year = Utc::now().year();
        for c in [&first, &second] {
            let rest = c
                .complaint_id
                .strip_prefix(&format!("BC-{year}-"))
                .expect("BC-<year>- prefix");
            assert!(!rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn description_bounds() {
        let complaints = ComplaintManager::new(memory_pool().await);
        for (len, ok) in [(19, false), (20, true), (500, true), (501, false)] {
            let result = complaints.validate(form(&"a".repeat(len)), None).await;
            assert_eq!(result.is_ok(), ok, "description of {len} characters");
            if let Err(e) = result {
                assert_eq!(e.fields()[0].field, "description");
            }
        }
    }

    #[tokio::test]
    async fn priority_defaults_to_low() {
        let complaints = ComplaintManager::new(memory_pool().await);
        let mut input = form(DESCRIPTION);
        input.priority = None;
        assert_eq!(file(&complaints, input).await.priority, Priority::Low);

        let mut input = form(DESCRIPTION);
        input.priority = Some("Urgent".into());
        let err = complaints.validate(input, None).await.unwrap_err();
        assert_eq!(err.fields()[0].field, "priority");
    }

    #[tokio::test]
    async fn invalid_fields_are_all_reported() {
        let complaints = ComplaintManager::new(memory_pool().await);
        let err = complaints
            .validate(
                ComplaintForm {
                    full_name: "J".into(),
                    contact_number: "0917".into(),
                    email: Some("not-an-email".into()),
                    category: "flood".into(),
                    description: "short".into(),
                    location: "here".into(),
                    priority: None,
                    unit_id: Some(42),
                },
                None,
            )
            .await
            .unwrap_err();
        let fields: Vec<_> = err.fields().iter().map(|f| f.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "fullName",
                "contactNumber",
                "email",
                "category",
                "description",
                "location",
                "barangayId"
            ]
        );
    }

    #[tokio::test]
    async fn contact_number_needs_digits() {
        let complaints = ComplaintManager::new(memory_pool().await);
        let mut input = form(DESCRIPTION);
        input.contact_number = "abcdefghijk".into();
        let err = complaints.validate(input, None).await.unwrap_err();
        assert_eq!(err.fields()[0].field, "contactNumber");

        let mut input = form(DESCRIPTION);
        input.contact_number = "+63 917 123 4567".into();
        assert!(complaints.validate(input, None).await.is_ok());
    }

    #[tokio::test]
    async fn empty_email_is_allowed() {
        let complaints = ComplaintManager::new(memory_pool().await);
        let mut input = form(DESCRIPTION);
        input.email = Some(String::new());
        assert_eq!(file(&complaints, input).await.email, None);
    }

    #[tokio::test]
    async fn unit_comes_from_form_then_fallback() {
        let db = memory_pool().await;
        let a = unit(&db, "San Antonio").await;
        let b = unit(&db, "Poblacion").await;
        let complaints = ComplaintManager::new(db);

        let mut input = form(DESCRIPTION);
        input.unit_id = Some(a.id);
        let new = complaints.validate(input, Some(b.id)).await.unwrap();
        assert_eq!(complaints.file(new, None).await.unwrap().unit_id, Some(a.id));

        let new = complaints.validate(form(DESCRIPTION), Some(b.id)).await.unwrap();
        assert_eq!(complaints.file(new, None).await.unwrap().unit_id, Some(b.id));
    }

    #[tokio::test]
    async fn resolving_moves_stats() {
        let complaints = ComplaintManager::new(memory_pool().await);
        let c = file(&complaints, form(DESCRIPTION)).await;
        file(&complaints, form(DESCRIPTION)).await;

        let before = complaints.stats(UnitScope::All).await.unwrap();
        assert_eq!(before.total, 2);
        assert_eq!(before.pending, 2);
        assert_eq!(before.this_month, 2);

        complaints
            .update_status(&c.complaint_id, "Resolved", UnitScope::All)
            .await
            .unwrap();
        let after = complaints.stats(UnitScope::All).await.unwrap();
        assert_eq!(after.resolved, before.resolved + 1);
        assert_eq!(after.pending, before.pending - 1);
        assert_eq!(after.total, before.total);
    }

    #[tokio::test]
    async fn this_month_follows_the_clock() {
        let complaints = ComplaintManager::new(memory_pool().await);
        file(&complaints, form(DESCRIPTION)).await;

        let next_year = Utc::now() + Duration::days(366);
        let stats = complaints.stats_at(UnitScope::All, next_year).await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.this_month, 0);
    }

    #[tokio::test]
    async fn status_updates() {
        let complaints = ComplaintManager::new(memory_pool().await);
        let c = file(&complaints, form(DESCRIPTION)).await;

        let err = complaints
            .update_status(&c.complaint_id, "Closed", UnitScope::All)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = complaints
            .update_status("BC-1999-000001", "Resolved", UnitScope::All)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let resolved = complaints
            .update_status(&c.complaint_id, "Resolved", UnitScope::All)
            .await
            .unwrap();
        assert!(resolved.updated_at >= c.updated_at);

        // Backwards is a permitted correction.
        let reopened = complaints
            .update_status(&c.complaint_id, "Submitted", UnitScope::All)
            .await
            .unwrap();
        assert_eq!(reopened.status, ComplaintStatus::Submitted);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let complaints = ComplaintManager::new(memory_pool().await);
        let c = file(&complaints, form(DESCRIPTION)).await;

        let (a, b) = tokio::join!(
            complaints.update_status(&c.complaint_id, "Under Review", UnitScope::All),
            complaints.update_status(&c.complaint_id, "Resolved", UnitScope::All),
        );
        a.unwrap();
        b.unwrap();

        let stored = complaints.get(&c.complaint_id).await.unwrap().unwrap();
        assert!(matches!(
            stored.status,
            ComplaintStatus::UnderReview | ComplaintStatus::Resolved
        ));
    }

    #[tokio::test]
    async fn notes_accumulate_in_order() {
        let complaints = ComplaintManager::new(memory_pool().await);
        let c = file(&complaints, form(DESCRIPTION)).await;

        complaints
            .add_note(&c.complaint_id, "Forwarded to sanitation.", UnitScope::All)
            .await
            .unwrap();
        complaints
            .add_note(&c.complaint_id, "Truck scheduled Monday.", UnitScope::All)
            .await
            .unwrap();

        let notes = complaints.notes(&c.complaint_id).await.unwrap();
        let texts: Vec<_> = notes.iter().map(|n| n.note.as_str()).collect();
        assert_eq!(texts, ["Forwarded to sanitation.", "Truck scheduled Monday."]);

        let err = complaints
            .add_note(&c.complaint_id, "   ", UnitScope::All)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let unchanged = complaints.get(&c.complaint_id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, ComplaintStatus::Submitted);
    }

    #[tokio::test]
    async fn unit_scope_hides_other_units() {
        let db = memory_pool().await;
        let a = unit(&db, "San Antonio").await;
        let b = unit(&db, "Poblacion").await;
        let complaints = ComplaintManager::new(db);

        let mut input = form(DESCRIPTION);
        input.unit_id = Some(a.id);
        let in_a = file(&complaints, input).await;
        let unassigned = file(&complaints, form(DESCRIPTION)).await;

        let scope_b = UnitScope::Unit(b.id);
        assert!(complaints.list(scope_b).await.unwrap().is_empty());
        assert_eq!(complaints.list(UnitScope::Unit(a.id)).await.unwrap().len(), 1);
        assert_eq!(complaints.list(UnitScope::All).await.unwrap().len(), 2);

        for id in [&in_a.complaint_id, &unassigned.complaint_id] {
            let err = complaints
                .update_status(id, "Resolved", scope_b)
                .await
                .unwrap_err();
            assert_eq!(err.status(), StatusCode::NOT_FOUND);
            let err = complaints.add_note(id, "nope", scope_b).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::NOT_FOUND);
        }
        assert_eq!(complaints.stats(scope_b).await.unwrap().total, 0);
        assert_eq!(complaints.stats(UnitScope::Unit(a.id)).await.unwrap().total, 1);
    }
}
