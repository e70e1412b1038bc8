//! Complaint filing, public tracking and admin triage.
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};

use super::{Json, Path, Query};
use crate::{
    auth::{AuthenticatedAdmin, MaybeResident},
    complaints::ComplaintManager,
    error::Error,
    models::{AdminNote, Complaint, ComplaintStats},
    policy::UnitScope,
    uploads::Uploads,
    AppState, Result,
};

/// Optional `?barangayId=` filter on admin listings.
#[derive(Debug, Default, Deserialize)]
pub(super) struct UnitFilter {
    #[serde(rename = "barangayId")]
    pub unit_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ComplaintDetail {
    #[serde(flatten)]
    complaint: Complaint,
    notes: Vec<AdminNote>,
}

#[derive(Debug, Deserialize)]
struct StatusInput {
    status: String,
}

#[derive(Debug, Deserialize)]
struct NoteInput {
    note: String,
}

async fn stats(State(complaints): State<ComplaintManager>) -> Result<Json<ComplaintStats>> {
    Ok(Json(complaints.stats(UnitScope::All).await?))
}

/// File a complaint. Open to anyone; a signed-in resident's unit is used when
/// the form names none.
async fn file_complaint(
    MaybeResident(resident): MaybeResident,
    State(complaints): State<ComplaintManager>,
    State(uploads): State<Uploads>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Complaint>)> {
    let upload = uploads.read_form(multipart?).await?;
    let new = complaints
        .validate(upload.form, resident.map(|r| r.unit_id))
        .await?;

    let photo_filename = match &upload.photo {
        Some(photo) => Some(uploads.store(photo).await?),
        None => None,
    };
    match complaints.file(new, photo_filename.clone()).await {
        Ok(complaint) => Ok((StatusCode::CREATED, Json(complaint))),
        Err(e) => {
            if let Some(name) = &photo_filename {
                uploads.discard(name).await;
            }
            Err(e.into())
        }
    }
}

/// Public tracking by complaint id.
async fn get_complaint(
    State(complaints): State<ComplaintManager>,
    Path(complaint_id): Path<String>,
) -> Result<Json<ComplaintDetail>> {
    let complaint = complaints
        .get(&complaint_id)
        .await?
        .ok_or_else(|| Error::not_found("Complaint"))?;
    let notes = complaints.notes(&complaint.complaint_id).await?;
    Ok(Json(ComplaintDetail { complaint, notes }))
}

async fn list_complaints(
    admin: AuthenticatedAdmin,
    State(complaints): State<ComplaintManager>,
    Query(filter): Query<UnitFilter>,
) -> Result<Json<Vec<Complaint>>> {
    let scope = admin.scope_for(filter.unit_id)?;
    Ok(Json(complaints.list(scope).await?))
}

async fn update_status(
    admin: AuthenticatedAdmin,
    State(complaints): State<ComplaintManager>,
    Path(complaint_id): Path<String>,
    Json(input): Json<StatusInput>,
) -> Result<Json<Complaint>> {
    let complaint = complaints
        .update_status(&complaint_id, &input.status, admin.scope())
        .await?;
    Ok(Json(complaint))
}

async fn add_note(
    admin: AuthenticatedAdmin,
    State(complaints): State<ComplaintManager>,
    Path(complaint_id): Path<String>,
    Json(input): Json<NoteInput>,
) -> Result<(StatusCode, Json<AdminNote>)> {
    let note = complaints
        .add_note(&complaint_id, &input.note, admin.scope())
        .await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn list_notes(
    admin: AuthenticatedAdmin,
    State(complaints): State<ComplaintManager>,
    Path(complaint_id): Path<String>,
) -> Result<Json<Vec<AdminNote>>> {
    let complaint = complaints.get_scoped(&complaint_id, admin.scope()).await?;
    Ok(Json(complaints.notes(&complaint.complaint_id).await?))
}

#[rustfmt::skip]
pub(super) fn routes() -> Router<AppState> {
    // UG /api/stats
    // UP /api/complaints
    // AG /api/complaints
    // UG /api/complaints/{complaintId}
    // AU /api/complaints/{complaintId}/status (PUT)
    // AG /api/complaints/{complaintId}/notes
    // AP /api/complaints/{complaintId}/notes
    Router::new()
        .route("/stats",                              get(stats))
        .route("/complaints",                        post(file_complaint).get(list_complaints))
        .route("/complaints/{complaint_id}",          get(get_complaint))
        .route("/complaints/{complaint_id}/status",   put(update_status))
        .route("/complaints/{complaint_id}/notes",   post(add_note).get(list_notes))
}
