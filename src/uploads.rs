//! Complaint photo uploads.
//!
//! The filing form arrives as `multipart/form-data`. Photos are checked for
//! type and size while the form is read, written to a temporary file and
//! then moved to their final `<uuid><ext>` name in one flat directory.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result as AnyResult};
use axum::extract::{multipart::Field, Multipart};
use tokio::fs as async_fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    complaints::ComplaintForm,
    config::UploadConfig,
    error::{Error, FieldError},
    Result,
};

/// Photo bytes held in memory between validation and storage.
#[derive(Debug, Clone)]
pub struct Photo {
    bytes: Vec<u8>,
    extension: &'static str,
}

/// A decoded filing form and its optional photo.
#[derive(Debug, Clone, Default)]
pub struct ComplaintUpload {
    pub form: ComplaintForm,
    pub photo: Option<Photo>,
}

/// Stored extension for an accepted photo type. The client's file name is
/// never used, so `/uploads` only ever serves these raster types.
fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/png" => Some(".png"),
        "image/jpeg" | "image/jpg" => Some(".jpg"),
        "image/gif" => Some(".gif"),
        "image/webp" => Some(".webp"),
        _ => None,
    }
}

fn not_an_image() -> Error {
    field_error("photo", "Only PNG, JPEG, GIF or WebP images are allowed")
}

fn field_error(field: &str, message: impl Into<String>) -> Error {
    Error::validation(vec![FieldError {
        field: field.to_owned(),
        message: message.into(),
    }])
}

fn too_large(limit: u64) -> Error {
    const MIB: u64 = 1024 * 1024;
    let message = if limit >= MIB && limit % MIB == 0 {
        format!("Photo must be {} MB or smaller", limit / MIB)
    } else {
        format!("Photo must be {limit} bytes or smaller")
    };
    field_error("photo", message)
}

fn malformed(err: impl std::fmt::Display) -> Error {
    Error::bad_request(format!("Malformed form data: {err}"))
}

#[derive(Clone, Debug)]
pub struct Uploads {
    dir: PathBuf,
    limit: u64,
}

impl Uploads {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.path.clone(),
            limit: config.limit,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Decode the complaint filing form. Unknown fields are ignored.
    pub async fn read_form(&self, mut multipart: Multipart) -> Result<ComplaintUpload> {
        let mut upload = ComplaintUpload::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_owned();
            if name == "photo" {
                upload.photo = self.read_photo(field).await?;
                continue;
            }

            let value = field.text().await.map_err(malformed)?;
            let form = &mut upload.form;
            match name.as_str() {
                "fullName" => form.full_name = value,
                "contactNumber" => form.contact_number = value,
                "email" => form.email = Some(value),
                "category" => form.category = value,
                "description" => form.description = value,
                "location" => form.location = value,
                "priority" => form.priority = Some(value),
                "barangayId" => {
                    let value = value.trim();
                    form.unit_id = if value.is_empty() {
                        None
                    } else {
                        Some(value.parse().map_err(|_| {
                            field_error("barangayId", "Please select a valid barangay")
                        })?)
                    };
                }
                _ => debug!("ignoring form field {name}"),
            }
        }

        Ok(upload)
    }

    /// Read the `photo` field. An empty file input counts as no photo.
    async fn read_photo(&self, mut field: Field<'_>) -> Result<Option<Photo>> {
        let has_file = field.file_name().is_some_and(|name| !name.is_empty());
        let extension = field.content_type().and_then(image_extension);
        if has_file && extension.is_none() {
            return Err(not_an_image());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
            if (bytes.len() + chunk.len()) as u64 > self.limit {
                return Err(too_large(self.limit));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Ok(None);
        }
        let Some(extension) = extension else {
            return Err(not_an_image());
        };
        Ok(Some(Photo { bytes, extension }))
    }

    /// Write a photo under a fresh name and return that name.
    pub async fn store(&self, photo: &Photo) -> AnyResult<String> {
        let name = format!("{}{}", Uuid::new_v4(), photo.extension);
        let tmp_path = self.dir.join(format!(".{name}.tmp"));
        let path = self.dir.join(&name);

        async_fs::write(&tmp_path, &photo.bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        if let Err(e) = async_fs::rename(&tmp_path, &path).await {
            _ = async_fs::remove_file(&tmp_path).await;
            return Err(anyhow::Error::new(e).context("failed to move photo into place"));
        }

        debug!("stored photo {name} ({} bytes)", photo.bytes.len());
        Ok(name)
    }

    /// Best-effort removal of a stored photo whose complaint was never saved.
    pub async fn discard(&self, name: &str) {
        if let Err(e) = async_fs::remove_file(self.dir.join(name)).await {
            warn!("failed to remove orphaned photo {name}: {e}");
        }
    }
}
