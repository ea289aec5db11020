//! Multipart intake.
//!
//! File parts are streamed to the transient uploads directory under unique
//! names while their size is checked chunk by chunk. Handlers then read the
//! bytes back into the store, which removes the transient files.

use axum::extract::multipart::{Field, Multipart};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use store::images::NewImage;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, instrument, trace, warn};
use uuid::Uuid;

use crate::config::UploadSettings;
use crate::error::AppError;

const FALLBACK_MIME: &str = "application/octet-stream";

/// A file part persisted to the uploads directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field: String,
    pub path: PathBuf,
    pub mime: String,
    pub size: u64,
}

impl UploadedFile {
    /// Reads the bytes back and removes the transient file.
    pub async fn into_image(self) -> Result<NewImage, AppError> {
        let bytes = fs::read(&self.path).await;
        discard(&self.path).await;
        let bytes = bytes.map_err(|e| AppError::Internal(format!("reading upload failed: {}", e)))?;
        Ok(NewImage {
            bytes,
            mime: self.mime,
        })
    }
}

/// Text fields and stored files of one multipart request.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: Vec<UploadedFile>,
}

impl MultipartForm {
    /// First value of a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value of a repeated text field, in submission order.
    pub fn all(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Removes and returns the files submitted under `field`.
    pub fn take_files(&mut self, field: &str) -> Vec<UploadedFile> {
        let (taken, kept) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| f.field == field);
        self.files = kept;
        taken
    }

    /// Deletes any transient file nobody claimed.
    pub async fn cleanup(self) {
        discard_files(self.files).await;
    }
}

/// Removes transient files that will not be stored.
pub async fn discard_files(files: Vec<UploadedFile>) {
    for file in files {
        discard(&file.path).await;
    }
}

/// Reads every file into memory, removing the transient copies even on failure.
pub async fn read_images(files: Vec<UploadedFile>) -> Result<Vec<NewImage>, AppError> {
    let mut images = Vec::with_capacity(files.len());
    let mut failure = None;
    for file in files {
        if failure.is_some() {
            discard(&file.path).await;
            continue;
        }
        match file.into_image().await {
            Ok(image) => images.push(image),
            Err(e) => failure = Some(e),
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(images),
    }
}

/// Consumes the request body.
///
/// Empty file parts (a file input left blank) are skipped. More than
/// `max_images` files, or any file above `max_file_bytes`, rejects the request
/// with 400 and leaves nothing behind on disk.
#[instrument(skip(multipart, limits))]
pub async fn receive(mut multipart: Multipart, limits: &UploadSettings) -> Result<MultipartForm, AppError> {
    fs::create_dir_all(&limits.dir)
        .await
        .map_err(|e| AppError::Internal(format!("creating uploads dir failed: {}", e)))?;

    let mut form = MultipartForm::default();
    let outcome = collect(&mut multipart, limits, &mut form).await;
    match outcome {
        Ok(()) => {
            debug!(files = form.files.len(), fields = form.fields.len(), "Multipart body received");
            Ok(form)
        }
        Err(e) => {
            form.cleanup().await;
            Err(e)
        }
    }
}

async fn collect(
    multipart: &mut Multipart,
    limits: &UploadSettings,
    form: &mut MultipartForm,
) -> Result<(), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if field.file_name().is_none() {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::bad_request(format!("Invalid form data: {}", e)))?;
            form.fields.entry(name).or_default().push(value);
            continue;
        }

        if let Some(file) = store_file(field, &name, limits).await? {
            if form.files.len() >= limits.max_images {
                discard(&file.path).await;
                return Err(AppError::bad_request(format!(
                    "At most {} images can be uploaded.",
                    limits.max_images
                )));
            }
            form.files.push(file);
        }
    }
    Ok(())
}

/// Streams one file part to disk. Returns `None` for an empty part.
async fn store_file(
    mut field: Field<'_>,
    name: &str,
    limits: &UploadSettings,
) -> Result<Option<UploadedFile>, AppError> {
    let original = field.file_name().unwrap_or_default().to_string();
    let mime = field
        .content_type()
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_MIME.to_string());
    let path = limits.dir.join(unique_name(&original));

    let mut out = fs::File::create(&path)
        .await
        .map_err(|e| AppError::Internal(format!("creating upload failed: {}", e)))?;

    let mut size: u64 = 0;
    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                discard(&path).await;
                return Err(AppError::bad_request(format!("Invalid form data: {}", e)));
            }
        };
        size += chunk.len() as u64;
        if size > limits.max_file_bytes {
            drop(out);
            discard(&path).await;
            warn!(file = %original, limit = limits.max_file_bytes, "Upload exceeds size limit");
            return Err(AppError::bad_request(format!(
                "File {} exceeds the {} byte limit.",
                original, limits.max_file_bytes
            )));
        }
        if let Err(e) = out.write_all(&chunk).await {
            discard(&path).await;
            return Err(AppError::Internal(format!("writing upload failed: {}", e)));
        }
    }
    if let Err(e) = out.flush().await {
        discard(&path).await;
        return Err(AppError::Internal(format!("writing upload failed: {}", e)));
    }
    drop(out);

    if size == 0 {
        trace!(field = name, "Skipping empty file part");
        discard(&path).await;
        return Ok(None);
    }

    trace!(field = name, size, path = %path.display(), "Stored upload");
    Ok(Some(UploadedFile {
        field: name.to_string(),
        path,
        mime,
        size,
    }))
}

/// `<unix millis>-<random><.ext>`, keeping only a short alphanumeric extension.
fn unique_name(original: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = Uuid::new_v4().simple();
    let extension = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 10 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}-{}{}", millis, random, extension)
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), "Failed to remove transient upload: {}", e);
        }
    }
}
