use axum::body::Bytes;
use axum::extract::{Multipart, Query, State};
use axum::response::Response;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::media::{self, unique_file_name, MediaStore};
use crate::models::event::{Event, NewEvent};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::Path;
use crate::utils::response::{created, ok};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// GET /events — public catalog, optionally filtered by `?q=`.
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    let details = Event::list(&state.pool, params.q.as_deref()).await?;
    let events = Event::project(
        &state.pool,
        details,
        state.config.public_base_url.as_deref(),
    )
    .await?;
    Ok(ok(events))
}

/// GET /events/{id}
pub async fn event_detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let detail = Event::find_detail(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    let mut events = Event::project(
        &state.pool,
        vec![detail],
        state.config.public_base_url.as_deref(),
    )
    .await?;
    Ok(ok(events.remove(0)))
}

/// POST /user/create-event — multipart form with the event fields plus
/// optional `image`, `guest_image`, and repeated `gallery` file parts.
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = EventForm::read(multipart).await?;
    let mut new_event = NewEvent::from_text_fields(&form.text)?;

    new_event.image = save_upload(&state.media, media::COVERS, form.image.as_ref()).await?;
    new_event.guest_image = save_upload(&state.media, media::GUESTS, form.guest_image.as_ref()).await?;

    let event_id = Event::create(&state.pool, user.id, &new_event).await?;

    for upload in &form.gallery {
        let path = state
            .media
            .save(media::GALLERY, &unique_file_name(&upload.file_name), &upload.bytes)
            .await?;
        Event::add_gallery_image(&state.pool, event_id, &path).await?;
    }

    let detail = Event::find_detail(&state.pool, event_id)
        .await?
        .ok_or_else(|| AppError::Internal("Created event vanished".to_string()))?;
    let mut events = Event::project(
        &state.pool,
        vec![detail],
        state.config.public_base_url.as_deref(),
    )
    .await?;
    Ok(created(events.remove(0)))
}

/// GET /user/edit-event/{id} — owner-scoped fetch; non-owners see 404.
pub async fn edit_event_fetch(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let detail = Event::find_detail_owned(&state.pool, id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    let mut events = Event::project(
        &state.pool,
        vec![detail],
        state.config.public_base_url.as_deref(),
    )
    .await?;
    Ok(ok(events.remove(0)))
}

/// PUT /user/edit-event/{id} — same field set as creation; file parts are
/// optional and leave the stored images alone when omitted, new gallery
/// parts are appended.
pub async fn edit_event_update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = EventForm::read(multipart).await?;
    let mut new_event = NewEvent::from_text_fields(&form.text)?;

    new_event.image = save_upload(&state.media, media::COVERS, form.image.as_ref()).await?;
    new_event.guest_image = save_upload(&state.media, media::GUESTS, form.guest_image.as_ref()).await?;

    let updated = Event::update_owned(&state.pool, id, user.id, &new_event).await?;
    if !updated {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    for upload in &form.gallery {
        let path = state
            .media
            .save(media::GALLERY, &unique_file_name(&upload.file_name), &upload.bytes)
            .await?;
        Event::add_gallery_image(&state.pool, id, &path).await?;
    }

    let detail = Event::find_detail_owned(&state.pool, id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    let mut events = Event::project(
        &state.pool,
        vec![detail],
        state.config.public_base_url.as_deref(),
    )
    .await?;
    Ok(ok(events.remove(0)))
}

struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// Raw multipart form: text parts collected by name, file parts kept as
/// bytes until validation passes.
struct EventForm {
    text: HashMap<String, String>,
    image: Option<Upload>,
    guest_image: Option<Upload>,
    gallery: Vec<Upload>,
}

impl EventForm {
    async fn read(mut multipart: Multipart) -> Result<EventForm, AppError> {
        let mut form = EventForm {
            text: HashMap::new(),
            image: None,
            guest_image: None,
            gallery: Vec::new(),
        };

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
        {
            let name = match field.name() {
                Some(name) => name.to_string(),
                None => continue,
            };

            if field.file_name().is_some() {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
                // An empty file part means "no file selected"
                if bytes.is_empty() {
                    continue;
                }
                let upload = Upload { file_name, bytes };
                match name.as_str() {
                    "image" => form.image = Some(upload),
                    "guest_image" => form.guest_image = Some(upload),
                    "gallery" => form.gallery.push(upload),
                    _ => {}
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field: {}", e)))?;
                form.text.insert(name, value);
            }
        }

        Ok(form)
    }
}

async fn save_upload(
    media_store: &MediaStore,
    subdir: &str,
    upload: Option<&Upload>,
) -> Result<Option<String>, AppError> {
    match upload {
        Some(upload) => {
            let path = media_store
                .save(subdir, &unique_file_name(&upload.file_name), &upload.bytes)
                .await?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}
