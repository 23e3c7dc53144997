use super::{enrollee, non_empty, or_defaults};
use crate::{
    auth::AuthUser,
    entity::Event,
    error::{required, AppError, AppResult},
    repo::{NewEvent, SharedRepo},
    roles::Permission,
};
use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEventRequest {
    title: Option<String>,
    date: Option<DateTime<Utc>>,
    description: Option<String>,
    #[serde(alias = "imageUrl")]
    image: Option<String>,
    organizer_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RsvpRequest {
    action: Option<String>,
    user_id: Option<String>,
    display_name: Option<String>,
}

async fn list(Extension(repo): Extension<SharedRepo>) -> AppResult<Json<Vec<Event>>> {
    Ok(Json(or_defaults(repo.list_events().await, "events")?))
}

async fn create(
    Extension(repo): Extension<SharedRepo>,
    auth: AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<Event>)> {
    auth.require(Permission::CreateEvent)?;

    let event = NewEvent {
        title: required("title", req.title)?,
        date: req
            .date
            .ok_or_else(|| AppError::from(StatusCode::BAD_REQUEST, "date is required"))?,
        description: non_empty(req.description),
        image: non_empty(req.image),
        organizer_id: non_empty(req.organizer_id),
    };

    let created = repo.create_event(event).await?;
    tracing::info!(event = %created.id, by = %auth.uid, "created event");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn info(
    Extension(repo): Extension<SharedRepo>,
    Path(event_id): Path<String>,
) -> AppResult<Json<Event>> {
    Ok(Json(repo.event(&event_id).await?))
}

async fn rsvp(
    Extension(repo): Extension<SharedRepo>,
    Path(event_id): Path<String>,
    auth: AuthUser,
    Json(req): Json<RsvpRequest>,
) -> AppResult<Json<Event>> {
    let who = enrollee(
        &auth,
        req.user_id,
        req.display_name,
        Permission::ManageEventAttendees,
    )?;

    let event = match req.action.as_deref() {
        Some("rsvp") => repo.rsvp(&event_id, who).await?,
        Some("cancel") => repo.cancel_rsvp(&event_id, &who.user_id).await?,
        _ => {
            return Err(AppError::from(
                StatusCode::BAD_REQUEST,
                r#"Invalid action. Must be "rsvp" or "cancel""#,
            ))
        }
    };

    Ok(Json(event))
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:event_id", get(info))
        .route("/:event_id/rsvp", put(rsvp))
}
