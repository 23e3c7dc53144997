use super::{enrollee, non_empty, or_defaults};
use crate::{
    auth::AuthUser,
    entity::Club,
    error::{required, AppResult},
    repo::{NewClub, SharedRepo},
    roles::Permission,
};
use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateClubRequest {
    name: Option<String>,
    category: Option<String>,
    description: Option<String>,
    #[serde(alias = "imageUrl")]
    image: Option<String>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembershipRequest {
    user_id: Option<String>,
    display_name: Option<String>,
}

async fn list(Extension(repo): Extension<SharedRepo>) -> AppResult<Json<Vec<Club>>> {
    Ok(Json(or_defaults(repo.list_clubs().await, "clubs")?))
}

async fn create(
    Extension(repo): Extension<SharedRepo>,
    auth: AuthUser,
    Json(req): Json<CreateClubRequest>,
) -> AppResult<(StatusCode, Json<Club>)> {
    auth.require(Permission::CreateClub)?;

    let club = NewClub {
        name: required("name", req.name)?,
        category: required("category", req.category)?,
        description: non_empty(req.description),
        image: non_empty(req.image),
    };

    let created = repo.create_club(club).await?;
    tracing::info!(club = %created.id, by = %auth.uid, "created club");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn info(
    Extension(repo): Extension<SharedRepo>,
    Path(club_id): Path<String>,
) -> AppResult<Json<Club>> {
    Ok(Json(repo.club(&club_id).await?))
}

async fn join(
    Extension(repo): Extension<SharedRepo>,
    Path(club_id): Path<String>,
    auth: AuthUser,
    req: Option<Json<MembershipRequest>>,
) -> AppResult<Json<Club>> {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    let who = enrollee(&auth, req.user_id, req.display_name, Permission::ManageClubMembers)?;
    Ok(Json(repo.join_club(&club_id, who).await?))
}

async fn leave(
    Extension(repo): Extension<SharedRepo>,
    Path(club_id): Path<String>,
    auth: AuthUser,
    req: Option<Json<MembershipRequest>>,
) -> AppResult<Json<Club>> {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    let who = enrollee(&auth, req.user_id, req.display_name, Permission::ManageClubMembers)?;
    Ok(Json(repo.leave_club(&club_id, &who.user_id).await?))
}

pub fn app() -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:club_id", get(info))
        .route("/:club_id/join", put(join))
        .route("/:club_id/leave", put(leave))
}
