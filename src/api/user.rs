use super::non_empty;
use crate::{
    auth::{self, AuthUser},
    entity::User,
    error::{required, AppResult},
    repo::{AuthProfile, NewUser, SharedRepo},
    roles::{role_of, Permission, Role},
};
use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Profile fields the auth provider knows but does not put in the token.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest {
    email: Option<String>,
    display_name: Option<String>,
    #[serde(alias = "photoURL")]
    photo_url: Option<String>,
}

#[derive(Serialize)]
struct ProfileResponse {
    #[serde(flatten)]
    user: User,
    permissions: &'static [Permission],
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
}

impl ProfileResponse {
    fn new(user: User, token: Option<String>) -> Self {
        let permissions = role_of(&user.role).permissions();
        Self {
            user,
            permissions,
            token,
        }
    }
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
}

#[derive(Deserialize)]
struct BadgesRequest {
    #[serde(default)]
    badges: Vec<String>,
}

// sessions last one day
const SESSION_LENGTH: Duration = Duration::from_secs(24 * 60 * 60);

async fn profile(
    Extension(repo): Extension<SharedRepo>,
    auth: AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    Ok(Json(ProfileResponse::new(repo.user(&auth.uid).await?, None)))
}

async fn info(
    Extension(repo): Extension<SharedRepo>,
    Path(user_id): Path<String>,
) -> AppResult<Json<User>> {
    Ok(Json(repo.user(&user_id).await?))
}

/// Upserts the verified caller. The identity always comes from the token;
/// the body only fills in profile details.
async fn authenticate(
    Extension(repo): Extension<SharedRepo>,
    auth: AuthUser,
    req: Option<Json<AuthRequest>>,
) -> AppResult<(StatusCode, Json<ProfileResponse>)> {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    let email = required("email", non_empty(Some(auth.email.clone())).or(req.email))?;
    let profile = AuthProfile {
        uid: auth.uid.clone(),
        name: non_empty(req.display_name)
            .or_else(|| non_empty(Some(auth.name.clone())))
            .unwrap_or_else(|| email.clone()),
        email,
        photo_url: non_empty(req.photo_url),
    };

    let (user, created) = repo.authenticate(profile).await?;
    // refreshed session for the same identity, carrying the stored role
    let token = auth::generate_jwt(
        &user.id,
        &user.email,
        &user.name,
        role_of(&user.role),
        SESSION_LENGTH,
    )
    .map_err(anyhow::Error::from)?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ProfileResponse::new(user, token))))
}

/// Legacy registration. Only callers with `ManageUsers` may pick a role.
async fn register(
    Extension(repo): Extension<SharedRepo>,
    caller: Option<AuthUser>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let may_assign = caller.map_or(false, |c| c.role.can(Permission::ManageUsers));
    let role = match req.role.as_deref() {
        Some(role) if may_assign => role_of(role),
        _ => Role::Student,
    };

    let user = NewUser {
        name: required("name", req.name)?,
        email: required("email", req.email)?,
        role: role.to_string(),
    };

    Ok((StatusCode::CREATED, Json(repo.register(user).await?)))
}

async fn update_badges(
    Extension(repo): Extension<SharedRepo>,
    Path(user_id): Path<String>,
    auth: AuthUser,
    Json(req): Json<BadgesRequest>,
) -> AppResult<Json<User>> {
    auth.require_self_or(&user_id, Permission::ManageUsers)?;
    Ok(Json(repo.add_badges(&user_id, req.badges).await?))
}

pub fn app() -> Router {
    Router::new()
        .route("/", post(register))
        .route("/auth", post(authenticate))
        .route("/profile", get(profile))
        .route("/:user_id", get(info))
        .route("/:user_id/badges", put(update_badges))
}
