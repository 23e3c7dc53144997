use crate::{
    auth::AuthUser,
    error::AppResult,
    repo::{Enrollee, RepoError, RepoResult},
    roles::Permission,
    sample::Defaults,
};
use axum::Router;

pub mod club;
pub mod event;
pub mod news;
pub mod user;

pub fn app() -> Router {
    Router::new()
        .nest("/clubs", club::app())
        .nest("/events", event::app())
        .nest("/news", news::app())
        .nest("/users", user::app())
}

/// List endpoints always render something: unreachable storage degrades to
/// the built-in defaults instead of an error.
fn or_defaults<T: Defaults>(result: RepoResult<Vec<T>>, what: &str) -> AppResult<Vec<T>> {
    match result {
        Ok(list) => Ok(list),
        Err(RepoError::Unavailable(err)) => {
            tracing::warn!(error = %format!("{err:#}"), "storage unavailable, returning sample {what}");
            Ok(T::defaults())
        }
        Err(err) => Err(err.into()),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolves whose roster entry a request touches. The caller acts for
/// themselves unless the body names another user, which needs `permission`.
fn enrollee(
    auth: &AuthUser,
    user_id: Option<String>,
    display_name: Option<String>,
    permission: Permission,
) -> AppResult<Enrollee> {
    let user_id = non_empty(user_id).unwrap_or_else(|| auth.uid.clone());
    auth.require_self_or(&user_id, permission)?;

    let display_name = non_empty(display_name).unwrap_or_else(|| {
        if user_id == auth.uid {
            auth.name.clone()
        } else {
            user_id.clone()
        }
    });
    Ok(Enrollee {
        user_id,
        display_name,
    })
}
