//! Storage behind the REST handlers.
//!
//! [`PgRepository`] is the real store. [`DemoRepository`] keeps everything in
//! memory, seeded from the built-in defaults, and is selected once at startup
//! when demo mode is on or no database is configured.

use crate::entity::{Club, Event, NewsArticle, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{borrow::Cow, sync::Arc};
use thiserror::Error;

mod demo;
mod pg;

pub use demo::DemoRepository;
pub use pg::PgRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    NotFound(&'static str),
    /// The request conflicts with stored state, e.g. a duplicate membership.
    #[error("{0}")]
    Rejected(Cow<'static, str>),
    #[error("storage unavailable: {0}")]
    Unavailable(anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

pub fn unavailable(e: impl Into<anyhow::Error>) -> RepoError {
    RepoError::Unavailable(e.into())
}

#[derive(Debug, Clone)]
pub struct NewClub {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub organizer_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub category: String,
    pub image: Option<String>,
    pub author_id: Option<String>,
    pub author_name: String,
}

/// A user arriving from the external auth provider.
#[derive(Debug, Clone)]
pub struct AuthProfile {
    pub uid: String,
    pub email: String,
    pub name: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Who is joining a roster.
#[derive(Debug, Clone)]
pub struct Enrollee {
    pub user_id: String,
    pub display_name: String,
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn list_clubs(&self) -> RepoResult<Vec<Club>>;
    async fn club(&self, id: &str) -> RepoResult<Club>;
    async fn create_club(&self, club: NewClub) -> RepoResult<Club>;
    async fn join_club(&self, id: &str, who: Enrollee) -> RepoResult<Club>;
    async fn leave_club(&self, id: &str, user_id: &str) -> RepoResult<Club>;

    /// Events ordered by date, soonest first.
    async fn list_events(&self) -> RepoResult<Vec<Event>>;
    async fn event(&self, id: &str) -> RepoResult<Event>;
    async fn create_event(&self, event: NewEvent) -> RepoResult<Event>;
    async fn rsvp(&self, id: &str, who: Enrollee) -> RepoResult<Event>;
    async fn cancel_rsvp(&self, id: &str, user_id: &str) -> RepoResult<Event>;

    /// Articles ordered newest first.
    async fn list_news(&self) -> RepoResult<Vec<NewsArticle>>;
    async fn article(&self, id: &str) -> RepoResult<NewsArticle>;
    async fn create_article(&self, article: NewArticle) -> RepoResult<NewsArticle>;

    async fn user(&self, id: &str) -> RepoResult<User>;
    /// Creates the user on first sign-in, otherwise refreshes `last_login`.
    /// The flag reports whether the user was created.
    async fn authenticate(&self, profile: AuthProfile) -> RepoResult<(User, bool)>;
    async fn register(&self, user: NewUser) -> RepoResult<User>;
    /// Adds badges the user does not already hold.
    async fn add_badges(&self, id: &str, badges: Vec<String>) -> RepoResult<User>;
}

pub type SharedRepo = Arc<dyn Repository>;

pub const CLUB_NOT_FOUND: &str = "Club not found";
pub const EVENT_NOT_FOUND: &str = "Event not found";
pub const NEWS_NOT_FOUND: &str = "News article not found";
pub const USER_NOT_FOUND: &str = "User not found";

/// Appends `new` badges to `held`, skipping ones already present.
pub(crate) fn merge_badges(held: &mut Vec<String>, new: Vec<String>) {
    for badge in new {
        if !held.contains(&badge) {
            held.push(badge);
        }
    }
}
