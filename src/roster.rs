//! Participant identity for club rosters and event attendee lists.
//!
//! Rosters arrive in three shapes depending on where they came from: full
//! records written by this crate, account objects from populated backend
//! documents, and bare identifier strings from legacy sample data. Every
//! membership check funnels through [`Participant::user_key`] so the shapes
//! compare consistently.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// A roster record type (`Member` for clubs, `Attendee` for events).
pub trait Enrollment:
    Clone + Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    fn new(user_id: String, display_name: String, at: DateTime<Utc>) -> Self;
    fn user_id(&self) -> &str;
    fn display_name(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(
        default,
        alias = "_id",
        alias = "userId",
        skip_serializing_if = "Option::is_none"
    )]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Participant<R> {
    Record(R),
    Account(Account),
    Bare(String),
}

impl<R: Enrollment> Participant<R> {
    /// Normalised identity used for every comparison.
    pub fn user_key(&self) -> &str {
        match self {
            Participant::Record(record) => record.user_id(),
            Participant::Account(account) => account
                .uid
                .as_deref()
                .or(account.email.as_deref())
                .or(account.name.as_deref())
                .unwrap_or_default(),
            Participant::Bare(id) => id,
        }
    }

    pub fn is_user(&self, user_id: &str) -> bool {
        if user_id.is_empty() {
            return false;
        }
        if self.user_key() == user_id {
            return true;
        }
        // accounts may be addressed by email even when they carry a uid
        matches!(
            self,
            Participant::Account(Account { email: Some(email), .. }) if email == user_id
        )
    }

    pub fn display_name(&self) -> &str {
        match self {
            Participant::Record(record) => record.display_name(),
            Participant::Account(account) => account
                .name
                .as_deref()
                .or(account.email.as_deref())
                .unwrap_or_else(|| self.user_key()),
            Participant::Bare(id) => id,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("user `{0}` is already enrolled")]
pub struct AlreadyEnrolled(pub String);

pub fn contains<R: Enrollment>(roster: &[Participant<R>], user_id: &str) -> bool {
    roster.iter().any(|p| p.is_user(user_id))
}

/// Appends `record` unless its user is already on the roster.
pub fn enroll<R: Enrollment>(
    roster: &mut Vec<Participant<R>>,
    record: R,
) -> Result<(), AlreadyEnrolled> {
    if contains(roster, record.user_id()) {
        return Err(AlreadyEnrolled(record.user_id().to_string()));
    }
    roster.push(Participant::Record(record));
    Ok(())
}

/// Removes every entry for `user_id`. Returns whether anything was removed.
pub fn withdraw<R: Enrollment>(roster: &mut Vec<Participant<R>>, user_id: &str) -> bool {
    let before = roster.len();
    roster.retain(|p| !p.is_user(user_id));
    roster.len() != before
}
