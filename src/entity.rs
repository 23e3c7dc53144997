//! Clubs, events, news and users as they travel over the wire.

use crate::roster::{Enrollment, Participant};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt::Debug;

pub type MemberRef = Participant<Member>;
pub type AttendeeRef = Participant<Attendee>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

impl Enrollment for Member {
    fn new(user_id: String, display_name: String, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            display_name,
            joined_at: at,
        }
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    pub rsvped_at: DateTime<Utc>,
}

impl Enrollment for Attendee {
    fn new(user_id: String, display_name: String, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            display_name,
            rsvped_at: at,
        }
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberRef>,
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Denormalised reference to the club organising an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organizer {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
    #[serde(default, alias = "organizerId")]
    pub organizer: Option<Organizer>,
    #[serde(default)]
    pub attendees: Vec<AttendeeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

fn general() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(alias = "authorId")]
    pub author: Author,
    #[serde(default = "general")]
    pub category: String,
    pub date: DateTime<Utc>,
    #[serde(default, alias = "imageUrl")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, alias = "photoURL")]
    pub photo_url: Option<String>,
    pub role: String,
    #[serde(default)]
    pub clubs_joined: Vec<String>,
    #[serde(default)]
    pub badges: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubDraft {
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer_id: Option<String>,
}

/// An entity carrying a roster that users join and leave.
pub trait Enrollable:
    Clone + Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    type Record: Enrollment;
    /// What a user fills in to create one.
    type Draft: Serialize + Send + Sync;

    /// Key of this entity type's persisted override entry.
    const CACHE_KEY: &'static str;
    /// Key of the entry holding entities created while offline.
    const CREATED_KEY: &'static str;
    const NOUN: &'static str;
    const ALREADY_ENROLLED: &'static str;

    fn id(&self) -> &str;
    fn roster(&self) -> &[Participant<Self::Record>];
    fn roster_mut(&mut self) -> &mut Vec<Participant<Self::Record>>;

    /// A fresh entity with an empty roster.
    fn from_draft(id: String, draft: &Self::Draft, now: DateTime<Utc>) -> Self;
}

impl Enrollable for Club {
    type Record = Member;
    type Draft = ClubDraft;

    const CACHE_KEY: &'static str = "clubMemberships";
    const CREATED_KEY: &'static str = "userCreatedClubs";
    const NOUN: &'static str = "club";
    const ALREADY_ENROLLED: &'static str = "User is already a member of this club";

    fn id(&self) -> &str {
        &self.id
    }

    fn roster(&self) -> &[MemberRef] {
        &self.members
    }

    fn roster_mut(&mut self) -> &mut Vec<MemberRef> {
        &mut self.members
    }

    fn from_draft(id: String, draft: &ClubDraft, now: DateTime<Utc>) -> Self {
        Club {
            id,
            name: draft.name.clone(),
            category: draft.category.clone(),
            description: draft.description.clone(),
            members: Vec::new(),
            image: None,
            created_at: Some(now),
        }
    }
}

impl Enrollable for Event {
    type Record = Attendee;
    type Draft = EventDraft;

    const CACHE_KEY: &'static str = "eventRSVPs";
    const CREATED_KEY: &'static str = "userCreatedEvents";
    const NOUN: &'static str = "event";
    const ALREADY_ENROLLED: &'static str = "User has already RSVP'd to this event";

    fn id(&self) -> &str {
        &self.id
    }

    fn roster(&self) -> &[AttendeeRef] {
        &self.attendees
    }

    fn roster_mut(&mut self) -> &mut Vec<AttendeeRef> {
        &mut self.attendees
    }

    /// The organizer's name is only known to the backend, so a local event
    /// has none.
    fn from_draft(id: String, draft: &EventDraft, _: DateTime<Utc>) -> Self {
        Event {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            date: draft.date,
            image: None,
            organizer: None,
            attendees: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_backend_shapes_deserialize() {
        let event: Event = serde_json::from_value(json!({
            "_id": "2",
            "title": "Annual Drama Performance",
            "date": "2025-09-28T00:00:00.000Z",
            "description": "End of year theater show",
            "organizerId": { "name": "Drama Society" },
            "attendees": [{ "uid": "dev-user-1", "email": "dev@example.com" }]
        }))
        .unwrap();

        assert_eq!(event.id, "2");
        assert_eq!(event.organizer.unwrap().name, "Drama Society");
        assert_eq!(event.attendees[0].user_key(), "dev-user-1");

        let club: Club = serde_json::from_value(json!({
            "_id": "1",
            "name": "Robotics Club",
            "category": "Technology",
            "members": ["John Doe", "Jane Smith"]
        }))
        .unwrap();
        assert_eq!(club.members.len(), 2);
        assert_eq!(club.created_at, None);
    }

    #[test]
    fn news_defaults_category() {
        let article: NewsArticle = serde_json::from_value(json!({
            "_id": "1",
            "title": "t",
            "content": "c",
            "authorId": { "name": "John Doe" },
            "date": "2025-09-20T00:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(article.category, "general");
        assert_eq!(article.author.name, "John Doe");
    }
}
