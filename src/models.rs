use crate::{
    entity::{Attendee, Author, Club, Event, Member, NewsArticle, Organizer, User},
    roster::Participant,
    schema::*,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = clubs)]
pub struct ClubRecord {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(ClubRecord, foreign_key = club_id))]
#[diesel(table_name = club_members)]
pub struct MemberRecord {
    pub id: i32,
    pub club_id: i32,
    pub user_id: String,
    pub display_name: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = events)]
pub struct EventRecord {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub image_url: Option<String>,
    pub organizer_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(belongs_to(EventRecord, foreign_key = event_id))]
#[diesel(table_name = event_attendees)]
pub struct AttendeeRecord {
    pub id: i32,
    pub event_id: i32,
    pub user_id: String,
    pub display_name: String,
    pub rsvped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = news)]
pub struct NewsRecord {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author_id: Option<String>,
    pub author_name: String,
    pub category: String,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Insertable)]
#[diesel(table_name = users)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub photo_url: Option<String>,
    pub role: String,
    pub badges: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl ClubRecord {
    pub fn into_club(self, members: Vec<MemberRecord>) -> Club {
        Club {
            id: self.id.to_string(),
            name: self.name,
            category: self.category,
            description: self.description,
            members: members
                .into_iter()
                .map(|m| {
                    Participant::Record(Member {
                        user_id: m.user_id,
                        display_name: m.display_name,
                        joined_at: m.joined_at,
                    })
                })
                .collect(),
            image: self.image_url,
            created_at: Some(self.created_at),
        }
    }
}

impl EventRecord {
    pub fn into_event(self, organizer: Option<String>, attendees: Vec<AttendeeRecord>) -> Event {
        Event {
            id: self.id.to_string(),
            title: self.title,
            description: self.description,
            date: self.scheduled_at,
            image: self.image_url,
            organizer: organizer.map(|name| Organizer {
                id: self.organizer_id.map(|id| id.to_string()),
                name,
            }),
            attendees: attendees
                .into_iter()
                .map(|a| {
                    Participant::Record(Attendee {
                        user_id: a.user_id,
                        display_name: a.display_name,
                        rsvped_at: a.rsvped_at,
                    })
                })
                .collect(),
        }
    }
}

impl From<NewsRecord> for NewsArticle {
    fn from(record: NewsRecord) -> Self {
        NewsArticle {
            id: record.id.to_string(),
            title: record.title,
            content: record.content,
            author: Author {
                id: record.author_id,
                name: record.author_name,
            },
            category: record.category,
            date: record.published_at,
            image: record.image_url,
        }
    }
}

impl UserRecord {
    pub fn into_user(self, clubs_joined: Vec<i32>) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            photo_url: self.photo_url,
            role: self.role,
            clubs_joined: clubs_joined.into_iter().map(|id| id.to_string()).collect(),
            badges: self.badges,
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}
