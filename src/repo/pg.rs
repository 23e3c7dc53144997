use super::{
    merge_badges, unavailable, AuthProfile, Enrollee, NewArticle, NewClub, NewEvent, NewUser,
    RepoError, RepoResult, Repository, CLUB_NOT_FOUND, EVENT_NOT_FOUND, NEWS_NOT_FOUND,
    USER_NOT_FOUND,
};
use crate::{
    entity::{Club, Enrollable, Event, NewsArticle, User},
    models::{AttendeeRecord, ClubRecord, EventRecord, MemberRecord, NewsRecord, UserRecord},
    schema::*,
    DbPool,
};
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{pg::AsyncPgConnection, AsyncConnection, RunQueryDsl};
use itertools::Itertools;
use nanoid::nanoid;
use std::collections::HashMap;

impl From<diesel::result::Error> for RepoError {
    fn from(e: diesel::result::Error) -> Self {
        unavailable(e)
    }
}

pub struct PgRepository {
    pool: DbPool,
}

impl PgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_id(id: &str, missing: &'static str) -> RepoResult<i32> {
    id.parse().map_err(|_| RepoError::NotFound(missing))
}

async fn load_clubs(conn: &mut AsyncPgConnection, clubs: Vec<ClubRecord>) -> RepoResult<Vec<Club>> {
    let members = MemberRecord::belonging_to(&clubs)
        .order(club_members::joined_at.asc())
        .load::<MemberRecord>(conn)
        .await?
        .grouped_by(&clubs);

    Ok(clubs
        .into_iter()
        .zip(members)
        .map(|(club, members)| club.into_club(members))
        .collect())
}

async fn load_club(conn: &mut AsyncPgConnection, id: i32) -> RepoResult<Club> {
    let club = clubs::table
        .find(id)
        .first::<ClubRecord>(conn)
        .await
        .optional()?
        .ok_or(RepoError::NotFound(CLUB_NOT_FOUND))?;

    load_clubs(conn, vec![club])
        .await?
        .pop()
        .ok_or(RepoError::NotFound(CLUB_NOT_FOUND))
}

async fn ensure_club(conn: &mut AsyncPgConnection, id: i32) -> RepoResult<()> {
    clubs::table
        .find(id)
        .select(clubs::id)
        .first::<i32>(conn)
        .await
        .optional()?
        .map(|_| ())
        .ok_or(RepoError::NotFound(CLUB_NOT_FOUND))
}

async fn load_events(
    conn: &mut AsyncPgConnection,
    events: Vec<EventRecord>,
) -> RepoResult<Vec<Event>> {
    let organizer_ids: Vec<i32> = events.iter().filter_map(|e| e.organizer_id).unique().collect();
    let organizers: HashMap<i32, String> = clubs::table
        .filter(clubs::id.eq_any(organizer_ids))
        .select((clubs::id, clubs::name))
        .load::<(i32, String)>(conn)
        .await?
        .into_iter()
        .collect();

    let attendees = AttendeeRecord::belonging_to(&events)
        .order(event_attendees::rsvped_at.asc())
        .load::<AttendeeRecord>(conn)
        .await?
        .grouped_by(&events);

    Ok(events
        .into_iter()
        .zip(attendees)
        .map(|(event, attendees)| {
            let organizer = event
                .organizer_id
                .and_then(|id| organizers.get(&id).cloned());
            event.into_event(organizer, attendees)
        })
        .collect())
}

async fn load_event(conn: &mut AsyncPgConnection, id: i32) -> RepoResult<Event> {
    let event = events::table
        .find(id)
        .first::<EventRecord>(conn)
        .await
        .optional()?
        .ok_or(RepoError::NotFound(EVENT_NOT_FOUND))?;

    load_events(conn, vec![event])
        .await?
        .pop()
        .ok_or(RepoError::NotFound(EVENT_NOT_FOUND))
}

async fn ensure_event(conn: &mut AsyncPgConnection, id: i32) -> RepoResult<()> {
    events::table
        .find(id)
        .select(events::id)
        .first::<i32>(conn)
        .await
        .optional()?
        .map(|_| ())
        .ok_or(RepoError::NotFound(EVENT_NOT_FOUND))
}

async fn load_user(conn: &mut AsyncPgConnection, record: UserRecord) -> RepoResult<User> {
    let clubs = user_clubs::table
        .filter(user_clubs::user_id.eq(&record.id))
        .order(user_clubs::id.asc())
        .select(user_clubs::club_id)
        .load::<i32>(conn)
        .await?;
    Ok(record.into_user(clubs))
}

async fn find_user(conn: &mut AsyncPgConnection, id: &str) -> RepoResult<Option<UserRecord>> {
    Ok(users::table
        .find(id)
        .first::<UserRecord>(conn)
        .await
        .optional()?)
}

async fn email_taken(conn: &mut AsyncPgConnection, email: &str) -> RepoResult<bool> {
    Ok(users::table
        .filter(users::email.eq(email))
        .select(users::id)
        .first::<String>(conn)
        .await
        .optional()?
        .is_some())
}

#[async_trait]
impl Repository for PgRepository {
    async fn list_clubs(&self) -> RepoResult<Vec<Club>> {
        let conn = &mut self.pool.get().await.map_err(unavailable)?;

        let clubs = clubs::table
            .order(clubs::created_at.desc())
            .load::<ClubRecord>(conn)
            .await?;

        load_clubs(conn, clubs).await
    }

    async fn club(&self, id: &str) -> RepoResult<Club> {
        let id = parse_id(id, CLUB_NOT_FOUND)?;
        let conn = &mut self.pool.get().await.map_err(unavailable)?;
        load_club(conn, id).await
    }

    async fn create_club(&self, club: NewClub) -> RepoResult<Club> {
        let conn = &mut self.pool.get().await.map_err(unavailable)?;

        let created = diesel::insert_into(clubs::table)
            .values((
                clubs::name.eq(club.name),
                clubs::category.eq(club.category),
                clubs::description.eq(club.description),
                clubs::image_url.eq(club.image),
            ))
            .on_conflict(clubs::name)
            .do_nothing()
            .get_result::<ClubRecord>(conn)
            .await
            .optional()?;

        let Some(created) = created else {
            return Err(RepoError::Rejected(
                "Club with this name already exists".into(),
            ));
        };

        Ok(created.into_club(Vec::new()))
    }

    async fn join_club(&self, id: &str, who: Enrollee) -> RepoResult<Club> {
        let club_id = parse_id(id, CLUB_NOT_FOUND)?;
        let conn = &mut self.pool.get().await.map_err(unavailable)?;

        // Roster row and user back-reference land together or not at all.
        conn.transaction::<_, RepoError, _>(|conn| {
            Box::pin(async move {
                ensure_club(conn, club_id).await?;

                let inserted = diesel::insert_into(club_members::table)
                    .values((
                        club_members::club_id.eq(club_id),
                        club_members::user_id.eq(&who.user_id),
                        club_members::display_name.eq(&who.display_name),
                        club_members::joined_at.eq(Utc::now()),
                    ))
                    .on_conflict((club_members::club_id, club_members::user_id))
                    .do_nothing()
                    .execute(conn)
                    .await?;

                if inserted == 0 {
                    return Err(RepoError::Rejected(Club::ALREADY_ENROLLED.into()));
                }

                diesel::insert_into(user_clubs::table)
                    .values((
                        user_clubs::user_id.eq(&who.user_id),
                        user_clubs::club_id.eq(club_id),
                    ))
                    .on_conflict((user_clubs::user_id, user_clubs::club_id))
                    .do_nothing()
                    .execute(conn)
                    .await?;

                load_club(conn, club_id).await
            })
        })
        .await
    }

    async fn leave_club(&self, id: &str, user_id: &str) -> RepoResult<Club> {
        let club_id = parse_id(id, CLUB_NOT_FOUND)?;
        let user_id = user_id.to_string();
        let conn = &mut self.pool.get().await.map_err(unavailable)?;

        conn.transaction::<_, RepoError, _>(|conn| {
            Box::pin(async move {
                ensure_club(conn, club_id).await?;

                diesel::delete(
                    club_members::table
                        .filter(club_members::club_id.eq(club_id))
                        .filter(club_members::user_id.eq(&user_id)),
                )
                .execute(conn)
                .await?;

                diesel::delete(
                    user_clubs::table
                        .filter(user_clubs::club_id.eq(club_id))
                        .filter(user_clubs::user_id.eq(&user_id)),
                )
                .execute(conn)
                .await?;

                load_club(conn, club_id).await
            })
        })
        .await
    }

    async fn list_events(&self) -> RepoResult<Vec<Event>> {
        let conn = &mut self.pool.get().await.map_err(unavailable)?;

        let events = events::table
            .order(events::scheduled_at.asc())
            .load::<EventRecord>(conn)
            .await?;

        load_events(conn, events).await
    }

    async fn event(&self, id: &str) -> RepoResult<Event> {
        let id = parse_id(id, EVENT_NOT_FOUND)?;
        let conn = &mut self.pool.get().await.map_err(unavailable)?;
        load_event(conn, id).await
    }

    async fn create_event(&self, event: NewEvent) -> RepoResult<Event> {
        let organizer_id = event
            .organizer_id
            .as_deref()
            .map(|id| parse_id(id, CLUB_NOT_FOUND))
            .transpose()?;
        let conn = &mut self.pool.get().await.map_err(unavailable)?;
        if let Some(organizer_id) = organizer_id {
            ensure_club(conn, organizer_id).await?;
        }

        let created = diesel::insert_into(events::table)
            .values((
                events::title.eq(event.title),
                events::description.eq(event.description),
                events::scheduled_at.eq(event.date),
                events::image_url.eq(event.image),
                events::organizer_id.eq(organizer_id),
            ))
            .get_result::<EventRecord>(conn)
            .await?;

        load_event(conn, created.id).await
    }

    async fn rsvp(&self, id: &str, who: Enrollee) -> RepoResult<Event> {
        let event_id = parse_id(id, EVENT_NOT_FOUND)?;
        let conn = &mut self.pool.get().await.map_err(unavailable)?;
        ensure_event(conn, event_id).await?;

        let inserted = diesel::insert_into(event_attendees::table)
            .values((
                event_attendees::event_id.eq(event_id),
                event_attendees::user_id.eq(&who.user_id),
                event_attendees::display_name.eq(&who.display_name),
                event_attendees::rsvped_at.eq(Utc::now()),
            ))
            .on_conflict((event_attendees::event_id, event_attendees::user_id))
            .do_nothing()
            .execute(conn)
            .await?;

        if inserted == 0 {
            return Err(RepoError::Rejected(Event::ALREADY_ENROLLED.into()));
        }

        load_event(conn, event_id).await
    }

    async fn cancel_rsvp(&self, id: &str, user_id: &str) -> RepoResult<Event> {
        let event_id = parse_id(id, EVENT_NOT_FOUND)?;
        let conn = &mut self.pool.get().await.map_err(unavailable)?;
        ensure_event(conn, event_id).await?;

        diesel::delete(
            event_attendees::table
                .filter(event_attendees::event_id.eq(event_id))
                .filter(event_attendees::user_id.eq(user_id)),
        )
        .execute(conn)
        .await?;

        load_event(conn, event_id).await
    }

    async fn list_news(&self) -> RepoResult<Vec<NewsArticle>> {
        let conn = &mut self.pool.get().await.map_err(unavailable)?;

        Ok(news::table
            .order(news::published_at.desc())
            .load::<NewsRecord>(conn)
            .await?
            .into_iter()
            .map(NewsArticle::from)
            .collect())
    }

    async fn article(&self, id: &str) -> RepoResult<NewsArticle> {
        let id = parse_id(id, NEWS_NOT_FOUND)?;
        let conn = &mut self.pool.get().await.map_err(unavailable)?;

        news::table
            .find(id)
            .first::<NewsRecord>(conn)
            .await
            .optional()?
            .map(NewsArticle::from)
            .ok_or(RepoError::NotFound(NEWS_NOT_FOUND))
    }

    async fn create_article(&self, article: NewArticle) -> RepoResult<NewsArticle> {
        let conn = &mut self.pool.get().await.map_err(unavailable)?;

        let created = diesel::insert_into(news::table)
            .values((
                news::title.eq(article.title),
                news::content.eq(article.content),
                news::author_id.eq(article.author_id),
                news::author_name.eq(article.author_name),
                news::category.eq(article.category),
                news::published_at.eq(Utc::now()),
                news::image_url.eq(article.image),
            ))
            .get_result::<NewsRecord>(conn)
            .await?;

        Ok(created.into())
    }

    async fn user(&self, id: &str) -> RepoResult<User> {
        let conn = &mut self.pool.get().await.map_err(unavailable)?;
        let record = find_user(conn, id)
            .await?
            .ok_or(RepoError::NotFound(USER_NOT_FOUND))?;
        load_user(conn, record).await
    }

    async fn authenticate(&self, profile: AuthProfile) -> RepoResult<(User, bool)> {
        let conn = &mut self.pool.get().await.map_err(unavailable)?;
        let now = Utc::now();

        if let Some(existing) = find_user(conn, &profile.uid).await? {
            let photo_url = profile.photo_url.or(existing.photo_url);
            let updated = diesel::update(users::table.find(&profile.uid))
                .set((users::last_login.eq(now), users::photo_url.eq(photo_url)))
                .get_result::<UserRecord>(conn)
                .await?;
            return Ok((load_user(conn, updated).await?, false));
        }

        if email_taken(conn, &profile.email).await? {
            return Err(RepoError::Rejected(
                "Email is already registered to another account".into(),
            ));
        }

        let created = diesel::insert_into(users::table)
            .values(UserRecord {
                id: profile.uid,
                name: profile.name,
                email: profile.email,
                photo_url: profile.photo_url,
                role: "student".to_string(),
                badges: Vec::new(),
                created_at: now,
                last_login: now,
            })
            .get_result::<UserRecord>(conn)
            .await?;

        Ok((created.into_user(Vec::new()), true))
    }

    async fn register(&self, user: NewUser) -> RepoResult<User> {
        let conn = &mut self.pool.get().await.map_err(unavailable)?;

        if email_taken(conn, &user.email).await? {
            return Err(RepoError::Rejected("User already exists".into()));
        }

        let now = Utc::now();
        let created = diesel::insert_into(users::table)
            .values(UserRecord {
                id: nanoid!(),
                name: user.name,
                email: user.email,
                photo_url: None,
                role: user.role,
                badges: Vec::new(),
                created_at: now,
                last_login: now,
            })
            .get_result::<UserRecord>(conn)
            .await?;

        Ok(created.into_user(Vec::new()))
    }

    async fn add_badges(&self, id: &str, badges: Vec<String>) -> RepoResult<User> {
        let conn = &mut self.pool.get().await.map_err(unavailable)?;
        let record = find_user(conn, id)
            .await?
            .ok_or(RepoError::NotFound(USER_NOT_FOUND))?;

        let mut held = record.badges;
        merge_badges(&mut held, badges);

        let updated = diesel::update(users::table.find(id))
            .set(users::badges.eq(held))
            .get_result::<UserRecord>(conn)
            .await?;

        load_user(conn, updated).await
    }
}
