use super::{
    merge_badges, AuthProfile, Enrollee, NewArticle, NewClub, NewEvent, NewUser, RepoError,
    RepoResult, Repository, CLUB_NOT_FOUND, EVENT_NOT_FOUND, NEWS_NOT_FOUND, USER_NOT_FOUND,
};
use crate::{
    entity::{Author, Club, Enrollable, Event, NewsArticle, Organizer, User},
    roster::{self, Enrollment},
    sample::Defaults,
};
use async_trait::async_trait;
use chrono::Utc;
use nanoid::nanoid;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct DemoState {
    clubs: Vec<Club>,
    events: Vec<Event>,
    news: Vec<NewsArticle>,
    users: HashMap<String, User>,
}

/// In-memory storage for demo mode and tests.
#[derive(Default)]
pub struct DemoRepository {
    state: Mutex<DemoState>,
}

impl DemoRepository {
    pub fn seeded() -> Self {
        Self {
            state: Mutex::new(DemoState {
                clubs: Club::defaults(),
                events: Event::defaults(),
                news: NewsArticle::defaults(),
                users: HashMap::new(),
            }),
        }
    }
}

fn next_id<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    (ids.filter_map(|id| id.parse::<u64>().ok()).max().unwrap_or(0) + 1).to_string()
}

fn find_mut<'a, E: Enrollable>(
    list: &'a mut [E],
    id: &str,
    missing: &'static str,
) -> RepoResult<&'a mut E> {
    list.iter_mut()
        .find(|e| e.id() == id)
        .ok_or(RepoError::NotFound(missing))
}

fn enroll<E: Enrollable>(entity: &mut E, who: Enrollee) -> RepoResult<E> {
    let record = E::Record::new(who.user_id, who.display_name, Utc::now());
    roster::enroll(entity.roster_mut(), record)
        .map_err(|_| RepoError::Rejected(E::ALREADY_ENROLLED.into()))?;
    Ok(entity.clone())
}

fn withdraw<E: Enrollable>(entity: &mut E, user_id: &str) -> E {
    roster::withdraw(entity.roster_mut(), user_id);
    entity.clone()
}

#[async_trait]
impl Repository for DemoRepository {
    async fn list_clubs(&self) -> RepoResult<Vec<Club>> {
        Ok(self.state.lock().await.clubs.clone())
    }

    async fn club(&self, id: &str) -> RepoResult<Club> {
        let state = self.state.lock().await;
        state
            .clubs
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(RepoError::NotFound(CLUB_NOT_FOUND))
    }

    async fn create_club(&self, club: NewClub) -> RepoResult<Club> {
        let mut state = self.state.lock().await;
        if state.clubs.iter().any(|c| c.name == club.name) {
            return Err(RepoError::Rejected(
                "Club with this name already exists".into(),
            ));
        }
        let created = Club {
            id: next_id(state.clubs.iter().map(|c| c.id.as_str())),
            name: club.name,
            category: club.category,
            description: club.description,
            members: Vec::new(),
            image: club.image,
            created_at: Some(Utc::now()),
        };
        state.clubs.insert(0, created.clone());
        Ok(created)
    }

    async fn join_club(&self, id: &str, who: Enrollee) -> RepoResult<Club> {
        let mut state = self.state.lock().await;
        let user_id = who.user_id.clone();
        let club = enroll(find_mut(&mut state.clubs, id, CLUB_NOT_FOUND)?, who)?;
        if let Some(user) = state.users.get_mut(&user_id) {
            if !user.clubs_joined.iter().any(|c| c == id) {
                user.clubs_joined.push(id.to_string());
            }
        }
        Ok(club)
    }

    async fn leave_club(&self, id: &str, user_id: &str) -> RepoResult<Club> {
        let mut state = self.state.lock().await;
        let club = withdraw(find_mut(&mut state.clubs, id, CLUB_NOT_FOUND)?, user_id);
        if let Some(user) = state.users.get_mut(user_id) {
            user.clubs_joined.retain(|c| c != id);
        }
        Ok(club)
    }

    async fn list_events(&self) -> RepoResult<Vec<Event>> {
        let mut events = self.state.lock().await.events.clone();
        events.sort_by_key(|e| e.date);
        Ok(events)
    }

    async fn event(&self, id: &str) -> RepoResult<Event> {
        let state = self.state.lock().await;
        state
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(RepoError::NotFound(EVENT_NOT_FOUND))
    }

    async fn create_event(&self, event: NewEvent) -> RepoResult<Event> {
        let mut state = self.state.lock().await;
        let organizer = match event.organizer_id {
            Some(club_id) => {
                let club = state
                    .clubs
                    .iter()
                    .find(|c| c.id == club_id)
                    .ok_or(RepoError::NotFound(CLUB_NOT_FOUND))?;
                Some(Organizer {
                    id: Some(club.id.clone()),
                    name: club.name.clone(),
                })
            }
            None => None,
        };
        let created = Event {
            id: next_id(state.events.iter().map(|e| e.id.as_str())),
            title: event.title,
            description: event.description,
            date: event.date,
            image: event.image,
            organizer,
            attendees: Vec::new(),
        };
        state.events.push(created.clone());
        Ok(created)
    }

    async fn rsvp(&self, id: &str, who: Enrollee) -> RepoResult<Event> {
        let mut state = self.state.lock().await;
        enroll(find_mut(&mut state.events, id, EVENT_NOT_FOUND)?, who)
    }

    async fn cancel_rsvp(&self, id: &str, user_id: &str) -> RepoResult<Event> {
        let mut state = self.state.lock().await;
        Ok(withdraw(
            find_mut(&mut state.events, id, EVENT_NOT_FOUND)?,
            user_id,
        ))
    }

    async fn list_news(&self) -> RepoResult<Vec<NewsArticle>> {
        let mut news = self.state.lock().await.news.clone();
        news.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(news)
    }

    async fn article(&self, id: &str) -> RepoResult<NewsArticle> {
        let state = self.state.lock().await;
        state
            .news
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or(RepoError::NotFound(NEWS_NOT_FOUND))
    }

    async fn create_article(&self, article: NewArticle) -> RepoResult<NewsArticle> {
        let mut state = self.state.lock().await;
        let created = NewsArticle {
            id: next_id(state.news.iter().map(|n| n.id.as_str())),
            title: article.title,
            content: article.content,
            author: Author {
                id: article.author_id,
                name: article.author_name,
            },
            category: article.category,
            date: Utc::now(),
            image: article.image,
        };
        state.news.push(created.clone());
        Ok(created)
    }

    async fn user(&self, id: &str) -> RepoResult<User> {
        let state = self.state.lock().await;
        state
            .users
            .get(id)
            .cloned()
            .ok_or(RepoError::NotFound(USER_NOT_FOUND))
    }

    async fn authenticate(&self, profile: AuthProfile) -> RepoResult<(User, bool)> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        if let Some(user) = state.users.get_mut(&profile.uid) {
            user.last_login = now;
            if profile.photo_url.is_some() {
                user.photo_url = profile.photo_url;
            }
            return Ok((user.clone(), false));
        }
        let user = User {
            id: profile.uid,
            name: profile.name,
            email: profile.email,
            photo_url: profile.photo_url,
            role: "student".to_string(),
            clubs_joined: Vec::new(),
            badges: Vec::new(),
            created_at: now,
            last_login: now,
        };
        state.users.insert(user.id.clone(), user.clone());
        Ok((user, true))
    }

    async fn register(&self, user: NewUser) -> RepoResult<User> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::Rejected("User already exists".into()));
        }
        let now = Utc::now();
        let user = User {
            id: nanoid!(),
            name: user.name,
            email: user.email,
            photo_url: None,
            role: user.role,
            clubs_joined: Vec::new(),
            badges: Vec::new(),
            created_at: now,
            last_login: now,
        };
        state.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn add_badges(&self, id: &str, badges: Vec<String>) -> RepoResult<User> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or(RepoError::NotFound(USER_NOT_FOUND))?;
        merge_badges(&mut user.badges, badges);
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Enrollee {
        Enrollee {
            user_id: "u1".to_string(),
            display_name: "Alice".to_string(),
        }
    }

    #[tokio::test]
    async fn join_is_unique_per_user() {
        let repo = DemoRepository::seeded();
        let club = repo.join_club("3", alice()).await.unwrap();
        assert_eq!(club.members.len(), 1);

        match repo.join_club("3", alice()).await {
            Err(RepoError::Rejected(message)) => {
                assert_eq!(message, "User is already a member of this club")
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(repo.club("3").await.unwrap().members.len(), 1);
    }

    #[tokio::test]
    async fn leave_and_cancel_are_idempotent() {
        let repo = DemoRepository::seeded();
        repo.rsvp("2", alice()).await.unwrap();
        assert!(repo.cancel_rsvp("2", "u1").await.unwrap().attendees.is_empty());
        assert!(repo.cancel_rsvp("2", "u1").await.unwrap().attendees.is_empty());
        assert!(repo.leave_club("1", "u1").await.unwrap().members.is_empty());
    }

    #[tokio::test]
    async fn missing_entities_are_not_found() {
        let repo = DemoRepository::seeded();
        assert!(matches!(
            repo.join_club("404", alice()).await,
            Err(RepoError::NotFound(CLUB_NOT_FOUND))
        ));
        assert!(matches!(
            repo.article("404").await,
            Err(RepoError::NotFound(NEWS_NOT_FOUND))
        ));
    }

    #[tokio::test]
    async fn membership_is_tracked_on_the_user() {
        let repo = DemoRepository::seeded();
        let profile = AuthProfile {
            uid: "u1".to_string(),
            email: "alice@example.com".to_string(),
            name: "Alice".to_string(),
            photo_url: None,
        };
        let (_, created) = repo.authenticate(profile.clone()).await.unwrap();
        assert!(created);
        let (_, created) = repo.authenticate(profile).await.unwrap();
        assert!(!created);

        repo.join_club("4", alice()).await.unwrap();
        assert_eq!(repo.user("u1").await.unwrap().clubs_joined, ["4"]);
        repo.leave_club("4", "u1").await.unwrap();
        assert!(repo.user("u1").await.unwrap().clubs_joined.is_empty());
    }

    #[tokio::test]
    async fn created_clubs_get_fresh_ids_and_unique_names() {
        let repo = DemoRepository::seeded();
        let club = repo
            .create_club(NewClub {
                name: "Chess Club".to_string(),
                category: "Games".to_string(),
                description: None,
                image: None,
            })
            .await
            .unwrap();
        assert_eq!(club.id, "7");
        assert_eq!(repo.list_clubs().await.unwrap()[0].name, "Chess Club");

        let duplicate = repo
            .create_club(NewClub {
                name: "Chess Club".to_string(),
                category: "Games".to_string(),
                description: None,
                image: None,
            })
            .await;
        assert!(matches!(duplicate, Err(RepoError::Rejected(_))));
    }

    #[tokio::test]
    async fn events_take_their_organizer_name() {
        let repo = DemoRepository::seeded();
        let event = repo
            .create_event(NewEvent {
                title: "Open Mic".to_string(),
                date: Utc::now(),
                description: None,
                image: None,
                organizer_id: Some("2".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(event.organizer.unwrap().name, "Drama Society");

        let events = repo.list_events().await.unwrap();
        assert!(events.windows(2).all(|w| w[0].date <= w[1].date));
    }
}
