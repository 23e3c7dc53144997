//! Client-side roster state for one entity type.
//!
//! Every mutation tries the backend first. When the backend cannot be
//! reached (or refuses) the same mutation is applied to the in-memory list
//! instead. Rosters are written to the override cache in both cases, and
//! entities created locally get their own cache entry, so both survive a
//! restart.

use super::{
    cache::OverrideCache,
    remote::{Enroll, Fetch, RemoteError},
};
use crate::{
    entity::{Enrollable, Event},
    roster::{self, Enrollment},
    sample::Defaults,
};
use chrono::Utc;
use std::{future::Future, sync::Arc};
use thiserror::Error;

/// Prefix of identifiers minted for entities created without the backend.
pub const LOCAL_ID_PREFIX: &str = "local-";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MembershipError {
    #[error("{0}")]
    Duplicate(&'static str),
    #[error("{noun} `{id}` not found")]
    NotFound { noun: &'static str, id: String },
}

/// Remote list, or the built-in defaults when the remote fails.
pub async fn fetch_or_defaults<T, S>(source: &S) -> Vec<T>
where
    T: Defaults,
    S: Fetch<T> + ?Sized,
{
    match source.fetch_all().await {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!(error = %e, "remote fetch failed, using built-in data");
            T::defaults()
        }
    }
}

pub struct MembershipStore<E: Enrollable> {
    entities: Vec<E>,
    remote: Arc<dyn Enroll<E>>,
    cache: Arc<OverrideCache>,
}

impl<E: Enrollable + Defaults> MembershipStore<E> {
    pub fn new(remote: Arc<dyn Enroll<E>>, cache: Arc<OverrideCache>) -> Self {
        Self {
            entities: Vec::new(),
            remote,
            cache,
        }
    }

    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    pub fn get(&self, entity_id: &str) -> Option<&E> {
        self.entities.iter().find(|e| e.id() == entity_id)
    }

    pub async fn fetch_all(&self) -> Vec<E> {
        fetch_or_defaults(self.remote.as_ref()).await
    }

    /// Puts locally created entities missing from `list` in front, then
    /// replaces each roster that has a persisted override. Idempotent.
    pub async fn merge_with_persisted_overrides(&self, list: Vec<E>) -> Vec<E> {
        let mut created = self.cache.load_created::<E>().await;
        created.retain(|c| !list.iter().any(|e| e.id() == c.id()));
        let mut list: Vec<E> = created.into_iter().chain(list).collect();

        let overrides = self.cache.load::<E>().await;
        for entity in &mut list {
            if let Some(roster) = overrides.get(entity.id()) {
                *entity.roster_mut() = roster.clone();
            }
        }
        list
    }

    pub async fn refresh(&mut self) -> &[E] {
        let fetched = self.fetch_all().await;
        self.entities = self.merge_with_persisted_overrides(fetched).await;
        &self.entities
    }

    pub fn is_member(&self, entity_id: &str, user_id: &str) -> bool {
        self.get(entity_id)
            .map_or(false, |e| roster::contains(e.roster(), user_id))
    }

    pub async fn join(
        &mut self,
        entity_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> Result<E, MembershipError> {
        let remote = Arc::clone(&self.remote);
        let attempt = remote.enroll(entity_id, user_id, display_name);
        let joined = self
            .with_remote_fallback("join", attempt, |entities| {
                let entity = find_mut(entities, entity_id)?;
                let record = E::Record::new(user_id.to_string(), display_name.to_string(), Utc::now());
                roster::enroll(entity.roster_mut(), record)
                    .map_err(|_| MembershipError::Duplicate(E::ALREADY_ENROLLED))?;
                Ok(entity.clone())
            })
            .await?;
        self.persist_rosters(entity_id).await;
        Ok(joined)
    }

    /// Leaving an entity the user never joined succeeds without changes.
    pub async fn leave(&mut self, entity_id: &str, user_id: &str) -> Result<E, MembershipError> {
        let remote = Arc::clone(&self.remote);
        let attempt = remote.withdraw(entity_id, user_id);
        let left = self
            .with_remote_fallback("leave", attempt, |entities| {
                let entity = find_mut(entities, entity_id)?;
                if !roster::withdraw(entity.roster_mut(), user_id) {
                    tracing::debug!(noun = E::NOUN, id = entity_id, user_id, "not enrolled");
                }
                Ok(entity.clone())
            })
            .await?;
        self.persist_rosters(entity_id).await;
        Ok(left)
    }

    /// Creates on the backend, or locally under a `local-<millis>` id. Local
    /// entities are persisted and merged back in by every refresh.
    pub async fn create(&mut self, draft: E::Draft) -> Result<E, MembershipError> {
        let remote = Arc::clone(&self.remote);
        let attempt = remote.create(&draft);
        let created = self
            .with_remote_fallback("create", attempt, |entities| {
                let now = Utc::now();
                let mut stamp = now.timestamp_millis();
                while entities.iter().any(|e| e.id() == local_id(stamp)) {
                    stamp += 1;
                }
                let entity = E::from_draft(local_id(stamp), &draft, now);
                entities.insert(0, entity.clone());
                Ok(entity)
            })
            .await?;

        let local: Vec<E> = self
            .entities
            .iter()
            .filter(|e| e.id().starts_with(LOCAL_ID_PREFIX))
            .cloned()
            .collect();
        if let Err(e) = self.cache.save_created(&local).await {
            tracing::error!(key = E::CREATED_KEY, error = %e, "failed to persist created entities");
        }
        Ok(created)
    }

    /// Awaits `remote` and adopts its result, or runs `local` against the
    /// in-memory list when the remote fails for any reason.
    async fn with_remote_fallback<F, L>(
        &mut self,
        op: &'static str,
        remote: F,
        local: L,
    ) -> Result<E, MembershipError>
    where
        F: Future<Output = Result<E, RemoteError>>,
        L: FnOnce(&mut Vec<E>) -> Result<E, MembershipError>,
    {
        match remote.await {
            Ok(confirmed) => Ok(self.adopt(confirmed)),
            Err(e) => {
                tracing::warn!(noun = E::NOUN, op, error = %e, "remote update failed, applying locally");
                local(&mut self.entities)
            }
        }
    }

    async fn persist_rosters(&self, touched: &str) {
        if let Err(e) = self.cache.save(&self.entities, touched).await {
            tracing::error!(key = E::CACHE_KEY, error = %e, "failed to persist overrides");
        }
    }

    /// Takes the server's roster for an entity already in memory, or adds
    /// the entity when it is new to this store.
    fn adopt(&mut self, confirmed: E) -> E {
        match self.entities.iter_mut().find(|e| e.id() == confirmed.id()) {
            Some(entity) => {
                *entity.roster_mut() = confirmed.roster().to_vec();
                entity.clone()
            }
            None => {
                self.entities.insert(0, confirmed.clone());
                confirmed
            }
        }
    }
}

fn local_id(stamp: i64) -> String {
    format!("{LOCAL_ID_PREFIX}{stamp}")
}

fn find_mut<'a, E: Enrollable>(entities: &'a mut [E], id: &str) -> Result<&'a mut E, MembershipError> {
    entities
        .iter_mut()
        .find(|e| e.id() == id)
        .ok_or_else(|| MembershipError::NotFound {
            noun: E::NOUN,
            id: id.to_string(),
        })
}

impl MembershipStore<Event> {
    pub async fn rsvp(
        &mut self,
        event_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> Result<Event, MembershipError> {
        self.join(event_id, user_id, display_name).await
    }

    pub async fn cancel(&mut self, event_id: &str, user_id: &str) -> Result<Event, MembershipError> {
        self.leave(event_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::remote::Offline,
        entity::{Club, ClubDraft, EventDraft},
        roster::Participant,
    };
    use async_trait::async_trait;

    async fn offline<E: Enrollable + Defaults>(cache: &Arc<OverrideCache>) -> MembershipStore<E> {
        let mut store = MembershipStore::new(Arc::new(Offline), Arc::clone(cache));
        store.refresh().await;
        store
    }

    fn members(store: &MembershipStore<Club>, id: &str) -> Vec<Participant<crate::entity::Member>> {
        store.get(id).unwrap().members.clone()
    }

    #[tokio::test]
    async fn unreachable_remote_yields_default_clubs() {
        let cache = Arc::new(OverrideCache::in_memory());
        let store = offline::<Club>(&cache).await;
        assert!(!store.entities().is_empty());
        assert!(store.entities().iter().any(|c| c.name.contains("Robotics Club")));
    }

    #[tokio::test]
    async fn local_join_appends_exactly_one_record() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Club>(&cache).await;

        let club = store.join("3", "u1", "Alice").await.unwrap();
        let matching: Vec<_> = club.members.iter().filter(|m| m.user_key() == "u1").collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].display_name(), "Alice");
        assert!(store.is_member("3", "u1"));
    }

    #[tokio::test]
    async fn join_then_leave_restores_roster() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Club>(&cache).await;
        store.join("1", "u0", "Zed").await.unwrap();
        let before = members(&store, "1");

        store.join("1", "u1", "Alice").await.unwrap();
        store.leave("1", "u1").await.unwrap();
        assert_eq!(members(&store, "1"), before);
    }

    #[tokio::test]
    async fn duplicate_join_is_rejected_and_roster_unchanged() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Club>(&cache).await;
        store.join("2", "u1", "Alice").await.unwrap();
        let before = members(&store, "2");

        let err = store.join("2", "u1", "Alice").await.unwrap_err();
        assert_eq!(err, MembershipError::Duplicate(Club::ALREADY_ENROLLED));
        assert_eq!(members(&store, "2"), before);
    }

    #[tokio::test]
    async fn second_rsvp_is_rejected() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Event>(&cache).await;

        let first = store.rsvp("2", "u2", "Bob").await.unwrap();
        let err = store.rsvp("2", "u2", "Bob").await.unwrap_err();
        assert!(err.to_string().contains("already RSVP'd"));
        assert_eq!(store.get("2").unwrap().attendees.len(), first.attendees.len());

        store.cancel("2", "u2").await.unwrap();
        assert!(!store.is_member("2", "u2"));
    }

    #[tokio::test]
    async fn leaving_a_club_never_joined_is_a_no_op() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Club>(&cache).await;
        let before = members(&store, "4");

        let club = store.leave("4", "stranger").await.unwrap();
        assert_eq!(club.members, before);
    }

    #[tokio::test]
    async fn unknown_entity_is_not_found_locally() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Club>(&cache).await;
        assert_eq!(
            store.join("404", "u1", "Alice").await.unwrap_err(),
            MembershipError::NotFound {
                noun: "club",
                id: "404".to_string()
            }
        );
    }

    #[tokio::test]
    async fn merge_is_idempotent() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Club>(&cache).await;
        store.join("5", "u1", "Alice").await.unwrap();

        let fetched = store.fetch_all().await;
        let once = store.merge_with_persisted_overrides(fetched).await;
        let twice = store.merge_with_persisted_overrides(once.clone()).await;
        assert_eq!(once, twice);
        assert!(roster::contains(&once[4].members, "u1"));
    }

    #[tokio::test]
    async fn overrides_survive_a_new_store() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Club>(&cache).await;
        store.join("6", "u1", "Alice").await.unwrap();
        store.join("1", "u1", "Alice").await.unwrap();
        store.leave("1", "u1").await.unwrap();

        let reopened = offline::<Club>(&cache).await;
        assert!(reopened.is_member("6", "u1"));
        assert!(!reopened.is_member("1", "u1"));
    }

    fn chess_club() -> ClubDraft {
        ClubDraft {
            name: "Chess Club".to_string(),
            category: "Games".to_string(),
            description: Some("Weekly blitz".to_string()),
        }
    }

    #[tokio::test]
    async fn offline_create_lists_the_club_first() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Club>(&cache).await;
        let count = store.entities().len();

        let club = store.create(chess_club()).await.unwrap();
        assert!(club.id.starts_with(LOCAL_ID_PREFIX));
        assert!(club.members.is_empty());
        assert_eq!(store.entities()[0], club);
        assert_eq!(store.entities().len(), count + 1);

        let second = store.create(chess_club()).await.unwrap();
        assert_ne!(second.id, club.id);
    }

    #[tokio::test]
    async fn created_clubs_survive_a_new_store_with_their_rosters() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Club>(&cache).await;
        let club = store.create(chess_club()).await.unwrap();
        store.join(&club.id, "u1", "Alice").await.unwrap();

        let mut reopened = offline::<Club>(&cache).await;
        assert_eq!(reopened.entities()[0].name, "Chess Club");
        assert!(reopened.is_member(&club.id, "u1"));

        let count = reopened.entities().len();
        reopened.refresh().await;
        assert_eq!(reopened.entities().len(), count);
    }

    #[tokio::test]
    async fn offline_events_can_be_created_and_rsvpd() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = offline::<Event>(&cache).await;
        let draft = EventDraft {
            title: "Chess Night".to_string(),
            date: Utc::now(),
            description: None,
            organizer_id: None,
        };

        let event = store.create(draft).await.unwrap();
        assert!(event.id.starts_with(LOCAL_ID_PREFIX));
        store.rsvp(&event.id, "u2", "Bob").await.unwrap();

        let reopened = offline::<Event>(&cache).await;
        assert_eq!(reopened.entities()[0].title, "Chess Night");
        assert!(reopened.is_member(&event.id, "u2"));
    }

    struct Confirming;

    #[async_trait]
    impl Fetch<Club> for Confirming {
        async fn fetch_all(&self) -> Result<Vec<Club>, RemoteError> {
            Ok(Club::defaults())
        }
    }

    #[async_trait]
    impl Enroll<Club> for Confirming {
        async fn create(&self, draft: &ClubDraft) -> Result<Club, RemoteError> {
            Ok(Club::from_draft("7".to_string(), draft, Utc::now()))
        }

        async fn enroll(&self, id: &str, user_id: &str, _: &str) -> Result<Club, RemoteError> {
            let mut club = Club::defaults()
                .into_iter()
                .find(|c| c.id == id)
                .ok_or(RemoteError::Status {
                    status: 404,
                    message: "Club not found".to_string(),
                })?;
            club.members = vec![Participant::Bare("owner".into()), Participant::Bare(user_id.into())];
            Ok(club)
        }

        async fn withdraw(&self, _: &str, _: &str) -> Result<Club, RemoteError> {
            Err(RemoteError::Offline)
        }
    }

    #[tokio::test]
    async fn remote_success_adopts_server_roster() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = MembershipStore::new(Arc::new(Confirming), Arc::clone(&cache));
        store.refresh().await;

        let club = store.join("3", "u1", "Alice").await.unwrap();
        let keys: Vec<_> = club.members.iter().map(|m| m.user_key()).collect();
        assert_eq!(keys, ["owner", "u1"]);
        assert_eq!(cache.load::<Club>().await["3"], club.members);
    }

    #[tokio::test]
    async fn remote_create_keeps_the_server_id() {
        let cache = Arc::new(OverrideCache::in_memory());
        let mut store = MembershipStore::new(Arc::new(Confirming), Arc::clone(&cache));
        store.refresh().await;

        let club = store.create(chess_club()).await.unwrap();
        assert_eq!(club.id, "7");
        assert_eq!(store.entities()[0], club);
        assert!(cache.load_created::<Club>().await.is_empty());
    }
}
