//! Client half: talks to the REST backend and keeps rosters usable offline.

pub mod cache;
pub mod filter;
pub mod remote;
pub mod store;

use crate::{
    entity::{Club, Event, NewsArticle},
    roster,
};
use anyhow::Context;
use cache::{FileStore, OverrideCache};
use chrono::{DateTime, Utc};
use envconfig::Envconfig;
use remote::{ApiClient, Enroll, Fetch, Offline};
use serde::Serialize;
use std::sync::Arc;
use store::MembershipStore;
use url::Url;

#[derive(Debug, Envconfig)]
pub struct ClientConfig {
    #[envconfig(from = "CLUBBEE_API_URL", default = "http://localhost:3001/")]
    pub api_url: String,
    #[envconfig(from = "CLUBBEE_TOKEN")]
    pub token: Option<String>,
    #[envconfig(from = "CLUBBEE_OFFLINE", default = "false")]
    pub offline: bool,
    #[envconfig(from = "CLUBBEE_CACHE_DIR", default = ".clubbee")]
    pub cache_dir: String,
}

/// Everything the client needs, wired once from configuration.
pub struct Session {
    pub clubs: MembershipStore<Club>,
    pub events: MembershipStore<Event>,
    pub news: Arc<dyn Fetch<NewsArticle>>,
}

impl Session {
    pub fn connect(config: &ClientConfig) -> anyhow::Result<Self> {
        let cache = Arc::new(OverrideCache::new(FileStore::new(&config.cache_dir)));

        if config.offline {
            tracing::info!("offline mode: using built-in data and local overrides");
            return Ok(Self::with_remote(Arc::new(Offline), cache));
        }

        let base = Url::parse(&config.api_url)
            .with_context(|| format!("invalid CLUBBEE_API_URL `{}`", config.api_url))?;
        let api = ApiClient::new(base, config.token.clone());
        Ok(Self::with_remote(Arc::new(api), cache))
    }

    fn with_remote<R>(remote: Arc<R>, cache: Arc<OverrideCache>) -> Self
    where
        R: Enroll<Club> + Enroll<Event> + Fetch<NewsArticle> + 'static,
    {
        Self {
            clubs: MembershipStore::new(remote.clone(), Arc::clone(&cache)),
            events: MembershipStore::new(remote.clone(), cache),
            news: remote,
        }
    }
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_clubs: usize,
    pub upcoming_events: usize,
    pub total_news: usize,
    pub my_clubs: usize,
}

impl Stats {
    pub fn compute(
        clubs: &[Club],
        events: &[Event],
        news: &[NewsArticle],
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let my_clubs = user_id.map_or(0, |user_id| {
            clubs
                .iter()
                .filter(|club| roster::contains(&club.members, user_id))
                .count()
        });

        Self {
            total_clubs: clubs.len(),
            upcoming_events: events.iter().filter(|e| e.date > now).count(),
            total_news: news.len(),
            my_clubs,
        }
    }
}
