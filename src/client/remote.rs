use crate::entity::{Club, ClubDraft, Enrollable, Event, EventDraft, NewsArticle};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("offline mode")]
    Offline,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("server responded {status}: {message}")]
    Status { status: u16, message: String },
}

/// Source of a full entity list.
#[async_trait]
pub trait Fetch<T>: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<T>, RemoteError>;
}

/// Remote creation and roster mutations. Success returns the
/// server-confirmed entity.
#[async_trait]
pub trait Enroll<E: Enrollable>: Fetch<E> {
    async fn create(&self, draft: &E::Draft) -> Result<E, RemoteError>;
    async fn enroll(&self, id: &str, user_id: &str, display_name: &str) -> Result<E, RemoteError>;
    async fn withdraw(&self, id: &str, user_id: &str) -> Result<E, RemoteError>;
}

/// Stands in for every remote when the client runs offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

#[async_trait]
impl<T: Send + 'static> Fetch<T> for Offline {
    async fn fetch_all(&self) -> Result<Vec<T>, RemoteError> {
        Err(RemoteError::Offline)
    }
}

#[async_trait]
impl<E: Enrollable> Enroll<E> for Offline {
    async fn create(&self, _: &E::Draft) -> Result<E, RemoteError> {
        Err(RemoteError::Offline)
    }

    async fn enroll(&self, _: &str, _: &str, _: &str) -> Result<E, RemoteError> {
        Err(RemoteError::Offline)
    }

    async fn withdraw(&self, _: &str, _: &str) -> Result<E, RemoteError> {
        Err(RemoteError::Offline)
    }
}

/// HTTP client for the CLUBBEE REST backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl ApiClient {
    /// `base` is the server root, e.g. `http://localhost:3001/`.
    pub fn new(base: Url, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            token,
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RemoteError> {
        let url = self.base.join("api/")?.join(path)?;
        let builder = self.http.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, RemoteError> {
        let resp = builder.send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn check(resp: Response) -> Result<Response, RemoteError> {
        #[derive(Deserialize)]
        struct ErrorBody {
            message: String,
        }

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or_default().to_string());
        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn create_club(&self, draft: &ClubDraft) -> Result<Club, RemoteError> {
        Self::send(self.request(Method::POST, "clubs")?.json(draft)).await
    }

    pub async fn create_event(&self, draft: &EventDraft) -> Result<Event, RemoteError> {
        Self::send(self.request(Method::POST, "events")?.json(draft)).await
    }
}

#[async_trait]
impl Fetch<Club> for ApiClient {
    async fn fetch_all(&self) -> Result<Vec<Club>, RemoteError> {
        Self::send(self.request(Method::GET, "clubs")?).await
    }
}

#[async_trait]
impl Enroll<Club> for ApiClient {
    async fn create(&self, draft: &ClubDraft) -> Result<Club, RemoteError> {
        self.create_club(draft).await
    }

    async fn enroll(&self, id: &str, user_id: &str, display_name: &str) -> Result<Club, RemoteError> {
        let body = json!({ "userId": user_id, "displayName": display_name });
        Self::send(self.request(Method::PUT, &format!("clubs/{id}/join"))?.json(&body)).await
    }

    async fn withdraw(&self, id: &str, user_id: &str) -> Result<Club, RemoteError> {
        let body = json!({ "userId": user_id });
        Self::send(self.request(Method::PUT, &format!("clubs/{id}/leave"))?.json(&body)).await
    }
}

#[async_trait]
impl Fetch<Event> for ApiClient {
    async fn fetch_all(&self) -> Result<Vec<Event>, RemoteError> {
        Self::send(self.request(Method::GET, "events")?).await
    }
}

#[async_trait]
impl Enroll<Event> for ApiClient {
    async fn create(&self, draft: &EventDraft) -> Result<Event, RemoteError> {
        self.create_event(draft).await
    }

    async fn enroll(&self, id: &str, user_id: &str, display_name: &str) -> Result<Event, RemoteError> {
        let body = json!({ "action": "rsvp", "userId": user_id, "displayName": display_name });
        Self::send(self.request(Method::PUT, &format!("events/{id}/rsvp"))?.json(&body)).await
    }

    async fn withdraw(&self, id: &str, user_id: &str) -> Result<Event, RemoteError> {
        let body = json!({ "action": "cancel", "userId": user_id });
        Self::send(self.request(Method::PUT, &format!("events/{id}/rsvp"))?.json(&body)).await
    }
}

#[async_trait]
impl Fetch<NewsArticle> for ApiClient {
    async fn fetch_all(&self) -> Result<Vec<NewsArticle>, RemoteError> {
        Self::send(self.request(Method::GET, "news")?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_rooted_under_api() {
        let client = ApiClient::new(Url::parse("http://localhost:3001/").unwrap(), None);
        let req = client
            .request(Method::PUT, "clubs/3/join")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(req.url().as_str(), "http://localhost:3001/api/clubs/3/join");
        assert!(req.headers().get("authorization").is_none());
    }

    #[test]
    fn token_is_sent_as_bearer() {
        let client = ApiClient::new(
            Url::parse("http://localhost:3001/").unwrap(),
            Some("abc".to_string()),
        );
        let req = client.request(Method::GET, "events").unwrap().build().unwrap();
        assert_eq!(req.headers()["authorization"], "Bearer abc");
    }

    #[tokio::test]
    async fn offline_always_fails() {
        let offline = Offline;
        let fetched: Result<Vec<Club>, _> = offline.fetch_all().await;
        assert!(matches!(fetched, Err(RemoteError::Offline)));
        let joined: Result<Event, _> = Enroll::<Event>::enroll(&offline, "1", "u1", "Alice").await;
        assert!(matches!(joined, Err(RemoteError::Offline)));
    }

    #[test]
    fn event_drafts_use_backend_field_names() {
        let draft = EventDraft {
            title: "Chess Night".to_string(),
            date: "2025-11-02T18:00:00Z".parse().unwrap(),
            description: None,
            organizer_id: Some("4".to_string()),
        };
        let body = serde_json::to_value(&draft).unwrap();
        assert_eq!(body["organizerId"], "4");
        assert_eq!(body["date"], "2025-11-02T18:00:00Z");
        assert!(body.get("description").is_none());
    }
}
