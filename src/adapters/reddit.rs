//! Reddit source client.
//!
//! Uses the OAuth2 client-credentials flow ("application only") and the
//! JSON listing endpoints:
//! - `GET /r/{name}/about` to open a subreddit
//! - `GET /r/{name}/top` paginated with `after`, 100 per page
//! - `GET /api/info?id=t3_{id}` to load one submission in full

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{SourceClient, SourceError, SourceHandle};
use crate::config::{RedditCredentials, RedditSettings};
use crate::domain::{MediaRef, Source, Submission};

/// Maximum page size accepted by the listing endpoints
const PAGE_SIZE: usize = 100;

/// Refresh tokens this long before they expire
const TOKEN_SLACK: Duration = Duration::from_secs(60);

/// Reddit API client
pub struct RedditClient {
    /// HTTP client (carries the User-Agent)
    http: reqwest::Client,

    /// Application credentials
    credentials: RedditCredentials,

    /// Endpoints and listing options
    settings: RedditSettings,

    /// Cached bearer token
    token: Mutex<Option<AccessToken>>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    /// Token valid for `expires_in` seconds from `now`.
    ///
    /// An expiry too far out to represent is treated as already expired.
    fn new(value: String, expires_in: u64, now: Instant) -> Self {
        let expires_at = now
            .checked_add(Duration::from_secs(expires_in))
            .unwrap_or(now);
        Self { value, expires_at }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now.checked_add(TOKEN_SLACK)
            .is_some_and(|deadline| deadline < self.expires_at)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    kind: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct Listing {
    after: Option<String>,
    #[serde(default)]
    children: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SubredditAbout {
    display_name: String,
}

/// Link ("t3") payload, trimmed to what ingestion needs
#[derive(Debug, Deserialize)]
struct RawPost {
    id: String,
    title: String,
    #[serde(default)]
    over_18: bool,
    link_flair_text: Option<String>,
    #[serde(default)]
    url: String,
    gallery_data: Option<GalleryData>,
    media_metadata: Option<IndexMap<String, MediaMetadataEntry>>,
}

#[derive(Debug, Deserialize)]
struct GalleryData {
    items: Vec<GalleryItem>,
}

#[derive(Debug, Deserialize)]
struct GalleryItem {
    media_id: String,
}

#[derive(Debug, Deserialize)]
struct MediaMetadataEntry {
    id: Option<String>,
    s: Option<MediaSource>,
}

#[derive(Debug, Deserialize)]
struct MediaSource {
    u: Option<String>,
    gif: Option<String>,
}

impl MediaMetadataEntry {
    fn source_url(&self) -> Option<&str> {
        let s = self.s.as_ref()?;
        s.u.as_deref().or(s.gif.as_deref())
    }
}

impl RawPost {
    /// Convert to a submission, resolving gallery entries in gallery order
    fn into_submission(self) -> Submission {
        let gallery = self.gallery_data.is_some() || self.media_metadata.is_some();
        let mut media_items = Vec::new();

        if let Some(metadata) = &self.media_metadata {
            let ordered_ids: Vec<String> = match &self.gallery_data {
                Some(gallery) => gallery.items.iter().map(|i| i.media_id.clone()).collect(),
                None => metadata.keys().cloned().collect(),
            };

            for key in ordered_ids {
                let Some(entry) = metadata.get(&key) else {
                    continue;
                };
                match entry.source_url() {
                    Some(url) => {
                        let media_id = entry.id.clone().unwrap_or(key);
                        media_items.push(MediaRef::new(url, media_id));
                    }
                    None => debug!(post = %self.id, media_id = %key, "Gallery entry has no source url"),
                }
            }
        }

        Submission {
            id: self.id,
            title: self.title,
            nsfw: self.over_18,
            flair: self.link_flair_text,
            url: self.url,
            gallery,
            media_items,
        }
    }
}

fn parse_post(value: serde_json::Value) -> Result<Submission, SourceError> {
    let id = value
        .pointer("/data/id")
        .and_then(|v| v.as_str())
        .unwrap_or("<unknown>")
        .to_string();

    let thing: Thing<RawPost> =
        serde_json::from_value(value).map_err(|e| SourceError::SubmissionLoad {
            id: id.clone(),
            reason: e.to_string(),
        })?;

    if thing.kind != "t3" {
        return Err(SourceError::SubmissionLoad {
            id,
            reason: format!("unexpected kind '{}'", thing.kind),
        });
    }

    Ok(thing.data.into_submission())
}

/// Pagination state for the top listing
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageCursor {
    after: Option<String>,
    remaining: usize,
    done: bool,
}

impl PageCursor {
    fn new(limit: usize) -> Self {
        Self {
            after: None,
            remaining: limit,
            done: limit == 0,
        }
    }

    /// Size of the next page request
    fn page_size(&self) -> usize {
        self.remaining.min(PAGE_SIZE)
    }

    /// Consume one listing page.
    ///
    /// Ends the listing once the limit is reached, the page is empty or the
    /// remote reports no further page.
    fn advance(mut self, listing: Listing) -> (Vec<Result<Submission, SourceError>>, Self) {
        let entries: Vec<_> = listing
            .children
            .into_iter()
            .take(self.remaining)
            .map(parse_post)
            .collect();

        self.remaining -= entries.len();
        self.after = listing.after;
        self.done = self.remaining == 0 || self.after.is_none() || entries.is_empty();
        (entries, self)
    }

    /// A failed page yields its error and ends the listing
    fn fail(mut self, error: SourceError) -> (Vec<Result<Submission, SourceError>>, Self) {
        self.done = true;
        (vec![Err(error)], self)
    }
}

impl RedditClient {
    /// Create a client from explicit credentials and settings
    pub fn new(credentials: RedditCredentials, settings: RedditSettings) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            credentials,
            settings,
            token: Mutex::new(None),
        })
    }

    /// Get a valid bearer token, requesting a new one if needed
    async fn access_token(&self) -> Result<String, SourceError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let response: TokenResponse = self
            .http
            .post(&self.settings.auth_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| SourceError::Auth(e.to_string()))?
            .json()
            .await?;

        let value = match (response.access_token, response.error) {
            (Some(token), None) => token,
            (_, Some(error)) => return Err(SourceError::Auth(error)),
            (None, None) => return Err(SourceError::Auth("no access token in response".to_string())),
        };

        debug!(expires_in = response.expires_in, "Obtained access token");

        *cached = Some(AccessToken::new(value.clone(), response.expires_in, Instant::now()));

        Ok(value)
    }

    /// Authenticated GET returning JSON
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.settings.api_url.trim_end_matches('/'), path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .query(&[("raw_json", "1")])
            .send()
            .await?
            .error_for_status()?;

        response.json().await.map_err(SourceError::from)
    }

    /// Fetch one page of the top listing
    async fn top_page(
        &self,
        handle: &SourceHandle,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Listing, SourceError> {
        let mut query = vec![
            ("t", self.settings.time_filter.clone()),
            ("limit", limit.to_string()),
        ];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let thing: Thing<Listing> = self
            .get_json(&format!("/r/{}/top", handle.source.id), &query)
            .await?;
        Ok(thing.data)
    }
}

#[async_trait]
impl SourceClient for RedditClient {
    fn name(&self) -> &str {
        "reddit"
    }

    async fn open(&self, source: &Source) -> Result<SourceHandle, SourceError> {
        let unavailable = |reason: String| SourceError::Unavailable {
            source_id: source.id.clone(),
            reason,
        };

        let thing: Thing<SubredditAbout> = self
            .get_json(&format!("/r/{}/about", source.id), &[])
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if thing.kind != "t5" {
            return Err(unavailable(format!("not a subreddit (kind '{}')", thing.kind)));
        }

        Ok(SourceHandle::new(source.clone()).with_name(thing.data.display_name))
    }

    fn top_submissions<'a>(
        &'a self,
        handle: &'a SourceHandle,
        limit: usize,
    ) -> BoxStream<'a, Result<Submission, SourceError>> {
        stream::unfold(PageCursor::new(limit), move |cursor| async move {
            if cursor.done {
                return None;
            }

            let page = self
                .top_page(handle, cursor.after.as_deref(), cursor.page_size())
                .await;
            match page {
                Ok(listing) => Some(cursor.advance(listing)),
                Err(e) => {
                    warn!(source = %handle.source.id, error = %e, "Listing page failed, ending listing");
                    Some(cursor.fail(e))
                }
            }
        })
        .flat_map(stream::iter)
        .boxed()
    }

    async fn load(
        &self,
        _handle: &SourceHandle,
        submission: Submission,
    ) -> Result<Submission, SourceError> {
        let load_error = |reason: String| SourceError::SubmissionLoad {
            id: submission.id.clone(),
            reason,
        };

        let thing: Thing<Listing> = self
            .get_json("/api/info", &[("id", format!("t3_{}", submission.id))])
            .await
            .map_err(|e| load_error(e.to_string()))?;

        let entry = thing
            .data
            .children
            .into_iter()
            .next()
            .ok_or_else(|| load_error("submission no longer exists".to_string()))?;

        parse_post(entry)
    }
}
