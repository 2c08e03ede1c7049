//! HTTP client for the place/article backend.
//!
//! Every call is blocking; callers run them inside `AsyncComputeTaskPool`
//! tasks and poll for the result, so the frame loop never waits on the network.

mod place;

pub use place::{Article, Place};

use std::time::Duration;

use bevy::prelude::*;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::{AppConfig, ConfigLoaded};
use crate::constants::{DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_URL, USER_AGENT};
use crate::geo::LatLngBounds;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid server url {0:?}: expected http:// or https://")]
    InvalidBaseUrl(String),
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },
    #[error("{endpoint} responded with HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Client for `/search`, `/update` and `/articles`
#[derive(Resource, Clone)]
pub struct SearchClient {
    base_url: String,
    agent: ureq::Agent,
}

impl Default for SearchClient {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL.to_string(),
            agent: build_agent(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        }
    }
}

/// HTTP agent shared by backend and tile requests
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

impl SearchClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(SearchError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            agent: build_agent(timeout),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Places matching free text, for autocomplete.
    ///
    /// Returns everything the backend sends; the suggestion list does the limiting.
    pub fn find_places(&self, query: &str) -> Result<Vec<Place>> {
        self.get_json("search", &[("q", query)])
    }

    /// Places inside `bounds` matching free text, for drawing markers
    pub fn places_in_bounds(&self, bounds: &LatLngBounds, query: &str) -> Result<Vec<Place>> {
        let ne = bounds.north_east.to_query_param();
        let sw = bounds.south_west.to_query_param();
        self.get_json("update", &[("ne", &ne), ("q", query), ("sw", &sw)])
    }

    /// News articles for a postal code
    pub fn find_articles(&self, postal_code: &str) -> Result<Vec<Article>> {
        self.get_json("articles", &[("geo", postal_code)])
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let mut request = self.agent.get(&self.endpoint_url(endpoint));
        for (key, value) in params {
            request = request.query(key, value);
        }

        match request.call() {
            Ok(response) => response
                .into_json::<T>()
                .map_err(|source| SearchError::Decode { endpoint, source }),
            Err(ureq::Error::Status(status, _)) => Err(SearchError::Status { endpoint, status }),
            Err(e) => Err(SearchError::Transport {
                endpoint,
                message: e.to_string(),
            }),
        }
    }
}

/// Startup system building the client from config
fn configure_search_client(config: Res<AppConfig>, mut client: ResMut<SearchClient>) {
    let timeout = config.data.request_timeout();
    match SearchClient::new(&config.data.server_url, timeout) {
        Ok(configured) => {
            info!("Using backend at {}", configured.base_url());
            *client = configured;
        }
        Err(e) => {
            error!("{}; falling back to {}", e, DEFAULT_SERVER_URL);
        }
    }
}

pub struct SearchPlugin;

impl Plugin for SearchPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SearchClient>()
            .add_systems(Startup, configure_search_client.after(ConfigLoaded));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> SearchClient {
        SearchClient::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_endpoint_url_joins_cleanly() {
        let c = client("http://127.0.0.1:5000/");
        assert_eq!(c.base_url(), "http://127.0.0.1:5000");
        assert_eq!(c.endpoint_url("update"), "http://127.0.0.1:5000/update");
        assert_eq!(c.endpoint_url("/articles"), "http://127.0.0.1:5000/articles");
    }

    #[test]
    fn test_rejects_non_http_base() {
        let err = SearchClient::new("ftp://example.com", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, SearchError::InvalidBaseUrl(_)));

        assert!(SearchClient::new("localhost:5000", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_default_client_points_at_local_backend() {
        assert_eq!(SearchClient::default().base_url(), DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_error_messages() {
        let status = SearchError::Status {
            endpoint: "update",
            status: 500,
        };
        assert_eq!(status.to_string(), "update responded with HTTP 500");

        let transport = SearchError::Transport {
            endpoint: "articles",
            message: "connection refused".to_string(),
        };
        assert_eq!(
            transport.to_string(),
            "request to articles failed: connection refused"
        );
    }
}
