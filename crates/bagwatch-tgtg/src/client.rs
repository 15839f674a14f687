// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Too Good To Go API.
//!
//! [`TgtgClient`] owns the shared connection pool and the search area.
//! [`TgtgSession`] binds it to one user's credentials for a single poll.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{
    ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, SET_COOKIE,
};
use serde_json::Value;
use tracing::debug;

use bagwatch_config::model::MarketplaceConfig;
use bagwatch_core::types::{LoginPoll, PendingLogin, SearchArea};
use bagwatch_core::{
    AdapterType, BagwatchError, Credentials, FavoritesSession, HealthStatus, ListingSnapshot,
    MarketplaceAdapter, PluginAdapter,
};

use crate::types::{
    AuthByEmailRequest, AuthByEmailResponse, AuthPollRequest, AuthTokens, DEVICE_TYPE,
    ItemsRequest, ItemsResponse, Origin, parse_items,
};

const ITEMS_PATH: &str = "item/v8/";
const AUTH_BY_EMAIL_PATH: &str = "auth/v5/authByEmail";
const AUTH_POLL_PATH: &str = "auth/v5/authByRequestPollingId";

/// Upper bound on favorites pages walked per fetch.
const MAX_FAVORITES_PAGES: u32 = 50;

/// Marketplace adapter backed by the Too Good To Go HTTP API.
#[derive(Debug, Clone)]
pub struct TgtgClient {
    http: reqwest::Client,
    base_url: String,
    area: SearchArea,
    page_size: u32,
}

impl TgtgClient {
    /// Creates a client from the `[marketplace]` configuration section.
    pub fn new(config: &MarketplaceConfig) -> Result<Self, BagwatchError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BagwatchError::fetch("failed to build HTTP client", e))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            area: SearchArea {
                latitude: config.latitude,
                longitude: config.longitude,
                radius_km: config.radius_km,
            },
            page_size: config.page_size,
        })
    }

    /// The search area used for favorites queries.
    pub fn area(&self) -> &SearchArea {
        &self.area
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Joins the `name=value` pairs of every `Set-Cookie` header into a
/// `Cookie` header value.
fn collect_cookies(headers: &HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl PluginAdapter for TgtgClient {
    fn name(&self) -> &str {
        "tgtg"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Marketplace
    }

    async fn health_check(&self) -> Result<HealthStatus, BagwatchError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BagwatchError> {
        Ok(())
    }
}

#[async_trait]
impl MarketplaceAdapter for TgtgClient {
    fn open_session(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn FavoritesSession>, BagwatchError> {
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credentials.access_token))
            .map_err(|e| BagwatchError::fetch("access token is not a valid header value", e))?;
        let cookie = HeaderValue::from_str(&credentials.cookie)
            .map_err(|e| BagwatchError::fetch("cookie is not a valid header value", e))?;

        Ok(Box::new(TgtgSession {
            client: self.clone(),
            bearer,
            cookie,
        }))
    }

    async fn initiate_login(&self, email: &str) -> Result<PendingLogin, BagwatchError> {
        let response = self
            .http
            .post(self.url(AUTH_BY_EMAIL_PATH))
            .json(&AuthByEmailRequest {
                device_type: DEVICE_TYPE,
                email,
            })
            .send()
            .await
            .map_err(|e| BagwatchError::fetch("login request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BagwatchError::Fetch {
                message: format!("login request returned {status}: {body}"),
                source: None,
            });
        }

        let body: AuthByEmailResponse = response
            .json()
            .await
            .map_err(|e| BagwatchError::fetch("failed to parse login response", e))?;

        match (body.state.as_str(), body.polling_id) {
            ("WAIT", Some(polling_id)) => {
                debug!("login email sent");
                Ok(PendingLogin {
                    email: email.to_string(),
                    polling_id,
                })
            }
            ("TERMS", _) => Err(BagwatchError::Fetch {
                message: "email is not linked to a marketplace account".into(),
                source: None,
            }),
            (state, _) => Err(BagwatchError::Fetch {
                message: format!("unexpected login state `{state}`"),
                source: None,
            }),
        }
    }

    async fn poll_login_result(&self, pending: &PendingLogin) -> Result<LoginPoll, BagwatchError> {
        let response = self
            .http
            .post(self.url(AUTH_POLL_PATH))
            .json(&AuthPollRequest {
                device_type: DEVICE_TYPE,
                email: &pending.email,
                request_polling_id: &pending.polling_id,
            })
            .send()
            .await
            .map_err(|e| BagwatchError::fetch("login poll failed", e))?;

        let status = response.status();
        debug!(status = %status, "login poll response");

        if status == StatusCode::ACCEPTED {
            return Ok(LoginPoll::Pending);
        }
        if status == StatusCode::OK {
            let cookie = collect_cookies(response.headers());
            let tokens: AuthTokens = response
                .json()
                .await
                .map_err(|e| BagwatchError::fetch("failed to parse login tokens", e))?;
            return Ok(LoginPoll::Ready(Credentials {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                cookie,
            }));
        }
        if status.is_client_error() {
            return Ok(LoginPoll::Expired);
        }

        Err(BagwatchError::Fetch {
            message: format!("login poll returned {status}"),
            source: None,
        })
    }
}

/// One user's view of the marketplace, built per poll.
pub struct TgtgSession {
    client: TgtgClient,
    bearer: HeaderValue,
    cookie: HeaderValue,
}

impl TgtgSession {
    /// Requests one page of favorites and returns its raw items.
    async fn fetch_page(&self, page: u32) -> Result<Vec<Value>, BagwatchError> {
        let area = &self.client.area;
        let request = ItemsRequest {
            origin: Origin {
                latitude: area.latitude,
                longitude: area.longitude,
            },
            radius: area.radius_km,
            page_size: self.client.page_size,
            page,
            favorites_only: true,
            with_stock_only: false,
            discover: false,
        };

        let response = self
            .client
            .http
            .post(self.client.url(ITEMS_PATH))
            .header(AUTHORIZATION, self.bearer.clone())
            .header(COOKIE, self.cookie.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| BagwatchError::fetch("favorites request failed", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BagwatchError::Fetch {
                message: format!("credentials rejected ({status})"),
                source: None,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BagwatchError::Fetch {
                message: format!("favorites request returned {status} on page {page}: {body}"),
                source: None,
            });
        }

        let body: ItemsResponse = response
            .json()
            .await
            .map_err(|e| BagwatchError::fetch("failed to parse favorites response", e))?;
        Ok(body.items)
    }
}

#[async_trait]
impl FavoritesSession for TgtgSession {
    /// Walks the favorites pages until one comes back short. A failure on
    /// any page fails the whole fetch, since a partial set would clear the
    /// state of listings on the missing pages.
    async fn fetch_favorites(&self) -> Result<Vec<ListingSnapshot>, BagwatchError> {
        let page_size = self.client.page_size as usize;
        let mut items = Vec::new();

        for page in 1..=MAX_FAVORITES_PAGES {
            let batch = self.fetch_page(page).await?;
            let last = batch.len() < page_size;
            items.extend(batch);
            if last {
                let listings = parse_items(&items);
                debug!(
                    pages = page,
                    received = items.len(),
                    parsed = listings.len(),
                    "favorites fetched"
                );
                return Ok(listings);
            }
        }

        Err(BagwatchError::Fetch {
            message: format!("favorites still full after {MAX_FAVORITES_PAGES} pages"),
            source: None,
        })
    }
}
