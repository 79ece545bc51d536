//! Legacy portal HTTP client
//!
//! Every call runs under a [`FetchProfile`] that fixes its connect timeout,
//! total timeout and retry policy.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use intake_common::LegacyPayload;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::error::FetchError;

const USER_AGENT: &str = concat!("portal-intake/", env!("CARGO_PKG_VERSION"));

/// Timeouts and retry policy for one kind of upstream call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProfile {
    pub name: &'static str,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// Total attempts, including the first
    pub attempts: u32,
    /// Fixed pause between attempts
    pub backoff: Duration,
}

impl FetchProfile {
    /// Synchronous listing fetch on a cache miss
    pub const FULL_REFRESH: FetchProfile = FetchProfile {
        name: "full_refresh",
        connect_timeout: Duration::from_secs(3),
        timeout: Duration::from_secs(8),
        attempts: 2,
        backoff: Duration::from_millis(300),
    };

    /// Detached refresh fired after a cache hit
    pub const BACKGROUND_WARM: FetchProfile = FetchProfile {
        name: "background_warm",
        connect_timeout: Duration::from_secs(2),
        timeout: Duration::from_secs(5),
        attempts: 1,
        backoff: Duration::ZERO,
    };

    /// Warm-up used by the dashboard and intake when the cache is empty
    pub const ON_DEMAND_WARM: FetchProfile = FetchProfile {
        name: "on_demand_warm",
        connect_timeout: Duration::from_secs(2),
        timeout: Duration::from_secs(4),
        attempts: 1,
        backoff: Duration::ZERO,
    };

    /// Single customer latest-inspection lookup
    pub const REFRESH_ONE: FetchProfile = FetchProfile {
        name: "refresh_one",
        connect_timeout: Duration::from_secs(3),
        timeout: Duration::from_secs(10),
        attempts: 2,
        backoff: Duration::from_millis(250),
    };

    const ALL: [FetchProfile; 4] = [
        Self::FULL_REFRESH,
        Self::BACKGROUND_WARM,
        Self::ON_DEMAND_WARM,
        Self::REFRESH_ONE,
    ];
}

/// Client for the legacy portal endpoints
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    customer_latest_url: Url,
    refresh_latest_inspection_url: Url,
    /// One pooled client per distinct connect timeout
    clients: HashMap<Duration, Client>,
}

impl UpstreamClient {
    pub fn new(
        customer_latest_url: &str,
        refresh_latest_inspection_url: &str,
    ) -> intake_common::Result<Self> {
        let parse = |raw: &str| {
            Url::parse(raw)
                .map_err(|e| intake_common::Error::Config(format!("invalid URL {}: {}", raw, e)))
        };

        let mut clients = HashMap::new();
        for profile in FetchProfile::ALL {
            if clients.contains_key(&profile.connect_timeout) {
                continue;
            }
            let client = Client::builder()
                .user_agent(USER_AGENT)
                .connect_timeout(profile.connect_timeout)
                .build()
                .map_err(|e| intake_common::Error::Config(format!("HTTP client: {}", e)))?;
            clients.insert(profile.connect_timeout, client);
        }

        Ok(Self {
            customer_latest_url: parse(customer_latest_url)?,
            refresh_latest_inspection_url: parse(refresh_latest_inspection_url)?,
            clients,
        })
    }

    /// Fetch the full latest-customer listing
    pub async fn fetch_latest(&self, profile: FetchProfile) -> Result<LegacyPayload, FetchError> {
        self.get_json(profile, self.customer_latest_url.clone()).await
    }

    /// Fetch the latest inspection of one legacy customer
    pub async fn fetch_one(&self, legacy_customer_id: i64) -> Result<LegacyPayload, FetchError> {
        let mut url = self.refresh_latest_inspection_url.clone();
        url.query_pairs_mut()
            .append_pair("legacy_customer_id", &legacy_customer_id.to_string());
        self.get_json(FetchProfile::REFRESH_ONE, url).await
    }

    async fn get_json(&self, profile: FetchProfile, url: Url) -> Result<LegacyPayload, FetchError> {
        let attempts = profile.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(profile, url.clone()).await {
                Err(err @ (FetchError::Unreachable(_) | FetchError::Rejected { .. }))
                    if attempt < attempts =>
                {
                    warn!(
                        profile = profile.name,
                        attempt,
                        error = %err,
                        "Upstream attempt failed, retrying"
                    );
                    tokio::time::sleep(profile.backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn attempt(&self, profile: FetchProfile, url: Url) -> Result<LegacyPayload, FetchError> {
        let client = match self.clients.get(&profile.connect_timeout) {
            Some(client) => client,
            None => {
                return Err(FetchError::Unreachable(format!(
                    "no client for profile {}",
                    profile.name
                )))
            }
        };

        let started = Instant::now();
        let response = client
            .get(url)
            .header(ACCEPT, "application/json")
            .timeout(profile.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let status = response.status();
        debug!(
            profile = profile.name,
            status = status.as_u16(),
            ms = started.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        if !status.is_success() {
            return Err(FetchError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Unreachable(e.to_string())
            } else {
                FetchError::Malformed(e.to_string())
            }
        })?;

        LegacyPayload::from_value(body).map_err(|e| FetchError::Malformed(e.to_string()))
    }
}
