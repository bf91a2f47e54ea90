use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::error::{CoreError, LookupError};
use crate::types::Network;

use super::types::{MetadataEntry, RemoteOutput, TxCborResponse, TxDetails, TxUtxosResponse};
use super::TxLookup;

/// Header carrying the per-network project key.
const API_KEY_HEADER: &str = "project_id";

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Connection settings for [`HttpLookup`].
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// API key per network. Required for networks served by the default
    /// hosted endpoints.
    pub api_keys: HashMap<Network, String>,
    /// Per-network base URL overrides (self-hosted compatible indexers).
    pub base_urls: HashMap<Network, String>,
    /// Outbound request budget; `None` disables rate limiting.
    pub requests_per_second: Option<u32>,
    pub timeout: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            base_urls: HashMap::new(),
            requests_per_second: None,
            timeout: Duration::from_secs(30),
        }
    }
}

// ==============================================================================
// HttpLookup: REST client for Blockfrost-compatible indexers
// ==============================================================================

pub struct HttpLookup {
    client: reqwest::Client,
    api_keys: HashMap<Network, String>,
    base_urls: HashMap<Network, String>,
    limiter: Option<DirectRateLimiter>,
}

impl HttpLookup {
    pub fn new(config: LookupConfig) -> Result<Self, CoreError> {
        for url in config.base_urls.values() {
            parse_base_url(url)?;
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.timeout)
            .pool_max_idle_per_host(32)
            .tcp_nodelay(true)
            .build()
            .map_err(LookupError::Transport)?;

        let limiter = match config.requests_per_second {
            None => None,
            Some(limit) => {
                let limit = NonZeroU32::new(limit).ok_or_else(|| {
                    CoreError::Config("requests_per_second must be at least 1".to_owned())
                })?;
                Some(RateLimiter::direct(Quota::per_second(limit)))
            }
        };

        Ok(Self {
            client,
            api_keys: config.api_keys,
            base_urls: config
                .base_urls
                .into_iter()
                .map(|(network, url)| (network, url.trim_end_matches('/').to_owned()))
                .collect(),
            limiter,
        })
    }

    /// Whether lookups for `network` can be attempted at all.
    pub fn has_credential(&self, network: Network) -> bool {
        self.api_keys.contains_key(&network) || self.base_urls.contains_key(&network)
    }

    fn base_url(&self, network: Network) -> &str {
        self.base_urls
            .get(&network)
            .map(String::as_str)
            .unwrap_or_else(|| network.default_api_url())
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        network: Network,
        path: &str,
    ) -> Result<T, CoreError> {
        let api_key = self.api_keys.get(&network);
        if api_key.is_none() && !self.base_urls.contains_key(&network) {
            return Err(LookupError::MissingCredential(network).into());
        }

        self.wait_for_rate_limit().await;
        let url = format!("{}{path}", self.base_url(network));
        debug!(%network, lookup.path = path, "lookup request");

        let mut builder = self.client.get(&url);
        if let Some(key) = api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder.send().await.map_err(LookupError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(LookupError::Transport)?;
        debug!(%network, lookup.path = path, %status, body_len = body.len(), "lookup response");
        trace!(%network, lookup.path = path, body = %body, "lookup response body");

        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(format!("{network}{path}")).into());
        }
        if !status.is_success() {
            return Err(LookupError::Status {
                status: status.as_u16(),
                message: body,
            }
            .into());
        }

        serde_json::from_str(&body).map_err(|e| {
            LookupError::InvalidResponse(format!("decode {path}: {e}; body={body}")).into()
        })
    }
}

#[async_trait]
impl TxLookup for HttpLookup {
    async fn tx_outputs(
        &self,
        network: Network,
        tx_hash: &str,
    ) -> Result<Vec<RemoteOutput>, CoreError> {
        let response: TxUtxosResponse = self
            .get_json(network, &format!("/txs/{tx_hash}/utxos"))
            .await?;
        if response.hash != tx_hash {
            warn!(
                requested = tx_hash,
                returned = %response.hash,
                "indexer returned outputs for a different transaction"
            );
            return Err(LookupError::InvalidResponse(format!(
                "requested outputs of {tx_hash}, got {}",
                response.hash
            ))
            .into());
        }
        Ok(response.outputs)
    }

    async fn tx_cbor(&self, network: Network, tx_hash: &str) -> Result<String, CoreError> {
        let response: TxCborResponse = self
            .get_json(network, &format!("/txs/{tx_hash}/cbor"))
            .await?;
        Ok(response.cbor)
    }

    async fn tx_details(&self, network: Network, tx_hash: &str) -> Result<TxDetails, CoreError> {
        let details_path = format!("/txs/{tx_hash}");
        let metadata_path = format!("/txs/{tx_hash}/metadata");
        let (mut details, metadata): (TxDetails, Vec<MetadataEntry>) = tokio::try_join!(
            self.get_json(network, &details_path),
            self.get_json(network, &metadata_path),
        )?;
        details.metadata = metadata;
        Ok(details)
    }
}

fn parse_base_url(url: &str) -> Result<(), CoreError> {
    let parsed = Url::parse(url).map_err(|e| {
        CoreError::Config(format!("invalid API base URL `{url}`: expected HTTP(S) URL ({e})"))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CoreError::Config(format!(
            "unsupported API base URL scheme `{other}`; expected http or https"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_base_url_accepts_https() {
        parse_base_url("https://cardano-preview.blockfrost.io/api/v0").expect("should parse");
    }

    #[test]
    fn parse_base_url_rejects_other_schemes() {
        let err = parse_base_url("ftp://example.com").expect_err("must reject ftp");
        assert!(err.to_string().contains("unsupported API base URL scheme"));
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let config = LookupConfig {
            requests_per_second: Some(0),
            ..Default::default()
        };
        let err = HttpLookup::new(config).err().expect("must reject zero rps");
        assert!(err.to_string().contains("requests_per_second"));
    }

    #[test]
    fn overrides_replace_default_endpoint() {
        let mut base_urls = HashMap::new();
        base_urls.insert(Network::Preview, "http://127.0.0.1:3000/api/v0/".to_owned());
        let lookup = HttpLookup::new(LookupConfig {
            base_urls,
            ..Default::default()
        })
        .expect("client must build");

        assert_eq!(lookup.base_url(Network::Preview), "http://127.0.0.1:3000/api/v0");
        assert_eq!(
            lookup.base_url(Network::Mainnet),
            Network::Mainnet.default_api_url()
        );
        assert!(lookup.has_credential(Network::Preview));
        assert!(!lookup.has_credential(Network::Mainnet));
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let lookup = HttpLookup::new(LookupConfig::default()).expect("client must build");
        let err = lookup
            .tx_cbor(Network::Mainnet, "aa")
            .await
            .expect_err("no key configured");
        assert!(matches!(
            err,
            CoreError::Lookup(LookupError::MissingCredential(Network::Mainnet))
        ));
    }
}
