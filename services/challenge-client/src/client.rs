use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use types::leaderboard::{
    LeaderboardEntry, LeaderboardOrderBy, LeaderboardResponse, SubmitMessageRequest,
    SubmitMessageResponse,
};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// HTTP client for the ranking service.
#[derive(Debug, Clone)]
pub struct RankingClient {
    http_client: Client,
    base_url: String,
}

impl RankingClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http_client: Client, base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl {
                url: base_url,
                reason: "expected an http(s) URL".to_string(),
            });
        }
        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /v1/submit
    pub async fn submit(&self, request: &SubmitMessageRequest) -> Result<LeaderboardEntry, ClientError> {
        let res = self
            .http_client
            .post(format!("{}/v1/submit", self.base_url))
            .json(request)
            .send()
            .await?;

        let body: SubmitMessageResponse = read_json(res).await?;
        debug!(
            position = body.entry.position,
            ratio = body.entry.ratio,
            transaction_hash = %body.entry.transaction_hash,
            "Submission ranked"
        );
        Ok(body.entry)
    }

    /// GET /v1/leaderboard, already sorted by the service.
    pub async fn leaderboard(&self, order_by: LeaderboardOrderBy) -> Result<Vec<LeaderboardEntry>, ClientError> {
        let res = self
            .http_client
            .get(format!("{}/v1/leaderboard?order_by={}", self.base_url, order_by.as_str()))
            .send()
            .await?;

        let body: LeaderboardResponse = read_json(res).await?;
        debug!(%order_by, entries = body.entries.len(), "Leaderboard loaded");
        Ok(body.entries)
    }
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        warn!(%status, body = %body, "Ranking service rejected request");
        return Err(ClientError::Status { status, body });
    }

    let bytes = res.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = RankingClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let err = RankingClient::new("localhost:5000").unwrap_err();
        assert!(matches!(err, ClientError::InvalidBaseUrl { .. }));
    }
}
