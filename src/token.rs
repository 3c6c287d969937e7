//! Credential caching for WeChat Open Platform calls
//!
//! Caches the server access token and the `type=2` SDK ticket, refreshing
//! each shortly before it expires. Both caches are async mutexes so that
//! concurrent callers share a single refresh.

use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::client::WechatClient;
use crate::error::WechatError;
use crate::types::{AccessToken, SdkTicket};
use crate::utils::backoff_delay;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 100;
const DEFAULT_REFRESH_BUFFER_SECS: u64 = 5 * 60;

pub(crate) struct Cached<T> {
    pub(crate) value: T,
    pub(crate) expires_at: Instant,
}

impl<T> Cached<T> {
    pub(crate) fn is_expired(&self, buffer: Duration) -> bool {
        Instant::now() + buffer >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) expires_in: u64,
    #[serde(default)]
    pub(crate) errcode: i32,
    #[serde(default)]
    pub(crate) errmsg: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TicketResponse {
    #[serde(default)]
    pub(crate) ticket: String,
    #[serde(default)]
    pub(crate) expires_in: u64,
    #[serde(default)]
    pub(crate) errcode: i32,
    #[serde(default)]
    pub(crate) errmsg: String,
}

/// Manages access token and SDK ticket lifecycles with automatic refresh
pub struct TokenManager {
    client: WechatClient,
    token: Mutex<Option<Cached<AccessToken>>>,
    ticket: Mutex<Option<Cached<SdkTicket>>>,
    refresh_buffer: Duration,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("appid", &self.client.appid())
            .field("refresh_buffer", &self.refresh_buffer)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(client: WechatClient) -> Self {
        Self {
            client,
            token: Mutex::new(None),
            ticket: Mutex::new(None),
            refresh_buffer: Duration::from_secs(DEFAULT_REFRESH_BUFFER_SECS),
        }
    }

    /// Refresh credentials this long before they expire (default 5 minutes)
    pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    pub fn refresh_buffer(&self) -> Duration {
        self.refresh_buffer
    }

    /// Current access token, fetched from `/cgi-bin/token` when stale
    pub async fn get_token(&self) -> Result<String, WechatError> {
        let mut cache = self.token.lock().await;

        if let Some(ref cached) = *cache {
            if !cached.is_expired(self.refresh_buffer) {
                return Ok(cached.value.as_str().to_string());
            }
        }

        let response = self.fetch_token_with_retry().await?;
        let token = AccessToken::new(response.access_token).map_err(WechatError::Token)?;

        debug!("[Token] access token refreshed, expires in {}s", response.expires_in);
        *cache = Some(Cached {
            value: token.clone(),
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        });
        Ok(token.as_str().to_string())
    }

    /// Current SDK ticket, fetched from `/cgi-bin/ticket/getticket` when stale
    ///
    /// A ticket request rejected for an expired access token drops the
    /// cached token and is retried once with a fresh one.
    pub async fn get_sdk_ticket(&self) -> Result<String, WechatError> {
        let mut cache = self.ticket.lock().await;

        if let Some(ref cached) = *cache {
            if !cached.is_expired(self.refresh_buffer) {
                return Ok(cached.value.as_str().to_string());
            }
        }

        let response = match self.fetch_ticket().await {
            Err(e) if e.is_token_expired() => {
                warn!("[Token] access token rejected while fetching ticket, refreshing");
                self.invalidate_token().await;
                self.fetch_ticket().await?
            }
            other => other?,
        };

        let ticket = SdkTicket::new(response.ticket).map_err(WechatError::Token)?;

        debug!("[Token] sdk ticket refreshed, expires in {}s", response.expires_in);
        *cache = Some(Cached {
            value: ticket.clone(),
            expires_at: Instant::now() + Duration::from_secs(response.expires_in),
        });
        Ok(ticket.as_str().to_string())
    }

    async fn fetch_token_with_retry(&self) -> Result<TokenResponse, WechatError> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match self.fetch_token().await {
                Ok(response) => {
                    WechatError::check_api(response.errcode, &response.errmsg)?;
                    return Ok(response);
                }
                Err(WechatError::Http(e)) => {
                    warn!("[Token] fetch attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(WechatError::Http(e));
                    if attempt < MAX_RETRIES - 1 {
                        tokio::time::sleep(backoff_delay(RETRY_DELAY_MS, attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| WechatError::Token("Unknown error".to_string())))
    }

    async fn fetch_token(&self) -> Result<TokenResponse, WechatError> {
        let query = [
            ("grant_type", "client_credential"),
            ("appid", self.client.appid()),
            ("secret", self.client.secret()),
        ];

        self.client.get("/cgi-bin/token", &query).await
    }

    async fn fetch_ticket(&self) -> Result<TicketResponse, WechatError> {
        let access_token = self.get_token().await?;
        let query = [("type", "2"), ("access_token", access_token.as_str())];

        let response: TicketResponse = self.client.get("/cgi-bin/ticket/getticket", &query).await?;
        WechatError::check_api(response.errcode, &response.errmsg)?;
        Ok(response)
    }

    /// Drop the cached access token; the ticket is kept
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Drop both cached credentials
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
        *self.ticket.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppId, AppSecret};

    fn create_test_client() -> WechatClient {
        let appid = AppId::new("wx1234567890abcdef").unwrap();
        let secret = AppSecret::new("secret1234567890ab").unwrap();
        WechatClient::builder()
            .appid(appid)
            .secret(secret)
            .build()
            .unwrap()
    }

    #[test]
    fn test_token_manager_creation() {
        let manager = TokenManager::new(create_test_client());
        assert!(manager.token.try_lock().unwrap().is_none());
        assert!(manager.ticket.try_lock().unwrap().is_none());
        assert_eq!(manager.refresh_buffer(), Duration::from_secs(300));
    }

    #[test]
    fn test_cached_not_expired() {
        let cached = Cached {
            value: AccessToken::new("test_token").unwrap(),
            expires_at: Instant::now() + Duration::from_secs(7200),
        };
        assert!(!cached.is_expired(Duration::from_secs(300)));
    }

    #[test]
    fn test_cached_expired_within_buffer() {
        let cached = Cached {
            value: SdkTicket::new("ticket").unwrap(),
            expires_at: Instant::now() + Duration::from_secs(100),
        };
        assert!(cached.is_expired(Duration::from_secs(300)));
    }

    #[test]
    fn test_ticket_response_parse() {
        let json = r#"{"errcode":0,"errmsg":"ok","ticket":"bxLdikRXVbTPdHSM05e5u5sUoXNKd8","expires_in":7200}"#;
        let response: TicketResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.ticket, "bxLdikRXVbTPdHSM05e5u5sUoXNKd8");
        assert_eq!(response.expires_in, 7200);
        assert_eq!(response.errcode, 0);
    }

    #[test]
    fn test_token_response_error_parse() {
        let json = r#"{"errcode":40013,"errmsg":"invalid appid"}"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(response.access_token.is_empty());
        assert_eq!(response.errcode, 40013);
    }

    #[tokio::test]
    async fn test_invalidate_clears_both() {
        let manager = TokenManager::new(create_test_client());
        *manager.token.lock().await = Some(Cached {
            value: AccessToken::new("token").unwrap(),
            expires_at: Instant::now() + Duration::from_secs(7200),
        });
        *manager.ticket.lock().await = Some(Cached {
            value: SdkTicket::new("ticket").unwrap(),
            expires_at: Instant::now() + Duration::from_secs(7200),
        });

        manager.invalidate_token().await;
        assert!(manager.token.lock().await.is_none());
        assert!(manager.ticket.lock().await.is_some());

        manager.invalidate().await;
        assert!(manager.ticket.lock().await.is_none());
    }
}
