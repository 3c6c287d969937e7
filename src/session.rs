//! Session with the platform SDK
//!
//! [`Session::register`] is the only way to obtain a session, so every
//! request method can assume a registered app. Each request gets a unique
//! transaction id and a single-shot completion channel; the platform's
//! response callback is routed back to it by [`Session::handle_response`].
//! Responses nobody waits for, and unsolicited callbacks such as messages
//! opened from WeChat or QR login progress, go to the event stream returned by
//! [`Session::subscribe`].
//!
//! ```rust,ignore
//! let session = Session::register(SessionConfig::new("wx1234567890abcdef"), transport).await?;
//! let pending = session.share(composer.text(ShareTextOptions::new("hi", ShareScene::Session))).await?;
//! let event = pending.wait().await?;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};

use crate::api::QrAuthParams;
use crate::client::WechatOpen;
use crate::error::WechatError;
use crate::event::{
    PlatformResponse, QrCodeAuthGotQrCode, QrCodeAuthResult, ShowMessageFromWeChat, WechatEvent,
};
use crate::share::SendMessageRequest;
use crate::types::scene::lenient;
use crate::types::{AppId, MiniProgramType};

const DEFAULT_EVENT_CAPACITY: usize = 64;

type PendingMap = Mutex<HashMap<String, oneshot::Sender<WechatEvent>>>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Seam to the proprietary platform SDK
///
/// Every method returns the SDK's own boolean answer; `Err` is reserved for
/// failures of the transport itself.
pub trait Transport: Send + Sync + 'static {
    /// Register the app with the SDK
    fn register_app<'a>(&'a self, config: &'a SessionConfig) -> BoxFuture<'a, Result<bool, WechatError>>;

    /// Hand a request to the SDK. `Ok(false)` means the SDK refused it and no
    /// response will follow.
    fn send<'a>(
        &'a self,
        transaction: &'a str,
        request: PlatformRequest,
    ) -> BoxFuture<'a, Result<bool, WechatError>>;

    fn is_app_installed(&self) -> BoxFuture<'_, Result<bool, WechatError>>;

    /// Highest API level supported by the installed WeChat app
    fn api_version(&self) -> BoxFuture<'_, Result<String, WechatError>>;

    fn open_app(&self) -> BoxFuture<'_, Result<bool, WechatError>>;

    /// Start a QR-code login; progress arrives through the session's QR hooks
    fn start_qr_auth(&self, params: QrAuthParams) -> BoxFuture<'_, Result<bool, WechatError>>;
}

/// Registration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub appid: String,
    /// iOS universal link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universal_link: Option<String>,
    /// Buffered events per subscriber before the slowest one starts lagging
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl SessionConfig {
    pub fn new(appid: impl Into<String>) -> Self {
        Self {
            appid: appid.into(),
            universal_link: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn universal_link(mut self, link: impl Into<String>) -> Self {
        self.universal_link = Some(link.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchMiniProgramOptions {
    /// Original id (`gh_...`) of the mini program
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::program_type")]
    pub program_type: MiniProgramType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<String>,
}

/// Pay request as signed by the merchant server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayOptions {
    pub partner_id: String,
    pub prepay_id: String,
    pub nonce_str: String,
    pub time_stamp: String,
    pub sign: String,
    pub package: String,
    #[serde(default)]
    pub extra_data: String,
}

/// Request handed to [`Transport::send`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformRequest {
    SendMessage(SendMessageRequest),
    Auth {
        scope: String,
        state: String,
    },
    Pay {
        appid: String,
        options: PayOptions,
    },
    LaunchMiniProgram(LaunchMiniProgramOptions),
    OpenCustomerServiceChat {
        corp_id: String,
        url: String,
    },
    SubscribeMessage {
        scene: i32,
        template_id: String,
        reserved: String,
    },
}

impl PlatformRequest {
    fn kind(&self) -> &'static str {
        match self {
            Self::SendMessage(request) => request.message.object.kind(),
            Self::Auth { .. } => "auth",
            Self::Pay { .. } => "pay",
            Self::LaunchMiniProgram(_) => "launchMiniProgram",
            Self::OpenCustomerServiceChat { .. } => "customerService",
            Self::SubscribeMessage { .. } => "subscribeMessage",
        }
    }
}

/// Completion of one dispatched request
///
/// Dropping it, or letting [`wait_timeout`](Self::wait_timeout) expire,
/// unregisters the transaction; a late response is then broadcast.
#[derive(Debug)]
pub struct PendingResponse {
    transaction: String,
    receiver: oneshot::Receiver<WechatEvent>,
    pending: Weak<PendingMap>,
}

impl PendingResponse {
    pub fn transaction(&self) -> &str {
        &self.transaction
    }

    /// Wait for the platform's response
    ///
    /// # Errors
    /// Returns `WechatError::Dispatch` when the session is dropped first
    pub async fn wait(mut self) -> Result<WechatEvent, WechatError> {
        (&mut self.receiver).await.map_err(|_| {
            WechatError::Dispatch(format!(
                "session closed before {} completed",
                self.transaction
            ))
        })
    }

    /// [`wait`](Self::wait) with an upper bound
    pub async fn wait_timeout(self, timeout: Duration) -> Result<WechatEvent, WechatError> {
        let transaction = self.transaction.clone();
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| {
                WechatError::Dispatch(format!("no response for {} within {:?}", transaction, timeout))
            })?
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.upgrade() {
            pending.lock().remove(&self.transaction);
        }
    }
}

/// Registered session with the platform SDK
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    pending: Arc<PendingMap>,
    events: broadcast::Sender<WechatEvent>,
    next_id: AtomicU64,
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("pending", &self.pending.lock().len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Session<T> {
    /// Register the app and open a session
    ///
    /// # Errors
    /// - `WechatError::Config` for an invalid appid
    /// - `WechatError::Dispatch` when the SDK refuses the registration
    pub async fn register(config: SessionConfig, transport: T) -> Result<Self, WechatError> {
        AppId::new(config.appid.as_str()).map_err(WechatError::Config)?;
        if config.event_capacity == 0 {
            return Err(WechatError::Config("event_capacity must be at least 1".to_string()));
        }

        if !transport.register_app(&config).await? {
            return Err(WechatError::Dispatch(format!(
                "platform SDK refused to register {}",
                config.appid
            )));
        }
        info!("[Session] registered {}", config.appid);

        let (events, _) = broadcast::channel(config.event_capacity);
        Ok(Self {
            transport,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
            events,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn appid(&self) -> &str {
        &self.config.appid
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Stream of unrouted responses and unsolicited callbacks
    pub fn subscribe(&self) -> broadcast::Receiver<WechatEvent> {
        self.events.subscribe()
    }

    /// Requests still waiting for a response
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn next_transaction(&self, kind: &str) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{:x}", kind, id)
    }

    /// Send `request` and register its completion channel
    ///
    /// # Errors
    /// `WechatError::Dispatch` when the SDK refuses the request; transport
    /// errors are passed through. Either way nothing stays registered.
    pub async fn dispatch(&self, request: PlatformRequest) -> Result<PendingResponse, WechatError> {
        let transaction = self.next_transaction(request.kind());
        let (sender, receiver) = oneshot::channel();
        self.pending.lock().insert(transaction.clone(), sender);

        debug!("[Session] dispatching {}", transaction);
        match self.transport.send(&transaction, request).await {
            Ok(true) => Ok(PendingResponse {
                transaction,
                receiver,
                pending: Arc::downgrade(&self.pending),
            }),
            Ok(false) => {
                self.pending.lock().remove(&transaction);
                warn!("[Session] platform SDK refused {}", transaction);
                Err(WechatError::Dispatch(format!(
                    "platform SDK refused {}",
                    transaction
                )))
            }
            Err(e) => {
                self.pending.lock().remove(&transaction);
                warn!("[Session] sending {} failed: {}", transaction, e);
                Err(e)
            }
        }
    }

    pub async fn share(&self, request: SendMessageRequest) -> Result<PendingResponse, WechatError> {
        self.dispatch(PlatformRequest::SendMessage(request)).await
    }

    pub async fn send_auth(&self, scope: &str, state: &str) -> Result<PendingResponse, WechatError> {
        self.dispatch(PlatformRequest::Auth {
            scope: scope.to_string(),
            state: state.to_string(),
        })
        .await
    }

    pub async fn pay(&self, options: PayOptions) -> Result<PendingResponse, WechatError> {
        self.dispatch(PlatformRequest::Pay {
            appid: self.config.appid.clone(),
            options,
        })
        .await
    }

    pub async fn launch_mini_program(
        &self,
        options: LaunchMiniProgramOptions,
    ) -> Result<PendingResponse, WechatError> {
        self.dispatch(PlatformRequest::LaunchMiniProgram(options)).await
    }

    pub async fn open_customer_service_chat(
        &self,
        corp_id: &str,
        url: &str,
    ) -> Result<PendingResponse, WechatError> {
        self.dispatch(PlatformRequest::OpenCustomerServiceChat {
            corp_id: corp_id.to_string(),
            url: url.to_string(),
        })
        .await
    }

    pub async fn send_subscribe_message(
        &self,
        scene: i32,
        template_id: &str,
        reserved: &str,
    ) -> Result<PendingResponse, WechatError> {
        self.dispatch(PlatformRequest::SubscribeMessage {
            scene,
            template_id: template_id.to_string(),
            reserved: reserved.to_string(),
        })
        .await
    }

    pub async fn is_app_installed(&self) -> Result<bool, WechatError> {
        self.transport.is_app_installed().await
    }

    pub async fn api_version(&self) -> Result<String, WechatError> {
        self.transport.api_version().await
    }

    pub async fn open_app(&self) -> Result<bool, WechatError> {
        self.transport.open_app().await
    }

    /// Sign a QR login request with `wechat` and start it on the platform
    ///
    /// # Errors
    /// Token, ticket and signing errors from [`WechatOpen::prepare_qr_auth`];
    /// `WechatError::Dispatch` when the SDK refuses to start
    pub async fn auth_by_qr(&self, wechat: &WechatOpen, scope: &str) -> Result<QrAuthParams, WechatError> {
        if wechat.appid() != self.config.appid {
            return Err(WechatError::Config(format!(
                "client appid {} does not match session appid {}",
                wechat.appid(),
                self.config.appid
            )));
        }

        let params = wechat.prepare_qr_auth(scope).await?;
        if !self.transport.start_qr_auth(params.clone()).await? {
            return Err(WechatError::Dispatch("platform SDK refused QR auth".to_string()));
        }
        Ok(params)
    }

    /// Route a platform response to the request waiting for it
    ///
    /// Returns `true` when a pending request received it. Anything else is
    /// broadcast, including responses for a transaction already completed.
    pub fn handle_response(&self, response: PlatformResponse) -> bool {
        let Some(event) = response.into_event() else {
            debug!("[Session] ignoring response of unrelayed type");
            return false;
        };

        let sender = event
            .transaction()
            .and_then(|transaction| self.pending.lock().remove(transaction));

        match sender {
            Some(sender) => match sender.send(event) {
                Ok(()) => true,
                Err(event) => {
                    debug!("[Session] waiter for {} is gone, broadcasting", event.event_name());
                    self.broadcast(event);
                    false
                }
            },
            None => {
                self.broadcast(event);
                false
            }
        }
    }

    /// Relay a message opened from inside WeChat
    pub fn handle_show_message(&self, message: ShowMessageFromWeChat) {
        self.broadcast(WechatEvent::ShowMessageFromWeChat(message));
    }

    /// QR login hook: the platform produced the QR code image
    pub fn on_qr_code(&self, image: &[u8]) {
        self.broadcast(WechatEvent::QrCodeAuthGotQrCode(QrCodeAuthGotQrCode {
            image: BASE64.encode(image),
        }));
    }

    /// QR login hook: the user scanned the code
    pub fn on_qr_scanned(&self) {
        self.broadcast(WechatEvent::QrCodeAuthUserScanned);
    }

    /// QR login hook: login finished
    pub fn on_qr_auth_finished(&self, error_code: i32, auth_code: Option<String>) {
        self.broadcast(WechatEvent::QrCodeAuthResult(QrCodeAuthResult {
            error_code,
            auth_code: auth_code.unwrap_or_default(),
        }));
    }

    fn broadcast(&self, event: WechatEvent) {
        let name = event.event_name();
        // An error only means nobody is subscribed right now.
        if self.events.send(event).is_err() {
            debug!("[Session] no subscriber for {}", name);
        }
    }
}
