//! Platform responses and the events relayed to the app
//!
//! The platform SDK reports results through callbacks. [`PlatformResponse`]
//! is the raw shape of such a callback; [`WechatEvent`] is what the session
//! hands to callers, serialized as `{"type": "<event name>", "payload": {...}}`.

use serde::{Deserialize, Serialize};

/// Result code carried by every platform response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum ResultErrorCode {
    #[default]
    Ok,
    Common,
    UserCancel,
    SentFailed,
    AuthDenied,
    Unsupported,
    Ban,
    Other(i32),
}

impl From<i32> for ResultErrorCode {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            -1 => Self::Common,
            -2 => Self::UserCancel,
            -3 => Self::SentFailed,
            -4 => Self::AuthDenied,
            -5 => Self::Unsupported,
            -6 => Self::Ban,
            other => Self::Other(other),
        }
    }
}

impl From<ResultErrorCode> for i32 {
    fn from(code: ResultErrorCode) -> Self {
        match code {
            ResultErrorCode::Ok => 0,
            ResultErrorCode::Common => -1,
            ResultErrorCode::UserCancel => -2,
            ResultErrorCode::SentFailed => -3,
            ResultErrorCode::AuthDenied => -4,
            ResultErrorCode::Unsupported => -5,
            ResultErrorCode::Ban => -6,
            ResultErrorCode::Other(code) => code,
        }
    }
}

impl ResultErrorCode {
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Fields shared by every response payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonResult {
    #[serde(default)]
    pub error_code: ResultErrorCode,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub open_id: String,
    #[serde(default)]
    pub transaction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    #[serde(flatten)]
    pub common: CommonResult,
    /// Exchange with [`OAuthApi::exchange_code`](crate::api::OAuthApi::exchange_code)
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub auth_result: bool,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayResult {
    #[serde(flatten)]
    pub common: CommonResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepay_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchMiniProgramResult {
    #[serde(flatten)]
    pub common: CommonResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<String>,
}

/// Message opened from inside WeChat that points back at the app
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowMessageFromWeChat {
    #[serde(default)]
    pub open_id: String,
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub country: String,
    /// Platform media type constant (1 text, 2 image, 5 url, 33 mini program, ...)
    #[serde(default)]
    pub media_type: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_tag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrCodeAuthGotQrCode {
    /// Base64 encoded QR code image
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeAuthResult {
    /// 0 on success
    pub error_code: i32,
    #[serde(default)]
    pub auth_code: String,
}

/// Event relayed to the app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WechatEvent {
    #[serde(rename = "onAuthResult")]
    AuthResult(AuthResult),
    #[serde(rename = "onPayResult")]
    PayResult(PayResult),
    #[serde(rename = "onLaunchMiniProgramResult")]
    LaunchMiniProgramResult(LaunchMiniProgramResult),
    #[serde(rename = "onSendMessageToWeChatResult")]
    SendMessageResult(CommonResult),
    #[serde(rename = "onShowMessageFromWeChat")]
    ShowMessageFromWeChat(ShowMessageFromWeChat),
    #[serde(rename = "onQRCodeAuthGotQRCode")]
    QrCodeAuthGotQrCode(QrCodeAuthGotQrCode),
    #[serde(rename = "onQRCodeAuthUserScanned")]
    QrCodeAuthUserScanned,
    #[serde(rename = "onQRCodeAuthResult")]
    QrCodeAuthResult(QrCodeAuthResult),
}

impl WechatEvent {
    /// Name the bridge emits this event under
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::AuthResult(_) => "onAuthResult",
            Self::PayResult(_) => "onPayResult",
            Self::LaunchMiniProgramResult(_) => "onLaunchMiniProgramResult",
            Self::SendMessageResult(_) => "onSendMessageToWeChatResult",
            Self::ShowMessageFromWeChat(_) => "onShowMessageFromWeChat",
            Self::QrCodeAuthGotQrCode(_) => "onQRCodeAuthGotQRCode",
            Self::QrCodeAuthUserScanned => "onQRCodeAuthUserScanned",
            Self::QrCodeAuthResult(_) => "onQRCodeAuthResult",
        }
    }

    /// Common result of a request completion; `None` for unsolicited events
    pub fn common(&self) -> Option<&CommonResult> {
        match self {
            Self::AuthResult(r) => Some(&r.common),
            Self::PayResult(r) => Some(&r.common),
            Self::LaunchMiniProgramResult(r) => Some(&r.common),
            Self::SendMessageResult(r) => Some(r),
            _ => None,
        }
    }

    pub fn transaction(&self) -> Option<&str> {
        self.common()
            .map(|c| c.transaction.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Response-specific part of a [`PlatformResponse`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    Auth {
        code: Option<String>,
        state: Option<String>,
        url: Option<String>,
        auth_result: bool,
        lang: Option<String>,
        country: Option<String>,
    },
    Pay {
        prepay_id: Option<String>,
        return_key: Option<String>,
        ext_data: Option<String>,
    },
    LaunchMiniProgram {
        ext_msg: Option<String>,
    },
    SendMessage,
    /// Response types the bridge does not relay
    Unknown(i32),
}

/// Raw platform SDK callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformResponse {
    pub error_code: i32,
    pub error_message: Option<String>,
    pub open_id: Option<String>,
    pub transaction: Option<String>,
    pub kind: ResponseKind,
}

impl PlatformResponse {
    pub fn new(kind: ResponseKind, error_code: i32) -> Self {
        Self {
            error_code,
            error_message: None,
            open_id: None,
            transaction: None,
            kind,
        }
    }

    pub fn with_transaction(mut self, transaction: impl Into<String>) -> Self {
        self.transaction = Some(transaction.into());
        self
    }

    /// Event for this response; `None` for [`ResponseKind::Unknown`]
    pub fn into_event(self) -> Option<WechatEvent> {
        let common = CommonResult {
            error_code: ResultErrorCode::from(self.error_code),
            error_message: self.error_message.unwrap_or_default(),
            open_id: self.open_id.unwrap_or_default(),
            transaction: self.transaction.unwrap_or_default(),
        };

        let event = match self.kind {
            ResponseKind::Auth {
                code,
                state,
                url,
                auth_result,
                lang,
                country,
            } => WechatEvent::AuthResult(AuthResult {
                common,
                code: code.unwrap_or_default(),
                state: state.unwrap_or_default(),
                url: url.unwrap_or_default(),
                auth_result,
                lang: lang.unwrap_or_default(),
                country: country.unwrap_or_default(),
            }),
            ResponseKind::Pay {
                prepay_id,
                return_key,
                ext_data,
            } => WechatEvent::PayResult(PayResult {
                common,
                prepay_id,
                return_key,
                extra_info: ext_data,
            }),
            ResponseKind::LaunchMiniProgram { ext_msg } => {
                WechatEvent::LaunchMiniProgramResult(LaunchMiniProgramResult {
                    common,
                    extra_info: ext_msg,
                })
            }
            ResponseKind::SendMessage => WechatEvent::SendMessageResult(common),
            ResponseKind::Unknown(_) => return None,
        };
        Some(event)
    }
}
