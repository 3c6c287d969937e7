use std::time::Duration;

use wechat_open_sdk::{
    api::QrAuthParams,
    event::{PlatformResponse, ResponseKind},
    session::{BoxFuture, PlatformRequest},
    share::ShareWebpageOptions,
    types::{AppId, AppSecret, ShareScene},
    Session, SessionConfig, Transport, WechatError, WechatOpen,
};

/// Prints every request instead of talking to a platform SDK
struct StdoutTransport;

impl Transport for StdoutTransport {
    fn register_app<'a>(&'a self, config: &'a SessionConfig) -> BoxFuture<'a, Result<bool, WechatError>> {
        Box::pin(async move {
            println!("register {}", config.appid);
            Ok(true)
        })
    }

    fn send<'a>(
        &'a self,
        transaction: &'a str,
        request: PlatformRequest,
    ) -> BoxFuture<'a, Result<bool, WechatError>> {
        Box::pin(async move {
            match &request {
                PlatformRequest::SendMessage(message) => println!(
                    "{transaction}: {} to {:?}, thumbnail {} bytes",
                    message.message.object.kind(),
                    message.scene,
                    message.message.thumb_data.as_ref().map_or(0, Vec::len)
                ),
                other => println!("{transaction}: {other:?}"),
            }
            Ok(true)
        })
    }

    fn is_app_installed(&self) -> BoxFuture<'_, Result<bool, WechatError>> {
        Box::pin(async { Ok(true) })
    }

    fn api_version(&self) -> BoxFuture<'_, Result<String, WechatError>> {
        Box::pin(async { Ok("stdout".to_string()) })
    }

    fn open_app(&self) -> BoxFuture<'_, Result<bool, WechatError>> {
        Box::pin(async { Ok(false) })
    }

    fn start_qr_auth(&self, params: QrAuthParams) -> BoxFuture<'_, Result<bool, WechatError>> {
        Box::pin(async move {
            println!("QR auth nonce {}", params.nonce_str);
            Ok(true)
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let wechat = WechatOpen::builder()
        .appid(AppId::new("wx1234567890abcdef")?)
        .secret(AppSecret::new("your_app_secret_here")?)
        .build()?;
    let session = Session::register(SessionConfig::new(wechat.appid()), StdoutTransport).await?;

    let mut options = ShareWebpageOptions::new("https://example.com/article", ShareScene::Timeline);
    options.title = Some("An article".to_string());
    let request = wechat.share_composer().webpage(options).await;
    let pending = session.share(request).await?;

    // Stands in for the platform SDK's response callback.
    let transaction = pending.transaction().to_string();
    session.handle_response(
        PlatformResponse::new(ResponseKind::SendMessage, 0).with_transaction(transaction),
    );

    let event = pending.wait_timeout(Duration::from_secs(5)).await?;
    println!("{}", serde_json::to_string(&event)?);

    Ok(())
}
