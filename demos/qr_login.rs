use wechat_open_sdk::{
    api::SCOPE_USER_INFO,
    types::{AppId, AppSecret},
    WechatOpen,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let wechat = WechatOpen::builder()
        .appid(AppId::new("wx1234567890abcdef")?)
        .secret(AppSecret::new("your_app_secret_here")?)
        .build()?;

    // Hand these to the platform SDK's QR auth call.
    match wechat.prepare_qr_auth(SCOPE_USER_INFO).await {
        Ok(params) => println!("QR auth params: {}", serde_json::to_string_pretty(&params)?),
        Err(error) => eprintln!("prepare_qr_auth failed: {error}"),
    }

    // The code arrives in the onQRCodeAuthResult event once the user confirms.
    let auth_code = std::env::args().nth(1).unwrap_or_else(|| "AUTH_CODE".to_string());
    match wechat.oauth_login(&auth_code).await {
        Ok(user) => println!("Logged in: {} ({})", user.nickname, user.openid),
        Err(error) => eprintln!("oauth_login failed: {error}"),
    }

    Ok(())
}
