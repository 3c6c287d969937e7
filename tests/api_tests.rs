//! QR-code login signing and OAuth login through the `WechatOpen` facade.

use std::sync::Arc;

use sha1::{Digest, Sha1};
use wechat_open_sdk::api::{OAuthApi, QrAuthApi, WechatApi, WechatContext, SCOPE_USER_INFO};
use wechat_open_sdk::types::{AppId, AppSecret};
use wechat_open_sdk::{WechatClient, WechatError, WechatOpen};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APPID: &str = "wx1234567890abcdef";
const SECRET: &str = "secret1234567890ab";

fn create_test_open(base_url: &str) -> WechatOpen {
    WechatOpen::builder()
        .appid(AppId::new(APPID).unwrap())
        .secret(AppSecret::new(SECRET).unwrap())
        .base_url(base_url)
        .build()
        .unwrap()
}

async fn mount_credentials(server: &MockServer, ticket: &str) {
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": "tok", "expires_in": 7200 })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/ticket/getticket"))
        .and(query_param("type", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0,
            "errmsg": "ok",
            "ticket": ticket,
            "expires_in": 7200
        })))
        .mount(server)
        .await;
}

// ============================================================
// QR-code login
// ============================================================

#[tokio::test]
async fn test_prepare_qr_auth_signature_matches_ticket() {
    let server = MockServer::start().await;
    mount_credentials(&server, "sdk_ticket_abc").await;
    let wechat = create_test_open(&server.uri());

    let params = wechat.prepare_qr_auth(SCOPE_USER_INFO).await.unwrap();

    assert_eq!(params.appid, APPID);
    assert_eq!(params.scope, "snsapi_userinfo");
    let origin = format!(
        "appid={}&noncestr={}&sdk_ticket=sdk_ticket_abc&timestamp={}",
        APPID, params.nonce_str, params.timestamp
    );
    assert_eq!(params.signature, hex::encode(Sha1::digest(origin.as_bytes())));
}

#[tokio::test]
async fn test_prepare_qr_auth_nonce_and_timestamp_shape() {
    let server = MockServer::start().await;
    mount_credentials(&server, "ticket").await;
    let wechat = create_test_open(&server.uri());

    let first = wechat.prepare_qr_auth(SCOPE_USER_INFO).await.unwrap();
    let second = wechat.prepare_qr_auth(SCOPE_USER_INFO).await.unwrap();

    assert!(first.nonce_str.len() > 16);
    assert!(first.nonce_str.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(first.nonce_str, second.nonce_str);
    assert_ne!(first.signature, second.signature);

    let millis: u128 = first.timestamp.parse().unwrap();
    assert!(millis > 1_600_000_000_000);
}

#[tokio::test]
async fn test_prepare_qr_auth_reuses_cached_ticket() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "access_token": "tok", "expires_in": 7200 })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/ticket/getticket"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 0, "errmsg": "ok", "ticket": "t", "expires_in": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;

    let wechat = create_test_open(&server.uri());
    for _ in 0..3 {
        wechat.prepare_qr_auth(SCOPE_USER_INFO).await.unwrap();
    }
}

#[tokio::test]
async fn test_prepare_qr_auth_empty_scope_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let wechat = create_test_open(&server.uri());
    let err = wechat.prepare_qr_auth("  ").await.unwrap_err();
    assert!(matches!(err, WechatError::Config(ref m) if m == "qr_auth: scope must not be empty"));
}

#[tokio::test]
async fn test_prepare_qr_auth_ticket_failure_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cgi-bin/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 40125, "errmsg": "invalid appsecret"
        })))
        .mount(&server)
        .await;

    let wechat = create_test_open(&server.uri());
    let err = wechat.prepare_qr_auth(SCOPE_USER_INFO).await.unwrap_err();
    assert!(matches!(err, WechatError::Api { code: 40125, .. }));
}

#[tokio::test]
async fn test_qr_auth_api_on_standalone_context() {
    let server = MockServer::start().await;
    mount_credentials(&server, "standalone").await;

    let client = WechatClient::builder()
        .appid(AppId::new(APPID).unwrap())
        .secret(AppSecret::new(SECRET).unwrap())
        .base_url(server.uri())
        .build()
        .unwrap();
    let context = Arc::new(WechatContext::from_client(client));

    let api = QrAuthApi::new(context.clone());
    assert_eq!(api.api_name(), "qr_auth");
    assert_eq!(api.context().client().appid(), APPID);

    let params = api
        .prepare_with_scheme_data(SCOPE_USER_INFO, Some("scheme".into()))
        .await
        .unwrap();
    assert_eq!(params.scheme_data.as_deref(), Some("scheme"));
    assert_eq!(context.token_manager().get_sdk_ticket().await.unwrap(), "standalone");

    assert_eq!(OAuthApi::new(context).api_name(), "oauth");
}

// ============================================================
// OAuth
// ============================================================

#[tokio::test]
async fn test_oauth_login_chains_exchange_and_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sns/oauth2/access_token"))
        .and(query_param("appid", APPID))
        .and(query_param("secret", SECRET))
        .and(query_param("code", "auth_code"))
        .and(query_param("grant_type", "authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "user_tok",
            "expires_in": 7200,
            "refresh_token": "refresh",
            "openid": "o_user",
            "scope": "snsapi_userinfo",
            "unionid": "u_union"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sns/userinfo"))
        .and(query_param("access_token", "user_tok"))
        .and(query_param("openid", "o_user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "openid": "o_user",
            "nickname": "Alice",
            "sex": 2,
            "city": "Hangzhou",
            "headimgurl": "https://example.com/a.png",
            "privilege": ["chinaunicom"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let wechat = create_test_open(&server.uri());
    let user = wechat.oauth_login("auth_code").await.unwrap();

    assert_eq!(user.openid, "o_user");
    assert_eq!(user.nickname, "Alice");
    assert_eq!(user.sex, 2);
    assert_eq!(user.privilege, vec!["chinaunicom".to_string()]);
    assert_eq!(user.unionid.as_deref(), Some("u_union"));
}

#[tokio::test]
async fn test_oauth_invalid_code_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sns/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errcode": 40029, "errmsg": "invalid code"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sns/userinfo"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let wechat = create_test_open(&server.uri());
    let err = wechat.oauth_login("stale").await.unwrap_err();
    match err {
        WechatError::Api { code, message } => {
            assert_eq!(code, 40029);
            assert_eq!(message, "invalid code");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_oauth_empty_code_rejected() {
    let wechat = create_test_open("http://127.0.0.1:9");
    let err = wechat.oauth_exchange_code(" ").await.unwrap_err();
    assert!(matches!(err, WechatError::Config(ref m) if m == "oauth: code must not be empty"));
}

#[tokio::test]
async fn test_oauth_server_error_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sns/userinfo"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let wechat = create_test_open(&server.uri());
    let err = wechat.oauth_user_info("tok", "openid").await.unwrap_err();
    assert!(matches!(err, WechatError::Http(_)));
}
