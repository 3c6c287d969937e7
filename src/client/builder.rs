use std::sync::Arc;
use std::time::Duration;

use reqwest::{Request as ReqwestRequest, Response as ReqwestResponse};
use tower::{Layer, Service};

use crate::api::WechatContext;
use crate::error::WechatError;
use crate::thumbnail::{CompressionOptions, ThumbnailCompressor};
use crate::token::TokenManager;
use crate::types::{AppId, AppSecret};

use super::wechat_client::{MiddlewareExecutor, WechatClient};
use super::WechatOpen;

#[must_use]
#[derive(Default)]
pub struct WechatOpenBuilder<M = ()> {
    appid: Option<AppId>,
    secret: Option<AppSecret>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    refresh_buffer: Option<Duration>,
    compression: Option<CompressionOptions>,
    middleware: Option<M>,
}

impl<M> std::fmt::Debug for WechatOpenBuilder<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatOpenBuilder")
            .field("appid", &self.appid)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("refresh_buffer", &self.refresh_buffer)
            .field("compression", &self.compression)
            .field("middleware", &self.middleware.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}

impl<M> WechatOpenBuilder<M> {
    pub fn appid(mut self, appid: AppId) -> Self {
        self.appid = Some(appid);
        self
    }

    pub fn secret(mut self, secret: AppSecret) -> Self {
        self.secret = Some(secret);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// How long before expiry cached credentials are refreshed (default 5 minutes)
    pub fn refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = Some(buffer);
        self
    }

    /// Tuning for share thumbnails
    pub fn compression(mut self, options: CompressionOptions) -> Self {
        self.compression = Some(options);
        self
    }

    pub fn with_middleware<M2>(self, middleware: M2) -> WechatOpenBuilder<M2>
    where
        M2: Layer<WechatClient> + Clone + Send + Sync + 'static,
    {
        WechatOpenBuilder {
            appid: self.appid,
            secret: self.secret,
            base_url: self.base_url,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            refresh_buffer: self.refresh_buffer,
            compression: self.compression,
            middleware: Some(middleware),
        }
    }

    /// Build the facade
    ///
    /// # Errors
    /// - `WechatError::Config` for missing credentials or a bad base URL
    /// - `WechatError::Thumbnail` for invalid compression options
    pub fn build(self) -> Result<WechatOpen, WechatError>
    where
        M: Layer<WechatClient> + Clone + Send + Sync + 'static,
        M::Service: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
            + Clone
            + Send
            + Sync
            + 'static,
        <M::Service as Service<ReqwestRequest>>::Future: Send + 'static,
    {
        let appid = self
            .appid
            .ok_or_else(|| WechatError::Config("appid is required".to_string()))?;
        let secret = self
            .secret
            .ok_or_else(|| WechatError::Config("secret is required".to_string()))?;

        let mut client_builder = WechatClient::builder().appid(appid).secret(secret);
        if let Some(base_url) = self.base_url {
            client_builder = client_builder.base_url(base_url);
        }
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            client_builder = client_builder.connect_timeout(timeout);
        }
        let mut client = client_builder.build()?;

        if let Some(middleware) = self.middleware {
            let service = middleware.layer(client.clone());
            let executor = make_middleware_executor(service);
            client = client.with_middleware_executor(executor);
        }

        let compressor = ThumbnailCompressor::new(self.compression.unwrap_or_default())?;

        let mut token_manager = TokenManager::new(client.clone());
        if let Some(buffer) = self.refresh_buffer {
            token_manager = token_manager.with_refresh_buffer(buffer);
        }

        let context = Arc::new(WechatContext::new(
            Arc::new(client),
            Arc::new(token_manager),
        ));

        Ok(WechatOpen::new(context, Arc::new(compressor)))
    }
}

fn make_middleware_executor<S>(service: S) -> MiddlewareExecutor
where
    S: Service<ReqwestRequest, Response = ReqwestResponse, Error = reqwest::Error>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
{
    let service = Arc::new(service);

    Arc::new(move |request: ReqwestRequest| {
        let mut service = (*service).clone();
        Box::pin(async move { service.call(request).await })
    })
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use tower::{Layer, Service};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn ids() -> (AppId, AppSecret) {
        (
            AppId::new("wx1234567890abcdef").unwrap(),
            AppSecret::new("secret1234567890ab").unwrap(),
        )
    }

    #[test]
    fn test_builder_default_values() {
        let (appid, secret) = ids();

        let wechat = WechatOpen::builder()
            .appid(appid.clone())
            .secret(secret)
            .build()
            .unwrap();

        assert_eq!(wechat.appid(), appid.as_str());
        assert_eq!(wechat.compressor().options(), &CompressionOptions::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let (appid, secret) = ids();
        let options = CompressionOptions {
            min_dimension: 64,
            ..CompressionOptions::default()
        };

        let wechat = WechatOpen::builder()
            .appid(appid)
            .secret(secret)
            .base_url("https://custom.api.example.com")
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .refresh_buffer(Duration::from_secs(60))
            .compression(options.clone())
            .build()
            .unwrap();

        assert_eq!(wechat.appid(), "wx1234567890abcdef");
        assert_eq!(wechat.compressor().options(), &options);
    }

    #[test]
    fn test_builder_rejects_invalid_compression() {
        let (appid, secret) = ids();
        let result = WechatOpen::builder()
            .appid(appid)
            .secret(secret)
            .compression(CompressionOptions {
                resize_factor: 1.5,
                ..CompressionOptions::default()
            })
            .build();

        assert!(matches!(result, Err(WechatError::Thumbnail(_))));
    }

    #[tokio::test]
    async fn test_middleware_configured_and_executes() {
        #[derive(Clone)]
        struct FlagLayer {
            flag: Arc<AtomicBool>,
        }

        impl Layer<WechatClient> for FlagLayer {
            type Service = FlagService;

            fn layer(&self, inner: WechatClient) -> Self::Service {
                FlagService {
                    inner,
                    flag: Arc::clone(&self.flag),
                }
            }
        }

        #[derive(Clone)]
        struct FlagService {
            inner: WechatClient,
            flag: Arc<AtomicBool>,
        }

        impl Service<ReqwestRequest> for FlagService {
            type Response = ReqwestResponse;
            type Error = reqwest::Error;
            type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

            fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
                Poll::Ready(Ok(()))
            }

            fn call(&mut self, req: ReqwestRequest) -> Self::Future {
                self.flag.store(true, Ordering::SeqCst);
                let mut inner = self.inner.clone();
                Box::pin(async move { inner.call(req).await })
            }
        }

        let (appid, secret) = ids();
        let middleware_invoked = Arc::new(AtomicBool::new(false));
        let layer = FlagLayer {
            flag: Arc::clone(&middleware_invoked),
        };

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "test_token",
                "expires_in": 7200
            })))
            .mount(&mock_server)
            .await;

        let wechat = WechatOpen::builder()
            .appid(appid)
            .secret(secret)
            .base_url(mock_server.uri())
            .with_middleware(layer)
            .build()
            .unwrap();

        let token = wechat.get_access_token().await.unwrap();

        assert_eq!(token, "test_token");
        assert!(middleware_invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_builder_with_logging_middleware_builds() {
        let (appid, secret) = ids();

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "test_token",
                "expires_in": 7200
            })))
            .mount(&mock_server)
            .await;

        let wechat = WechatOpen::builder()
            .appid(appid)
            .secret(secret)
            .base_url(mock_server.uri())
            .with_middleware(crate::middleware::LoggingMiddleware::new())
            .build()
            .unwrap();

        assert!(wechat.get_access_token().await.is_ok());
    }

    #[test]
    fn test_missing_appid() {
        let (_, secret) = ids();
        assert!(WechatOpen::builder().secret(secret).build().is_err());
    }

    #[test]
    fn test_missing_secret() {
        let (appid, _) = ids();
        assert!(WechatOpen::builder().appid(appid).build().is_err());
    }
}
