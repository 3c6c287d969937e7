use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use percent_encoding::percent_decode_str;
use reqwest::{Request, Response};
use tower::{Layer, Service};

const REDACTED: &str = "[REDACTED]";

/// Query keys whose values never reach the log
const SENSITIVE_KEYS: &[&str] = &[
    "access_token",
    "appsecret",
    "secret",
    "ticket",
    "sdk_ticket",
    "signature",
    "code",
    "refresh_token",
    "authorization",
];

#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    verbose: bool,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log at `debug` with status text instead of a one-line `info`
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl<S> Layer<S> for LoggingMiddleware
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Service = LoggingMiddlewareService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingMiddlewareService {
            inner,
            verbose: self.verbose,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingMiddlewareService<S> {
    inner: S,
    verbose: bool,
}

fn is_sensitive(raw_key: &str) -> bool {
    let key = percent_decode_str(raw_key).decode_utf8_lossy();
    SENSITIVE_KEYS.iter().any(|s| key.eq_ignore_ascii_case(s))
}

/// Replace the values of credential-bearing query parameters
pub fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let redacted: Vec<String> = query
        .split('&')
        .map(|param| match param.split_once('=') {
            Some((key, _)) if is_sensitive(key) => format!("{}={}", key, REDACTED),
            _ => param.to_string(),
        })
        .collect();

    format!("{}?{}", base, redacted.join("&"))
}

fn log_request(method: &str, url: &str, verbose: bool) {
    let safe_url = redact_url(url);
    if verbose {
        debug!("[WechatOpen] >>> {} {}", method, safe_url);
    } else {
        info!("[WechatOpen] {} {}", method, safe_url);
    }
}

fn log_response(status: reqwest::StatusCode, duration: Duration, verbose: bool) {
    if verbose {
        debug!(
            "[WechatOpen] <<< {} {} ({:?})",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            duration
        );
    } else {
        info!("[WechatOpen] {} ({:?})", status.as_u16(), duration);
    }
}

impl<S, Error> Service<Request> for LoggingMiddlewareService<S>
where
    S: Service<Request, Response = Response, Error = Error> + Send + Clone + 'static,
    S::Future: Send,
    Error: std::fmt::Display + Send + 'static,
{
    type Response = Response;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let method = req.method().as_str().to_string();
        let url = req.url().to_string();
        let verbose = self.verbose;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            log_request(&method, &url, verbose);

            let start = Instant::now();
            match inner.call(req).await {
                Ok(response) => {
                    log_response(response.status(), start.elapsed(), verbose);
                    Ok(response)
                }
                Err(e) => {
                    warn!(
                        "[WechatOpen] {} {} failed after {:?}: {}",
                        method,
                        redact_url(&url),
                        start.elapsed(),
                        e
                    );
                    Err(e)
                }
            }
        })
    }
}
