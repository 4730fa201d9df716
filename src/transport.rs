//! The HTTP transport the handshake runs over.
//!
//! NTLM authenticates a *connection*, not a request, so every round of one
//! handshake must go through the same [`Transport`] value. The default
//! [`HyperTransport`] keeps its own keep-alive connection pool and cookie
//! jar for exactly that reason; create one per handshake.
//!
//! Redirects are followed through `tower-http`. `Authorization` and `Cookie`
//! headers are dropped whenever a redirect leaves the original origin, and
//! the cookie jar sees every hop.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tower::ServiceExt;
use tower_http::follow_redirect::policy::{self, PolicyExt};
use tower_http::follow_redirect::FollowRedirect;

use crate::error::BoxError;

/// Performs one HTTP round.
///
/// Implementations receive a complete request (absolute URI, method, headers
/// and body) and yield the complete response, body included.
pub trait Transport {
    /// Send `request` and wait for the full response.
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>, BoxError>> + Send;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>, BoxError>> + Send {
        (**self).execute(request)
    }
}

/// A `Transport` backed by a pooled hyper client.
///
/// Each value owns its connection pool and (with the `cookies` feature) its
/// cookie jar. Only plain `http://` URLs are supported.
pub struct HyperTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    follow_redirects: bool,
    timeout: Option<Duration>,
    #[cfg(feature = "cookies")]
    cookies: Option<crate::cookie::Jar>,
}

/// A `HyperTransportBuilder` can be used to create a `HyperTransport` with
/// custom configuration.
#[must_use]
#[derive(Debug)]
pub struct HyperTransportBuilder {
    follow_redirects: bool,
    timeout: Option<Duration>,
    pool_idle_timeout: Option<Duration>,
    #[cfg(feature = "cookies")]
    cookie_store: bool,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    /// Constructs a new `HyperTransportBuilder`.
    ///
    /// Redirects are followed, cookies are kept and idle pooled connections
    /// are closed after 90 seconds.
    pub fn new() -> HyperTransportBuilder {
        HyperTransportBuilder {
            follow_redirects: true,
            timeout: None,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            #[cfg(feature = "cookies")]
            cookie_store: true,
        }
    }

    /// Returns a `HyperTransport` that uses this builder's configuration.
    pub fn build(self) -> HyperTransport {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_timer(TokioTimer::new())
            .build(HttpConnector::new());

        HyperTransport {
            client,
            follow_redirects: self.follow_redirects,
            timeout: self.timeout,
            #[cfg(feature = "cookies")]
            cookies: self
                .cookie_store
                .then(crate::cookie::new_jar),
        }
    }

    /// Follow redirect responses (up to 20 hops). Default is `true`.
    ///
    /// A hop to another origin (scheme, host or port) is sent without the
    /// `Authorization` and `Cookie` headers of the previous hop.
    pub fn follow_redirects(mut self, enable: bool) -> HyperTransportBuilder {
        self.follow_redirects = enable;
        self
    }

    /// Enables a timeout for each round, from sending the request until the
    /// body has been read.
    ///
    /// Default is no timeout.
    pub fn timeout(mut self, timeout: Duration) -> HyperTransportBuilder {
        self.timeout = Some(timeout);
        self
    }

    /// Set an optional timeout for idle sockets being kept-alive.
    ///
    /// Pass `None` to disable timeout.
    pub fn pool_idle_timeout<D>(mut self, val: D) -> HyperTransportBuilder
    where
        D: Into<Option<Duration>>,
    {
        self.pool_idle_timeout = val.into();
        self
    }

    /// Keep cookies set by the server and send them back on later rounds.
    ///
    /// Default is `true`.
    #[cfg(feature = "cookies")]
    #[cfg_attr(docsrs, doc(cfg(feature = "cookies")))]
    pub fn cookie_store(mut self, enable: bool) -> HyperTransportBuilder {
        self.cookie_store = enable;
        self
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    /// Constructs a new `HyperTransport` with the default configuration.
    pub fn new() -> HyperTransport {
        HyperTransportBuilder::new().build()
    }

    /// Creates a `HyperTransportBuilder` to configure a `HyperTransport`.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        let request = request.map(Full::new);

        #[cfg(feature = "cookies")]
        let service =
            crate::cookie::CookieService::new(self.client.clone(), self.cookies.clone());
        #[cfg(not(feature = "cookies"))]
        let service = self.client.clone();

        let response = if self.follow_redirects {
            let policy = policy::Limited::default()
                .and::<_, (), ()>(policy::FilterCredentials::new());
            FollowRedirect::with_policy(service, policy)
                .oneshot(request)
                .await?
        } else {
            service.oneshot(request).await?
        };

        let (parts, body) = response.into_parts();
        let body = body.collect().await?.to_bytes();

        log::trace!("response {} with {} body bytes", parts.status, body.len());
        Ok(Response::from_parts(parts, body))
    }
}

impl Transport for HyperTransport {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>, BoxError> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.send(request)).await?,
            None => self.send(request).await,
        }
    }
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("HyperTransport");
        builder
            .field("follow_redirects", &self.follow_redirects)
            .field("timeout", &self.timeout);
        #[cfg(feature = "cookies")]
        builder.field("cookie_store", &self.cookies.is_some());
        builder.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = HyperTransportBuilder::new();
        assert!(builder.follow_redirects);
        assert_eq!(builder.timeout, None);
        assert_eq!(builder.pool_idle_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_builder_overrides() {
        let transport = HyperTransport::builder()
            .follow_redirects(false)
            .timeout(Duration::from_secs(5))
            .pool_idle_timeout(None)
            .build();

        assert!(!transport.follow_redirects);
        assert_eq!(transport.timeout, Some(Duration::from_secs(5)));
    }

    #[cfg(feature = "cookies")]
    #[test]
    fn test_cookie_store_toggle() {
        assert!(HyperTransport::new().cookies.is_some());

        let transport = HyperTransport::builder().cookie_store(false).build();
        assert!(transport.cookies.is_none());
    }
}
