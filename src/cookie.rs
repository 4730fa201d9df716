//! Cookie jar support for [`HyperTransport`](crate::HyperTransport).
//!
//! The jar sits *below* the redirect layer, so it sees every hop: cookies
//! are attached for the URL each hop targets and `Set-Cookie` headers are
//! filed under the URL that actually answered.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use http::{Request, Response};
use tower::Service;
use url::Url;

pub(crate) type Jar = Arc<Mutex<cookie_store::CookieStore>>;

pub(crate) fn new_jar() -> Jar {
    Arc::new(Mutex::new(cookie_store::CookieStore::default()))
}

fn lock(jar: &Jar) -> MutexGuard<'_, cookie_store::CookieStore> {
    jar.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replace the `Cookie` header with the jar's cookies for `url`.
///
/// Leaves `headers` untouched when the jar holds nothing for `url`.
pub(crate) fn add_request_cookies(jar: &Jar, url: &Url, headers: &mut HeaderMap) {
    let value = lock(jar)
        .get_request_values(url)
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");

    if value.is_empty() {
        return;
    }
    match HeaderValue::from_str(&value) {
        Ok(value) => {
            headers.insert(COOKIE, value);
        }
        Err(err) => log::debug!("skipping cookie header for {url}: {err}"),
    }
}

pub(crate) fn store_response_cookies(jar: &Jar, url: &Url, headers: &HeaderMap) {
    let cookies = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| cookie_crate::Cookie::parse(value.to_owned()).ok());

    lock(jar).store_response_cookies(cookies, url);
}

/// Wraps a service so every request it sends goes through the jar.
#[derive(Clone)]
pub(crate) struct CookieService<S> {
    inner: S,
    jar: Option<Jar>,
}

impl<S> CookieService<S> {
    pub(crate) fn new(inner: S, jar: Option<Jar>) -> Self {
        CookieService { inner, jar }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CookieService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResBody>, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let jar = self.jar.clone();
        let url = match jar {
            Some(_) => Url::parse(&request.uri().to_string()).ok(),
            None => None,
        };

        if let (Some(jar), Some(url)) = (&jar, &url) {
            add_request_cookies(jar, url, request.headers_mut());
        }

        let fut = self.inner.call(request);
        Box::pin(async move {
            let response = fut.await?;
            if let (Some(jar), Some(url)) = (jar, url) {
                store_response_cookies(&jar, &url, response.headers());
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jar_round_trip() {
        let jar = new_jar();
        let url = Url::parse("http://intranet.example/login").unwrap();

        let mut request_headers = HeaderMap::new();
        add_request_cookies(&jar, &url, &mut request_headers);
        assert!(request_headers.get(COOKIE).is_none());

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("session=abc; Path=/"));
        store_response_cookies(&jar, &url, &headers);

        add_request_cookies(&jar, &url, &mut request_headers);
        assert_eq!(request_headers[COOKIE], "session=abc");
    }

    #[test]
    fn test_cookies_scoped_to_host() {
        let jar = new_jar();
        let first = Url::parse("http://127.0.0.1:8080/").unwrap();
        let other = Url::parse("http://localhost:8080/").unwrap();

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("sid=secret"));
        store_response_cookies(&jar, &first, &headers);

        let mut request_headers = HeaderMap::new();
        add_request_cookies(&jar, &other, &mut request_headers);
        assert!(request_headers.get(COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_service_stores_per_request_url() {
        use tower::ServiceExt;

        let jar = new_jar();
        let inner = tower::service_fn(|request: Request<()>| async move {
            let mut response = Response::new(());
            if request.uri().path() == "/hop" {
                response
                    .headers_mut()
                    .insert(SET_COOKIE, HeaderValue::from_static("hop=1; Path=/"));
            }
            Ok::<_, std::convert::Infallible>(response)
        });

        let request = Request::builder()
            .uri("http://intranet.example/hop")
            .body(())
            .unwrap();
        CookieService::new(inner, Some(jar.clone()))
            .oneshot(request)
            .await
            .unwrap();

        let mut headers = HeaderMap::new();
        let url = Url::parse("http://intranet.example/other").unwrap();
        add_request_cookies(&jar, &url, &mut headers);
        assert_eq!(headers[COOKIE], "hop=1");
    }
}
