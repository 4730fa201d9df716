// src/auth/options.rs

//! Caller options and their resolution into canonical credentials.

use std::fmt;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use url::Url;

use super::{Credentials, DOMAIN_SEPARATOR};
use crate::error::{self, Result};

/// Extra request settings merged into every round of the handshake.
///
/// Headers computed by the handshake (`Authorization`) take precedence over
/// headers set here.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl RequestOptions {
    /// Headers sent with every round.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Body replayed with every round.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Options for a single authenticated request.
///
/// `uri`, `method`, `username` and `password` are required; everything else
/// is optional.
///
/// ```
/// use ntlm_request::{Method, Options};
///
/// let options = Options::new()
///     .uri("http://intranet.example/api")
///     .method(Method::GET)
///     .username("CORP\\alice")
///     .password("secret");
/// let resolved = options.resolve().unwrap();
/// assert_eq!(resolved.credentials().domain(), Some("CORP"));
/// ```
#[derive(Clone, Default)]
pub struct Options {
    uri: Option<String>,
    method: Option<Method>,
    username: Option<String>,
    password: Option<String>,
    domain: Option<String>,
    workstation: Option<String>,
    request: RequestOptions,
}

impl Options {
    /// Start with no options set.
    pub fn new() -> Options {
        Options::default()
    }

    /// The absolute URI to request.
    pub fn uri<U: Into<String>>(mut self, uri: U) -> Options {
        self.uri = Some(uri.into());
        self
    }

    /// The HTTP method used for every round.
    pub fn method(mut self, method: Method) -> Options {
        self.method = Some(method);
        self
    }

    /// The user name, optionally written as `DOMAIN\user`.
    pub fn username<S: Into<String>>(mut self, username: S) -> Options {
        self.username = Some(username.into());
        self
    }

    /// The password.
    pub fn password<S: Into<String>>(mut self, password: S) -> Options {
        self.password = Some(password.into());
        self
    }

    /// The domain (NTLM target). Must agree with a domain embedded in the
    /// username, if both are given.
    pub fn domain<S: Into<String>>(mut self, domain: S) -> Options {
        self.domain = Some(domain.into());
        self
    }

    /// The workstation name handed to the NTLM codec.
    pub fn workstation<S: Into<String>>(mut self, workstation: S) -> Options {
        self.workstation = Some(workstation.into());
        self
    }

    /// Add a header to every round.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Options {
        self.request.headers.append(name, value);
        self
    }

    /// Merge a set of headers into every round, replacing earlier values
    /// with the same name.
    pub fn headers(mut self, headers: HeaderMap) -> Options {
        self.request.headers.extend(headers);
        self
    }

    /// The request body, replayed with every round.
    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Options {
        self.request.body = body.into();
        self
    }

    /// Validate the options and normalize the credentials.
    ///
    /// No network I/O happens here; every error returned is an input error.
    pub fn resolve(self) -> Result<Resolved> {
        let uri = self.uri.ok_or_else(|| error::missing_option("uri"))?;
        let method = self.method.ok_or_else(|| error::missing_option("method"))?;
        let username = self
            .username
            .ok_or_else(|| error::missing_option("username"))?;
        let password = self
            .password
            .ok_or_else(|| error::missing_option("password"))?;

        let url = Url::parse(&uri).map_err(error::builder)?;
        let (domain, username) = split_domain(username, self.domain)?;

        Ok(Resolved {
            url,
            method,
            credentials: Credentials {
                username,
                domain,
                password,
                workstation: self.workstation,
            },
            request: self.request,
        })
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("uri", &self.uri)
            .field("method", &self.method)
            .field("username", &self.username)
            .field("domain", &self.domain)
            .field("workstation", &self.workstation)
            .field("request", &self.request)
            .finish()
    }
}

/// Options after validation, ready to drive a handshake.
#[derive(Clone, Debug)]
pub struct Resolved {
    pub(crate) url: Url,
    pub(crate) method: Method,
    pub(crate) credentials: Credentials,
    pub(crate) request: RequestOptions,
}

impl Resolved {
    /// The parsed request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The canonical credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Extra settings merged into every round.
    pub fn request(&self) -> &RequestOptions {
        &self.request
    }
}

/// Split `DOMAIN\user` and reconcile it with an explicit domain.
///
/// Returns `(domain, username)`.
fn split_domain(username: String, domain: Option<String>) -> Result<(Option<String>, String)> {
    if !username.contains(DOMAIN_SEPARATOR) {
        return Ok((domain, username));
    }

    let mut parts = username.split(DOMAIN_SEPARATOR);
    let (embedded, user) = match (parts.next(), parts.next(), parts.next()) {
        (Some(embedded), Some(user), None) if !embedded.is_empty() && !user.is_empty() => {
            (embedded, user)
        }
        _ => return Err(error::malformed_username()),
    };

    // an empty explicit domain counts as unset
    if let Some(explicit) = domain.as_deref().filter(|d| !d.is_empty()) {
        if explicit.to_uppercase() != embedded.to_uppercase() {
            return Err(error::conflicting_domain());
        }
    }

    Ok((Some(embedded.to_owned()), user.to_owned()))
}
