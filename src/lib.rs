#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # ntlm-request
//!
//! The `ntlm-request` crate performs an HTTP request that is protected by
//! NTLM authentication, falling back to Basic when the server does not offer
//! NTLM.
//!
//! The handshake takes up to three HTTP rounds over one connection:
//!
//! - the request is sent without credentials;
//! - if the server answers `401` with `WWW-Authenticate: NTLM`, an NTLM
//!   negotiate message is sent, the server's challenge is decoded and the
//!   authenticate message is sent in the last round;
//! - if the server only offers `Basic`, the credentials are sent once as
//!   `Basic` instead.
//!
//! Only the final response is returned. Every intermediate failure surfaces
//! as an [`Error`].
//!
//! The NTLM messages themselves are produced by an [`NtlmCodec`] supplied by
//! the caller; the HTTP rounds go through a [`Transport`], by default a
//! [`HyperTransport`].
//!
//! ```rust,no_run
//! # use ntlm_request::{BoxError, Credentials, Method, NtlmCodec, Options};
//! # struct MyCodec;
//! # impl NtlmCodec for MyCodec {
//! #     type Challenge = Vec<u8>;
//! #     fn negotiate(&self, _: &Credentials) -> Result<Vec<u8>, BoxError> { unimplemented!() }
//! #     fn decode_challenge(&self, m: &[u8]) -> Result<Vec<u8>, BoxError> { Ok(m.to_vec()) }
//! #     fn authenticate(&self, _: &Vec<u8>, _: &Credentials) -> Result<Vec<u8>, BoxError> { unimplemented!() }
//! # }
//! # async fn run() -> Result<(), ntlm_request::Error> {
//! let options = Options::new()
//!     .uri("http://intranet.example/api")
//!     .method(Method::GET)
//!     .username("CORP\\alice")
//!     .password("secret")
//!     .workstation("WS01");
//!
//! let outcome = ntlm_request::request(options, MyCodec).await?;
//! println!("{} {:?}", outcome.response.status, outcome.body);
//! # Ok(())
//! # }
//! ```
//!
//! ## Optional Features
//!
//! - **cookies** *(enabled by default)*: keep cookies between the rounds of
//!   a handshake in [`HyperTransport`], including those set on redirect hops.

pub use http::header;
pub use http::Method;
pub use http::StatusCode;
pub use url::Url;

pub use self::auth::{Credentials, NtlmCodec, Options, Outcome, RequestOptions, Resolved};
pub use self::error::{BoxError, Error, Result};
pub use self::transport::{HyperTransport, HyperTransportBuilder, Transport};

mod auth;
#[cfg(feature = "cookies")]
mod cookie;
mod error;
pub mod transport;

/// Run the handshake for `options` over a fresh [`HyperTransport`].
///
/// The transport in the returned [`Outcome`] holds the authenticated
/// connection, so follow-up requests can be sent over it.
///
/// # Errors
///
/// Input errors (missing options, malformed username, conflicting domain)
/// are returned before any request is sent. See [`Error`] for the rest.
pub async fn request<C: NtlmCodec>(options: Options, codec: C) -> Result<Outcome<HyperTransport>> {
    let resolved = options.resolve()?;
    auth::execute_with_ntlm(resolved, HyperTransport::new(), &codec).await
}

/// Run the handshake for `options` over a caller-supplied transport.
///
/// The transport must keep the underlying connection (and cookies) between
/// calls: NTLM authenticates the connection, not the request.
pub async fn request_with<T, C>(options: Options, transport: T, codec: &C) -> Result<Outcome<T>>
where
    T: Transport,
    C: NtlmCodec,
{
    let resolved = options.resolve()?;
    auth::execute_with_ntlm(resolved, transport, codec).await
}

fn _assert_impls() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<HyperTransport>();
    assert_sync::<HyperTransport>();
    assert_send::<Options>();
    assert_send::<Error>();
    assert_sync::<Error>();
}
