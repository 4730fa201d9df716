// src/auth/ntlm.rs

//! The NTLM handshake driver with Basic fallback.
//!
//! One invocation walks through at most three HTTP rounds:
//!
//! 1. the request without authentication, to collect the server's challenge;
//! 2. the NTLM negotiate message (skipped when only Basic is offered);
//! 3. the NTLM authenticate message, or the Basic credentials.
//!
//! The `Authorization` header of each round is computed from the response
//! to the previous one, and only the final response is handed back.

use base64::Engine as _;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONNECTION, USER_AGENT};
use http::{Request, Response, StatusCode};

use super::challenge::{self, SchemeSet};
use super::{Credentials, NtlmCodec, Resolved};
use crate::error::{self, BoxError, Result};
use crate::transport::Transport;

static DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The result of a completed handshake.
#[derive(Debug)]
pub struct Outcome<T> {
    /// The transport the handshake ran over, still holding the authenticated
    /// connection and session cookies.
    pub transport: T,
    /// Status and headers of the final response.
    pub response: http::response::Parts,
    /// Body of the final response.
    pub body: Bytes,
}

/// Which round the next response answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Round {
    /// Nothing has been sent yet.
    Init = 0,
    /// The unauthenticated request is out.
    Challenged = 1,
    /// The NTLM negotiate message is out.
    NegotiateSent = 2,
    /// The NTLM authenticate message or Basic credentials are out.
    CredentialsSent = 3,
}

/// Per-invocation handshake state. Never shared, never reused.
#[derive(Debug)]
pub(crate) struct HandshakeState<Ch> {
    round: Round,
    challenge: Option<Ch>,
}

#[derive(Debug)]
pub(crate) enum Step {
    /// Issue another round with this `Authorization` header, if any.
    Send(Option<HeaderValue>),
    /// The handshake is over; this is the final response.
    Resolve(Response<Bytes>),
}

type RoundResult = std::result::Result<Response<Bytes>, BoxError>;

impl<Ch> HandshakeState<Ch> {
    pub(crate) fn new() -> Self {
        HandshakeState {
            round: Round::Init,
            challenge: None,
        }
    }

    pub(crate) fn round(&self) -> Round {
        self.round
    }

    /// Interpret the previous round's result and decide what happens next.
    ///
    /// `previous` is ignored in `Init`; `None` in any other round means the
    /// transport produced no response at all.
    pub(crate) fn next_step<C>(
        &mut self,
        previous: Option<RoundResult>,
        codec: &C,
        credentials: &Credentials,
    ) -> Result<Step>
    where
        C: NtlmCodec<Challenge = Ch>,
    {
        match self.round {
            Round::Init => {
                self.round = Round::Challenged;
                Ok(Step::Send(None))
            }
            Round::Challenged => {
                let response = received(previous)?;
                if response.status() != StatusCode::UNAUTHORIZED {
                    return Ok(Step::Resolve(response));
                }

                let schemes = SchemeSet::from_headers(response.headers());
                log::debug!("server offered authentication schemes {:?}", schemes);

                if schemes.contains("ntlm") {
                    let message = codec.negotiate(credentials).map_err(error::codec)?;
                    self.round = Round::NegotiateSent;
                    Ok(Step::Send(Some(ntlm_header(&message)?)))
                } else if schemes.contains("basic") {
                    self.round = Round::CredentialsSent;
                    Ok(Step::Send(Some(basic_header(credentials)?)))
                } else {
                    Err(error::no_common_scheme())
                }
            }
            Round::NegotiateSent => {
                let response = received(previous)?;
                if !response.status().is_client_error() {
                    return Ok(Step::Resolve(response));
                }

                let token = challenge::ntlm_token(response.headers())?;
                let raw = base64::engine::general_purpose::STANDARD
                    .decode(token)
                    .map_err(error::codec)?;
                let challenge = self
                    .challenge
                    .insert(codec.decode_challenge(&raw).map_err(error::codec)?);
                let message = codec
                    .authenticate(challenge, credentials)
                    .map_err(error::codec)?;

                self.round = Round::CredentialsSent;
                Ok(Step::Send(Some(ntlm_header(&message)?)))
            }
            Round::CredentialsSent => {
                let response = received(previous)?;
                if !response.status().is_success() {
                    return Err(error::rejected(response.status()));
                }
                Ok(Step::Resolve(response))
            }
        }
    }
}

fn received(previous: Option<RoundResult>) -> Result<Response<Bytes>> {
    match previous {
        Some(Ok(response)) => Ok(response),
        Some(Err(err)) => Err(error::transport(err)),
        None => Err(error::transport("no response received")),
    }
}

/// Execute a request with the NTLM handshake, falling back to Basic.
///
/// Rounds are strictly sequential: the next request is only built once the
/// previous response has been interpreted. Every round goes through the same
/// `transport`, which is handed back in the [`Outcome`].
pub(crate) async fn execute_with_ntlm<T, C>(
    resolved: Resolved,
    transport: T,
    codec: &C,
) -> Result<Outcome<T>>
where
    T: Transport,
    C: NtlmCodec,
{
    let mut state = HandshakeState::<C::Challenge>::new();
    let mut previous = None;

    loop {
        let step = state
            .next_step(previous.take(), codec, &resolved.credentials)
            .map_err(|e| e.with_url(resolved.url.clone()))?;

        match step {
            Step::Resolve(response) => {
                log::debug!(
                    "handshake with {} finished with {}",
                    resolved.url,
                    response.status()
                );
                let (response, body) = response.into_parts();
                return Ok(Outcome {
                    transport,
                    response,
                    body,
                });
            }
            Step::Send(authorization) => {
                log::debug!(
                    "{} {} (round {:?})",
                    resolved.method,
                    resolved.url,
                    state.round()
                );
                let request = build_request(&resolved, authorization)?;
                previous = Some(transport.execute(request).await);
            }
        }
    }
}

/// Build one round: session defaults, then the caller's headers, then the
/// computed `Authorization`.
fn build_request(resolved: &Resolved, authorization: Option<HeaderValue>) -> Result<Request<Bytes>> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.extend(resolved.request.headers.clone());

    headers.remove(AUTHORIZATION);
    if let Some(authorization) = authorization {
        headers.insert(AUTHORIZATION, authorization);
    }

    let mut request = Request::builder()
        .method(resolved.method.clone())
        .uri(resolved.url.as_str())
        .body(resolved.request.body.clone())
        .map_err(error::builder)?;
    *request.headers_mut() = headers;
    Ok(request)
}

fn ntlm_header(message: &[u8]) -> Result<HeaderValue> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(message);
    HeaderValue::from_str(&format!("NTLM {}", encoded)).map_err(error::builder)
}

fn basic_header(credentials: &Credentials) -> Result<HeaderValue> {
    let encoded = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", credentials.username, credentials.password));
    let mut header =
        HeaderValue::from_str(&format!("Basic {}", encoded)).map_err(error::builder)?;
    header.set_sensitive(true);
    Ok(header)
}
