use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;
use url::Url;

/// A `Result` alias where the `Err` case is `ntlm_request::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// The Errors that may occur while resolving options or driving a handshake.
///
/// Every error is terminal for the handshake that produced it.
pub struct Error {
    inner: Box<Inner>,
}

/// A boxed error produced by a [`Transport`](crate::Transport) or an
/// [`NtlmCodec`](crate::NtlmCodec).
pub type BoxError = Box<dyn StdError + Send + Sync>;

struct Inner {
    kind: Kind,
    source: Option<BoxError>,
    url: Option<Url>,
}

impl Error {
    pub(crate) fn new<E>(kind: Kind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                url: None,
            }),
        }
    }

    /// Returns a possible URL related to this error.
    pub fn url(&self) -> Option<&Url> {
        self.inner.url.as_ref()
    }

    /// Add a url related to this error (overwriting any existing)
    pub fn with_url(mut self, url: Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    /// Strip the related url from this error (if, for example, it contains
    /// sensitive information)
    pub fn without_url(mut self) -> Self {
        self.inner.url = None;
        self
    }

    /// Returns true if a required option (uri, method, username, password)
    /// was not supplied.
    pub fn is_missing_option(&self) -> bool {
        matches!(self.inner.kind, Kind::MissingOption(_))
    }

    /// Returns true if the username had a domain separator but could not be
    /// split into `DOMAIN\user`.
    pub fn is_malformed_username(&self) -> bool {
        matches!(self.inner.kind, Kind::MalformedUsername)
    }

    /// Returns true if the domain embedded in the username disagrees with
    /// the explicitly configured one.
    pub fn is_conflicting_domain(&self) -> bool {
        matches!(self.inner.kind, Kind::ConflictingDomain)
    }

    /// Returns true if the error came from the underlying transport.
    pub fn is_transport(&self) -> bool {
        matches!(self.inner.kind, Kind::Transport)
    }

    /// Returns true if the server advertised neither NTLM nor Basic.
    pub fn is_no_common_scheme(&self) -> bool {
        matches!(self.inner.kind, Kind::NoCommonScheme)
    }

    /// Returns true if the server's NTLM challenge was missing.
    pub fn is_malformed_challenge(&self) -> bool {
        matches!(self.inner.kind, Kind::MalformedChallenge)
    }

    /// Returns true if the NTLM codec failed to encode or decode a token.
    pub fn is_codec(&self) -> bool {
        matches!(self.inner.kind, Kind::Codec)
    }

    /// Returns true if the final authenticated round was not a success.
    pub fn is_rejected(&self) -> bool {
        matches!(self.inner.kind, Kind::Rejected(..))
    }

    /// Returns true if the error is related to building a request.
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the transport gave up waiting for a round.
    pub fn is_timeout(&self) -> bool {
        let mut source = self.source();

        while let Some(err) = source {
            if err.is::<tokio::time::error::Elapsed>() {
                return true;
            }
            if let Some(io) = err.downcast_ref::<std::io::Error>() {
                if io.kind() == std::io::ErrorKind::TimedOut {
                    return true;
                }
            }
            source = err.source();
        }

        false
    }

    /// Returns the status code, if the error was a rejected final round.
    pub fn status(&self) -> Option<StatusCode> {
        match self.inner.kind {
            Kind::Rejected(code, _) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut builder = f.debug_struct("ntlm_request::Error");

        builder.field("kind", &self.inner.kind);

        if let Some(ref url) = self.inner.url {
            builder.field("url", &url.as_str());
        }
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }

        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.kind {
            Kind::MissingOption(name) => write!(f, "required option missing: {name}")?,
            Kind::MalformedUsername => f.write_str("unable to parse username")?,
            Kind::ConflictingDomain => {
                f.write_str("domain in username conflicts with the configured domain")?
            }
            Kind::Builder => f.write_str("builder error")?,
            Kind::Transport => f.write_str("error sending request")?,
            Kind::NoCommonScheme => {
                f.write_str("could not negotiate on an authentication scheme")?
            }
            Kind::MalformedChallenge => f.write_str("server sent a malformed NTLM challenge")?,
            Kind::Codec => f.write_str("NTLM codec error")?,
            Kind::Rejected(ref code, ref reason) => {
                if let Some(reason) = reason {
                    write!(
                        f,
                        "authentication rejected (HTTP {} {})",
                        code.as_str(),
                        reason
                    )?;
                } else {
                    write!(f, "authentication rejected (HTTP {})", code.as_str())?;
                }
            }
        };

        if let Some(url) = &self.inner.url {
            write!(f, " for url ({url})")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

#[derive(Debug)]
pub(crate) enum Kind {
    MissingOption(&'static str),
    MalformedUsername,
    ConflictingDomain,
    Builder,
    Transport,
    NoCommonScheme,
    MalformedChallenge,
    Codec,
    Rejected(StatusCode, Option<String>),
}

// constructors

pub(crate) fn missing_option(name: &'static str) -> Error {
    Error::new(Kind::MissingOption(name), None::<Error>)
}

pub(crate) fn malformed_username() -> Error {
    Error::new(Kind::MalformedUsername, None::<Error>)
}

pub(crate) fn conflicting_domain() -> Error {
    Error::new(Kind::ConflictingDomain, None::<Error>)
}

pub(crate) fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder, Some(e))
}

pub(crate) fn transport<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Transport, Some(e))
}

pub(crate) fn no_common_scheme() -> Error {
    Error::new(Kind::NoCommonScheme, None::<Error>)
}

pub(crate) fn malformed_challenge<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::MalformedChallenge, Some(e))
}

pub(crate) fn codec<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Codec, Some(e))
}

pub(crate) fn rejected(status: StatusCode) -> Error {
    let reason = status.canonical_reason().map(str::to_owned);
    Error::new(Kind::Rejected(status, reason), None::<Error>)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn test_source_chain() {
        let root = Error::new(Kind::Transport, None::<Error>);
        assert!(root.source().is_none());

        let link = super::codec(root);
        assert!(link.source().is_some());
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn mem_size_of() {
        use std::mem::size_of;
        assert_eq!(size_of::<Error>(), size_of::<usize>());
    }

    #[test]
    fn rejected_carries_status() {
        let err = super::rejected(StatusCode::FORBIDDEN);
        assert!(err.is_rejected());
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(
            err.to_string(),
            "authentication rejected (HTTP 403 Forbidden)"
        );
    }

    #[test]
    fn display_appends_url() {
        let url = Url::parse("http://intranet.example/").unwrap();
        let err = super::no_common_scheme().with_url(url);
        assert_eq!(
            err.to_string(),
            "could not negotiate on an authentication scheme for url (http://intranet.example/)"
        );
        assert!(err.without_url().url().is_none());
    }

    #[test]
    fn is_timeout() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "round timed out");
        let err = super::transport(io);
        assert!(err.is_timeout());
        assert!(!super::transport("refused").is_timeout());
    }
}
