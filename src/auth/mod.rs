// src/auth/mod.rs

//! Authentication module for the NTLM handshake with Basic fallback.
//!
//! The flow is split in three parts: option resolution ([`Options`]),
//! challenge parsing and the round-by-round driver in `ntlm`.

use std::fmt;

mod challenge;
mod codec;
mod ntlm;
mod options;

pub use self::codec::NtlmCodec;
pub(crate) use self::ntlm::execute_with_ntlm;
pub use self::ntlm::Outcome;
pub use self::options::{Options, RequestOptions, Resolved};

/// Separator between the domain and the user in `DOMAIN\user`.
pub(crate) const DOMAIN_SEPARATOR: char = '\\';

/// Canonical credentials for one handshake.
///
/// After resolution the username never carries a domain prefix; the domain,
/// if any, lives in its own field.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub(crate) username: String,
    pub(crate) domain: Option<String>,
    pub(crate) password: String,
    pub(crate) workstation: Option<String>,
}

impl Credentials {
    /// The bare user name, without any domain prefix.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The domain (NTLM target) the user belongs to.
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// The password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// The workstation name reported to the server.
    pub fn workstation(&self) -> Option<&str> {
        self.workstation.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("domain", &self.domain)
            .field("password", &"<redacted>")
            .field("workstation", &self.workstation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials {
            username: "alice".into(),
            domain: Some("CORP".into()),
            password: "hunter2".into(),
            workstation: None,
        };

        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }
}
