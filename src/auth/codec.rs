// src/auth/codec.rs

//! Seam for the NTLM message codec.
//!
//! The handshake never looks inside NTLM messages. It hands raw bytes to an
//! [`NtlmCodec`] and moves the results in and out of HTTP headers as
//! `NTLM <base64>` tokens.

use super::Credentials;
use crate::error::BoxError;

/// Produces and consumes the three NTLM messages.
///
/// Implementations are expected to be pure: the same inputs give the same
/// outputs, and no state is carried between handshakes.
pub trait NtlmCodec {
    /// Structured data decoded from the server's challenge message.
    type Challenge;

    /// Build the initial negotiate message.
    fn negotiate(&self, credentials: &Credentials) -> Result<Vec<u8>, BoxError>;

    /// Decode the server's challenge message.
    fn decode_challenge(&self, message: &[u8]) -> Result<Self::Challenge, BoxError>;

    /// Build the final authenticate message answering `challenge`.
    fn authenticate(
        &self,
        challenge: &Self::Challenge,
        credentials: &Credentials,
    ) -> Result<Vec<u8>, BoxError>;
}
