// tests/support/codec.rs

//! An NTLM codec with human-readable messages, for driving test servers.

use ntlm_request::{BoxError, Credentials, NtlmCodec};

pub const NEGOTIATE: &[u8] = b"NEGOTIATE";
pub const CHALLENGE: &[u8] = b"CHALLENGE:8f3a";

pub struct FakeCodec;

impl NtlmCodec for FakeCodec {
    type Challenge = String;

    fn negotiate(&self, _credentials: &Credentials) -> Result<Vec<u8>, BoxError> {
        Ok(NEGOTIATE.to_vec())
    }

    fn decode_challenge(&self, message: &[u8]) -> Result<String, BoxError> {
        match message.strip_prefix(b"CHALLENGE:") {
            Some(nonce) => Ok(String::from_utf8_lossy(nonce).into_owned()),
            None => Err("not a challenge message".into()),
        }
    }

    fn authenticate(&self, challenge: &String, credentials: &Credentials) -> Result<Vec<u8>, BoxError> {
        Ok(authenticate_message(
            credentials.domain().unwrap_or(""),
            credentials.username(),
            challenge,
        ))
    }
}

/// What `FakeCodec` answers to `CHALLENGE` for the given identity.
pub fn authenticate_message(domain: &str, username: &str, nonce: &str) -> Vec<u8> {
    format!("AUTH:{}\\{}:{}", domain, username, nonce).into_bytes()
}
