// tests/support/mod.rs

#![allow(dead_code)]

pub mod codec;
pub mod server;

/// Base64 with the standard alphabet, as used in `Authorization` headers.
pub fn b64(bytes: &[u8]) -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
