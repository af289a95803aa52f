//! PKCE (RFC 7636) helpers for public OAuth clients

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 32 random bytes, base64url without padding (43 chars).
#[must_use]
pub fn generate_code_verifier() -> String {
    random_token()
}

/// `BASE64URL(SHA256(verifier))`
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Random CSRF token for the `state` parameter.
#[must_use]
pub fn generate_state() -> String {
    random_token()
}

/// Verifier, challenge and state for one authorization request
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    pub code_verifier: String,
    pub code_challenge: String,
    pub state: String,
}

impl PkceChallenge {
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge, state: generate_state() }
    }

    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}
