use anyhow::Context;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

const RESET_TOKEN_BYTES: usize = 32;

/// A freshly issued password-reset token. `plaintext` goes to the caller once,
/// only `digest` is persisted.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub plaintext: String,
    pub digest: String,
}

pub fn issue() -> anyhow::Result<ResetToken> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate reset token")?;
    let plaintext = hex::encode(bytes);
    let digest = digest(&plaintext);
    Ok(ResetToken { plaintext, digest })
}

/// Hex SHA-256 of a plaintext reset token, as stored on the user row.
pub fn digest(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}
