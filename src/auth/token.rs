use sha2::{Digest, Sha256};

/// 32 random bytes, hex encoded. Used for bearer tokens and password reset links.
pub fn generate() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Tokens are looked up by their SHA-256; the plaintext is never persisted.
pub fn hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
