use sha2::{Digest, Sha256};

/// One-way digest stored in `m_user.hashed_password`.
pub fn convert_password(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}
