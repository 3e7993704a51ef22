use std::num::NonZeroU32;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

const ALGORITHM_TAG: &str = "pbkdf2_sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = ring::digest::SHA256_OUTPUT_LEN;
static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Iteration count must be positive")]
    ZeroIterations,
    #[error("Failed to generate salt")]
    Rng,
}

/// Hashes a password into `pbkdf2_sha256$<iterations>$<salt>$<hash>`.
pub fn hash_password(password: &str, iterations: u32) -> Result<String, CredentialError> {
    let rounds = NonZeroU32::new(iterations).ok_or(CredentialError::ZeroIterations)?;

    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new().fill(&mut salt).map_err(|_| CredentialError::Rng)?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2::derive(PBKDF2_ALG, rounds, &salt, password.as_bytes(), &mut hash);

    Ok(format!(
        "{ALGORITHM_TAG}${iterations}${}${}",
        STANDARD.encode(salt),
        STANDARD.encode(hash)
    ))
}

/// Checks a candidate password against a stored hash. Malformed hashes never
/// match.
pub fn check_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(tag), Some(iterations), Some(salt), Some(hash), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    if tag != ALGORITHM_TAG {
        return false;
    }

    let Some(rounds) = iterations.parse().ok().and_then(NonZeroU32::new) else { return false };
    let (Ok(salt), Ok(hash)) = (STANDARD.decode(salt), STANDARD.decode(hash)) else { return false };

    pbkdf2::verify(PBKDF2_ALG, rounds, &salt, password.as_bytes(), &hash).is_ok()
}
