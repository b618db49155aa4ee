use anyhow::{anyhow, bail, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

const MIN_ADMIN_PASSWORD_LEN: usize = 12;

fn argon2id(m_cost_kb: u32) -> Result<Argon2<'static>> {
    let params =
        Params::new(m_cost_kb, 3, 1, Some(32)).map_err(|e| anyhow!("argon2 params: {}", e))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a PHC string.
///
/// `m_cost_kb` comes from `STOREFRONT_ARGON2_MEMORY_KB`.
pub fn hash_password(password: &str, m_cost_kb: u32) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2id(m_cost_kb)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("hash_password: {}", e))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored hash.
///
/// Users created by the storefront sign-in flow have no local password; a
/// missing or unparsable hash never verifies. Parameters are read from the
/// PHC string, so hashes made with another memory cost still verify.
pub fn verify_password(password: &str, stored: Option<&str>) -> bool {
    let Some(parsed) = stored.and_then(|h| PasswordHash::new(h).ok()) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// [`verify_password`] for the login path: when there is no usable hash, a
/// throwaway hash is computed instead, so a missing account costs the same
/// argon2 work as a wrong password.
pub fn verify_login_password(password: &str, stored: Option<&str>, m_cost_kb: u32) -> bool {
    if stored.and_then(|h| PasswordHash::new(h).ok()).is_some() {
        return verify_password(password, stored);
    }
    if let Err(e) = hash_password(password, m_cost_kb) {
        tracing::warn!(error = %e, "Dummy password hash failed");
    }
    false
}

/// Reject weak passwords given to the startup admin bootstrap.
pub fn check_admin_password(password: &str) -> Result<()> {
    if password.trim().is_empty() {
        bail!("admin password cannot be empty or whitespace-only");
    }
    if password.chars().count() < MIN_ADMIN_PASSWORD_LEN {
        bail!("admin password must be at least {MIN_ADMIN_PASSWORD_LEN} characters");
    }
    Ok(())
}
