/// Reasons a request fails API key validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing x-api-key header")]
    MissingKey,
    #[error("invalid API key")]
    InvalidKey,
}

/// Validates the provided API key against the key configured at startup.
///
/// Returns `Ok(())` when no key is configured or the provided key matches.
pub fn validate_api_key(expected: Option<&str>, provided: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match provided {
        None => Err(AuthError::MissingKey),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AuthError::InvalidKey),
    }
}
