//! Bearer token validation
//!
//! Tokens are JWTs issued by the backend and signed with the shared secret.
//! Only the HMAC family (HS256/HS384/HS512) is accepted: a token announcing
//! any other algorithm is rejected before its signature is looked at, so a
//! token signed some other way can never be checked as if it were HMAC.

use std::collections::HashMap;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use log::debug;
use thiserror::Error;

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Why a credential was refused
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("malformed header")]
    MalformedHeader,
    #[error("unexpected signing method: {0}")]
    UnexpectedSigningMethod(String),
    #[error("invalid token")]
    InvalidToken,
}

/// Proof that a request carried a valid token.
///
/// Only [`TokenValidator`] can mint one, and every mutating service operation
/// takes a `&Grant`, so an unauthenticated call cannot reach the store.
#[derive(Debug, Clone)]
pub struct Grant {
    subject: Option<String>,
}

impl Grant {
    /// `sub` claim of the token, if it had one. Used for logging only.
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self { subject: Some("test".to_string()) }
    }
}

/// Validates bearer credentials against the shared signing secret
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        // Presence and validity of the token is the whole authorization
        // signal: no claim is mandatory, exp/nbf are honoured when present.
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Check a raw `Authorization` header value
    pub fn authorize(&self, header: Option<&str>) -> Result<Grant, AuthRejection> {
        let header = header.ok_or(AuthRejection::MissingHeader)?;
        let token = bearer_credential(header)?;
        self.verify(token)
    }

    /// Check the token itself, without the `Bearer` wrapper
    pub fn verify(&self, token: &str) -> Result<Grant, AuthRejection> {
        let header = decode_header(token).map_err(|e| {
            debug!("Could not decode token header: {}", e);
            AuthRejection::InvalidToken
        })?;

        if !HMAC_ALGORITHMS.contains(&header.alg) {
            return Err(AuthRejection::UnexpectedSigningMethod(format!("{:?}", header.alg)));
        }

        let data = decode::<HashMap<String, serde_json::Value>>(token, &self.key, &self.validation)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                AuthRejection::InvalidToken
            })?;

        let subject = data
            .claims
            .get("sub")
            .and_then(|sub| sub.as_str())
            .map(str::to_string);

        Ok(Grant { subject })
    }
}

/// Split `"<scheme> <credential>"` and return the credential
fn bearer_credential(header: &str) -> Result<&str, AuthRejection> {
    let parts: Vec<&str> = header.split(' ').collect();
    if parts.len() != 2 {
        return Err(AuthRejection::MalformedHeader);
    }

    let (scheme, credential) = (parts[0], parts[1]);
    if !scheme.eq_ignore_ascii_case("bearer") || credential.is_empty() {
        return Err(AuthRejection::MalformedHeader);
    }

    Ok(credential)
}
