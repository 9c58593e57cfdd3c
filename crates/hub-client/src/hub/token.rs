//! Session token decoding.
//!
//! The registry issues a JWT on sign-in. Only the `ID` claim is read, to
//! scope later queries to the signed-in user. The signature is NOT checked:
//! the registry remains the authority on whether the token is valid.

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::error::{ClientError, Result};

#[derive(Debug, Deserialize)]
struct SessionClaims {
    #[serde(rename = "ID")]
    id: String,
}

/// Extract the user id from a session token without verifying it.
pub fn decode_user_id(token: &str) -> Result<String> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<SessionClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| ClientError::Authentication(format!("unreadable session token: {e}")))?;

    if data.claims.id.trim().is_empty() {
        return Err(ClientError::Authentication(
            "session token carries an empty user id".into(),
        ));
    }
    Ok(data.claims.id)
}
