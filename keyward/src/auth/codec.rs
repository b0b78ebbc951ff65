//! Stateless JWT encoding and verification.
//!
//! Tokens are HS256-signed claim sets `{sub, email, type?, exp, iat}`.
//! Verification pins the algorithm to HS256, applies no clock leeway, and
//! deserializes into a typed claim struct so missing or mistyped identity
//! claims fail with [`AuthError::MalformedClaims`] instead of defaulting.
//! `iat` is written on every token but not required on input.

use super::{
    errors::{AuthError, AuthResult},
    models::{REFRESH_TOKEN_TYPE, TokenClaims, TokenKind, UserClaims},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT encoder/decoder bound to one signing secret
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec for the given HMAC secret
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign `claims` into a token that expires `ttl` from now
    ///
    /// A negative `ttl` produces an already-expired token.
    ///
    /// # Errors
    ///
    /// * `AuthError::EncodingError` - The signer rejected the key or payload
    pub fn encode(&self, claims: &UserClaims, ttl: Duration, kind: TokenKind) -> AuthResult<String> {
        let now = Utc::now();
        let payload = TokenClaims {
            sub: claims.user_id.clone(),
            email: claims.email.clone(),
            token_type: kind.claim_value().map(str::to_string),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &payload, &self.encoding_key)
            .map_err(|e| AuthError::EncodingError(e.to_string()))
    }

    /// Verify `token` and extract its identity claims
    ///
    /// # Errors
    ///
    /// * `AuthError::TokenExpired` - `exp` is in the past
    /// * `AuthError::WrongTokenType` - `type` does not match `expected`
    /// * `AuthError::MalformedClaims` - `sub`/`email`/`exp` missing or mistyped
    /// * `AuthError::InvalidToken` - Bad signature, foreign algorithm, or garbage input
    pub fn decode(&self, token: &str, expected: TokenKind) -> AuthResult<UserClaims> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(map_decode_error)?;
        let claims = data.claims;

        match expected {
            TokenKind::Refresh if claims.token_type.as_deref() != Some(REFRESH_TOKEN_TYPE) => {
                return Err(AuthError::WrongTokenType);
            }
            TokenKind::Access if claims.token_type.is_some() => {
                return Err(AuthError::WrongTokenType);
            }
            _ => {}
        }

        if claims.sub.is_empty() || claims.email.is_empty() {
            return Err(AuthError::MalformedClaims);
        }

        Ok(UserClaims {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => AuthError::MalformedClaims,
        _ => AuthError::InvalidToken,
    }
}
