//! Identity: password sign-in and bearer-token verification.
//!
//! The API only needs two things from an identity service: exchange an email
//! and password for a token, and turn a token back into claims. That contract
//! is [`IdentityProvider`]. [`LocalIdentityProvider`] implements it with users
//! from the configuration file and HS256 JSON Web Tokens.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthSettings;

type HmacSha256 = Hmac<Sha256>;

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the signed-in email address.
    pub sub: String,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
    pub jti: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is not a three-part JWT")]
    InvalidFormat,
    #[error("token signature does not verify")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
}

#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub trait IdentityProvider: Send + Sync {
    /// Exchanges credentials for a bearer token.
    fn sign_in(&self, email: &str, password: &str) -> Result<String, SignInError>;

    /// Verifies a bearer token and returns its claims.
    fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

/// Lower-case hex SHA-256 of a password, as stored in the user list.
pub fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

pub fn encode_token(claims: &Claims, secret: &[u8]) -> Result<String> {
    let header = Header {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = HmacSha256::new_from_slice(secret).context("Initialising token signer")?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{signing_input}.{signature}"))
}

/// Verifies signature and expiry against `now` (seconds since the epoch).
pub fn decode_token(token: &str, secret: &[u8], now: i64) -> Result<Claims, TokenError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::InvalidFormat);
    };

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::InvalidSignature)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::InvalidSignature)?;
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| TokenError::InvalidFormat)?;
    let claims: Claims =
        serde_json::from_slice(&claims_json).map_err(|_| TokenError::InvalidFormat)?;
    if claims.exp <= now {
        return Err(TokenError::Expired);
    }
    Ok(claims)
}

/// Users and signing key from the configuration file.
pub struct LocalIdentityProvider {
    users: HashMap<String, String>,
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl LocalIdentityProvider {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: u64) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            bail!("A token secret is required; set auth.token_secret or SALES_API_TOKEN_SECRET");
        }
        let ttl_secs = i64::try_from(ttl_secs).context("Token lifetime out of range")?;
        Ok(Self {
            users: HashMap::new(),
            secret,
            ttl_secs,
        })
    }

    pub fn from_settings(settings: &AuthSettings) -> Result<Self> {
        let mut provider = Self::new(settings.token_secret.as_bytes(), settings.token_ttl_secs)?;
        for user in &settings.users {
            provider.add_user_hash(&user.email, &user.password_sha256);
        }
        Ok(provider)
    }

    pub fn with_user(mut self, email: &str, password: &str) -> Self {
        self.add_user_hash(email, &hash_password(password));
        self
    }

    fn add_user_hash(&mut self, email: &str, password_sha256: &str) {
        self.users
            .insert(email.trim().to_string(), password_sha256.trim().to_ascii_lowercase());
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn issue(&self, email: &str, now: i64) -> Result<String> {
        let claims = Claims {
            sub: email.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
            jti: Uuid::new_v4(),
        };
        encode_token(&claims, &self.secret)
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn sign_in(&self, email: &str, password: &str) -> Result<String, SignInError> {
        let Some(expected) = self.users.get(email.trim()) else {
            debug!("Sign-in rejected for unknown user '{email}'");
            return Err(SignInError::InvalidCredentials);
        };
        if *expected != hash_password(password) {
            debug!("Sign-in rejected for '{email}': wrong password");
            return Err(SignInError::InvalidCredentials);
        }
        Ok(self.issue(email.trim(), Utc::now().timestamp())?)
    }

    fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode_token(token, &self.secret, Utc::now().timestamp())
    }
}
