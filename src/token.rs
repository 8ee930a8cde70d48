//! Manage json web tokens.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};
use crate::user::{Identity, UserId};

const DEFAULT_AUDIENCE: &str = "devroom";
pub const EXPIRATION_TIME: u64 = 60 * 60 * 24; // 1 day.

/// Pieces of information asserted on a JWT.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Claims {
    /// Recipients that the JWT is intended for.
    pub aud: String,
    /// Identifies the expiration time on or after which the JWT must not be
    /// accepted for processing.
    pub exp: u64,
    /// Identifies the time at which the JWT was issued.
    pub iat: u64,
    /// Identifies the organization that issued the JWT.
    pub iss: String,
    /// User ID.
    pub sub: String,
    /// User display name.
    pub name: String,
}

/// Manage JWT tokens.
#[derive(Clone)]
pub struct TokenManager {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    name: String,
    audience: String,
    expiration: u64,
}

impl TokenManager {
    /// Create a new [`TokenManager`] signing with an HMAC `secret`.
    pub fn new(name: &str, secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(ServerError::Internal {
                details: "token secret must not be empty".into(),
                source: None,
            });
        }

        Ok(Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            name: name.to_owned(),
            audience: DEFAULT_AUDIENCE.to_string(),
            expiration: EXPIRATION_TIME,
        })
    }

    /// Set `audience` field on JWT.
    pub fn audience(&mut self, audience: &str) {
        self.audience = audience.to_owned();
    }

    /// Set token lifetime, in seconds.
    pub fn expiration(&mut self, seconds: u64) {
        self.expiration = seconds;
    }

    /// Token lifetime, in seconds.
    pub fn expires_in(&self) -> u64 {
        self.expiration
    }

    /// Create a new [`jsonwebtoken`] for `identity`.
    pub fn create(&self, identity: &Identity) -> Result<String> {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        self.create_at(identity, now)
    }

    pub(crate) fn create_at(&self, identity: &Identity, issued_at: u64) -> Result<String> {
        let header = Header::new(self.algorithm);
        let claims = Claims {
            aud: self.audience.clone(),
            exp: issued_at + self.expiration,
            iat: issued_at,
            iss: self.name.clone(),
            sub: identity.id.to_string(),
            name: identity.name.clone(),
        };

        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    /// Decode and check a token.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.name]);

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }

    /// Decode a token into the caller [`Identity`].
    pub fn identify(&self, token: &str) -> Result<Identity> {
        let claims = self.decode(token).map_err(|_| ServerError::Unauthorized)?;
        let id = UserId::parse(&claims.sub).map_err(|_| ServerError::Unauthorized)?;

        Ok(Identity {
            id,
            name: claims.name,
        })
    }
}
