//! Credentials attached to source requests

use core::fmt::{self, Debug, Formatter};

use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};
use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;
use serde::Serialize;

use crate::errors::SourceError;

/// Clock skew tolerated between this host and the API, in seconds.
const LEEWAY_SECS: u64 = 60;
const TOKEN_LIFETIME_SECS: u64 = 60 * 60;

const USER_ID: &str = "searchsync";
const USER_REPRESENTATION: &str = "search-sync";

#[derive(Clone)]
pub enum Credential {
    None,
    /// `Authorization: Token <key>`
    Token(String),
    /// `Authorization: Bearer <token>`
    Bearer(String),
    Basic {
        username: String,
        password: String,
    },
}

impl Credential {
    /// Signs a short-lived HS256 token for APIs that authenticate clients by
    /// a shared secret.
    pub fn signed(client_id: &str, secret: &str) -> Result<Self, SourceError> {
        let now = get_current_timestamp();
        let issued_at = now.saturating_sub(LEEWAY_SECS);

        let claims = Claims {
            iss: client_id,
            iat: issued_at,
            nbf: issued_at,
            exp: now + TOKEN_LIFETIME_SECS,
            client_id,
            user_id: USER_ID,
            user_representation: USER_REPRESENTATION,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;

        Ok(Self::Bearer(token))
    }

    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Self::None => builder,
            Self::Token(token) => builder.header(AUTHORIZATION, format!("Token {token}")),
            Self::Bearer(token) => builder.bearer_auth(token),
            Self::Basic { username, password } => builder.basic_auth(username, Some(password)),
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Token(_) => f.write_str("Token(..)"),
            Self::Bearer(_) => f.write_str("Bearer(..)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    iat: u64,
    nbf: u64,
    exp: u64,
    client_id: &'a str,
    user_id: &'a str,
    user_representation: &'a str,
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{decode, DecodingKey, Validation};
    use serde_json::Value;

    use super::*;

    #[test]
    fn signed_token_carries_client_claims() {
        let Credential::Bearer(token) = Credential::signed("sync-client", "s3cret").unwrap() else {
            panic!("expected a bearer credential");
        };

        let mut validation = Validation::default();
        validation.set_issuer(&["sync-client"]);
        let decoded = decode::<Value>(
            &token,
            &DecodingKey::from_secret(b"s3cret"),
            &validation,
        )
        .unwrap();

        assert_eq!(decoded.claims["client_id"], "sync-client");
        assert_eq!(decoded.claims["user_id"], USER_ID);
        let iat = decoded.claims["iat"].as_u64().unwrap();
        let exp = decoded.claims["exp"].as_u64().unwrap();
        assert_eq!(exp - iat, TOKEN_LIFETIME_SECS + LEEWAY_SECS);
    }

    #[test]
    fn debug_hides_secrets() {
        let credential = Credential::Basic {
            username: "elastic".to_owned(),
            password: "changeme".to_owned(),
        };

        let debug = format!("{credential:?}");
        assert!(debug.contains("elastic"));
        assert!(!debug.contains("changeme"));
        assert_eq!(format!("{:?}", Credential::Token("abc".to_owned())), "Token(..)");
    }
}
