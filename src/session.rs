//! Signed session tokens.
//!
//! Sessions are stateless: a token carries the user's identity and is
//! verified with the server secret alone. Logging out only discards the
//! token on the client.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::route::auth::model::User;

pub const BEARER_PREFIX: &str = "Bearer ";

/// How long a token stays valid after it is issued, in days.
pub const VALIDITY_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
	pub user_id: String,
	pub email: String,
	pub is_admin: bool,
	/// Issued at, in seconds since the epoch.
	pub iat: i64,
	/// Expires at, in seconds since the epoch.
	pub exp: i64,
}

/// Issues and verifies tokens signed with a shared secret.
#[derive(Clone)]
pub struct Tokens {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
	validity: Duration,
}

impl std::fmt::Debug for Tokens {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Tokens")
			.field("validity", &self.validity)
			.finish_non_exhaustive()
	}
}

impl Tokens {
	pub fn new(secret: &str) -> Self {
		Self::with_validity(secret, Duration::days(VALIDITY_DAYS))
	}

	pub fn with_validity(secret: &str, validity: Duration) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.leeway = 0;

		Self {
			encoding: EncodingKey::from_secret(secret.as_bytes()),
			decoding: DecodingKey::from_secret(secret.as_bytes()),
			validation,
			validity,
		}
	}

	pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
		let now = Utc::now();
		let claims = Claims {
			user_id: user.id.clone(),
			email: user.email.clone(),
			is_admin: user.is_admin,
			iat: now.timestamp(),
			exp: (now + self.validity).timestamp(),
		};

		jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
	}

	/// Returns the claims of a token, or `None` if its signature does not
	/// match or it has expired.
	pub fn verify(&self, token: &str) -> Option<Claims> {
		match jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation) {
			Ok(data) => Some(data.claims),
			Err(e) => {
				tracing::debug!(error = %e, "rejected token");
				None
			}
		}
	}
}

/// Extracts the token from an `Authorization` header value.
pub fn extract_bearer(header: Option<&str>) -> Option<&str> {
	header?
		.strip_prefix(BEARER_PREFIX)
		.map(str::trim)
		.filter(|token| !token.is_empty())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::test::user;

	#[test]
	fn test_issue_then_verify() {
		let tokens = Tokens::new("secret");
		let user = user("a@b.c", true);

		let claims = tokens.verify(&tokens.issue(&user).unwrap()).unwrap();

		assert_eq!(claims.user_id, user.id);
		assert_eq!(claims.email, "a@b.c");
		assert!(claims.is_admin);
		assert_eq!(claims.exp - claims.iat, VALIDITY_DAYS * 24 * 60 * 60);
	}

	#[test]
	fn test_wrong_secret_is_rejected() {
		let token = Tokens::new("secret").issue(&user("a@b.c", false)).unwrap();

		assert!(Tokens::new("other").verify(&token).is_none());
		assert!(Tokens::new("secret").verify("garbage").is_none());
	}

	#[test]
	fn test_expired_token_is_rejected() {
		let tokens = Tokens::with_validity("secret", Duration::minutes(-5));
		let token = tokens.issue(&user("a@b.c", false)).unwrap();

		assert!(tokens.verify(&token).is_none());
	}

	#[test]
	fn test_extract_bearer() {
		assert_eq!(extract_bearer(Some("Bearer abc")), Some("abc"));
		assert_eq!(extract_bearer(Some("Basic abc")), None);
		assert_eq!(extract_bearer(Some("Bearer ")), None);
		assert_eq!(extract_bearer(None), None);
	}
}
