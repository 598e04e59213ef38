use chrono::{DateTime, Utc};
use macros::patch;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A stored account.
///
/// This carries the password hash, so it must never be sent to clients.
/// Use [`PublicUser`] instead.
#[patch]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	#[patch(skip)]
	pub id: String,
	/// The email address used to log in.
	pub email: String,
	pub name: String,
	/// An Argon2 hash in PHC string format.
	pub password_hash: String,
	#[serde(default)]
	pub is_admin: bool,
	/// The ids of the user's favorite services.
	#[serde(default)]
	pub favorites: Vec<String>,
	#[patch(skip)]
	pub created_at: DateTime<Utc>,
	#[patch(skip)]
	pub updated_at: DateTime<Utc>,
}

/// A user without credentials.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
	pub id: String,
	pub email: String,
	pub name: String,
	pub is_admin: bool,
	pub favorites: Vec<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
	fn from(user: User) -> Self {
		Self {
			id: user.id,
			email: user.email,
			name: user.name,
			is_admin: user.is_admin,
			favorites: user.favorites,
			created_at: user.created_at,
			updated_at: user.updated_at,
		}
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[serde(default)]
	#[validate(length(min = 1, message = "Email and password are required"))]
	pub email: String,
	#[serde(default)]
	#[validate(length(min = 1, message = "Email and password are required"))]
	pub password: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AuthResponse {
	/// A bearer token for the `Authorization` header.
	pub token: String,
	pub user: PublicUser,
}
