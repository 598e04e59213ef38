use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Shared by unknown emails and wrong passwords.
	#[error("Invalid credentials")]
	InvalidCredentials,
	#[error("No authentication token provided")]
	NoToken,
	#[error("Invalid or expired token")]
	InvalidToken,
	#[error("User not found")]
	UserNotFound,
	#[error("Admin access required")]
	AdminRequired,
	#[error("token signing failed: {0}")]
	Token(#[from] jsonwebtoken::errors::Error),
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/login", post_with(login, login_docs))
		.api_route("/logout", post_with(logout, logout_docs))
		.api_route("/me", get_with(get_me, get_me_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::InvalidCredentials | Self::NoToken | Self::InvalidToken | Self::UserNotFound => {
				StatusCode::UNAUTHORIZED
			}
			Self::AdminRequired => StatusCode::FORBIDDEN,
			Self::Token(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_login_flow() {
		let state = state();
		let user = insert_user(&state, "admin@example.com", true).await;
		let server = server(state.clone());

		let response = server
			.post("/api/auth/login")
			.json(&json!({
				"email": "admin@example.com",
				"password": PASSWORD,
			}))
			.await;

		assert_eq!(response.status_code(), 200);

		let body = response.json::<Value>();
		assert_eq!(body["success"], true);
		assert!(body["data"]["user"].get("passwordHash").is_none());
		assert_eq!(body["data"]["user"]["email"], "admin@example.com");

		let token = body["data"]["token"].as_str().unwrap();
		let claims = state.tokens.verify(token).unwrap();
		assert_eq!(claims.user_id, user.id);
		assert_eq!(claims.email, user.email);
		assert!(claims.is_admin);

		let response = server
			.get("/api/auth/me")
			.add_header(AUTHORIZATION, bearer(token))
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>()["data"]["id"], user.id.as_str());
	}

	#[tokio::test]
	async fn test_login_failures_are_indistinguishable() {
		let state = state();
		insert_user(&state, "admin@example.com", true).await;
		let server = server(state);

		let unknown = server
			.post("/api/auth/login")
			.json(&json!({ "email": "nobody@example.com", "password": PASSWORD }))
			.await;
		let wrong = server
			.post("/api/auth/login")
			.json(&json!({ "email": "admin@example.com", "password": "wrong password" }))
			.await;

		assert_eq!(unknown.status_code(), 401);
		assert_eq!(wrong.status_code(), 401);
		assert_eq!(unknown.json::<Value>(), wrong.json::<Value>());
		assert_eq!(
			wrong.json::<Value>(),
			json!({ "success": false, "error": "Invalid credentials" })
		);
	}

	#[tokio::test]
	async fn test_login_requires_both_fields() {
		let server = server(state());

		let response = server
			.post("/api/auth/login")
			.json(&json!({ "email": "admin@example.com" }))
			.await;

		assert_eq!(response.status_code(), 400);
		assert_eq!(
			response.json::<Value>()["error"],
			"Email and password are required"
		);
	}

	#[tokio::test]
	async fn test_logout_acknowledges() {
		let response = server(state()).post("/api/auth/logout").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.json::<Value>(),
			json!({ "success": true, "message": "Logged out successfully" })
		);
	}

	#[tokio::test]
	async fn test_deleted_user_loses_access() {
		let state = state();
		let user = insert_user(&state, "user@example.com", false).await;
		let token = token_for(&state, &user);
		let server = server(state.clone());

		server
			.get("/api/auth/me")
			.add_header(AUTHORIZATION, token.clone())
			.await
			.assert_status_ok();

		state
			.database
			.delete(crate::store::Collection::Users, &user.id)
			.await
			.unwrap();

		let response = server
			.get("/api/auth/me")
			.add_header(AUTHORIZATION, token)
			.await;
		assert_eq!(response.status_code(), 401);
		assert_eq!(response.json::<Value>()["error"], "User not found");
	}

	#[tokio::test]
	async fn test_me_rejects_bad_tokens() {
		let state = state();
		let server = server(state.clone());

		let response = server.get("/api/auth/me").await;
		assert_eq!(response.status_code(), 401);
		assert_eq!(
			response.json::<Value>()["error"],
			"No authentication token provided"
		);

		let response = server
			.get("/api/auth/me")
			.add_header(AUTHORIZATION, bearer("garbage"))
			.await;
		assert_eq!(response.status_code(), 401);
		assert_eq!(response.json::<Value>()["error"], "Invalid or expired token");

		// a valid token for a user that no longer exists
		let token = state.tokens.issue(&user("gone@example.com", true)).unwrap();
		let response = server
			.get("/api/auth/me")
			.add_header(AUTHORIZATION, bearer(&token))
			.await;
		assert_eq!(response.status_code(), 401);
		assert_eq!(response.json::<Value>()["error"], "User not found");
	}
}
