use axum::extract::State;
use macros::route;

use crate::{
	extract::{Json, Session},
	openapi::tag,
	password,
	route::model::Envelope,
	store::users,
	AppState,
};

use super::{model, Error, RouteError};

/// Log in
/// Exchanges an email and password for a bearer token and the user it belongs to.
#[route(
	tag = tag::AUTH,
	response(status = 200, description = "Logged in successfully.", shape = "Json<Envelope<model::AuthResponse>>"),
	error(status = 400, description = "The email or password is missing."),
	error(status = 401, description = "The credentials are invalid.")
)]
pub async fn login(
	State(state): State<AppState>,
	Json(input): Json<model::LoginInput>,
) -> Result<Json<Envelope<model::AuthResponse>>, RouteError> {
	let user = users::get_by_email(state.database.as_ref(), &input.email)
		.await?
		.filter(|user| password::verify_password(&state.hasher, &input.password, &user.password_hash))
		.ok_or(Error::InvalidCredentials)?;

	let token = state.tokens.issue(&user).map_err(Error::Token)?;

	tracing::info!(user = %user.id, "user logged in");

	Ok(Json(Envelope::data(model::AuthResponse {
		token,
		user: user.into(),
	})))
}

/// Log out
/// Acknowledges a logout. Tokens are stateless, so the client discards its own.
#[route(tag = tag::AUTH, response(status = 200, description = "Logged out successfully.", shape = "Json<Envelope<()>>"))]
pub async fn logout() -> Json<Envelope<()>> {
	Json(Envelope::message("Logged out successfully"))
}

/// Get user
/// Returns the authenticated user.
#[route(tag = tag::AUTH, error(status = 401, description = "No valid session."))]
pub async fn get_me(session: Session) -> Json<Envelope<model::PublicUser>> {
	Json(Envelope::data(session.user.into()))
}
