use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};

use crate::{
	openapi::SECURITY_SCHEME_BEARER,
	route::auth::{self, model::User},
	session::{self, Claims, Tokens},
	store, Database,
};

/// The authenticated user of a request.
///
/// The token in the `Authorization` header is verified, then the user it
/// names is fetched again, so a deleted user or a revoked privilege takes
/// effect before the token expires.
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Session {
	pub claims: Claims,
	pub user: User,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	Tokens: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = auth::RouteError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let header = parts
			.headers
			.get(header::AUTHORIZATION)
			.and_then(|value| value.to_str().ok());

		let token = session::extract_bearer(header).ok_or(auth::Error::NoToken)?;
		let claims = Tokens::from_ref(state)
			.verify(token)
			.ok_or(auth::Error::InvalidToken)?;

		let database = Database::from_ref(state);
		let user = store::users::get(database.as_ref(), &claims.user_id)
			.await?
			.ok_or(auth::Error::UserNotFound)?;

		Ok(Self { claims, user })
	}
}

impl OperationInput for Session {
	/// Adds a bearer token requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_BEARER.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}

/// A [`Session`] whose user is an administrator.
///
/// The privilege is read from the stored user, not from the token.
#[derive(Debug, Clone)]
pub struct Admin(pub Session);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Admin
where
	Database: FromRef<S>,
	Tokens: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = auth::RouteError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let session = Session::from_request_parts(parts, state).await?;

		if !session.user.is_admin {
			tracing::warn!(user = %session.user.id, "admin access denied");
			return Err(auth::Error::AdminRequired.into());
		}

		Ok(Self(session))
	}
}

impl OperationInput for Admin {
	fn operation_input(ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		Session::operation_input(ctx, operation);
	}
}
