mod session;

pub use session::{Admin, Session};

use aide::OperationIo;
use axum::{
	extract::{FromRequest, FromRequestParts, Request},
	http::request::Parts,
	response::{IntoResponse, Response},
};
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Serialize};
use validator::Validate;

use crate::error::RequestError;

fn validated<T: Validate>(input: T) -> Result<T, RequestError> {
	input.validate()?;
	Ok(input)
}

/// A JSON request body that has passed [`Validate`], or a JSON response body.
///
/// Malformed bodies and failed validation both answer 400 with the envelope.
///
/// ```rust
/// async fn login(Json(input): Json<LoginInput>) {
///   // ...
/// }
/// ```
#[derive(OperationIo)]
#[aide(input_with = "axum::Json<T>", output_with = "axum::Json<T>", json_schema)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
	fn into_response(self) -> Response {
		axum::Json(self.0).into_response()
	}
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
	T: DeserializeOwned + Validate + JsonSchema + 'static,
	S: Send + Sync,
{
	type Rejection = RequestError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let axum::Json(input) = axum::Json::<T>::from_request(req, state).await?;

		validated(input).map(Self)
	}
}

/// Defines a validating wrapper around an axum extractor that reads the request parts.
macro_rules! parts_extractor {
	($(#[$meta:meta])* $name:ident => $schema:tt, $inner:ty) => {
		$(#[$meta])*
		#[derive(OperationIo)]
		#[aide(input_with = $schema, output_with = "axum::Json<T>", json_schema)]
		pub struct $name<T>(pub T);

		#[axum::async_trait]
		impl<T, S> FromRequestParts<S> for $name<T>
		where
			T: DeserializeOwned + Validate + Send,
			S: Send + Sync,
		{
			type Rejection = RequestError;

			async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
				let input = <$inner>::from_request_parts(parts, state).await?.0;

				validated(input).map(Self)
			}
		}
	};
}

parts_extractor! {
	/// Query string parameters that have passed [`Validate`].
	Query => "axum::extract::Query<T>", axum::extract::Query<T>
}

parts_extractor! {
	/// Path segments that have passed [`Validate`], such as a service slug or id.
	Path => "axum::extract::Path<T>", axum::extract::Path<T>
}
