use std::{borrow::Cow, convert::Infallible};

use axum::{
	extract::rejection::{JsonRejection, PathRejection, QueryRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::{route::model::Envelope, store};

/// The message sent in place of the details of a server error.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// An error raised by a group of routes.
///
/// The [`Display`](std::fmt::Display) output is sent to the client, so it
/// must not contain sensitive information.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn message(&self) -> Cow<'_, str> {
		self.to_string().into()
	}
}

impl ErrorShape for Infallible {
	fn status(&self) -> StatusCode {
		match *self {}
	}
}

/// Error type for the handlers of a group of routes.
///
/// Besides the errors of the group itself, this absorbs the errors every
/// handler can run into, so that each one ends up in the response envelope.
/// The [`Display`](std::fmt::Display) output is only logged.
#[derive(Debug, thiserror::Error)]
pub enum RouteError<E> {
	#[error(transparent)]
	Route(E),
	#[error("validation error: {0}")]
	Validation(#[from] ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] JsonRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("store error: {0}")]
	Store(#[from] store::Error),
}

/// The rejection of extractors that are not tied to a group of routes.
pub type RequestError = RouteError<Infallible>;

/// Flattens validation errors, including those of nested structs, into
/// sorted and deduplicated messages.
fn validation_messages(errors: &ValidationErrors, messages: &mut Vec<String>) {
	for (field, kind) in errors.errors() {
		match kind {
			ValidationErrorsKind::Field(errors) => {
				messages.extend(errors.iter().map(|error| {
					error
						.message
						.as_ref()
						.map_or_else(|| format!("{field}: {}", error.code), ToString::to_string)
				}));
			}
			ValidationErrorsKind::Struct(errors) => validation_messages(errors, messages),
			ValidationErrorsKind::List(errors) => {
				for errors in errors.values() {
					validation_messages(errors, messages);
				}
			}
		}
	}
}

impl<E> RouteError<E>
where
	E: ErrorShape,
{
	fn status(&self) -> StatusCode {
		match self {
			Self::Route(error) => error.status(),
			Self::Validation(..) | Self::Json(..) | Self::Path(..) | Self::Query(..) => {
				StatusCode::BAD_REQUEST
			}
			Self::Store(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn message(&self) -> Cow<'_, str> {
		match self {
			Self::Route(error) => error.message(),
			Self::Validation(errors) => {
				let mut messages = Vec::new();
				validation_messages(errors, &mut messages);
				messages.sort_unstable();
				messages.dedup();

				messages.join(", ").into()
			}
			Self::Json(rejection) => rejection.body_text().into(),
			Self::Path(rejection) => rejection.body_text().into(),
			Self::Query(rejection) => rejection.body_text().into(),
			Self::Store(..) => INTERNAL_ERROR_MESSAGE.into(),
		}
	}
}

impl<E> IntoResponse for RouteError<E>
where
	E: ErrorShape,
{
	fn into_response(self) -> Response {
		let status = self.status();

		let message = if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
			INTERNAL_ERROR_MESSAGE.into()
		} else {
			tracing::debug!(error = %self, %status, "request rejected");
			self.message()
		};

		(status, axum::Json(Envelope::failure(message))).into_response()
	}
}

impl<E> aide::OperationOutput for RouteError<E> {
	type Inner = Envelope<()>;
}
