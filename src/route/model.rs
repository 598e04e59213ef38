use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// The body of every API response.
///
/// Successful responses carry `data` (or only a `message`), failed ones
/// carry `error`.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Envelope<T> {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl<T> Envelope<T> {
	pub fn data(data: T) -> Self {
		Self {
			success: true,
			data: Some(data),
			error: None,
			message: None,
		}
	}
}

impl Envelope<()> {
	pub fn message(message: impl Into<String>) -> Self {
		Self {
			success: true,
			data: None,
			error: None,
			message: Some(message.into()),
		}
	}

	pub fn failure(error: impl Into<String>) -> Self {
		Self {
			success: false,
			data: None,
			error: Some(error.into()),
			message: None,
		}
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	#[validate(length(min = 1, message = "Service ID is required"))]
	pub id: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct SlugInput {
	#[validate(length(min = 1, message = "Service slug is required"))]
	pub slug: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct CategoryQuery {
	/// Restricts the listing to one category. Without it, every service is
	/// returned grouped by category.
	pub category: Option<String>,
}

#[cfg(test)]
mod test {
	use serde_json::json;

	use super::Envelope;

	#[test]
	fn test_envelope_omits_absent_fields() {
		assert_eq!(
			serde_json::to_value(Envelope::data(1)).unwrap(),
			json!({ "success": true, "data": 1 })
		);
		assert_eq!(
			serde_json::to_value(Envelope::failure("nope")).unwrap(),
			json!({ "success": false, "error": "nope" })
		);
		assert_eq!(
			serde_json::to_value(Envelope::message("ok")).unwrap(),
			json!({ "success": true, "message": "ok" })
		);
	}
}
