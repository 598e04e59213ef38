use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{
	response::{IntoResponse, Response},
	routing::get,
	Extension,
};

use crate::AppState;

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new().route("/api.json", get(serve_docs))
}

async fn serve_docs(Extension(api): Extension<Arc<OpenApi>>) -> Response {
	axum::Json(&*api).into_response()
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_document_lists_routes() {
		let response = server(state()).get("/docs/api.json").await;

		assert_eq!(response.status_code(), 200);

		let document = response.json::<Value>();
		assert_eq!(document["info"]["title"], "Cloud Canvas");
		assert!(document["paths"]["/api/auth/login"]["post"].is_object());

		let update = document["paths"]
			.as_object()
			.unwrap()
			.iter()
			.find(|(path, _)| path.starts_with("/api/services/id/"))
			.map(|(_, item)| &item["put"])
			.unwrap();
		assert!(update["security"].is_array());
		assert!(update["responses"]["409"].is_object());
		assert!(update["responses"]["403"].is_object());
		assert!(document["components"]["securitySchemes"]["Bearer"].is_object());
	}
}
