use aide::axum::{routing::get_with, ApiRouter};
use macros::route;

use crate::{
	category::{self, Category},
	extract::Json,
	openapi::tag,
	route::model::Envelope,
	AppState,
};

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new().api_route("/", get_with(get_categories, get_categories_docs))
}

/// Get categories
/// Returns the enabled categories in display order.
#[route(tag = tag::CATEGORY)]
pub async fn get_categories() -> Json<Envelope<Vec<Category>>> {
	Json(Envelope::data(category::enabled().copied().collect()))
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_categories_in_configured_order() {
		let response = server(state()).get("/api/categories").await;

		assert_eq!(response.status_code(), 200);

		let body = response.json::<Value>();
		let categories = body["data"].as_array().unwrap();

		assert_eq!(categories.len(), crate::category::CATEGORIES.len());
		assert_eq!(categories[0]["id"], "Analytics");
		assert_eq!(categories[1]["name"], "App-Integration");
		assert_eq!(categories[1]["displayName"], "Application Integration");
	}
}
