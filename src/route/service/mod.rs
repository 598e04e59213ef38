use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, store, AppState};

pub mod model;
pub mod route;

/// The cache hint sent with public listings.
pub const CACHE_CONTROL: &str = "public, s-maxage=60, stale-while-revalidate=30";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Service not found")]
	NotFound,
	#[error("Service not found with ID: {0}")]
	NotFoundWithId(String),
	#[error("Service was modified by another request, expected version {0}")]
	Conflict(u64),
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
		.api_route("/", get_with(get_services, get_services_docs))
		.api_route("/stats", get_with(get_stats, get_stats_docs))
		.api_route(
			"/:slug",
			get_with(get_service, get_service_docs).put_with(update_service, update_service_docs),
		)
		.api_route(
			"/id/:id",
			get_with(get_service_by_id, get_service_by_id_docs)
				.put_with(update_service_by_id, update_service_by_id_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::NotFound | Self::NotFoundWithId(..) => StatusCode::NOT_FOUND,
			Self::Conflict(..) => StatusCode::CONFLICT,
		}
	}
}

/// Maps a failed version check onto [`Error::Conflict`], and a service deleted
/// during the update onto [`Error::NotFoundWithId`].
fn update_failed(id: &str, expected: Option<u64>) -> impl FnOnce(store::Error) -> RouteError + '_ {
	move |error| match (error, expected) {
		(store::Error::ConditionFailed, Some(version)) => Error::Conflict(version).into(),
		(store::Error::NotFound, _) => Error::NotFoundWithId(id.to_owned()).into(),
		(error, _) => error.into(),
	}
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use axum::response::IntoResponse;

	use crate::{
		route::service::model::{Service, ServicePatch},
		store::{self, services},
		test::*,
	};

	async fn seeded(state: &crate::State) -> Service {
		let mut service = service("s3", "Storage");
		service.enabled = false;
		services::put(state.database.as_ref(), &service).await.unwrap();

		service
	}

	async fn stored(state: &crate::State, id: &str) -> Service {
		services::get(state.database.as_ref(), id).await.unwrap().unwrap()
	}

	#[tokio::test]
	async fn test_update_by_id_bumps_updated_at() {
		let state = state();
		let service = seeded(&state).await;
		let admin = insert_user(&state, "admin@example.com", true).await;
		let server = server(state.clone());

		let before = server
			.get(&format!("/api/services/id/{}", service.id))
			.await
			.json::<Value>();

		tokio::time::sleep(Duration::from_millis(5)).await;

		let response = server
			.put(&format!("/api/services/id/{}", service.id))
			.add_header(AUTHORIZATION, token_for(&state, &admin))
			.json(&json!({ "enabled": true }))
			.await;

		assert_eq!(response.status_code(), 200);

		let after = server
			.get(&format!("/api/services/id/{}", service.id))
			.await
			.json::<Value>();

		assert_eq!(after["data"]["enabled"], true);
		assert_eq!(after["data"]["version"], 1);

		let parse = |value: &Value| {
			value["data"]["updatedAt"]
				.as_str()
				.unwrap()
				.parse::<chrono::DateTime<chrono::Utc>>()
				.unwrap()
		};
		assert!(parse(&after) > parse(&before));
	}

	#[tokio::test]
	async fn test_update_signals_revalidation() {
		let state = state();
		let service = seeded(&state).await;
		let admin = insert_user(&state, "admin@example.com", true).await;
		let mut paths = state.revalidator.subscribe();
		let server = server(state.clone());

		server
			.put(&format!("/api/services/id/{}", service.id))
			.add_header(AUTHORIZATION, token_for(&state, &admin))
			.json(&json!({ "summary": "Object storage" }))
			.await
			.assert_status_ok();

		assert_eq!(paths.recv().await.unwrap(), "/Storage/s3");
		assert_eq!(paths.recv().await.unwrap(), "/");
	}

	#[tokio::test]
	async fn test_non_admins_cannot_update() {
		let state = state();
		let service = seeded(&state).await;
		let user = insert_user(&state, "user@example.com", false).await;
		let server = server(state.clone());

		let anonymous = server
			.put("/api/services/s3")
			.json(&json!({ "enabled": true }))
			.await;
		assert_eq!(anonymous.status_code(), 401);

		let forbidden = server
			.put(&format!("/api/services/id/{}", service.id))
			.add_header(AUTHORIZATION, token_for(&state, &user))
			.json(&json!({ "enabled": true }))
			.await;
		assert_eq!(forbidden.status_code(), 403);
		assert_eq!(forbidden.json::<Value>()["error"], "Admin access required");

		assert_eq!(stored(&state, &service.id).await, service);
	}

	#[tokio::test]
	async fn test_revoked_admin_is_forbidden() {
		let state = state();
		seeded(&state).await;
		let admin = insert_user(&state, "admin@example.com", true).await;
		let token = token_for(&state, &admin);

		let patch = crate::route::auth::model::UserPatch {
			is_admin: Some(false),
			..Default::default()
		};
		crate::store::users::update(state.database.as_ref(), &admin.id, &patch)
			.await
			.unwrap();

		let response = server(state)
			.put("/api/services/s3")
			.add_header(AUTHORIZATION, token)
			.json(&json!({ "enabled": true }))
			.await;

		assert_eq!(response.status_code(), 403);
	}

	#[tokio::test]
	async fn test_empty_update_changes_nothing() {
		let state = state();
		let service = seeded(&state).await;
		let admin = insert_user(&state, "admin@example.com", true).await;
		let server = server(state.clone());

		let response = server
			.put("/api/services/s3")
			.add_header(AUTHORIZATION, token_for(&state, &admin))
			.json(&json!({ "id": "hijacked", "createdAt": "2000-01-01T00:00:00Z" }))
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(stored(&state, &service.id).await, service);
	}

	#[tokio::test]
	async fn test_update_missing_service() {
		let state = state();
		let admin = insert_user(&state, "admin@example.com", true).await;
		let server = server(state.clone());

		let response = server
			.put("/api/services/id/missing")
			.add_header(AUTHORIZATION, token_for(&state, &admin))
			.json(&json!({ "enabled": true }))
			.await;

		assert_eq!(response.status_code(), 404);
		assert_eq!(
			response.json::<Value>()["error"],
			"Service not found with ID: missing"
		);
		assert!(services::list(state.database.as_ref()).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_stale_version_conflicts() {
		let state = state();
		let service = seeded(&state).await;
		let admin = insert_user(&state, "admin@example.com", true).await;
		let server = server(state.clone());
		let token = token_for(&state, &admin);

		server
			.put("/api/services/s3")
			.add_header(AUTHORIZATION, token.clone())
			.json(&json!({ "version": 0, "summary": "first" }))
			.await
			.assert_status_ok();

		let response = server
			.put("/api/services/s3")
			.add_header(AUTHORIZATION, token)
			.json(&json!({ "version": 0, "summary": "second" }))
			.await;

		assert_eq!(response.status_code(), 409);

		let stored = stored(&state, &service.id).await;
		assert_eq!(stored.summary, "first");
		assert_eq!(stored.version, 1);
	}

	#[tokio::test]
	async fn test_stale_version_without_changes_conflicts() {
		let state = state();
		let service = seeded(&state).await;
		let admin = insert_user(&state, "admin@example.com", true).await;
		let server = server(state.clone());
		let token = token_for(&state, &admin);

		let response = server
			.put(&format!("/api/services/id/{}", service.id))
			.add_header(AUTHORIZATION, token.clone())
			.json(&json!({ "version": 7 }))
			.await;

		assert_eq!(response.status_code(), 409);

		let response = server
			.put(&format!("/api/services/id/{}", service.id))
			.add_header(AUTHORIZATION, token)
			.json(&json!({ "version": 0 }))
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(stored(&state, &service.id).await, service);
	}

	#[tokio::test]
	async fn test_empty_string_clears_and_null_keeps() {
		let state = state();
		let mut service = service("s3", "Storage");
		service.aws_docs_url = "https://docs.aws.amazon.com/s3/".into();
		service.diagram_url = "https://example.com/s3.png".into();
		services::put(state.database.as_ref(), &service).await.unwrap();

		let admin = insert_user(&state, "admin@example.com", true).await;
		let response = server(state.clone())
			.put("/api/services/s3")
			.add_header(AUTHORIZATION, token_for(&state, &admin))
			.json(&json!({ "awsDocsUrl": "", "diagramUrl": null }))
			.await;

		assert_eq!(response.status_code(), 200);

		let stored = stored(&state, &service.id).await;
		assert_eq!(stored.aws_docs_url, "");
		assert_eq!(stored.diagram_url, service.diagram_url);
	}

	#[tokio::test]
	async fn test_update_of_deleted_service_leaves_no_record() {
		let state = state();
		let service = seeded(&state).await;
		let database = state.database.as_ref();

		database
			.delete(store::Collection::Services, &service.id)
			.await
			.unwrap();

		let patch = ServicePatch {
			enabled: Some(true),
			..ServicePatch::default()
		};
		let error = services::update(database, &service, &patch, None)
			.await
			.unwrap_err();

		assert!(matches!(error, store::Error::NotFound));
		assert!(database
			.scan(store::Collection::Services, None, None)
			.await
			.unwrap()
			.is_empty());

		let response = super::update_failed(&service.id, None)(error).into_response();
		assert_eq!(response.status(), 404);
	}

	#[tokio::test]
	async fn test_listing_survives_partial_records() {
		let state = state();
		services::put(state.database.as_ref(), &service("lambda", "Storage"))
			.await
			.unwrap();

		// written before timestamps existed
		let legacy = json!({ "id": "legacy", "name": "S3", "slug": "s3", "category": "Storage" });
		// a bare attribute set, not a service
		let stub = json!({ "id": "stub", "enabled": true, "version": 1 });
		for document in [legacy, stub] {
			let Value::Object(document) = document else {
				unreachable!()
			};

			state
				.database
				.put(store::Collection::Services, document, None)
				.await
				.unwrap();
		}

		let server = server(state);

		let flat = server
			.get("/api/services")
			.add_query_param("category", "Storage")
			.await;
		assert_eq!(flat.status_code(), 200);
		assert_eq!(flat.json::<Value>()["data"].as_array().unwrap().len(), 2);

		let grouped = server.get("/api/services").await;
		assert_eq!(grouped.status_code(), 200);
		assert_eq!(
			grouped.json::<Value>()["data"][0]["services"]
				.as_array()
				.unwrap()
				.len(),
			2
		);

		let stats = server.get("/api/services/stats").await;
		assert_eq!(stats.status_code(), 200);
		assert_eq!(
			stats.json::<Value>()["data"],
			json!({ "total": 2, "available": 2 })
		);

		let legacy = server.get("/api/services/s3").await;
		assert_eq!(legacy.status_code(), 200);
		assert_eq!(
			legacy.json::<Value>()["data"]["createdAt"],
			"1970-01-01T00:00:00Z"
		);
	}

	#[tokio::test]
	async fn test_listing_defaults_enabled() {
		let state = state();
		let mut document = crate::store::to_document(&service("s3", "Storage")).unwrap();
		document.remove("enabled");
		document.remove("summary");
		state
			.database
			.put(crate::store::Collection::Services, document, None)
			.await
			.unwrap();
		let server = server(state);

		let response = server
			.get("/api/services")
			.add_query_param("category", "Storage")
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.header("cache-control"),
			super::CACHE_CONTROL
		);

		let body = response.json::<Value>();
		assert_eq!(body["data"][0]["enabled"], true);
		assert_eq!(body["data"][0]["summary"], "");

		let grouped = server.get("/api/services").await.json::<Value>();
		assert_eq!(grouped["data"][0]["services"][0]["enabled"], true);
	}

	#[tokio::test]
	async fn test_grouped_listing_order() {
		let state = state();
		for (slug, category) in [
			("s3", "Storage"),
			("lambda", "Compute"),
			("athena", "Analytics"),
			("orphan", "General-Icons"),
		] {
			services::put(state.database.as_ref(), &service(slug, category))
				.await
				.unwrap();
		}

		let body = server(state).get("/api/services").await.json::<Value>();
		let groups = body["data"].as_array().unwrap();

		let categories = groups
			.iter()
			.map(|group| group["category"].as_str().unwrap())
			.collect::<Vec<_>>();
		assert_eq!(categories, ["Analytics", "Compute", "Storage"]);
		assert!(groups
			.iter()
			.all(|group| !group["services"].as_array().unwrap().is_empty()));
		assert_eq!(groups[0]["displayName"], "Analytics");
	}

	#[tokio::test]
	async fn test_stats_include_disabled() {
		let state = state();
		seeded(&state).await;
		services::put(state.database.as_ref(), &service("lambda", "Compute"))
			.await
			.unwrap();

		let response = server(state).get("/api/services/stats").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(
			response.json::<Value>()["data"],
			json!({ "total": 2, "available": 1 })
		);
	}

	#[tokio::test]
	async fn test_get_by_slug() {
		let state = state();
		let service = seeded(&state).await;
		let server = server(state);

		let response = server.get("/api/services/s3").await;
		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<Value>()["data"]["id"], service.id.as_str());

		let response = server.get("/api/services/ec2").await;
		assert_eq!(response.status_code(), 404);
		assert_eq!(
			response.json::<Value>(),
			json!({ "success": false, "error": "Service not found" })
		);
	}
}
