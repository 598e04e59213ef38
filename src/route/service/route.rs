use aide::axum::IntoApiResponse;
use axum::{extract::State, http::header};
use macros::route;

use crate::{
	category::{self, CATEGORIES},
	extract::{Admin, Json, Path, Query},
	openapi::tag,
	route::model::Envelope,
	store::services,
	AppState, Database,
};

use super::{model, update_failed, Error, RouteError, CACHE_CONTROL};

/// Applies an update to a service that is known to exist, then reads it back.
async fn apply_update(
	state: &AppState,
	admin: &Admin,
	service: model::Service,
	input: &model::UpdateServiceInput,
) -> Result<model::Service, RouteError> {
	let database = state.database.as_ref();

	let applied = services::update(database, &service, &input.patch, input.version)
		.await
		.map_err(update_failed(&service.id, input.version))?;

	let updated = services::get(database, &service.id)
		.await?
		.ok_or_else(|| Error::NotFoundWithId(service.id.clone()))?;

	if applied {
		tracing::info!(
			service = %updated.id,
			user = %admin.0.user.id,
			version = updated.version,
			"service updated"
		);

		if updated.category != service.category || updated.slug != service.slug {
			state
				.revalidator
				.revalidate(format!("/{}/{}", service.category, service.slug));
		}

		state.revalidator.service_updated(&updated);
	}

	Ok(updated)
}

/// List services
/// Returns the services of one category, or every service grouped by category
/// in the configured category order. Categories without services are omitted.
#[route(tag = tag::SERVICE, response(status = 200, shape = "Json<Envelope<model::Listing>>"))]
pub async fn get_services(
	State(database): State<Database>,
	Query(query): Query<model::CategoryQuery>,
) -> Result<impl IntoApiResponse, RouteError> {
	let listing = match query.category {
		Some(category) => {
			model::Listing::Flat(services::list_by_category(database.as_ref(), &category).await?)
		}
		None => model::Listing::Grouped(category::group_by_category(
			services::list(database.as_ref()).await?,
			CATEGORIES,
		)),
	};

	Ok((
		[(header::CACHE_CONTROL, CACHE_CONTROL)],
		Json(Envelope::data(listing)),
	))
}

/// Get statistics
/// Returns the number of services, including disabled ones, and how many are enabled.
#[route(tag = tag::SERVICE, response(status = 200, shape = "Json<Envelope<model::Stats>>"))]
pub async fn get_stats(State(database): State<Database>) -> Result<impl IntoApiResponse, RouteError> {
	let services = services::list(database.as_ref()).await?;

	Ok((
		[(header::CACHE_CONTROL, CACHE_CONTROL)],
		Json(Envelope::data(model::Stats::of(&services))),
	))
}

/// Get service
/// Returns a single service by its slug.
#[route(tag = tag::SERVICE, error(status = 404, description = "No service has this slug."))]
pub async fn get_service(
	State(database): State<Database>,
	Path(input): Path<model::SlugInput>,
) -> Result<Json<Envelope<model::Service>>, RouteError> {
	let service = services::get_by_slug(database.as_ref(), &input.slug)
		.await?
		.ok_or(Error::NotFound)?;

	Ok(Json(Envelope::data(service)))
}

/// Update service
/// Updates the given fields of a service found by its slug, returning the stored result.
/// Requires an administrator.
#[route(
	tag = tag::SERVICE,
	error(status = 401, description = "No valid session."),
	error(status = 403, description = "The user is not an administrator."),
	error(status = 404, description = "The service does not exist."),
	error(status = 409, description = "The service changed since the given version.")
)]
pub async fn update_service(
	State(state): State<AppState>,
	admin: Admin,
	Path(input): Path<model::SlugInput>,
	Json(update): Json<model::UpdateServiceInput>,
) -> Result<Json<Envelope<model::Service>>, RouteError> {
	let service = services::get_by_slug(state.database.as_ref(), &input.slug)
		.await?
		.ok_or(Error::NotFound)?;

	let updated = apply_update(&state, &admin, service, &update).await?;

	Ok(Json(Envelope::data(updated)))
}

/// Get service by id
/// Returns a single service by its unique id.
#[route(tag = tag::SERVICE, error(status = 404, description = "No service has this id."))]
pub async fn get_service_by_id(
	State(database): State<Database>,
	Path(input): Path<model::IdInput>,
) -> Result<Json<Envelope<model::Service>>, RouteError> {
	let service = services::get(database.as_ref(), &input.id)
		.await?
		.ok_or(Error::NotFoundWithId(input.id))?;

	Ok(Json(Envelope::data(service)))
}

/// Update service by id
/// Updates the given fields of a service found by its unique id, returning the stored result.
/// Requires an administrator.
#[route(
	tag = tag::SERVICE,
	error(status = 401, description = "No valid session."),
	error(status = 403, description = "The user is not an administrator."),
	error(status = 404, description = "The service does not exist."),
	error(status = 409, description = "The service changed since the given version.")
)]
pub async fn update_service_by_id(
	State(state): State<AppState>,
	admin: Admin,
	Path(input): Path<model::IdInput>,
	Json(update): Json<model::UpdateServiceInput>,
) -> Result<Json<Envelope<model::Service>>, RouteError> {
	let service = services::get(state.database.as_ref(), &input.id)
		.await?
		.ok_or(Error::NotFoundWithId(input.id))?;

	let updated = apply_update(&state, &admin, service, &update).await?;

	Ok(Json(Envelope::data(updated)))
}
