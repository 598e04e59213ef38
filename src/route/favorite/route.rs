use axum::extract::State;
use macros::route;

use crate::{
	extract::{Json, Path, Session},
	openapi::tag,
	route::{
		model::{Envelope, IdInput},
		service::model::Service,
	},
	store::{services, users},
	AppState, Database,
};

use super::{Error, RouteError};

/// Get favorites
/// Returns the favorite services of the authenticated user, in the order they were added.
/// Favorites whose service no longer exists are skipped.
#[route(tag = tag::FAVORITE, error(status = 401, description = "No valid session."))]
pub async fn get_favorites(
	State(database): State<Database>,
	session: Session,
) -> Result<Json<Envelope<Vec<Service>>>, RouteError> {
	let favorites = &session.user.favorites;
	let mut found = services::get_many(database.as_ref(), favorites).await?;

	found.sort_by_key(|service| favorites.iter().position(|id| *id == service.id));

	Ok(Json(Envelope::data(found)))
}

/// Add favorite
/// Adds a service to the favorites of the authenticated user, returning the updated ids.
/// Adding a service twice has no effect.
#[route(
	tag = tag::FAVORITE,
	error(status = 401, description = "No valid session."),
	error(status = 404, description = "The service does not exist.")
)]
pub async fn add_favorite(
	State(state): State<AppState>,
	session: Session,
	Path(input): Path<IdInput>,
) -> Result<Json<Envelope<Vec<String>>>, RouteError> {
	let database = state.database.as_ref();
	let mut favorites = session.user.favorites;

	if !favorites.contains(&input.id) {
		if services::get(database, &input.id).await?.is_none() {
			return Err(Error::UnknownService(input.id).into());
		}

		favorites.push(input.id);
		users::set_favorites(database, &session.user.id, favorites.clone()).await?;
	}

	Ok(Json(Envelope::data(favorites)))
}

/// Remove favorite
/// Removes a service from the favorites of the authenticated user, returning the updated ids.
#[route(tag = tag::FAVORITE, error(status = 401, description = "No valid session."))]
pub async fn remove_favorite(
	State(state): State<AppState>,
	session: Session,
	Path(input): Path<IdInput>,
) -> Result<Json<Envelope<Vec<String>>>, RouteError> {
	let mut favorites = session.user.favorites;
	let count = favorites.len();

	favorites.retain(|id| *id != input.id);

	if favorites.len() != count {
		users::set_favorites(state.database.as_ref(), &session.user.id, favorites.clone()).await?;
	}

	Ok(Json(Envelope::data(favorites)))
}
