//! Typed access to the users collection.

use serde_json::Value;

use super::{from_document, to_document, Collection, Condition, Error, Store};
use crate::route::auth::model::{User, UserPatch};

pub async fn get(store: &dyn Store, id: &str) -> Result<Option<User>, Error> {
	store
		.get(Collection::Users, id)
		.await?
		.map(from_document)
		.transpose()
}

pub async fn get_by_email(store: &dyn Store, email: &str) -> Result<Option<User>, Error> {
	store
		.scan_by_attribute(Collection::Users, "email", Value::from(email), Some(1))
		.await?
		.into_iter()
		.next()
		.map(from_document)
		.transpose()
}

/// Inserts a new user.
///
/// Fails with [`Error::ConditionFailed`] if another user already has the same email.
pub async fn create(store: &dyn Store, user: &User) -> Result<(), Error> {
	let condition = Condition::Unique {
		attribute: "email".into(),
		value: Value::from(user.email.as_str()),
	};

	store
		.put(Collection::Users, to_document(user)?, Some(&condition))
		.await
}

/// Returns `false` if the patch is empty.
pub async fn update(store: &dyn Store, id: &str, patch: &UserPatch) -> Result<bool, Error> {
	store
		.patch(Collection::Users, id, to_document(patch)?, None)
		.await
}

pub async fn set_favorites(
	store: &dyn Store,
	id: &str,
	favorites: Vec<String>,
) -> Result<(), Error> {
	let patch = UserPatch {
		favorites: Some(favorites),
		..UserPatch::default()
	};

	update(store, id, &patch).await.map(drop)
}

/// Deletes every user, returning how many were removed.
pub async fn clear(store: &dyn Store) -> Result<usize, Error> {
	let ids = store
		.scan(Collection::Users, None, None)
		.await?
		.into_iter()
		.filter_map(|document| document.get(super::KEY)?.as_str().map(str::to_owned))
		.collect::<Vec<_>>();
	let count = ids.len();

	store.batch_delete(Collection::Users, ids).await?;
	Ok(count)
}
