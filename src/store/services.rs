//! Typed access to the services collection.

use serde_json::Value;

use super::{from_document, to_document, Collection, Condition, Error, Store};
use crate::route::service::model::{Service, ServicePatch};

/// Decodes every document that holds a service, skipping the ones that do not.
///
/// A single partial record must not take down a whole listing, so undecodable
/// documents are logged and left out.
fn decode_all(documents: Vec<super::Document>) -> Vec<Service> {
	documents
		.into_iter()
		.filter_map(|document| {
			let id = document.get(super::KEY).cloned();

			from_document(document)
				.map_err(|e| tracing::warn!(?id, error = %e, "skipping malformed service record"))
				.ok()
		})
		.collect()
}

pub async fn get(store: &dyn Store, id: &str) -> Result<Option<Service>, Error> {
	store
		.get(Collection::Services, id)
		.await?
		.map(from_document)
		.transpose()
}

/// Returns the first service with the given slug.
pub async fn get_by_slug(store: &dyn Store, slug: &str) -> Result<Option<Service>, Error> {
	store
		.scan_by_attribute(Collection::Services, "slug", Value::from(slug), Some(1))
		.await?
		.into_iter()
		.next()
		.map(from_document)
		.transpose()
}

/// Returns every service, including disabled ones.
pub async fn list(store: &dyn Store) -> Result<Vec<Service>, Error> {
	Ok(decode_all(store.scan(Collection::Services, None, None).await?))
}

pub async fn list_by_category(store: &dyn Store, category: &str) -> Result<Vec<Service>, Error> {
	Ok(decode_all(
		store
			.scan_by_attribute(Collection::Services, "category", Value::from(category), None)
			.await?,
	))
}

pub async fn get_many(store: &dyn Store, ids: &[String]) -> Result<Vec<Service>, Error> {
	Ok(decode_all(store.batch_get(Collection::Services, ids).await?))
}

pub async fn put(store: &dyn Store, service: &Service) -> Result<(), Error> {
	store
		.put(Collection::Services, to_document(service)?, None)
		.await
}

/// Applies `patch` to the service, bumping its version.
///
/// When `expected_version` is given, the write only happens if the stored
/// version still matches it, and an empty patch is still checked against the
/// version of `service`. Returns `false` if the patch is empty.
///
/// Fails with [`Error::NotFound`] if the service was deleted in the meantime.
pub async fn update(
	store: &dyn Store,
	service: &Service,
	patch: &ServicePatch,
	expected_version: Option<u64>,
) -> Result<bool, Error> {
	if patch.is_empty() {
		return match expected_version {
			Some(version) if version != service.version => Err(Error::ConditionFailed),
			_ => Ok(false),
		};
	}

	let mut fields = to_document(patch)?;
	fields.insert("version".into(), Value::from(service.version + 1));

	let condition = expected_version.map(|version| Condition::Matches {
		attribute: "version".into(),
		value: Value::from(version),
		missing: Value::from(0),
	});

	store
		.patch(Collection::Services, &service.id, fields, condition.as_ref())
		.await
}

/// Writes all services in batches, returning the number of batches issued.
pub async fn batch_put(store: &dyn Store, services: &[Service]) -> Result<usize, Error> {
	let documents = services
		.iter()
		.map(to_document)
		.collect::<Result<Vec<_>, _>>()?;

	store.batch_put(Collection::Services, documents).await
}

/// Deletes every service, returning how many were removed.
pub async fn clear(store: &dyn Store) -> Result<usize, Error> {
	// raw keys, so malformed records are removed too
	let ids = store
		.scan(Collection::Services, None, None)
		.await?
		.into_iter()
		.filter_map(|document| document.get(super::KEY)?.as_str().map(str::to_owned))
		.collect::<Vec<_>>();
	let count = ids.len();

	store.batch_delete(Collection::Services, ids).await?;
	Ok(count)
}
