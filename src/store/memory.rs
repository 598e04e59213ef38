use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Collection, Condition, Document, Error, Filter, Store, WriteRequest, KEY};

/// An in-process store that keeps records in insertion order.
///
/// This is the reference implementation of the [`Store`] semantics, used by
/// tests and local development. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
	collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

fn key(document: &Document) -> Option<&str> {
	document.get(KEY).and_then(Value::as_str)
}

fn matches(document: &Document, filter: &Filter) -> bool {
	document.get(&filter.attribute) == Some(&filter.value)
}

/// Checks `condition` against the current records, where `existing` is the
/// record sharing the key of the write.
fn check(
	records: &[Document],
	existing: Option<&Document>,
	condition: Option<&Condition>,
) -> Result<(), Error> {
	let satisfied = match condition {
		None => true,
		Some(Condition::KeyAbsent) => existing.is_none(),
		Some(Condition::Unique { attribute, value }) => !records
			.iter()
			.any(|record| record.get(attribute) == Some(value)),
		Some(Condition::Matches {
			attribute,
			value,
			missing,
		}) => existing.and_then(|record| record.get(attribute)).unwrap_or(missing) == value,
	};

	if satisfied {
		Ok(())
	} else {
		Err(Error::ConditionFailed)
	}
}

fn upsert(records: &mut Vec<Document>, document: Document) {
	let position = key(&document)
		.and_then(|id| records.iter().position(|record| key(record) == Some(id)));

	match position {
		Some(position) => records[position] = document,
		None => records.push(document),
	}
}

#[async_trait]
impl Store for MemoryStore {
	async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, Error> {
		let collections = self.collections.read().await;

		Ok(collections
			.get(&collection)
			.and_then(|records| records.iter().find(|record| key(record) == Some(id)))
			.cloned())
	}

	async fn get_many(
		&self,
		collection: Collection,
		ids: &[String],
	) -> Result<Vec<Document>, Error> {
		let collections = self.collections.read().await;

		Ok(collections
			.get(&collection)
			.map(|records| {
				records
					.iter()
					.filter(|record| key(record).is_some_and(|id| ids.iter().any(|x| x == id)))
					.cloned()
					.collect()
			})
			.unwrap_or_default())
	}

	async fn scan(
		&self,
		collection: Collection,
		filter: Option<&Filter>,
		limit: Option<usize>,
	) -> Result<Vec<Document>, Error> {
		let collections = self.collections.read().await;
		let Some(records) = collections.get(&collection) else {
			return Ok(Vec::new());
		};

		Ok(records
			.iter()
			.filter(|record| filter.map_or(true, |filter| matches(record, filter)))
			.take(limit.unwrap_or(usize::MAX))
			.cloned()
			.collect())
	}

	async fn put(
		&self,
		collection: Collection,
		document: Document,
		condition: Option<&Condition>,
	) -> Result<(), Error> {
		let mut collections = self.collections.write().await;
		let records = collections.entry(collection).or_default();

		let existing = key(&document)
			.and_then(|id| records.iter().find(|record| key(record) == Some(id)));
		check(records, existing, condition)?;

		upsert(records, document);
		Ok(())
	}

	async fn update(
		&self,
		collection: Collection,
		id: &str,
		fields: Document,
		condition: Option<&Condition>,
	) -> Result<(), Error> {
		let mut collections = self.collections.write().await;
		let records = collections.entry(collection).or_default();

		let position = records
			.iter()
			.position(|record| key(record) == Some(id))
			.ok_or(Error::NotFound)?;
		check(records, Some(&records[position]), condition)?;

		records[position].extend(fields);
		Ok(())
	}

	async fn delete(&self, collection: Collection, id: &str) -> Result<(), Error> {
		let mut collections = self.collections.write().await;

		if let Some(records) = collections.get_mut(&collection) {
			records.retain(|record| key(record) != Some(id));
		}

		Ok(())
	}

	async fn batch_write(
		&self,
		collection: Collection,
		requests: Vec<WriteRequest>,
	) -> Result<(), Error> {
		let mut collections = self.collections.write().await;
		let records = collections.entry(collection).or_default();

		for request in requests {
			match request {
				WriteRequest::Put(document) => upsert(records, document),
				WriteRequest::Delete(id) => {
					records.retain(|record| key(record) != Some(id.as_str()));
				}
			}
		}

		Ok(())
	}

	/// Drops every record. Nothing outlives the process anyway.
	async fn close(&self) {
		let mut collections = self.collections.write().await;
		let records = collections.values().map(Vec::len).sum::<usize>();

		collections.clear();
		tracing::debug!(records, "in-memory store closed");
	}
}

#[cfg(test)]
mod test {
	use serde_json::json;

	use super::*;

	fn document(value: Value) -> Document {
		let Value::Object(document) = value else {
			panic!("expected object");
		};

		document
	}

	#[tokio::test]
	async fn test_scan_keeps_insertion_order_and_limit() {
		let store = MemoryStore::default();

		for (id, slug) in [("1", "a"), ("2", "b"), ("3", "a")] {
			store
				.put(
					Collection::Services,
					document(json!({ "id": id, "slug": slug })),
					None,
				)
				.await
				.unwrap();
		}

		let found = store
			.scan_by_attribute(Collection::Services, "slug", json!("a"), None)
			.await
			.unwrap();
		assert_eq!(found.len(), 2);
		assert_eq!(found[0]["id"], "1");
		assert_eq!(found[1]["id"], "3");

		let first = store
			.scan_by_attribute(Collection::Services, "slug", json!("a"), Some(1))
			.await
			.unwrap();
		assert_eq!(first.len(), 1);
		assert_eq!(first[0]["id"], "1");
	}

	#[tokio::test]
	async fn test_put_replaces_same_key() {
		let store = MemoryStore::default();

		store
			.put(Collection::Users, document(json!({ "id": "1", "name": "a" })), None)
			.await
			.unwrap();
		store
			.put(Collection::Users, document(json!({ "id": "1", "name": "b" })), None)
			.await
			.unwrap();

		let all = store.scan(Collection::Users, None, None).await.unwrap();
		assert_eq!(all.len(), 1);
		assert_eq!(all[0]["name"], "b");
	}

	#[tokio::test]
	async fn test_put_conditions() {
		let store = MemoryStore::default();
		let unique = Condition::Unique {
			attribute: "email".into(),
			value: json!("a@b.c"),
		};

		store
			.put(
				Collection::Users,
				document(json!({ "id": "1", "email": "a@b.c" })),
				Some(&unique),
			)
			.await
			.unwrap();

		let duplicate = store
			.put(
				Collection::Users,
				document(json!({ "id": "2", "email": "a@b.c" })),
				Some(&unique),
			)
			.await;
		assert!(matches!(duplicate, Err(Error::ConditionFailed)));

		let same_key = store
			.put(
				Collection::Users,
				document(json!({ "id": "1", "email": "x@y.z" })),
				Some(&Condition::KeyAbsent),
			)
			.await;
		assert!(matches!(same_key, Err(Error::ConditionFailed)));
	}

	#[tokio::test]
	async fn test_update_matches_condition() {
		let store = MemoryStore::default();
		store
			.put(Collection::Services, document(json!({ "id": "1" })), None)
			.await
			.unwrap();

		let expect = |value: u64| Condition::Matches {
			attribute: "version".into(),
			value: json!(value),
			missing: json!(0),
		};

		// a missing attribute reads as the `missing` value
		store
			.update(
				Collection::Services,
				"1",
				document(json!({ "version": 1 })),
				Some(&expect(0)),
			)
			.await
			.unwrap();

		let stale = store
			.update(
				Collection::Services,
				"1",
				document(json!({ "version": 2 })),
				Some(&expect(0)),
			)
			.await;
		assert!(matches!(stale, Err(Error::ConditionFailed)));

		let record = store.get(Collection::Services, "1").await.unwrap().unwrap();
		assert_eq!(record["version"], 1);
	}

	#[tokio::test]
	async fn test_update_missing_key_is_not_found() {
		let store = MemoryStore::default();

		let result = store
			.update(
				Collection::Services,
				"gone",
				document(json!({ "enabled": true })),
				None,
			)
			.await;

		assert!(matches!(result, Err(Error::NotFound)));
		assert!(store
			.scan(Collection::Services, None, None)
			.await
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn test_close_drops_records() {
		let store = MemoryStore::default();
		store
			.put(Collection::Users, document(json!({ "id": "1" })), None)
			.await
			.unwrap();

		store.close().await;

		assert!(store.get(Collection::Users, "1").await.unwrap().is_none());
	}
}
