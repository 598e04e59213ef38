//! Document store access.
//!
//! Records are kept as flat JSON documents in two collections keyed by `id`.
//! There are no secondary indexes: every lookup by another attribute is a scan
//! with an equality filter. Backends implement the primitive operations of
//! [`Store`], while chunking and patch building are shared.

pub mod dynamo;
pub mod memory;
pub mod services;
pub mod users;

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub use memory::MemoryStore;

/// The maximum number of requests in a single batch write.
pub const BATCH_WRITE_LIMIT: usize = 25;
/// The maximum number of keys in a single batch read.
pub const BATCH_GET_LIMIT: usize = 100;

/// The attribute used as the key of every collection.
pub const KEY: &str = "id";
/// The attribute stamped on every mutation.
pub const UPDATED_AT: &str = "updatedAt";

pub type Document = serde_json::Map<String, Value>;

/// The process-wide store handle shared by all handlers.
pub type Database = Arc<dyn Store>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("conditional check failed")]
	ConditionFailed,
	#[error("no record with this key")]
	NotFound,
	#[error("malformed record: {0}")]
	Malformed(#[from] serde_json::Error),
	#[error("batch chunk {chunk} of {total} failed: {source}")]
	Batch {
		chunk: usize,
		total: usize,
		#[source]
		source: Box<Error>,
	},
	#[error("{0} items left unprocessed after retries")]
	Unprocessed(usize),
	#[error("dynamodb error: {0}")]
	Dynamo(#[from] Box<aws_sdk_dynamodb::Error>),
	#[error("invalid dynamodb request: {0}")]
	Build(#[from] aws_sdk_dynamodb::error::BuildError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
	Services,
	Users,
}

/// An attribute equality filter applied during a scan.
#[derive(Debug, Clone)]
pub struct Filter {
	pub attribute: String,
	pub value: Value,
}

/// A precondition checked by the store before a write is applied.
#[derive(Debug, Clone)]
pub enum Condition {
	/// No record exists with the same key.
	KeyAbsent,
	/// No record in the collection carries `attribute == value`.
	Unique { attribute: String, value: Value },
	/// The stored `attribute` equals `value`, reading a missing attribute as `missing`.
	Matches {
		attribute: String,
		value: Value,
		missing: Value,
	},
}

#[derive(Debug, Clone)]
pub enum WriteRequest {
	Put(Document),
	Delete(String),
}

#[async_trait]
pub trait Store: Send + Sync {
	/// Fetches a single record by key.
	async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, Error>;

	/// Fetches up to [`BATCH_GET_LIMIT`] records by key. Missing keys are skipped
	/// and the order of the result is unspecified.
	async fn get_many(&self, collection: Collection, ids: &[String])
		-> Result<Vec<Document>, Error>;

	/// Reads the whole collection, keeping the records that match `filter`.
	///
	/// `limit` applies to matching records, so a limit of one returns the first match.
	async fn scan(
		&self,
		collection: Collection,
		filter: Option<&Filter>,
		limit: Option<usize>,
	) -> Result<Vec<Document>, Error>;

	/// Writes a full record, replacing any record with the same key.
	async fn put(
		&self,
		collection: Collection,
		document: Document,
		condition: Option<&Condition>,
	) -> Result<(), Error>;

	/// Sets the given attributes on the record, leaving the others untouched.
	///
	/// Fails with [`Error::NotFound`] when no record has the key, so a record
	/// deleted concurrently is never recreated as a partial stub.
	async fn update(
		&self,
		collection: Collection,
		id: &str,
		fields: Document,
		condition: Option<&Condition>,
	) -> Result<(), Error>;

	async fn delete(&self, collection: Collection, id: &str) -> Result<(), Error>;

	/// Issues a single batch write of at most [`BATCH_WRITE_LIMIT`] requests.
	async fn batch_write(
		&self,
		collection: Collection,
		requests: Vec<WriteRequest>,
	) -> Result<(), Error>;

	/// Releases the resources held by the store. Called once, after the last request.
	async fn close(&self);

	/// Finds records by attribute equality.
	///
	/// Stores with a secondary index on `attribute` can override this,
	/// the default is a full scan.
	async fn scan_by_attribute(
		&self,
		collection: Collection,
		attribute: &str,
		value: Value,
		limit: Option<usize>,
	) -> Result<Vec<Document>, Error> {
		let filter = Filter {
			attribute: attribute.to_owned(),
			value,
		};

		self.scan(collection, Some(&filter), limit).await
	}

	/// Applies a partial update, stamping [`UPDATED_AT`] with the current time.
	///
	/// The key attribute is never written. Returns `false` without touching the
	/// store when there is nothing left to write.
	async fn patch(
		&self,
		collection: Collection,
		id: &str,
		mut fields: Document,
		condition: Option<&Condition>,
	) -> Result<bool, Error> {
		fields.remove(KEY);
		fields.retain(|_, value| !value.is_null());

		if fields.is_empty() {
			return Ok(false);
		}

		fields.insert(UPDATED_AT.into(), Value::String(now()));
		self.update(collection, id, fields, condition).await?;

		Ok(true)
	}

	/// Fetches any number of records by key, in chunks of [`BATCH_GET_LIMIT`].
	async fn batch_get(
		&self,
		collection: Collection,
		ids: &[String],
	) -> Result<Vec<Document>, Error> {
		let mut seen = HashSet::new();
		let ids = ids
			.iter()
			.filter(|id| seen.insert(id.as_str()))
			.cloned()
			.collect::<Vec<_>>();

		let mut documents = Vec::with_capacity(ids.len());

		for chunk in ids.chunks(BATCH_GET_LIMIT) {
			documents.extend(self.get_many(collection, chunk).await?);
		}

		Ok(documents)
	}

	/// Writes the records in sequential chunks of [`BATCH_WRITE_LIMIT`],
	/// returning the number of chunks issued.
	///
	/// There is no atomicity across chunks: when one fails, the earlier chunks
	/// stay written and the remaining ones are not attempted.
	async fn batch_put(
		&self,
		collection: Collection,
		documents: Vec<Document>,
	) -> Result<usize, Error> {
		let requests = documents.into_iter().map(WriteRequest::Put).collect();

		write_in_chunks(self, collection, requests).await
	}

	/// Deletes the records in sequential chunks of [`BATCH_WRITE_LIMIT`],
	/// returning the number of chunks issued.
	async fn batch_delete(&self, collection: Collection, ids: Vec<String>) -> Result<usize, Error> {
		let requests = ids.into_iter().map(WriteRequest::Delete).collect();

		write_in_chunks(self, collection, requests).await
	}
}

async fn write_in_chunks<S>(
	store: &S,
	collection: Collection,
	requests: Vec<WriteRequest>,
) -> Result<usize, Error>
where
	S: Store + ?Sized,
{
	let total = requests.len().div_ceil(BATCH_WRITE_LIMIT);
	let mut requests = requests.into_iter();

	for chunk in 1..=total {
		let batch = requests.by_ref().take(BATCH_WRITE_LIMIT).collect();

		store
			.batch_write(collection, batch)
			.await
			.map_err(|source| Error::Batch {
				chunk,
				total,
				source: Box::new(source),
			})?;

		tracing::debug!(?collection, chunk, total, "batch written");
	}

	Ok(total)
}

/// The current time as an ISO-8601 string, the format of every timestamp in the store.
pub fn now() -> String {
	timestamp(chrono::Utc::now())
}

/// Formats `at` exactly like the serialized `DateTime` fields of records, so a
/// stamp written by [`Store::patch`] never reads as earlier than the one it replaces.
fn timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
	at.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

/// Serializes a record into a document.
pub fn to_document<T: Serialize>(record: &T) -> Result<Document, Error> {
	match serde_json::to_value(record)? {
		Value::Object(document) => Ok(document),
		other => Err(Error::Malformed(serde::ser::Error::custom(format!(
			"expected an object, found {other}"
		)))),
	}
}

/// Deserializes a document into a record.
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, Error> {
	Ok(serde_json::from_value(Value::Object(document))?)
}
