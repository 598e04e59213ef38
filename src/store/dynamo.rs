use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use aws_sdk_dynamodb::{
	config::Region,
	error::SdkError,
	types::{AttributeValue, DeleteRequest, KeysAndAttributes, PutRequest},
	Client,
};
use serde_json::{Number, Value};

use super::{Collection, Condition, Document, Error, Filter, Store, WriteRequest, KEY};

type Item = HashMap<String, AttributeValue>;

/// How many times unprocessed batch items are resent before giving up.
const MAX_BATCH_RETRIES: u32 = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Connection settings for [`DynamoStore`].
#[derive(Debug, Clone)]
pub struct DynamoConfig {
	pub region: String,
	/// Overrides the service endpoint, e.g. for DynamoDB Local.
	pub endpoint: Option<String>,
	pub services_table: String,
	pub users_table: String,
}

/// A [`Store`] backed by two DynamoDB tables, both keyed by `id`.
#[derive(Debug, Clone)]
pub struct DynamoStore {
	client: Client,
	services_table: String,
	users_table: String,
}

impl DynamoStore {
	pub async fn connect(config: DynamoConfig) -> Self {
		let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
			.region(Region::new(config.region));

		if let Some(endpoint) = config.endpoint {
			loader = loader.endpoint_url(endpoint);
		}

		let aws_config = loader.load().await;

		Self::new_from_client(
			Client::new(&aws_config),
			config.services_table,
			config.users_table,
		)
	}

	pub fn new_from_client(client: Client, services_table: String, users_table: String) -> Self {
		Self {
			client,
			services_table,
			users_table,
		}
	}

	/// Tells a missing record apart from a failed caller condition after a
	/// rejected update.
	async fn failed_update(&self, collection: Collection, id: &str, conditional: bool) -> Error {
		if !conditional {
			return Error::NotFound;
		}

		match self.get(collection, id).await {
			Ok(None) => Error::NotFound,
			Ok(Some(_)) => Error::ConditionFailed,
			Err(error) => error,
		}
	}

	fn table(&self, collection: Collection) -> &str {
		match collection {
			Collection::Services => &self.services_table,
			Collection::Users => &self.users_table,
		}
	}
}

/// Maps an SDK failure onto [`Error`], recognising failed conditional checks.
fn backend<E, R>(error: SdkError<E, R>) -> Error
where
	aws_sdk_dynamodb::Error: From<SdkError<E, R>>,
{
	match aws_sdk_dynamodb::Error::from(error) {
		aws_sdk_dynamodb::Error::ConditionalCheckFailedException(_) => Error::ConditionFailed,
		error => Error::Dynamo(Box::new(error)),
	}
}

fn key_of(id: &str) -> Item {
	HashMap::from([(KEY.to_owned(), AttributeValue::S(id.to_owned()))])
}

pub fn to_attribute(value: Value) -> AttributeValue {
	match value {
		Value::Null => AttributeValue::Null(true),
		Value::Bool(value) => AttributeValue::Bool(value),
		Value::Number(value) => AttributeValue::N(value.to_string()),
		Value::String(value) => AttributeValue::S(value),
		Value::Array(values) => AttributeValue::L(values.into_iter().map(to_attribute).collect()),
		Value::Object(map) => AttributeValue::M(
			map.into_iter()
				.map(|(key, value)| (key, to_attribute(value)))
				.collect(),
		),
	}
}

pub fn from_attribute(value: AttributeValue) -> Value {
	match value {
		AttributeValue::S(value) => Value::String(value),
		AttributeValue::N(value) => number(&value),
		AttributeValue::Bool(value) => Value::Bool(value),
		AttributeValue::L(values) => Value::Array(values.into_iter().map(from_attribute).collect()),
		AttributeValue::M(map) => Value::Object(
			map.into_iter()
				.map(|(key, value)| (key, from_attribute(value)))
				.collect(),
		),
		AttributeValue::Ss(values) => Value::Array(values.into_iter().map(Value::String).collect()),
		AttributeValue::Ns(values) => Value::Array(values.iter().map(|n| number(n)).collect()),
		// binary attributes are never written by this application
		_ => Value::Null,
	}
}

fn number(text: &str) -> Value {
	text.parse::<i64>()
		.map(Value::from)
		.ok()
		.or_else(|| {
			text.parse::<f64>()
				.ok()
				.and_then(Number::from_f64)
				.map(Value::Number)
		})
		.unwrap_or(Value::Null)
}

fn to_item(document: Document) -> Item {
	document
		.into_iter()
		.map(|(key, value)| (key, to_attribute(value)))
		.collect()
}

fn to_document(item: Item) -> Document {
	item.into_iter()
		.map(|(key, value)| (key, from_attribute(value)))
		.collect()
}

/// A condition expression with its placeholder names and values.
struct Expression {
	text: String,
	names: HashMap<String, String>,
	values: Item,
}

fn condition_expression(condition: &Condition) -> Option<Expression> {
	match condition {
		Condition::KeyAbsent => Some(Expression {
			text: "attribute_not_exists(#key)".into(),
			names: HashMap::from([("#key".to_owned(), KEY.to_owned())]),
			values: HashMap::new(),
		}),
		// checked with a scan before writing, see `DynamoStore::put`
		Condition::Unique { .. } => None,
		Condition::Matches {
			attribute,
			value,
			missing,
		} => {
			let text = if value == missing {
				"(attribute_not_exists(#cond) OR #cond = :cond)"
			} else {
				"#cond = :cond"
			};

			Some(Expression {
				text: text.into(),
				names: HashMap::from([("#cond".to_owned(), attribute.clone())]),
				values: HashMap::from([(":cond".to_owned(), to_attribute(value.clone()))]),
			})
		}
	}
}

/// The condition of an `UpdateItem`: the key must exist, since DynamoDB would
/// otherwise create the item, and then the caller's condition must hold.
fn update_condition(condition: Option<&Condition>) -> Expression {
	let mut expression = Expression {
		text: "attribute_exists(#key)".into(),
		names: HashMap::from([("#key".to_owned(), KEY.to_owned())]),
		values: HashMap::new(),
	};

	if let Some(extra) = condition.and_then(condition_expression) {
		expression.text = format!("{} AND {}", expression.text, extra.text);
		expression.names.extend(extra.names);
		expression.values.extend(extra.values);
	}

	expression
}

#[async_trait]
impl Store for DynamoStore {
	#[tracing::instrument(skip(self))]
	async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, Error> {
		let output = self
			.client
			.get_item()
			.table_name(self.table(collection))
			.set_key(Some(key_of(id)))
			.send()
			.await
			.map_err(backend)?;

		Ok(output.item.map(to_document))
	}

	#[tracing::instrument(skip(self))]
	async fn get_many(
		&self,
		collection: Collection,
		ids: &[String],
	) -> Result<Vec<Document>, Error> {
		if ids.is_empty() {
			return Ok(Vec::new());
		}

		let table = self.table(collection);
		let mut keys = ids.iter().map(|id| key_of(id)).collect::<Vec<_>>();
		let mut documents = Vec::with_capacity(ids.len());

		for attempt in 0..=MAX_BATCH_RETRIES {
			if attempt > 0 {
				tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt - 1)).await;
			}

			let request = KeysAndAttributes::builder().set_keys(Some(keys)).build()?;
			let output = self
				.client
				.batch_get_item()
				.request_items(table, request)
				.send()
				.await
				.map_err(backend)?;

			if let Some(mut responses) = output.responses {
				documents.extend(
					responses
						.remove(table)
						.unwrap_or_default()
						.into_iter()
						.map(to_document),
				);
			}

			keys = output
				.unprocessed_keys
				.and_then(|mut unprocessed| unprocessed.remove(table))
				.map(|pending| pending.keys)
				.unwrap_or_default();

			if keys.is_empty() {
				return Ok(documents);
			}

			tracing::warn!(pending = keys.len(), attempt, "retrying unprocessed keys");
		}

		Err(Error::Unprocessed(keys.len()))
	}

	#[tracing::instrument(skip(self))]
	async fn scan(
		&self,
		collection: Collection,
		filter: Option<&Filter>,
		limit: Option<usize>,
	) -> Result<Vec<Document>, Error> {
		let mut documents = Vec::new();
		let mut start_key: Option<Item> = None;

		// a scan `Limit` applies before the filter, so pages are read until enough records match
		loop {
			let mut request = self
				.client
				.scan()
				.table_name(self.table(collection))
				.set_exclusive_start_key(start_key);

			if let Some(filter) = filter {
				request = request
					.filter_expression("#attr = :value")
					.expression_attribute_names("#attr", &filter.attribute)
					.expression_attribute_values(":value", to_attribute(filter.value.clone()));
			}

			let output = request.send().await.map_err(backend)?;

			documents.extend(output.items.unwrap_or_default().into_iter().map(to_document));

			if let Some(limit) = limit {
				if documents.len() >= limit {
					documents.truncate(limit);
					break;
				}
			}

			start_key = output.last_evaluated_key;

			if start_key.is_none() {
				break;
			}
		}

		Ok(documents)
	}

	#[tracing::instrument(skip(self, document))]
	async fn put(
		&self,
		collection: Collection,
		document: Document,
		condition: Option<&Condition>,
	) -> Result<(), Error> {
		// DynamoDB conditions only see the item being written, so uniqueness
		// across the table is checked with a scan first. This is not atomic.
		if let Some(Condition::Unique { attribute, value }) = condition {
			let existing = self
				.scan_by_attribute(collection, attribute, value.clone(), Some(1))
				.await?;

			if !existing.is_empty() {
				return Err(Error::ConditionFailed);
			}
		}

		let mut request = self
			.client
			.put_item()
			.table_name(self.table(collection))
			.set_item(Some(to_item(document)));

		if let Some(expression) = condition.and_then(condition_expression) {
			request = request
				.condition_expression(expression.text)
				.set_expression_attribute_names(Some(expression.names));

			if !expression.values.is_empty() {
				request = request.set_expression_attribute_values(Some(expression.values));
			}
		} else if condition.is_some() {
			request = request
				.condition_expression("attribute_not_exists(#key)")
				.expression_attribute_names("#key", KEY);
		}

		request.send().await.map_err(backend)?;
		Ok(())
	}

	#[tracing::instrument(skip(self, fields))]
	async fn update(
		&self,
		collection: Collection,
		id: &str,
		fields: Document,
		condition: Option<&Condition>,
	) -> Result<(), Error> {
		if fields.is_empty() {
			return Ok(());
		}

		let mut names = HashMap::new();
		let mut values = HashMap::new();
		let mut assignments = Vec::with_capacity(fields.len());

		for (index, (attribute, value)) in fields.into_iter().enumerate() {
			assignments.push(format!("#f{index} = :f{index}"));
			names.insert(format!("#f{index}"), attribute);
			values.insert(format!(":f{index}"), to_attribute(value));
		}

		let request = self
			.client
			.update_item()
			.table_name(self.table(collection))
			.set_key(Some(key_of(id)))
			.update_expression(format!("SET {}", assignments.join(", ")));

		let expression = update_condition(condition);
		names.extend(expression.names);
		values.extend(expression.values);

		let result = request
			.condition_expression(expression.text)
			.set_expression_attribute_names(Some(names))
			.set_expression_attribute_values(Some(values))
			.send()
			.await
			.map_err(backend);

		match result {
			Ok(_) => Ok(()),
			Err(Error::ConditionFailed) => {
				Err(self.failed_update(collection, id, condition.is_some()).await)
			}
			Err(error) => Err(error),
		}
	}

	#[tracing::instrument(skip(self))]
	async fn delete(&self, collection: Collection, id: &str) -> Result<(), Error> {
		self.client
			.delete_item()
			.table_name(self.table(collection))
			.set_key(Some(key_of(id)))
			.send()
			.await
			.map_err(backend)?;

		Ok(())
	}

	#[tracing::instrument(skip(self, requests), fields(count = requests.len()))]
	async fn batch_write(
		&self,
		collection: Collection,
		requests: Vec<WriteRequest>,
	) -> Result<(), Error> {
		if requests.is_empty() {
			return Ok(());
		}

		let table = self.table(collection);
		let mut pending = requests
			.into_iter()
			.map(|request| {
				let builder = aws_sdk_dynamodb::types::WriteRequest::builder();

				Ok(match request {
					WriteRequest::Put(document) => builder
						.put_request(PutRequest::builder().set_item(Some(to_item(document))).build()?)
						.build(),
					WriteRequest::Delete(id) => builder
						.delete_request(DeleteRequest::builder().set_key(Some(key_of(&id))).build()?)
						.build(),
				})
			})
			.collect::<Result<Vec<_>, Error>>()?;

		for attempt in 0..=MAX_BATCH_RETRIES {
			if attempt > 0 {
				tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt - 1)).await;
			}

			let output = self
				.client
				.batch_write_item()
				.request_items(table, pending)
				.send()
				.await
				.map_err(backend)?;

			pending = output
				.unprocessed_items
				.and_then(|mut unprocessed| unprocessed.remove(table))
				.unwrap_or_default();

			if pending.is_empty() {
				return Ok(());
			}

			tracing::warn!(pending = pending.len(), attempt, "retrying unprocessed items");
		}

		Err(Error::Unprocessed(pending.len()))
	}

	/// The SDK client holds no connections that need an explicit shutdown,
	/// its pool is released when the last handle is dropped.
	async fn close(&self) {
		tracing::info!(
			services = %self.services_table,
			users = %self.users_table,
			"dynamodb store closed"
		);
	}
}

#[cfg(test)]
mod test {
	use serde_json::json;

	use super::*;

	#[test]
	fn test_attribute_conversion() {
		let value = json!({
			"id": "a",
			"enabled": true,
			"version": 3,
			"ratio": 0.5,
			"favorites": ["x", "y"],
			"nested": { "empty": null },
		});

		let Value::Object(document) = value.clone() else {
			unreachable!()
		};

		let item = to_item(document);
		assert_eq!(item["id"], AttributeValue::S("a".into()));
		assert_eq!(item["version"], AttributeValue::N("3".into()));
		assert_eq!(item["enabled"], AttributeValue::Bool(true));

		assert_eq!(Value::Object(super::to_document(item)), value);
	}

	#[test]
	fn test_number_parsing() {
		assert_eq!(number("42"), json!(42));
		assert_eq!(number("-1.25"), json!(-1.25));
		assert_eq!(number("not a number"), Value::Null);
	}

	#[test]
	fn test_condition_expressions() {
		let versioned = Condition::Matches {
			attribute: "version".into(),
			value: json!(0),
			missing: json!(0),
		};
		let expression = condition_expression(&versioned).unwrap();
		assert_eq!(
			expression.text,
			"(attribute_not_exists(#cond) OR #cond = :cond)"
		);
		assert_eq!(expression.names["#cond"], "version");

		let versioned = Condition::Matches {
			attribute: "version".into(),
			value: json!(4),
			missing: json!(0),
		};
		assert_eq!(condition_expression(&versioned).unwrap().text, "#cond = :cond");

		let update = update_condition(None);
		assert_eq!(update.text, "attribute_exists(#key)");
		assert_eq!(update.names["#key"], KEY);

		let update = update_condition(Some(&versioned));
		assert_eq!(update.text, "attribute_exists(#key) AND #cond = :cond");
		assert_eq!(update.values[":cond"], AttributeValue::N("4".into()));

		let unique = Condition::Unique {
			attribute: "email".into(),
			value: json!("a@b.c"),
		};
		assert!(condition_expression(&unique).is_none());
	}
}
