//! Process configuration, read from environment variables.

use std::sync::Arc;

use crate::store::{
	dynamo::{DynamoConfig, DynamoStore},
	Database, MemoryStore,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{name} is invalid: {reason}")]
	Invalid { name: &'static str, reason: String },
}

/// Where records are kept.
#[derive(Debug, Clone)]
pub enum Backend {
	Dynamo(DynamoConfig),
	/// Records live in process memory and are lost on exit.
	Memory,
}

impl Backend {
	/// Constructs the store. This happens once per process.
	pub async fn connect(self) -> Database {
		match self {
			Self::Dynamo(config) => {
				tracing::info!(
					region = %config.region,
					services = %config.services_table,
					users = %config.users_table,
					"using dynamodb store"
				);

				Arc::new(DynamoStore::connect(config).await)
			}
			Self::Memory => {
				tracing::warn!("using in-memory store, nothing will be persisted");

				Arc::new(MemoryStore::default())
			}
		}
	}
}

#[derive(Debug, Clone)]
pub struct Config {
	pub backend: Backend,
	/// The secret used to sign session tokens.
	pub jwt_secret: String,
	pub host: String,
	pub port: u16,
}

/// The account created by the seed tooling.
#[derive(Debug, Clone)]
pub struct Admin {
	pub email: String,
	pub password: String,
	pub name: String,
}

/// Reads variables through `lookup`, treating empty values as absent.
struct Env<F>(F);

impl<F> Env<F>
where
	F: Fn(&str) -> Option<String>,
{
	fn optional(&self, name: &str) -> Option<String> {
		(self.0)(name).filter(|value| !value.is_empty())
	}

	fn required(&self, name: &'static str) -> Result<String, Error> {
		self.optional(name).ok_or(Error::Missing(name))
	}
}

impl Config {
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		let env = Env(lookup);

		let backend = match env.optional("STORE_BACKEND").as_deref() {
			None | Some("dynamodb") => Backend::Dynamo(DynamoConfig {
				region: env.required("AWS_REGION")?,
				endpoint: env.optional("DYNAMODB_ENDPOINT"),
				services_table: env.required("SERVICES_TABLE_NAME")?,
				users_table: env.required("USERS_TABLE_NAME")?,
			}),
			Some("memory") => Backend::Memory,
			Some(other) => {
				return Err(Error::Invalid {
					name: "STORE_BACKEND",
					reason: format!("expected `dynamodb` or `memory`, found `{other}`"),
				})
			}
		};

		let port = match env.optional("PORT") {
			Some(port) => port.parse().map_err(|e: std::num::ParseIntError| Error::Invalid {
				name: "PORT",
				reason: e.to_string(),
			})?,
			None => 3000,
		};

		Ok(Self {
			backend,
			jwt_secret: env.required("JWT_SECRET")?,
			host: env.optional("HOST").unwrap_or_else(|| "127.0.0.1".into()),
			port,
		})
	}
}

impl Admin {
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		let env = Env(lookup);

		Ok(Self {
			email: env.required("ADMIN_EMAIL")?,
			password: env.required("ADMIN_PASSWORD")?,
			name: env.required("ADMIN_NAME")?,
		})
	}
}
