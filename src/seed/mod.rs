//! Seed tooling: replaces the stored records with a generated catalog and
//! an administrator account.

pub mod generate;

use std::path::{Path, PathBuf};

use argon2::Argon2;
use chrono::Utc;
use uuid::Uuid;

use crate::{
	config::Admin,
	password,
	route::{auth::model::User, service::model::Service},
	store::{self, services, users, Store},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("failed to access {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
	#[error("store error: {0}")]
	Store(#[from] store::Error),
	#[error("failed to hash admin password: {0}")]
	Hash(argon2::password_hash::Error),
}

/// What a seed run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Report {
	pub services_cleared: usize,
	pub users_cleared: usize,
	pub services_written: usize,
	pub batches: usize,
	/// `false` when an account with the admin email already existed.
	pub admin_created: bool,
}

/// Reads a seed file written by [`save`].
pub fn load(path: &Path) -> Result<Vec<Service>, Error> {
	let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
		path: path.to_owned(),
		source,
	})?;

	serde_json::from_str(&content).map_err(|source| Error::Parse {
		path: path.to_owned(),
		source,
	})
}

pub fn save(path: &Path, services: &[Service]) -> Result<(), Error> {
	let io = |source| Error::Io {
		path: path.to_owned(),
		source,
	};

	if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
		std::fs::create_dir_all(parent).map_err(io)?;
	}

	let content = serde_json::to_string_pretty(services).map_err(|source| Error::Parse {
		path: path.to_owned(),
		source,
	})?;

	std::fs::write(path, content).map_err(io)
}

/// Creates the administrator account.
///
/// Returns `false` if an account with the same email already exists.
pub async fn create_admin(
	store: &dyn Store,
	hasher: &Argon2<'_>,
	admin: &Admin,
) -> Result<bool, Error> {
	let now = Utc::now();
	let user = User {
		id: Uuid::new_v4().to_string(),
		email: admin.email.clone(),
		name: admin.name.clone(),
		password_hash: password::hash_password(hasher, &admin.password).map_err(Error::Hash)?,
		is_admin: true,
		favorites: Vec::new(),
		created_at: now,
		updated_at: now,
	};

	match users::create(store, &user).await {
		Ok(()) => Ok(true),
		Err(store::Error::ConditionFailed) => Ok(false),
		Err(e) => Err(e.into()),
	}
}

/// Clears both collections, writes `services` and creates the admin.
///
/// Writes are not atomic: a failure leaves whatever was written before it.
pub async fn run(
	store: &dyn Store,
	hasher: &Argon2<'_>,
	services: &[Service],
	admin: &Admin,
) -> Result<Report, Error> {
	let services_cleared = services::clear(store).await?;
	tracing::info!(count = services_cleared, "cleared services");

	let users_cleared = users::clear(store).await?;
	tracing::info!(count = users_cleared, "cleared users");

	let batches = services::batch_put(store, services).await?;
	tracing::info!(count = services.len(), batches, "wrote services");

	let admin_created = create_admin(store, hasher, admin).await?;

	if admin_created {
		tracing::info!(email = %admin.email, "created admin user");
	} else {
		tracing::info!(email = %admin.email, "admin user already exists");
	}

	Ok(Report {
		services_cleared,
		users_cleared,
		services_written: services.len(),
		batches,
		admin_created,
	})
}
