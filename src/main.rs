#![warn(clippy::pedantic)]

mod category;
mod config;
mod error;
mod extract;
mod openapi;
mod password;
mod revalidate;
mod route;
mod seed;
mod session;
mod store;

use std::{path::PathBuf, sync::Arc};

use aide::{axum::ApiRouter, openapi::OpenApi};
use anyhow::Context;
use argon2::Argon2;
use axum::{Extension, Router};
use clap::{Parser, Subcommand, ValueEnum};
use tower::ServiceBuilder;
use tower_http::{
	compression::CompressionLayer,
	cors::CorsLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use store::Database;

use crate::{config::Config, revalidate::Revalidator, session::Tokens};

pub type AppState = State;

/// The shared application state.
///
/// Everything here is cheap to clone: the store is behind an [`Arc`] and the
/// hasher only holds its parameters.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub hasher: Argon2<'static>,
	pub tokens: Tokens,
	pub revalidator: Revalidator,
}

#[derive(Parser)]
#[command(version, about)]
struct Cli {
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
	/// Runs the HTTP server (the default).
	Serve,
	/// Generates a seed file from a directory of icon folders.
	Generate {
		/// The directory holding one `Arch_<Category>` folder per category.
		#[arg(long, env = "ICONS_DIR", default_value = "public/aws/Architecture-Service")]
		icons: PathBuf,
		#[arg(long, env = "SEED_FILE", default_value = "seed/services.json")]
		output: PathBuf,
	},
	/// Replaces every stored service and user with a seed file and an admin account.
	Seed {
		#[arg(long, env = "SEED_FILE", default_value = "seed/services.json")]
		input: PathBuf,
		/// Selects the environment file to load.
		#[arg(long, value_enum, default_value_t = Stage::Dev)]
		stage: Stage,
	},
}

#[derive(Clone, Copy, ValueEnum)]
enum Stage {
	Dev,
	Prod,
}

impl Stage {
	fn env_file(self) -> &'static str {
		match self {
			Self::Dev => ".env.development",
			Self::Prod => ".env.production",
		}
	}
}

/// Builds the router with every route, the `OpenAPI` document and the middleware stack.
pub fn app(state: State) -> Router {
	let mut api = OpenApi::default();

	let router = ApiRouter::new()
		.nest("/api/auth", route::auth::routes())
		.nest("/api/services", route::service::routes())
		.nest("/api/categories", route::category::routes())
		.nest("/api/favorites", route::favorite::routes())
		.nest("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs);

	router
		.layer(Extension(Arc::new(api)))
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
				.layer(TraceLayer::new_for_http())
				.layer(PropagateRequestIdLayer::x_request_id())
				.layer(CompressionLayer::new())
				.layer(CorsLayer::permissive()),
		)
		.with_state(state)
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for ctrl-c");
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => tracing::error!(error = %e, "failed to listen for SIGTERM"),
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}

	tracing::info!("shutting down");
}

async fn serve() -> anyhow::Result<()> {
	dotenvy::dotenv().ok();

	let config = Config::from_env().context("invalid configuration, check your .env file")?;
	let database = config.backend.connect().await;

	let state = State {
		database: database.clone(),
		hasher: password::hasher().context("invalid argon2 parameters")?,
		tokens: Tokens::new(&config.jwt_secret),
		revalidator: Revalidator::new(),
	};

	let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
		.await
		.with_context(|| format!("failed to bind to {}:{}", config.host, config.port))?;

	tracing::info!("listening on {}", listener.local_addr()?);

	axum::serve(listener, app(state))
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	database.close().await;
	Ok(())
}

async fn run_seed(input: PathBuf, stage: Stage) -> anyhow::Result<()> {
	if dotenvy::from_filename(stage.env_file()).is_err() {
		tracing::warn!(file = stage.env_file(), "environment file not found, using .env");
		dotenvy::dotenv().ok();
	}

	let services = seed::load(&input)
		.with_context(|| format!("run `generate` first to create {}", input.display()))?;

	let config = Config::from_env().context("invalid configuration, check your environment file")?;
	let admin = config::Admin::from_env().context("the admin account must be configured")?;
	let database = config.backend.connect().await;
	let hasher = password::hasher().context("invalid argon2 parameters")?;

	let report = seed::run(database.as_ref(), &hasher, &services, &admin).await?;
	database.close().await;

	tracing::info!(
		services = report.services_written,
		batches = report.batches,
		admin_created = report.admin_created,
		"seeding complete"
	);

	Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with(tracing_subscriber::fmt::layer())
		.init();

	match Cli::parse().command.unwrap_or(Command::Serve) {
		Command::Serve => serve().await,
		Command::Generate { icons, output } => {
			let services = seed::generate::generate(&icons)
				.with_context(|| format!("failed to read icons from {}", icons.display()))?;
			seed::save(&output, &services)?;

			tracing::info!(count = services.len(), output = %output.display(), "seed file written");
			Ok(())
		}
		Command::Seed { input, stage } => run_seed(input, stage).await,
	}
}
