//! Builds seed records from a directory of icon folders.
//!
//! The directory holds one `Arch_<Category>` folder per category, each with
//! one `.svg` icon per service.

use std::{
	ffi::OsStr,
	fs,
	path::{Path, PathBuf},
};

use chrono::Utc;
use uuid::Uuid;

use super::Error;
use crate::{
	category,
	route::service::model::{Service, SEED_DEFAULT_ENABLED},
};

/// The public path icons are served under.
pub const ICON_ROOT: &str = "/aws/Architecture-Service";

/// Tokens naming the provider rather than the service.
const PROVIDER_TOKENS: [&str; 2] = ["aws", "amazon"];

/// Derives a display name from an icon file name.
///
/// `Arch_Amazon-Simple-Storage-Service_64.svg` becomes
/// `Amazon Simple Storage Service`.
pub fn display_name(file_name: &str) -> String {
	let stem = Path::new(file_name)
		.file_stem()
		.and_then(OsStr::to_str)
		.unwrap_or(file_name);
	let stem = stem.strip_prefix("Arch_").unwrap_or(stem);
	let stem = stem
		.strip_suffix("_64")
		.or_else(|| stem.strip_suffix("_32"))
		.unwrap_or(stem);

	stem.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
		.filter(|token| !token.is_empty() && !token.eq_ignore_ascii_case("aws"))
		.collect::<Vec<_>>()
		.join(" ")
}

/// Lowercases, joins words with `-` and drops everything outside `[a-z0-9-]`.
fn url_safe<'a>(words: impl Iterator<Item = &'a str>) -> String {
	words
		.collect::<Vec<_>>()
		.join("-")
		.to_lowercase()
		.chars()
		.filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
		.collect()
}

/// Derives a slug from a display name, dropping leading provider tokens.
///
/// A name made only of provider tokens keeps them.
pub fn slug(display_name: &str) -> String {
	let is_provider = |word: &&str| {
		PROVIDER_TOKENS
			.iter()
			.any(|token| word.eq_ignore_ascii_case(token))
	};

	let words = display_name
		.split_whitespace()
		.skip_while(is_provider)
		.collect::<Vec<_>>();

	if words.is_empty() {
		url_safe(display_name.split_whitespace())
	} else {
		url_safe(words.into_iter())
	}
}

fn docs_url(display_name: &str) -> String {
	format!(
		"https://docs.aws.amazon.com/{}/",
		url_safe(display_name.split_whitespace())
	)
}

fn body(name: &str, category: &str) -> String {
	format!(
		"# {name}

Detailed documentation for {name} will be added here. This service is part of the {category} category.

## Key Features

- Feature 1
- Feature 2
- Feature 3

## Use Cases

Common use cases and scenarios for {name}.

## Getting Started

Instructions for getting started with {name}.

## Best Practices

- Best practice 1
- Best practice 2
- Best practice 3
"
	)
}

/// Builds the record of one icon. New records are hidden until reviewed.
pub fn service(folder: &str, file_name: &str, category: &str) -> Service {
	let name = display_name(file_name);
	let now = Utc::now();

	Service {
		id: Uuid::new_v4().to_string(),
		slug: slug(&name),
		category: category.to_owned(),
		summary: format!("{name} service"),
		description: format!(
			"{name} service in the {category} category. Learn more about this service and its capabilities."
		),
		html_content: body(&name, category),
		icon_path: format!("{ICON_ROOT}/{folder}/{file_name}"),
		enabled: SEED_DEFAULT_ENABLED,
		aws_docs_url: docs_url(&name),
		diagram_url: String::new(),
		version: 0,
		created_at: now,
		updated_at: now,
		name,
	}
}

fn read_dir_sorted(path: &Path) -> Result<Vec<PathBuf>, Error> {
	let io = |source| Error::Io {
		path: path.to_owned(),
		source,
	};

	let mut entries = fs::read_dir(path)
		.map_err(io)?
		.map(|entry| entry.map(|entry| entry.path()))
		.collect::<Result<Vec<_>, _>>()
		.map_err(io)?;

	entries.sort();
	Ok(entries)
}

fn file_name(path: &Path) -> Option<&str> {
	path.file_name().and_then(OsStr::to_str)
}

/// Scans `icons` and builds one record per `.svg` file, in name order.
///
/// Folders without a known category are skipped with a warning.
pub fn generate(icons: &Path) -> Result<Vec<Service>, Error> {
	let mut services = Vec::new();

	for folder in read_dir_sorted(icons)? {
		let Some(folder_name) = file_name(&folder).filter(|name| name.starts_with("Arch_")) else {
			continue;
		};

		if !folder.is_dir() {
			continue;
		}

		let Some(category) = category::by_folder(folder_name) else {
			tracing::warn!(folder = folder_name, "no category for folder, skipping");
			continue;
		};

		let before = services.len();

		for icon in read_dir_sorted(&folder)? {
			let Some(icon_name) = file_name(&icon) else {
				continue;
			};

			if !icon_name.to_ascii_lowercase().ends_with(".svg") {
				continue;
			}

			services.push(service(folder_name, icon_name, category));
		}

		tracing::info!(category, count = services.len() - before, "processed category");
	}

	Ok(services)
}
