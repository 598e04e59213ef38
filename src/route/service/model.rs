use chrono::{DateTime, Utc};
use macros::patch;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::route::model::{CategoryQuery, IdInput, SlugInput};

/// The value of `enabled` for records stored before the flag existed.
pub const READ_DEFAULT_ENABLED: bool = true;
/// The value of `enabled` for records created by the seed tooling,
/// so that new entries stay hidden until reviewed.
pub const SEED_DEFAULT_ENABLED: bool = false;

fn read_default_enabled() -> bool {
	READ_DEFAULT_ENABLED
}

/// A catalog entry for one service icon and its documentation page.
#[patch]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Service {
	/// The unique identifier of the service.
	#[patch(skip)]
	pub id: String,
	/// The display name of the service.
	#[validate(length(min = 1, max = 256))]
	pub name: String,
	/// The URL-safe key of the service, derived from its name.
	#[validate(length(min = 1, max = 256))]
	pub slug: String,
	/// The identifier of the category the service belongs to.
	#[validate(length(min = 1, max = 64))]
	pub category: String,
	/// A one-line summary.
	#[serde(default)]
	pub summary: String,
	#[serde(default)]
	pub description: String,
	/// The body of the service page, in Markdown or HTML.
	#[serde(default, alias = "markdownContent")]
	pub html_content: String,
	/// The path to the static icon asset.
	#[serde(default)]
	pub icon_path: String,
	/// Whether the service is visible in the catalog.
	#[serde(default = "read_default_enabled")]
	pub enabled: bool,
	/// Empty when unset. Updates clear it with `""`, a `null` is ignored.
	#[serde(default)]
	pub aws_docs_url: String,
	#[serde(default)]
	pub diagram_url: String,
	/// Incremented on every applied update.
	#[patch(skip)]
	#[serde(default)]
	pub version: u64,
	/// Records written before timestamps were tracked read as the Unix epoch.
	#[patch(skip)]
	#[serde(default)]
	pub created_at: DateTime<Utc>,
	#[patch(skip)]
	#[serde(default)]
	pub updated_at: DateTime<Utc>,
}

/// A partial update of a service.
///
/// When `version` is present, the update only applies if the stored
/// version still matches it.
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct UpdateServiceInput {
	/// The version of the service the changes are based on.
	#[serde(default)]
	pub version: Option<u64>,
	#[serde(flatten)]
	#[validate(nested)]
	pub patch: ServicePatch,
}

/// The services of one category, in the shape used by the dashboard.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceGroup {
	/// The category identifier.
	pub category: String,
	pub display_name: String,
	pub icon_path: String,
	pub services: Vec<Service>,
}

/// Either the services of a single category or every service grouped by category.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Listing {
	Flat(Vec<Service>),
	Grouped(Vec<ServiceGroup>),
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct Stats {
	/// The number of services, including disabled ones.
	pub total: usize,
	/// The number of enabled services.
	pub available: usize,
}

impl Stats {
	pub fn of(services: &[Service]) -> Self {
		Self {
			total: services.len(),
			available: services.iter().filter(|service| service.enabled).count(),
		}
	}
}
