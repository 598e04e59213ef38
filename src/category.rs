//! The fixed category configuration.
//!
//! Categories are not stored: the list below decides which categories exist,
//! their display order, and how icon folders map onto them.

use schemars::JsonSchema;
use serde::Serialize;

use crate::route::service::model::{Service, ServiceGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
	/// The identifier stored in [`Service::category`].
	pub id: &'static str,
	pub name: &'static str,
	pub display_name: &'static str,
	pub icon_path: &'static str,
	pub description: &'static str,
	pub enabled: bool,
}

macro_rules! category {
	($id:literal, $name:literal, $display_name:literal, $description:literal) => {
		Category {
			id: $id,
			name: $name,
			display_name: $display_name,
			icon_path: concat!("/aws/Category/Arch-Category_", $id, "_64.svg"),
			description: $description,
			enabled: true,
		}
	};
}

/// Every category, in display order.
pub static CATEGORIES: &[Category] = &[
	category!("Analytics", "Analytics", "Analytics", "Data analytics and business intelligence services"),
	category!("Application-Integration", "App-Integration", "Application Integration", "Connect and coordinate distributed applications"),
	category!("Artificial-Intelligence", "Artificial-Intelligence", "AI & Machine Learning", "Machine learning and AI services"),
	category!("Blockchain", "Blockchain", "Blockchain", "Blockchain and distributed ledger services"),
	category!("Business-Applications", "Business-Applications", "Business Applications", "Enterprise business applications"),
	category!("Cloud-Financial-Management", "Cloud-Financial-Management", "Cloud Financial Management", "Cost management and billing optimization"),
	category!("Compute", "Compute", "Compute", "Virtual servers, containers, and serverless compute"),
	category!("Containers", "Containers", "Containers", "Container orchestration and management"),
	category!("Customer-Enablement", "Customer-Enablement", "Customer Enablement", "Customer support and enablement services"),
	category!("Database", "Database", "Database", "Managed database services"),
	category!("Developer-Tools", "Developer-Tools", "Developer Tools", "Development, testing, and deployment tools"),
	category!("End-User-Computing", "End-User-Computing", "End User Computing", "Desktop and application streaming"),
	category!("Front-End-Web-Mobile", "Front-End-Web-Mobile", "Frontend Web & Mobile", "Frontend development and mobile services"),
	category!("Games", "Games", "Game Tech", "Game development and hosting services"),
	category!("Internet-of-Things", "Internet-of-Things", "Internet of Things", "IoT device management and analytics"),
	category!("Management-Governance", "Management-Governance", "Management & Governance", "Cloud management and governance tools"),
	category!("Media-Services", "Media-Services", "Media Services", "Media processing and streaming services"),
	category!("Migration-Modernization", "Migration-Modernization", "Migration & Transfer", "Application migration and modernization"),
	category!("Networking-Content-Delivery", "Networking-Content-Delivery", "Networking & Content Delivery", "Networking and content delivery services"),
	category!("Quantum-Technologies", "Quantum-Technologies", "Quantum Technologies", "Quantum computing services"),
	category!("Satellite", "Satellite", "Satellite", "Satellite communication services"),
	category!("Security-Identity-Compliance", "Security-Identity-Compliance", "Security, Identity & Compliance", "Security, identity, and compliance services"),
	category!("Serverless", "Serverless", "Serverless", "Serverless computing services"),
	category!("Storage", "Storage", "Storage", "Cloud storage services"),
];

/// Icon folder names and the category id their icons are filed under.
///
/// `General-Icons` has no configured category, so its services are stored
/// but never shown in the grouped listing.
pub static FOLDERS: &[(&str, &str)] = &[
	("Arch_Analytics", "Analytics"),
	("Arch_App-Integration", "Application-Integration"),
	("Arch_Artificial-Intelligence", "Artificial-Intelligence"),
	("Arch_Blockchain", "Blockchain"),
	("Arch_Business-Applications", "Business-Applications"),
	("Arch_Cloud-Financial-Management", "Cloud-Financial-Management"),
	("Arch_Compute", "Compute"),
	("Arch_Containers", "Containers"),
	("Arch_Customer-Enablement", "Customer-Enablement"),
	("Arch_Database", "Database"),
	("Arch_Developer-Tools", "Developer-Tools"),
	("Arch_End-User-Computing", "End-User-Computing"),
	("Arch_Front-End-Web-Mobile", "Front-End-Web-Mobile"),
	("Arch_Games", "Games"),
	("Arch_General-Icons", "General-Icons"),
	("Arch_Internet-of-Things", "Internet-of-Things"),
	("Arch_Management-Governance", "Management-Governance"),
	("Arch_Media-Services", "Media-Services"),
	("Arch_Migration-Modernization", "Migration-Modernization"),
	("Arch_Networking-Content-Delivery", "Networking-Content-Delivery"),
	("Arch_Quantum-Technologies", "Quantum-Technologies"),
	("Arch_Satellite", "Satellite"),
	("Arch_Security-Identity-Compliance", "Security-Identity-Compliance"),
	("Arch_Storage", "Storage"),
];

/// Returns the category id for an icon folder name.
pub fn by_folder(folder: &str) -> Option<&'static str> {
	FOLDERS
		.iter()
		.find(|(name, _)| *name == folder)
		.map(|(_, id)| *id)
}

pub fn enabled() -> impl Iterator<Item = &'static Category> {
	CATEGORIES.iter().filter(|category| category.enabled)
}

/// Groups services by category, following the order of `categories`.
///
/// Services of unknown categories are dropped, as are categories without services.
pub fn group_by_category(services: Vec<Service>, categories: &[Category]) -> Vec<ServiceGroup> {
	let mut services = services;

	categories
		.iter()
		.filter_map(|category| {
			let (matching, rest) = services
				.drain(..)
				.partition::<Vec<_>, _>(|service| service.category == category.id);
			services = rest;

			(!matching.is_empty()).then(|| ServiceGroup {
				category: category.id.to_owned(),
				display_name: category.display_name.to_owned(),
				icon_path: category.icon_path.to_owned(),
				services: matching,
			})
		})
		.collect()
}
