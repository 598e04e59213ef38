use aide::{
	openapi::{SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{extract::Json, route::model::Envelope};

pub const SECURITY_SCHEME_BEARER: &str = "Bearer";

pub mod tag {
	pub const AUTH: &str = "Auth";
	pub const SERVICE: &str = "Service";
	pub const CATEGORY: &str = "Category";
	pub const FAVORITE: &str = "Favorite";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Cloud Canvas")
		.summary("A catalog of cloud service icons and documentation")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::AUTH.into(),
			description: Some("Administrator authentication".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::SERVICE.into(),
			description: Some("Service catalog browsing and editing".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::CATEGORY.into(),
			description: Some("The configured service categories".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::FAVORITE.into(),
			description: Some("Favorite services of the authenticated user".into()),
			..Default::default()
		})
		.security_scheme(
			SECURITY_SCHEME_BEARER,
			SecurityScheme::Http {
				scheme: "bearer".into(),
				bearer_format: Some("JWT".into()),
				description: Some("A token returned by the login endpoint".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<Envelope<()>>, _>(|res| {
			res.example(Envelope::failure("error message"))
		})
}
