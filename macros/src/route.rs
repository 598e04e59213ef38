use darling::{ast::NestedMeta, FromMeta};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};

#[derive(FromMeta)]
struct RouteArgs {
	#[darling(multiple)]
	tag: Vec<syn::Expr>,
	/// A success response with an explicit body shape.
	#[darling(multiple)]
	response: Vec<ResponseArgs>,
	/// A failure response, always rendered as the error envelope.
	#[darling(multiple)]
	error: Vec<ErrorArgs>,
}

#[derive(FromMeta)]
struct ResponseArgs {
	status: syn::LitInt,
	shape: Option<syn::Type>,
	description: Option<String>,
}

#[derive(FromMeta)]
struct ErrorArgs {
	status: syn::LitInt,
	description: String,
}

impl ResponseArgs {
	fn transform(&self) -> TokenStream2 {
		let status = &self.status;
		let shape = self.shape.as_ref().map_or_else(|| quote!(()), |x| quote!(#x));

		match &self.description {
			Some(description) => quote! {
				.response_with::<#status, #shape, _>(|res| res.description(#description))
			},
			None => quote!(.response::<#status, #shape>()),
		}
	}
}

impl ErrorArgs {
	fn transform(&self) -> TokenStream2 {
		let status = &self.status;
		let description = &self.description;

		quote! {
			.response_with::<#status, axum::Json<crate::route::model::Envelope<()>>, _>(|res| {
				res.description(#description)
			})
		}
	}
}

pub fn from_input(args: TokenStream, input: TokenStream) -> TokenStream {
	let args = match NestedMeta::parse_meta_list(args.into())
		.map_err(darling::Error::from)
		.and_then(|list| RouteArgs::from_list(&list))
	{
		Ok(args) => args,
		Err(e) => return e.write_errors().into(),
	};

	let function = syn::parse_macro_input!(input as syn::ItemFn);
	let Some(doc) = Doc::from_attrs(&function.attrs) else {
		return syn::Error::new_spanned(
			&function.sig.ident,
			"#[route] needs a doc comment, its first line becomes the summary",
		)
		.into_compile_error()
		.into();
	};

	let docs_fn = format_ident!("{}_docs", function.sig.ident);
	let vis = &function.vis;
	let Doc {
		summary,
		description,
	} = doc;

	let tags = &args.tag;
	let responses = args.response.iter().map(ResponseArgs::transform);
	let errors = args.error.iter().map(ErrorArgs::transform);

	quote! {
		#function

		#vis fn #docs_fn(op: aide::transform::TransformOperation) -> aide::transform::TransformOperation {
			op.summary(#summary)
				.description(#description)
				#(.tag(#tags))*
				#(#responses)*
				#(#errors)*
		}
	}
	.into()
}

/// The operation text taken from a doc comment.
///
/// The first line is the summary and the following lines, joined with spaces,
/// the description. A single-line comment is used for both.
struct Doc {
	summary: String,
	description: String,
}

impl Doc {
	fn from_attrs(attrs: &[syn::Attribute]) -> Option<Self> {
		let mut lines = attrs
			.iter()
			.filter(|attr| attr.path().is_ident("doc"))
			.filter_map(|attr| match &attr.meta {
				syn::Meta::NameValue(syn::MetaNameValue {
					value:
						syn::Expr::Lit(syn::ExprLit {
							lit: syn::Lit::Str(literal),
							..
						}),
					..
				}) => Some(literal.value().trim().to_owned()),
				_ => None,
			})
			.skip_while(String::is_empty);

		let summary = lines.next()?;
		let rest = lines.filter(|line| !line.is_empty()).collect::<Vec<_>>();

		let description = if rest.is_empty() {
			summary.clone()
		} else {
			rest.join(" ")
		};

		Some(Self {
			summary,
			description,
		})
	}
}
