use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Fields, ItemStruct, Type};

/// Returns `true` if any of the attributes is `#[patch(skip)]`.
fn is_skipped(attrs: &[Attribute]) -> syn::Result<bool> {
	let mut skip = false;

	for attr in attrs.iter().filter(|attr| attr.path().is_ident("patch")) {
		attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("skip") {
				skip = true;
				Ok(())
			} else {
				Err(meta.error("expected `skip`"))
			}
		})?;
	}

	Ok(skip)
}

/// Collects the `alias` and `rename` options of the field's `serde` attributes,
/// so the patch accepts the same names as the record.
fn names(attrs: &[Attribute]) -> syn::Result<Vec<TokenStream>> {
	let mut names = Vec::new();

	for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
		attr.parse_nested_meta(|meta| {
			if meta.path.is_ident("alias") || meta.path.is_ident("rename") {
				let path = &meta.path;
				let value: syn::LitStr = meta.value()?.parse()?;
				names.push(quote!(#path = #value));
			} else if meta.input.peek(syn::Token![=]) {
				// `default = "..."` and friends do not apply to an optional field
				meta.value()?.parse::<syn::Expr>()?;
			}

			Ok(())
		})?;
	}

	Ok(names)
}

fn is_option(ty: &Type) -> bool {
	let Type::Path(path) = ty else {
		return false;
	};

	path.qself.is_none()
		&& path
			.path
			.segments
			.last()
			.is_some_and(|segment| segment.ident == "Option")
}

pub fn from_input(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let mut item = syn::parse_macro_input!(input as ItemStruct);

	match expand(&mut item) {
		Ok(tokens) => tokens.into(),
		Err(e) => e.into_compile_error().into(),
	}
}

fn expand(item: &mut ItemStruct) -> syn::Result<TokenStream> {
	let Fields::Named(fields) = &mut item.fields else {
		return Err(syn::Error::new_spanned(
			&item.ident,
			"#[patch] only supports structs with named fields",
		));
	};

	let mut idents = Vec::new();
	let mut definitions = Vec::new();

	for field in &mut fields.named {
		let skip = is_skipped(&field.attrs)?;

		// `patch` is not a registered helper attribute, so it must not survive
		field.attrs.retain(|attr| !attr.path().is_ident("patch"));

		if skip {
			continue;
		}

		let Some(ident) = field.ident.clone() else {
			continue;
		};

		let ty = &field.ty;
		let ty = if is_option(ty) {
			quote!(#ty)
		} else {
			quote!(Option<#ty>)
		};

		let vis = &field.vis;
		let attrs = field
			.attrs
			.iter()
			.filter(|attr| attr.path().is_ident("doc") || attr.path().is_ident("validate"));
		let names = names(&field.attrs)?;

		definitions.push(quote! {
			#(#attrs)*
			#[serde(default, skip_serializing_if = "Option::is_none" #(, #names)*)]
			#vis #ident: #ty,
		});
		idents.push(ident);
	}

	let vis = &item.vis;
	let ident = &item.ident;
	let patch_ident = format_ident!("{}Patch", ident);
	let doc = format!("A partial update of [`{ident}`]. Absent fields are left untouched.");

	let attrs = item
		.attrs
		.iter()
		.filter(|attr| attr.path().is_ident("derive") || attr.path().is_ident("serde"));

	Ok(quote! {
		#item

		#[doc = #doc]
		#(#attrs)*
		#[derive(Default)]
		#vis struct #patch_ident {
			#(
				#definitions
			)*
		}

		impl #patch_ident {
			/// Returns `true` when no field is present.
			#vis fn is_empty(&self) -> bool {
				true #(&& self.#idents.is_none())*
			}
		}
	})
}
