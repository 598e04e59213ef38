mod patch;
mod route;

use proc_macro::TokenStream;

/// Creates a new documentation function for the route, named after the original function with the suffix `_docs`.
///
/// The first line of the doc comment becomes the summary, the remaining lines the description.
#[proc_macro_attribute]
pub fn route(args: TokenStream, input: TokenStream) -> TokenStream {
	route::from_input(args, input)
}

/// Creates a `XPatch` struct for the record `X`, where every field is optional
/// and only serialized when present.
///
/// Fields marked with `#[patch(skip)]` are left out of the patch, so they can
/// never be written through it. The `derive` and `serde` attributes of the record
/// are copied over, as are the `doc` and `validate` attributes and the serde
/// `alias` and `rename` names of each field.
#[proc_macro_attribute]
pub fn patch(_args: TokenStream, input: TokenStream) -> TokenStream {
	patch::from_input(input)
}
