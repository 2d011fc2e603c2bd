use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::{Attribute, Ident, Lit, Meta, NestedMeta, spanned::Spanned};
use synstructure::{BindingInfo, Structure, VariantInfo};

/// A compile error to be emitted in place of generated code.
struct Error(TokenStream);

impl Error {
    fn new(span: Span, message: &str) -> Error {
        Error(quote_spanned! { span =>
            compile_error!(#message);
        })
    }
}

/// Contents of an `#[api(...)]` attribute.
#[derive(Default)]
struct Api {
    internal: Option<Span>,
    code: Option<Lit>,
    status: Option<Ident>,
}

/// Which method of `ApiError` is being generated.
#[derive(Clone, Copy)]
enum Method {
    Status,
    Code,
}

pub fn derive_error(s: Structure) -> TokenStream {
    let statuses = s.each_variant(|v| expand(v, Method::Status));
    let codes = s.each_variant(|v| expand(v, Method::Code));

    s.gen_impl(quote! {
        extern crate actix_web;
        use std::borrow::Cow;

        gen impl ApiError for @Self {
            fn status(&self) -> actix_web::http::StatusCode {
                match *self { #statuses }
            }

            fn code(&self) -> Option<Cow<str>> {
                match *self { #codes }
            }
        }
    })
}

fn expand(v: &VariantInfo, method: Method) -> TokenStream {
    match expand_variant(v, method) {
        Ok(tokens) => tokens,
        Err(Error(tokens)) => tokens,
    }
}

/// Generate body of a match arm for a single variant.
fn expand_variant(v: &VariantInfo, method: Method) -> Result<TokenStream, Error> {
    let api = match parse_api(v.ast().attrs)? {
        Some(api) => api,
        // Without an annotation we defer to the cause.
        None => {
            let cause = v.bindings()
                .iter()
                .find(is_cause)
                .ok_or_else(|| Error::new(
                    v.ast().ident.span(),
                    "each variant must be #[api]-annotated or have a #[cause]",
                ))?;

            return Ok(match method {
                Method::Status => quote!(#cause.status()),
                Method::Code => quote!(#cause.code()),
            });
        }
    };

    Ok(match method {
        Method::Status => match api.status {
            Some(status) => quote!(actix_web::http::StatusCode::#status),
            None => quote!(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
        },
        Method::Code => match api.code {
            Some(code) => quote!(Some(Cow::Borrowed(#code))),
            None => quote!(None),
        },
    })
}

/// Find and parse the single `#[api(...)]` attribute in a list.
fn parse_api(attrs: &[Attribute]) -> Result<Option<Api>, Error> {
    let mut metas = attrs.iter()
        .filter_map(|attr| attr.parse_meta().ok())
        .filter(|meta| meta.path().is_ident("api"));

    let meta = match metas.next() {
        Some(meta) => meta,
        None => return Ok(None),
    };

    if let Some(extra) = metas.next() {
        return Err(Error::new(
            extra.span(), "api attribute must be used exactly once"));
    }

    let list = match meta {
        Meta::List(list) => list,
        other => return Err(Error::new(
            other.span(), "api attribute must take a list in parentheses")),
    };

    if list.nested.is_empty() {
        return Err(Error::new(
            list.span(), "api attribute requires at least one argument"));
    }

    let mut api = Api::default();

    for item in &list.nested {
        match item {
            NestedMeta::Meta(Meta::Path(path)) if path.is_ident("internal") =>
                api.internal = Some(item.span()),
            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("code") =>
                api.code = Some(nv.lit.clone()),
            NestedMeta::Meta(Meta::NameValue(nv)) if nv.path.is_ident("status") =>
                api.status = Some(match nv.lit {
                    Lit::Str(ref s) => Ident::new(&s.value(), s.span()),
                    ref other => return Err(Error::new(
                        other.span(), "expected a string")),
                }),
            _ => return Err(Error::new(
                item.span(), "expected one of: internal, code, status")),
        }
    }

    if let Some(span) = api.internal {
        if api.code.is_some() || api.status.is_some() {
            return Err(Error::new(
                span, "internal errors can't have codes or statuses"));
        }
    }

    Ok(Some(api))
}

fn is_cause(bi: &&BindingInfo) -> bool {
    bi.ast()
        .attrs
        .iter()
        .filter_map(|attr| attr.parse_meta().ok())
        .any(|meta| meta.path().is_ident("cause"))
}
