//! Derive macros shared by all Syllabus crates.
//!
//! - `ApiError` implements `syllabus_error::ApiError` from `#[api(...)]`
//!   annotations. Every variant must either carry `#[api(internal)]`,
//!   `#[api(code = "...", status = "...")]`, or have a field marked
//!   `#[cause]` which itself implements `ApiError`.
//! - `From` implements [`From`] for each single-field variant whose field is
//!   marked `#[from]`.

extern crate proc_macro;

use synstructure::decl_derive;

mod api;
mod from;

decl_derive!([ApiError, attributes(api)] => api::derive_error);
decl_derive!([From, attributes(from)] => from::derive_from);
