#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by every crate of the workspace.
//!
//! * [`macro@hooklift_error`] turns a plain enum into a context-aware error type.
//! * [`macro@main`] bootstraps an `async fn main` on a `hooklift_runtime` profile.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! hooklift-derive = { path = "../infra/derive" }
//! ```
//!
//! Examples below are `ignore`d because they need the consuming crates in scope.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, parse_macro_input};

/// Attribute macro to run `async fn main` on a `hooklift_runtime` profile.
///
/// # Arguments
///
/// * `cooperative` - Single-threaded scheduler (the default). Every hook and phase
///   interleaves on one thread.
/// * `multi_thread` - Work-stealing scheduler for embedders that want parallel hooks.
///
/// # Examples
///
/// ```rust,ignore
/// #[hooklift_runtime::main(cooperative)]
/// async fn main() -> anyhow::Result<()> {
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::runtime::expand_main(args.into(), input).into()
}

/// Attribute macro for crate-level error enums.
///
/// # Generated Items
///
/// * `#[derive(Debug, thiserror::Error)]` unless already derived.
/// * `<ErrorName>Ext` trait adding `.context(..)` to `Result<T, ErrorName>` and to
///   `Result<T, Source>` for every variant that wraps a `source`.
/// * `From<Source>` for every variant that wraps a `source`.
/// * `From<&'static str>` / `From<String>` routed to the `Internal` variant, when present.
/// * A private `format_context` helper usable inside `#[error(..)]` strings.
///
/// # Requirements
///
/// Variants must use named fields. A variant with a `source` field (or a field marked
/// `#[source]`/`#[from]`) must also carry `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[hooklift_derive::hooklift_error]
/// pub enum SettingsError {
///     #[error("Settings source error{}: {source}", format_context(.context))]
///     Source { source: config::ConfigError, context: Option<Cow<'static, str>> },
///
///     #[error("Internal settings error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read() -> Result<config::Config, SettingsError> {
///     config::Config::builder().build().context("Building layered settings")
/// }
/// ```
#[proc_macro_attribute]
pub fn hooklift_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}
