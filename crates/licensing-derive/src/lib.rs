//! # licensing-derive
//!
//! Procedural macro that reduces the boilerplate of defining the error enums
//! used across the `licensing-core` and CLI crates.
//!
//! See [`licensing_error`] for the generated items and requirements.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for defining domain-specific error enums.
///
/// Transforms a plain enum into a fully-featured error type:
///
/// # Features
///
/// * **Automatic derives**: injects `#[derive(Debug, thiserror::Error)]` when
///   not already present.
/// * **Context support**: generates a companion `...Ext` trait adding
///   `.context(...)` to any `Result` convertible into this error type.
/// * **Standard conversions**: implements `From<T>` for variants with a
///   `source` field, enabling `?` on upstream errors.
/// * **Internal fallback**: `From<&str>`/`From<String>` when an `Internal`
///   variant is present.
///
/// # Requirements
///
/// 1. Must be applied to an enum.
/// 2. Variants that support context must carry a
///    `context: Option<Cow<'static, str>>` field.
/// 3. Variants wrapping an external error must carry a `source` field (or one
///    tagged `#[source]`/`#[from]`).
/// 4. Tuple and unit variants are rejected to keep error wiring explicit.
///
/// # Example
///
/// ```rust,ignore
/// use licensing_derive::licensing_error;
/// use std::borrow::Cow;
///
/// #[licensing_error]
/// pub enum LicenseError {
///     #[error("signature mismatch{}: {source}", format_context(.context))]
///     SignatureMismatch { source: ed25519_dalek::SignatureError, context: Option<Cow<'static, str>> },
///
///     #[error("internal licensing fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
/// ```
#[proc_macro_attribute]
pub fn licensing_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
