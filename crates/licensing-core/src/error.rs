use std::borrow::Cow;

/// Errors surfaced by license construction, verification, and the resolver.
///
/// Every variant is detected and returned at the point of failure — nothing
/// here is retried internally (see the resolver's own per-candidate retry
/// loop in [`crate::resolver`], which is a policy layered on top, not a
/// property of this type).
#[licensing_derive::licensing_error]
pub enum LicenseError {
    /// A value coercion (string/mapping → typed value) failed during construction.
    #[error("invalid field `{field}`{}: {detail}", format_context(.context))]
    InvalidField {
        field: Cow<'static, str>,
        detail: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    /// Timespan intersection across dependencies and constraints produced an
    /// empty (or backwards) overlap.
    #[error(
        "incompatible timespan for {author}/{product}{}: {detail}",
        format_context(.context)
    )]
    IncompatibleTimespan {
        author: Cow<'static, str>,
        product: Cow<'static, str>,
        detail: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    /// The license's machine binding does not match the local machine.
    #[error("machine mismatch{}: required {required}, detected {detected}", format_context(.context))]
    MachineMismatch {
        required: Cow<'static, str>,
        detected: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    /// Ed25519 signature verification rejected the payload.
    #[error("signature mismatch{}: {source}", format_context(.context))]
    SignatureMismatch {
        #[source]
        source: ed25519_dalek::SignatureError,
        context: Option<Cow<'static, str>>,
    },

    /// A DKIM-style DNS TXT lookup failed or returned a malformed record.
    #[error("DKIM lookup failed{}: {detail}", format_context(.context))]
    DkimLookupFailed { detail: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A dependency's client pubkey does not match the parent's author pubkey.
    #[error("dependency chain broken{}: {detail}", format_context(.context))]
    ChainBroken { detail: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Keypair decryption failed the authenticated-encryption MAC check.
    #[error("keypair credentials rejected{}", format_context(.context))]
    KeypairCredentialError { context: Option<Cow<'static, str>> },

    /// A Grant's top-level value was not itself a JSON object.
    #[error("grant malformed at key `{key}`{}", format_context(.context))]
    GrantMalformed { key: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Discovery or persistence I/O failure.
    #[error("I/O error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Canonical JSON (de)serialization failure.
    #[error("JSON error{}: {source}", format_context(.context))]
    Json {
        #[source]
        source: serde_json::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Internal fallback for logic errors and unreachable states.
    #[error("internal licensing error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

pub type Result<T> = std::result::Result<T, LicenseError>;
