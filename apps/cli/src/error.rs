use std::borrow::Cow;

/// CLI-layer errors: the filesystem discovery, DNS, and machine-identity
/// collaborators that `licensing-core` consumes only through traits.
#[licensing_derive::licensing_error]
pub enum CliError {
    /// A keypair or license file could not be read from disk.
    #[error("failed to read {path}{}: {source}", format_context(.context))]
    Read { path: Cow<'static, str>, source: std::io::Error, context: Option<Cow<'static, str>> },

    /// A newly issued keypair or license could not be written to disk.
    #[error("failed to write {path}{}: {source}", format_context(.context))]
    Write { path: Cow<'static, str>, source: std::io::Error, context: Option<Cow<'static, str>> },

    /// No writable search path was configured for persisting new material.
    #[error("no search path available to persist a new keypair{}", format_context(.context))]
    NoWritablePath { context: Option<Cow<'static, str>> },

    /// Internal fallback for logic errors and unreachable states.
    #[error("internal CLI error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// CLI-layer failures are folded into `licensing_core::LicenseError::Io` so
/// they can flow through the same `Result` the resolver's `Discovery` trait
/// returns.
impl From<CliError> for licensing_core::LicenseError {
    fn from(err: CliError) -> Self {
        licensing_core::LicenseError::Io {
            source: std::io::Error::other(err.to_string()),
            context: Some("CLI collaborator".into()),
        }
    }
}
