pub mod check;
pub mod license;
pub mod registered;

use licensing_core::dkim::TxtResolver;
use licensing_core::machine::MachineIdProvider;
use std::path::PathBuf;

/// Collaborators and global options shared by every subcommand handler.
pub struct Context<'a> {
    pub name: String,
    pub search_paths: Vec<PathBuf>,
    pub reverse: bool,
    pub why: bool,
    pub private: bool,
    pub resolver: &'a dyn TxtResolver,
    pub machine: &'a dyn MachineIdProvider,
}

/// Resolves a username/password from a CLI flag, falling back to the
/// `ENVUSERNAME`/`ENVPASSWORD` environment variables (§6 "Environment variables").
pub fn credential(flag: Option<String>, env_var: &str) -> Option<String> {
    flag.or_else(|| std::env::var(env_var).ok())
}
