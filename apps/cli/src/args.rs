//! Command-line surface (§6 "CLI surface"): three subcommands plus the
//! global flags shared across all of them.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "licensing-cli")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Issue, discover, and verify Ed25519-signed software licenses")]
pub struct Cli {
    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease log verbosity (repeatable: -q, -qq).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Disclose private key material in output (off by default).
    #[arg(short = 'p', long, global = true)]
    pub private: bool,

    /// Directory to write rolling log files to; console-only when absent.
    #[arg(short = 'l', long = "log", global = true)]
    pub log_dir: Option<std::path::PathBuf>,

    /// Print the reason(s) a match failed, not just that it failed.
    #[arg(short = 'w', long = "why", global = true)]
    pub why: bool,

    /// Basename shared by `<name>.crypto-keypair` / `<name>.crypto-license` files.
    #[arg(short = 'n', long = "name", global = true, default_value = "crypto")]
    pub name: String,

    /// Extra search path for candidate files (repeatable).
    #[arg(short = 'e', long = "extra", global = true)]
    pub extra: Vec<std::path::PathBuf>,

    /// Reverse write order for newly persisted material (most-specific first).
    #[arg(short = 'r', long = "reverse", global = true)]
    pub reverse: bool,

    /// Path to a layered configuration file (see `LICENSING__`-prefixed env overrides).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load existing keypair(s) and license(s); print matches.
    Check {
        /// Username for decrypting an encrypted keypair (falls back to `ENVUSERNAME`).
        #[arg(short, long)]
        username: Option<String>,
        /// Password for decrypting an encrypted keypair (falls back to `ENVPASSWORD`).
        #[arg(short = 'P', long)]
        password: Option<String>,
        /// Skip DKIM confirmation of the license author's public key.
        #[arg(long)]
        no_confirm: bool,
    },
    /// Find or create a local keypair.
    Registered {
        /// Username to encrypt the keypair under (falls back to `ENVUSERNAME`).
        #[arg(short, long)]
        username: Option<String>,
        /// Password to encrypt the keypair under (falls back to `ENVPASSWORD`).
        #[arg(short = 'P', long)]
        password: Option<String>,
        /// A 32-byte seed (hex or base64) to register instead of a random one.
        #[arg(long)]
        seed: Option<String>,
        /// Create a new keypair when none is found (default); pass
        /// `--no-registering` to only look, never create.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        registering: bool,
    },
    /// Issue a `LicenseSigned`.
    License {
        /// The license author's display name.
        #[arg(long)]
        author: String,
        /// The author's DNS domain, for DKIM confirmation.
        #[arg(long)]
        domain: Option<String>,
        /// The product name this license covers.
        #[arg(long)]
        product: Option<String>,
        /// Override the derived DNS service label.
        #[arg(long)]
        service: Option<String>,
        /// JSON object of grant capabilities, e.g. `{"some":{"capability":1}}`.
        #[arg(long)]
        grant: Option<String>,
        /// Path to a dependency `LicenseSigned` JSON file (repeatable).
        #[arg(long = "dependency")]
        dependency: Vec<std::path::PathBuf>,
        /// The license client's display name.
        #[arg(long)]
        client: Option<String>,
        /// The client's DNS domain.
        #[arg(long = "client-domain")]
        client_domain: Option<String>,
        /// The client's Ed25519 public key (hex or base64).
        #[arg(long = "client-pubkey")]
        client_pubkey: Option<String>,
        /// Bind the license to the machine it's issued on.
        #[arg(long = "bind-machine")]
        bind_machine: bool,
        /// Perform DKIM confirmation of the author's published pubkey before signing.
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        confirm: bool,
    },
}
