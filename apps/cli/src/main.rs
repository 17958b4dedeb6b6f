#![allow(clippy::print_stdout, clippy::print_stderr)]

mod args;
mod commands;
mod config;
mod discovery;
mod dns;
mod error;
mod machine;

use anyhow::Context as _;
use args::{Cli, Command};
use clap::Parser;
use licensing_logger::{LevelFilter, Logger};
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match i32::from(cli.verbose) - i32::from(cli.quiet) {
        ..=-2 => LevelFilter::ERROR,
        -1 => LevelFilter::WARN,
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        2.. => LevelFilter::TRACE,
    };

    let logger_builder = Logger::builder().name(env!("CARGO_PKG_NAME")).level(level);
    let _logger = match &cli.log_dir {
        Some(dir) => logger_builder.path(dir).init()?,
        None => logger_builder.init()?,
    };

    let cfg = config::load_config(cli.config.as_deref()).context("configuration is malformed")?;

    let mut search_paths = cli.extra.clone();
    if search_paths.is_empty() {
        search_paths = cfg.search_paths.clone();
    }

    let resolver = dns::DnsTxtResolver::from_system_config(Duration::from_secs(cfg.dns_timeout_secs))
        .context("failed to initialize DNS resolver")?;
    let machine = machine::LocalMachine;

    let ctx = commands::Context {
        name: cli.name.clone(),
        search_paths,
        reverse: cli.reverse,
        why: cli.why,
        private: cli.private,
        resolver: &resolver,
        machine: &machine,
    };

    match cli.command {
        Command::Check { username, password, no_confirm } => {
            commands::check::run(&ctx, username, password, no_confirm)
        },
        Command::Registered { username, password, seed, registering } => {
            commands::registered::run(&ctx, username, password, seed, registering)
        },
        Command::License {
            author,
            domain,
            product,
            service,
            grant,
            dependency,
            client,
            client_domain,
            client_pubkey,
            bind_machine,
            confirm,
        } => commands::license::run(
            &ctx,
            author,
            domain,
            product,
            service,
            grant,
            dependency,
            client,
            client_domain,
            client_pubkey,
            bind_machine,
            confirm,
        ),
    }
}
