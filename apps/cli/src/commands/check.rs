use super::{Context, credential};
use crate::discovery::FsDiscovery;
use licensing_core::resolver::{self, Discovery as _, Match, ResolveContext};

#[allow(clippy::too_many_arguments)]
pub fn run(
    ctx: &Context<'_>,
    username: Option<String>,
    password: Option<String>,
    no_confirm: bool,
) -> anyhow::Result<()> {
    let username = credential(username, "ENVUSERNAME");
    let password = credential(password, "ENVPASSWORD");

    let discovery = FsDiscovery::new(ctx.name.clone(), ctx.search_paths.clone(), ctx.reverse);
    let resolve_ctx = ResolveContext {
        username: username.as_deref(),
        password: password.as_deref(),
        confirm: no_confirm.then_some(false),
        timespan_constraint: None,
        machine_constraint: None,
        resolver: Some(ctx.resolver),
        machine: Some(ctx.machine),
    };

    let results = resolver::check(&discovery.keypair_candidates()?, &discovery.license_candidates()?, &resolve_ctx);

    if results.is_empty() {
        println!("no local keypairs found");
        return Ok(());
    }

    let mut any_matched = false;
    for (keypair, outcome) in &results {
        let vk = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, keypair.vk());
        match outcome {
            Match::Existing(signed) => {
                any_matched = true;
                println!("{vk}: licensed as {}", signed.license.author.name);
            },
            Match::Issued(signed) => {
                any_matched = true;
                println!("{vk}: newly sub-licensable as {}", signed.license.author.name);
            },
            Match::None { reasons } => {
                println!("{vk}: no matching license");
                if ctx.why {
                    for reason in reasons {
                        println!("  - {reason}");
                    }
                }
            },
        }
        if ctx.private {
            println!("  sk: {}", hex::encode(keypair.sk()));
        }
    }

    anyhow::ensure!(any_matched, "no keypair matched an existing or sub-licensable license");
    Ok(())
}
