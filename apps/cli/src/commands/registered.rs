use super::{Context, credential};
use crate::discovery::FsDiscovery;
use licensing_core::canonical::to_canonical_json;
use licensing_core::keypair_at_rest::{KeypairEncrypted, KeypairPlaintext};
use licensing_core::keys;
use licensing_core::resolver::Discovery as _;

pub fn run(
    ctx: &Context<'_>,
    username: Option<String>,
    password: Option<String>,
    seed: Option<String>,
    registering: bool,
) -> anyhow::Result<()> {
    let username = credential(username, "ENVUSERNAME");
    let password = credential(password, "ENVPASSWORD");

    let discovery = FsDiscovery::new(ctx.name.clone(), ctx.search_paths.clone(), ctx.reverse);
    let candidates = discovery.keypair_candidates()?;
    let keypairs = licensing_core::resolver::load_keypairs(
        &candidates,
        username.as_deref().unwrap_or_default(),
        password.as_deref().unwrap_or_default(),
    );

    if let Some((origin, keypair)) = keypairs.first() {
        println!("found existing keypair at {origin}");
        println!("vk: {}", base64::Engine::encode(&base64::engine::general_purpose::STANDARD, keypair.vk()));
        if ctx.private {
            println!("sk: {}", hex::encode(keypair.sk()));
        }
        return Ok(());
    }

    anyhow::ensure!(registering, "no keypair found and --no-registering was given");

    let seed_bytes: [u8; 32] = match seed {
        Some(text) => {
            let bytes = licensing_core::canonical::decode_tolerant(&text)?;
            bytes.try_into().map_err(|b: Vec<u8>| anyhow::anyhow!("seed must be 32 bytes, got {}", b.len()))?
        },
        None => keys::register()?,
    };

    let content = match (&username, &password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            to_canonical_json(&KeypairEncrypted::encrypt(seed_bytes, username, password)?)?
        },
        _ => {
            let (_, sk) = keys::keypair_from_seed(seed_bytes);
            to_canonical_json(&KeypairPlaintext::new(&hex::encode(sk), None)?)?
        },
    };

    let origin = discovery.persist_keypair(&content)?;
    println!("registered a new keypair at {origin}");
    let (vk, sk) = keys::keypair_from_seed(seed_bytes);
    println!("vk: {}", base64::Engine::encode(&base64::engine::general_purpose::STANDARD, vk));
    if ctx.private {
        println!("sk: {}", hex::encode(sk));
    }

    Ok(())
}
