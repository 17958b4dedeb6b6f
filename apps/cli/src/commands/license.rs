use super::{Context, credential};
use crate::discovery::FsDiscovery;
use licensing_core::agent::Agent;
use licensing_core::canonical::{decode_tolerant, to_canonical_json};
use licensing_core::grant::Grant;
use licensing_core::license::{self, VerifyContext};
use licensing_core::machine::MachineSpec;
use licensing_core::resolver::Discovery as _;

#[allow(clippy::too_many_arguments)]
pub fn run(
    ctx: &Context<'_>,
    author: String,
    domain: Option<String>,
    product: Option<String>,
    service: Option<String>,
    grant: Option<String>,
    dependency: Vec<std::path::PathBuf>,
    client: Option<String>,
    client_domain: Option<String>,
    client_pubkey: Option<String>,
    bind_machine: bool,
    confirm: bool,
) -> anyhow::Result<()> {
    let discovery = FsDiscovery::new(ctx.name.clone(), ctx.search_paths.clone(), ctx.reverse);
    let username = credential(None, "ENVUSERNAME");
    let password = credential(None, "ENVPASSWORD");
    let keypairs = licensing_core::resolver::load_keypairs(
        &discovery.keypair_candidates()?,
        username.as_deref().unwrap_or_default(),
        password.as_deref().unwrap_or_default(),
    );
    let (_, keypair) = keypairs.first().ok_or_else(|| anyhow::anyhow!("no local keypair found; run `registered` first"))?;

    let client_pubkey_bytes = client_pubkey
        .map(|text| decode_tolerant(&text))
        .transpose()?
        .map(|bytes| <[u8; 32]>::try_from(bytes).map_err(|b: Vec<u8>| anyhow::anyhow!("client pubkey must be 32 bytes, got {}", b.len())))
        .transpose()?;

    let author_agent = Agent::new(author, domain, product, service, Some(keypair.vk()))?;
    let client_agent = match (client, client_domain, client_pubkey_bytes) {
        (None, None, None) => None,
        (name, domain, pubkey) => {
            Some(Agent::new(name.unwrap_or_default(), domain, None, None, pubkey)?)
        },
    };

    let grant = grant
        .map(|text| {
            let value: serde_json::Value = serde_json::from_str(&text)?;
            let serde_json::Value::Object(map) = value else {
                anyhow::bail!("--grant must be a JSON object");
            };
            Ok::<_, anyhow::Error>(Grant::try_from_value(map)?)
        })
        .transpose()?;

    let mut dependencies = Vec::new();
    for path in dependency {
        let content = std::fs::read_to_string(&path)?;
        let signed: licensing_core::license::LicenseSigned = serde_json::from_str(&content)?;
        dependencies.push(signed);
    }
    let dependencies = (!dependencies.is_empty()).then_some(dependencies);

    let machine = bind_machine.then_some(MachineSpec::Current);

    let verify_ctx = VerifyContext {
        author_pubkey: None,
        confirm: (!confirm).then_some(false),
        timespan_constraint: None,
        machine_constraint: None,
        resolver: Some(ctx.resolver),
        machine: Some(ctx.machine),
    };

    let signed =
        license::issue(author_agent, client_agent, dependencies, machine, None, grant, keypair.sk(), &verify_ctx)?;

    let output = to_canonical_json(&signed)?;
    println!("{output}");

    Ok(())
}
