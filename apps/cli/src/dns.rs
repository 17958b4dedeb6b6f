//! DNS TXT lookup (§4.4, spec external collaborator ii): the
//! `hickory-resolver`-backed [`TxtResolver`] implementation.
//!
//! The core's verification algorithm is synchronous (§5 "Scheduling"), so
//! this adapter owns a small dedicated Tokio runtime and blocks on it for
//! every lookup rather than exposing async up through `licensing-core`.

use hickory_resolver::Resolver;
use hickory_resolver::name_server::TokioConnectionProvider;
use licensing_core::dkim::TxtResolver;
use std::time::Duration;

pub struct DnsTxtResolver {
    runtime: tokio::runtime::Runtime,
    resolver: Resolver<TokioConnectionProvider>,
}

impl DnsTxtResolver {
    /// Builds a resolver from the system's `/etc/resolv.conf` (or platform
    /// equivalent), bounding every lookup by `timeout`.
    pub fn from_system_config(timeout: Duration) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let mut builder = Resolver::builder_tokio()?;
        builder.options_mut().timeout = timeout;
        let resolver = builder.build();
        Ok(Self { runtime, resolver })
    }
}

impl TxtResolver for DnsTxtResolver {
    fn resolve_txt(&self, name: &str) -> Result<Vec<String>, String> {
        let name = name.to_owned();
        self.runtime.block_on(async {
            let lookup = self.resolver.txt_lookup(name).await.map_err(|error| error.to_string())?;
            Ok(lookup.iter().map(std::string::ToString::to_string).collect())
        })
    }
}
