//! Discovery service setup
//!
//! The discovery agents share a symmetric gossip key for encrypted cluster
//! communication and two ACL tokens (master and agent). Tokens are UUIDs;
//! the gossip key is 16 random bytes, base64 encoded, which is the length
//! the agent's keyring expects.

use uuid::Uuid;

use super::{Routine, SetupContext, toggle};
use crate::error::Result;
use crate::secrets::random_secret;

/// Gossip keys are exactly 16 bytes before encoding.
const GOSSIP_KEY_BYTES: usize = 16;

pub const ROUTINES: &[Routine] = &[
    Routine {
        description: "Set the discovery ACL authentication default",
        run: auth_toggle,
    },
    Routine {
        description: "Set the discovery TLS default",
        run: ssl_toggle,
    },
    Routine {
        description: "Generate the gossip encryption key",
        run: gossip_key,
    },
    Routine {
        description: "Generate the master ACL token",
        run: master_token,
    },
    Routine {
        description: "Generate the agent ACL token",
        run: agent_token,
    },
    Routine {
        description: "Issue the discovery TLS certificate",
        run: certificate,
    },
];

fn auth_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.discovery, ctx.options.discovery_auth);
    toggle(ctx, "do_discovery_auth", service, feature)
}

fn ssl_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.discovery, ctx.options.discovery_ssl);
    toggle(ctx, "do_discovery_ssl", service, feature)
}

fn gossip_key(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.discovery) {
        println!("  discovery disabled, skipping");
        return Ok(());
    }
    ctx.store.with_state(|state| {
        if state.contains("discovery_gossip_key") {
            println!("  gossip key already exists");
        } else {
            state.set_str("discovery_gossip_key", random_secret(GOSSIP_KEY_BYTES));
            println!("  generated gossip key");
        }
        Ok(())
    })
}

fn master_token(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.discovery) {
        println!("  discovery disabled, skipping");
        return Ok(());
    }
    ctx.store.with_state(|state| {
        if state.contains("discovery_master_token") {
            println!("  master ACL token already exists");
        } else {
            state.set_str("discovery_master_token", Uuid::new_v4().to_string());
            println!("  generated master ACL token");
        }
        Ok(())
    })
}

fn agent_token(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.discovery) {
        println!("  discovery disabled, skipping");
        return Ok(());
    }
    ctx.store.with_state(|state| {
        if state.contains("discovery_agent_token") {
            println!("  agent ACL token already exists");
        } else {
            state.set_str("discovery_agent_token", Uuid::new_v4().to_string());
            println!("  generated agent ACL token");
        }
        Ok(())
    })
}

fn certificate(ctx: &mut SetupContext) -> Result<()> {
    if !ctx
        .options
        .scoped_enabled(ctx.options.discovery, ctx.options.discovery_ssl)
    {
        println!("  TLS disabled, skipping certificate");
        return Ok(());
    }
    ctx.ca.issue("discovery", &ctx.options.discovery_cn)
}
