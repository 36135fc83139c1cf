//! API gateway setup
//!
//! The gateway talks to the scheduler with a minted principal/secret pair,
//! just like the framework managers, so its routines run before the
//! scheduler's aggregation in the fixed order.

use super::{Routine, SetupContext, toggle};
use crate::error::Result;
use crate::secrets::default_secret;

pub const ROUTINES: &[Routine] = &[
    Routine {
        description: "Set the gateway authentication default",
        run: auth_toggle,
    },
    Routine {
        description: "Generate the gateway principal and secret",
        run: credentials,
    },
    Routine {
        description: "Issue the gateway TLS certificate",
        run: certificate,
    },
];

fn auth_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.gateway, ctx.options.gateway_auth);
    toggle(ctx, "do_gateway_auth", service, feature)
}

fn credentials(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.gateway) {
        println!("  gateway disabled, skipping");
        return Ok(());
    }
    ctx.store.with_state(|state| {
        if state.contains("gateway_secret") {
            println!("  gateway secret already exists");
        } else {
            state.set_str("gateway_principal", "gateway");
            state.set_str("gateway_secret", default_secret());
            println!("  minted gateway principal and secret");
        }
        Ok(())
    })
}

fn certificate(ctx: &mut SetupContext) -> Result<()> {
    if !ctx
        .options
        .scoped_enabled(ctx.options.gateway, ctx.options.gateway_auth)
    {
        println!("  gateway authentication disabled, skipping certificate");
        return Ok(());
    }
    ctx.ca.issue("gateway", &ctx.options.gateway_cn)
}
