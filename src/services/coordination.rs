//! Coordination service setup
//!
//! The distributed coordination layer gets one super-user secret plus, for
//! each of its three consumer services, a username/secret pair and the
//! matching ACL digest (base64 of SHA-1 over `user:secret`). All three
//! values for a consumer are written together; the secret key is the guard.

use super::{Routine, SetupContext, toggle};
use crate::error::Result;
use crate::secrets::{default_secret, hashed_digest};

/// Consumer services that authenticate to the coordination layer, as
/// (username, state-key prefix) pairs.
const CONSUMERS: &[(&str, &str)] = &[
    ("scheduler", "coordination_scheduler"),
    ("app-framework", "coordination_app_framework"),
    ("job-framework", "coordination_job_framework"),
];

pub const ROUTINES: &[Routine] = &[
    Routine {
        description: "Set the coordination ACL authentication default",
        run: auth_toggle,
    },
    Routine {
        description: "Generate the coordination super-user secret",
        run: super_secret,
    },
    Routine {
        description: "Generate consumer credentials and digests",
        run: consumer_credentials,
    },
];

fn auth_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.coordination, ctx.options.coordination_auth);
    toggle(ctx, "do_coordination_auth", service, feature)
}

fn super_secret(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.coordination) {
        println!("  coordination disabled, skipping");
        return Ok(());
    }
    ctx.store.with_state(|state| {
        if state.contains("coordination_super_secret") {
            println!("  super-user secret already exists");
        } else {
            state.set_str("coordination_super_secret", default_secret());
            println!("  generated super-user secret");
        }
        Ok(())
    })
}

fn consumer_credentials(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.coordination) {
        println!("  coordination disabled, skipping");
        return Ok(());
    }
    ctx.store.with_state(|state| {
        for (user, prefix) in CONSUMERS {
            let secret_key = format!("{prefix}_secret");
            if state.contains(&secret_key) {
                println!("  {user} coordination credentials already exist");
                continue;
            }
            let secret = default_secret();
            state.set_str(&format!("{prefix}_user"), *user);
            state.set_str(&format!("{prefix}_digest"), hashed_digest(user, &secret));
            state.set_str(&secret_key, secret);
            println!("  generated {user} coordination credentials");
        }
        Ok(())
    })
}
