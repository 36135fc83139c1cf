//! Web console setup
//!
//! The console fronts the cluster for human operators, so its password is
//! collected interactively under the shared `admin` purpose - any other
//! service asking for the admin password this run gets the same answer
//! from the cache. `--change-admin-password` is the one sanctioned way to
//! overwrite the stored value.

use super::{Routine, SetupContext, toggle};
use crate::error::Result;
use crate::input::interactive_password;

/// Key of the persisted console admin password.
pub const ADMIN_PASSWORD_KEY: &str = "console_admin_password";

pub const ROUTINES: &[Routine] = &[
    Routine {
        description: "Set the console authentication default",
        run: auth_toggle,
    },
    Routine {
        description: "Set the console TLS default",
        run: ssl_toggle,
    },
    Routine {
        description: "Collect the console admin password",
        run: admin_password,
    },
    Routine {
        description: "Issue the console TLS certificate",
        run: certificate,
    },
];

fn auth_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.console, ctx.options.console_auth);
    toggle(ctx, "do_console_auth", service, feature)
}

fn ssl_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.console, ctx.options.console_ssl);
    toggle(ctx, "do_console_ssl", service, feature)
}

fn admin_password(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.console) {
        println!("  console disabled, skipping");
        return Ok(());
    }
    let change = ctx.options.change_admin_password;
    let SetupContext {
        store, passwords, ..
    } = ctx;
    store.with_state(|state| {
        if state.contains(ADMIN_PASSWORD_KEY) && !change {
            println!("  admin password already set");
            return Ok(());
        }
        let password = interactive_password(passwords, "Console admin password:", Some("admin"))?;
        state.set_str(ADMIN_PASSWORD_KEY, password);
        println!("  stored admin password");
        Ok(())
    })
}

fn certificate(ctx: &mut SetupContext) -> Result<()> {
    if !ctx
        .options
        .scoped_enabled(ctx.options.console, ctx.options.console_ssl)
    {
        println!("  TLS disabled, skipping certificate");
        return Ok(());
    }
    ctx.ca.issue("console", &ctx.options.console_cn)
}
