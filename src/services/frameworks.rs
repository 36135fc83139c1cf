//! Framework manager setup
//!
//! Two framework managers (long-running applications and scheduled jobs)
//! authenticate to the scheduler with a principal and a matching secret.
//! Each manager mints its pair exactly once; the scheduler's aggregation
//! routine later folds every minted pair into its consumable credential
//! list, which is why both framework services run before the scheduler in
//! the fixed order.

use super::{Routine, SetupContext, toggle};
use crate::error::Result;
use crate::secrets::default_secret;

pub const APP_ROUTINES: &[Routine] = &[
    Routine {
        description: "Set the application framework authentication default",
        run: app_auth_toggle,
    },
    Routine {
        description: "Set the application framework TLS default",
        run: app_ssl_toggle,
    },
    Routine {
        description: "Generate the application framework principal and secret",
        run: app_credentials,
    },
    Routine {
        description: "Issue the application framework TLS certificate",
        run: app_certificate,
    },
];

pub const JOB_ROUTINES: &[Routine] = &[
    Routine {
        description: "Set the job framework authentication default",
        run: job_auth_toggle,
    },
    Routine {
        description: "Set the job framework TLS default",
        run: job_ssl_toggle,
    },
    Routine {
        description: "Generate the job framework principal and secret",
        run: job_credentials,
    },
    Routine {
        description: "Issue the job framework TLS certificate",
        run: job_certificate,
    },
];

/// Mint a principal/secret pair once. The secret is the guard key: when it
/// already exists the whole pair is left untouched.
fn mint_credentials(ctx: &mut SetupContext, principal: &str, prefix: &str) -> Result<()> {
    let principal_key = format!("{prefix}_principal");
    let secret_key = format!("{prefix}_secret");
    ctx.store.with_state(|state| {
        if state.contains(&secret_key) {
            println!("  {principal} secret already exists");
        } else {
            state.set_str(&principal_key, principal);
            state.set_str(&secret_key, default_secret());
            println!("  minted {principal} principal and secret");
        }
        Ok(())
    })
}

fn app_auth_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.app_framework, ctx.options.app_framework_auth);
    toggle(ctx, "do_app_framework_auth", service, feature)
}

fn app_ssl_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.app_framework, ctx.options.app_framework_ssl);
    toggle(ctx, "do_app_framework_ssl", service, feature)
}

fn app_credentials(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.app_framework) {
        println!("  app-framework disabled, skipping");
        return Ok(());
    }
    mint_credentials(ctx, "app-framework", "app_framework")
}

fn app_certificate(ctx: &mut SetupContext) -> Result<()> {
    if !ctx
        .options
        .scoped_enabled(ctx.options.app_framework, ctx.options.app_framework_ssl)
    {
        println!("  TLS disabled, skipping certificate");
        return Ok(());
    }
    ctx.ca.issue("app-framework", &ctx.options.app_framework_cn)
}

fn job_auth_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.job_framework, ctx.options.job_framework_auth);
    toggle(ctx, "do_job_framework_auth", service, feature)
}

fn job_ssl_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.job_framework, ctx.options.job_framework_ssl);
    toggle(ctx, "do_job_framework_ssl", service, feature)
}

fn job_credentials(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.job_framework) {
        println!("  job-framework disabled, skipping");
        return Ok(());
    }
    mint_credentials(ctx, "job-framework", "job_framework")
}

fn job_certificate(ctx: &mut SetupContext) -> Result<()> {
    if !ctx
        .options
        .scoped_enabled(ctx.options.job_framework, ctx.options.job_framework_ssl)
    {
        println!("  TLS disabled, skipping certificate");
        return Ok(());
    }
    ctx.ca.issue("job-framework", &ctx.options.job_framework_cn)
}
