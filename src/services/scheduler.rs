//! Scheduler setup
//!
//! Besides its own toggles, follower secret, and certificate, the scheduler
//! owns two cross-service routines: credential aggregation, which folds
//! every principal/secret pair minted by earlier services into the
//! scheduler's consumable list, and deprecation cleanup, which migrates
//! state written by older releases.

use log::info;

use super::{Routine, SetupContext, toggle};
use crate::error::Result;
use crate::secrets::default_secret;
use crate::state::{FrameworkCredential, SecurityState};

/// Key of the aggregated credential list.
pub const CREDENTIALS_KEY: &str = "scheduler_credentials";

/// Key of the standalone follower secret.
pub const FOLLOWER_SECRET_KEY: &str = "scheduler_follower_secret";

/// Principal name older releases synthesized into the aggregated list.
const FOLLOWER_PRINCIPAL: &str = "follower";

/// Obsolete per-framework aggregate keys replaced by [`CREDENTIALS_KEY`].
const OBSOLETE_KEYS: &[&str] = &[
    "app_framework_http_credentials",
    "job_framework_http_credentials",
];

/// State keys of every principal/secret pair the aggregation consumes.
const MINTED_PAIRS: &[(&str, &str)] = &[
    ("app_framework_principal", "app_framework_secret"),
    ("job_framework_principal", "job_framework_secret"),
    ("gateway_principal", "gateway_secret"),
];

pub const ROUTINES: &[Routine] = &[
    Routine {
        description: "Set the scheduler authentication default",
        run: auth_toggle,
    },
    Routine {
        description: "Set the scheduler TLS default",
        run: ssl_toggle,
    },
    Routine {
        description: "Set the framework authentication default",
        run: framework_auth_toggle,
    },
    Routine {
        description: "Generate the follower secret",
        run: follower_secret,
    },
    Routine {
        description: "Aggregate framework credentials",
        run: aggregate_credentials,
    },
    Routine {
        description: "Clean up deprecated credential settings",
        run: cleanup_deprecated,
    },
    Routine {
        description: "Issue the scheduler TLS certificate",
        run: certificate,
    },
];

fn auth_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.scheduler, ctx.options.scheduler_auth);
    toggle(ctx, "do_scheduler_auth", service, feature)
}

fn ssl_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (ctx.options.scheduler, ctx.options.scheduler_ssl);
    toggle(ctx, "do_scheduler_ssl", service, feature)
}

fn framework_auth_toggle(ctx: &mut SetupContext) -> Result<()> {
    let (service, feature) = (
        ctx.options.scheduler,
        ctx.options.scheduler_framework_auth,
    );
    toggle(ctx, "do_scheduler_framework_auth", service, feature)
}

fn follower_secret(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.scheduler) {
        println!("  scheduler disabled, skipping");
        return Ok(());
    }
    ctx.store.with_state(|state| {
        if state.contains(FOLLOWER_SECRET_KEY) {
            println!("  follower secret already exists");
        } else {
            state.set_str(FOLLOWER_SECRET_KEY, default_secret());
            println!("  generated follower secret");
        }
        Ok(())
    })
}

/// Fold every minted principal/secret pair into the aggregated list.
///
/// The list is keyed by principal name: a pair already present is skipped,
/// and a principal whose secret has rotated since the last run has its
/// entry replaced rather than duplicated.
fn aggregate_credentials(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.feature_enabled(ctx.options.scheduler) {
        println!("  scheduler disabled, skipping");
        return Ok(());
    }
    ctx.store.with_state(|state| {
        let mut credentials: Vec<FrameworkCredential> = state.get_list(CREDENTIALS_KEY)?;
        let mut changed = false;

        for (principal_key, secret_key) in MINTED_PAIRS {
            let (Some(principal), Some(secret)) =
                (state.get_str(principal_key), state.get_str(secret_key))
            else {
                continue;
            };

            match credentials.iter_mut().find(|c| c.principal == principal) {
                Some(existing) if existing.secret == secret => {}
                Some(existing) => {
                    info!("replacing rotated secret for principal {principal}");
                    existing.secret = secret.to_string();
                    changed = true;
                }
                None => {
                    credentials.push(FrameworkCredential {
                        principal: principal.to_string(),
                        secret: secret.to_string(),
                    });
                    changed = true;
                }
            }
        }

        if changed {
            let count = credentials.len();
            state.set_list(CREDENTIALS_KEY, &credentials)?;
            println!("  aggregated {count} framework credentials");
        } else {
            println!("  framework credentials already aggregated");
        }
        Ok(())
    })
}

/// Remove settings written by older releases: the two per-framework
/// aggregate keys, and the follower entry that used to be synthesized into
/// the aggregated list before it became a standalone setting.
fn cleanup_deprecated(ctx: &mut SetupContext) -> Result<()> {
    ctx.store.with_state(|state| cleanup_state(state))
}

fn cleanup_state(state: &mut SecurityState) -> Result<()> {
    let mut removed = 0;
    for key in OBSOLETE_KEYS {
        if state.remove(key).is_some() {
            println!("  removed deprecated setting {key} (now part of {CREDENTIALS_KEY})");
            removed += 1;
        }
    }

    let credentials: Vec<FrameworkCredential> = state.get_list(CREDENTIALS_KEY)?;
    let filtered: Vec<FrameworkCredential> = credentials
        .iter()
        .filter(|c| c.principal != FOLLOWER_PRINCIPAL)
        .cloned()
        .collect();
    if filtered.len() != credentials.len() {
        println!(
            "  removed the synthesized follower entry from {CREDENTIALS_KEY} \
             (tracked as {FOLLOWER_SECRET_KEY})"
        );
        state.set_list(CREDENTIALS_KEY, &filtered)?;
        removed += 1;
    }

    if removed == 0 {
        println!("  no deprecated settings found");
    }
    Ok(())
}

fn certificate(ctx: &mut SetupContext) -> Result<()> {
    if !ctx
        .options
        .scoped_enabled(ctx.options.scheduler, ctx.options.scheduler_ssl)
    {
        println!("  TLS disabled, skipping certificate");
        return Ok(());
    }
    ctx.ca.issue("scheduler", &ctx.options.scheduler_cn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::tests::offline_context;
    use tempfile::TempDir;

    fn seed_minted_pairs(ctx: &mut SetupContext) {
        ctx.store
            .with_state(|state| {
                state.set_str("app_framework_principal", "app-framework");
                state.set_str("app_framework_secret", "app-secret");
                state.set_str("job_framework_principal", "job-framework");
                state.set_str("job_framework_secret", "job-secret");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_aggregation_collects_each_pair_once() {
        let dir = TempDir::new().unwrap();
        let mut ctx = offline_context(&dir);
        seed_minted_pairs(&mut ctx);

        aggregate_credentials(&mut ctx).unwrap();
        aggregate_credentials(&mut ctx).unwrap();

        let state = ctx.store.read().unwrap();
        let credentials: Vec<FrameworkCredential> = state.get_list(CREDENTIALS_KEY).unwrap();
        assert_eq!(credentials.len(), 2);
        assert!(credentials.iter().any(|c| c.principal == "app-framework"));
        assert!(credentials.iter().any(|c| c.principal == "job-framework"));
    }

    #[test]
    fn test_aggregation_replaces_rotated_secret() {
        let dir = TempDir::new().unwrap();
        let mut ctx = offline_context(&dir);
        seed_minted_pairs(&mut ctx);
        aggregate_credentials(&mut ctx).unwrap();

        ctx.store
            .with_state(|state| {
                state.set_str("app_framework_secret", "rotated-secret");
                Ok(())
            })
            .unwrap();
        aggregate_credentials(&mut ctx).unwrap();

        let state = ctx.store.read().unwrap();
        let credentials: Vec<FrameworkCredential> = state.get_list(CREDENTIALS_KEY).unwrap();
        assert_eq!(credentials.len(), 2);
        let app = credentials
            .iter()
            .find(|c| c.principal == "app-framework")
            .unwrap();
        assert_eq!(app.secret, "rotated-secret");
    }

    #[test]
    fn test_cleanup_removes_all_three_artifacts() {
        let dir = TempDir::new().unwrap();
        let mut ctx = offline_context(&dir);

        ctx.store
            .with_state(|state| {
                state.set_str("app_framework_http_credentials", "app:old");
                state.set_str("job_framework_http_credentials", "job:old");
                state.set_str(FOLLOWER_SECRET_KEY, "standalone-secret");
                state.set_list(
                    CREDENTIALS_KEY,
                    &[
                        FrameworkCredential {
                            principal: "app-framework".to_string(),
                            secret: "s".to_string(),
                        },
                        FrameworkCredential {
                            principal: "follower".to_string(),
                            secret: "standalone-secret".to_string(),
                        },
                    ],
                )
            })
            .unwrap();

        cleanup_deprecated(&mut ctx).unwrap();

        let state = ctx.store.read().unwrap();
        assert!(!state.contains("app_framework_http_credentials"));
        assert!(!state.contains("job_framework_http_credentials"));
        let credentials: Vec<FrameworkCredential> = state.get_list(CREDENTIALS_KEY).unwrap();
        assert_eq!(credentials.len(), 1);
        assert_eq!(credentials[0].principal, "app-framework");
        // The standalone follower secret is untouched.
        assert_eq!(state.get_str(FOLLOWER_SECRET_KEY), Some("standalone-secret"));
    }

    #[test]
    fn test_cleanup_is_a_noop_on_clean_state() {
        let dir = TempDir::new().unwrap();
        let mut ctx = offline_context(&dir);
        seed_minted_pairs(&mut ctx);
        aggregate_credentials(&mut ctx).unwrap();

        let before = ctx.store.read().unwrap();
        cleanup_deprecated(&mut ctx).unwrap();
        let after = ctx.store.read().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_follower_secret_written_once() {
        let dir = TempDir::new().unwrap();
        let mut ctx = offline_context(&dir);

        follower_secret(&mut ctx).unwrap();
        let first = ctx.store.read().unwrap();
        let secret = first.get_str(FOLLOWER_SECRET_KEY).unwrap().to_string();

        follower_secret(&mut ctx).unwrap();
        let second = ctx.store.read().unwrap();
        assert_eq!(second.get_str(FOLLOWER_SECRET_KEY), Some(secret.as_str()));
    }
}
