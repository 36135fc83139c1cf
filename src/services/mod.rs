//! Per-service setup routines
//!
//! Every platform service contributes an ordered list of idempotent
//! routines. The services themselves run in one fixed, statically declared
//! order: credential minters (frameworks, gateway) come before the
//! scheduler, whose aggregation routine consumes what they wrote. Within a
//! service, routines run strictly in declaration order.
//!
//! Universal routine pattern: print the one-line description, acquire the
//! state store, act only when the target keys are absent, and print a
//! status line either way. Toggle routines always run so the persisted
//! file carries an explicit boolean for the deployment tooling even when a
//! feature is disabled; generative routines skip themselves when their
//! service resolves disabled.

pub mod console;
pub mod coordination;
pub mod discovery;
pub mod frameworks;
pub mod gateway;
pub mod registry;
pub mod scheduler;

use strum::Display;

use crate::ca::CertificateAuthority;
use crate::error::Result;
use crate::input::PasswordCache;
use crate::options::{ResolvedOptions, Switch};
use crate::state::StateStore;

/// Platform services, in their display form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ServiceName {
    Discovery,
    AppFramework,
    JobFramework,
    Gateway,
    Scheduler,
    Coordination,
    Console,
    Registry,
}

/// Everything a routine may touch: the resolved options, the state store,
/// the process-lifetime password cache, and the certificate authority.
pub struct SetupContext {
    pub options: ResolvedOptions,
    pub store: StateStore,
    pub passwords: PasswordCache,
    pub ca: CertificateAuthority,
}

impl SetupContext {
    pub fn new(options: ResolvedOptions) -> Self {
        let store = StateStore::new(&options.state_file);
        let ca = CertificateAuthority::new(
            &options.ca_dir,
            options.subject.clone(),
            !options.skip_verify,
        );
        Self {
            options,
            store,
            passwords: PasswordCache::new(),
            ca,
        }
    }
}

/// One idempotent setup step with its operator-facing description.
pub struct Routine {
    pub description: &'static str,
    pub run: fn(&mut SetupContext) -> Result<()>,
}

/// One platform service: name plus its ordered routines.
pub struct ServiceDescriptor {
    pub name: ServiceName,
    pub routines: &'static [Routine],
}

/// The fixed service order. Framework and gateway principals are minted
/// before the scheduler aggregates them; everything else is position-
/// independent but kept stable so runs are diffable.
pub const SERVICES: &[ServiceDescriptor] = &[
    ServiceDescriptor {
        name: ServiceName::Discovery,
        routines: discovery::ROUTINES,
    },
    ServiceDescriptor {
        name: ServiceName::AppFramework,
        routines: frameworks::APP_ROUTINES,
    },
    ServiceDescriptor {
        name: ServiceName::JobFramework,
        routines: frameworks::JOB_ROUTINES,
    },
    ServiceDescriptor {
        name: ServiceName::Gateway,
        routines: gateway::ROUTINES,
    },
    ServiceDescriptor {
        name: ServiceName::Scheduler,
        routines: scheduler::ROUTINES,
    },
    ServiceDescriptor {
        name: ServiceName::Coordination,
        routines: coordination::ROUTINES,
    },
    ServiceDescriptor {
        name: ServiceName::Console,
        routines: console::ROUTINES,
    },
    ServiceDescriptor {
        name: ServiceName::Registry,
        routines: registry::ROUTINES,
    },
];

/// Run every service's routines in the fixed order.
pub fn run_all(ctx: &mut SetupContext) -> Result<()> {
    for service in SERVICES {
        for routine in service.routines {
            println!("[{}] {}", service.name, routine.description);
            (routine.run)(ctx)?;
        }
    }
    Ok(())
}

/// Shared toggle routine body: persist the resolved boolean as a default.
///
/// The resolved value is written when the key is absent, or when the
/// operator passed an explicit switch in scope this run; an implicit
/// default never overwrites a previously persisted choice.
pub(crate) fn toggle(
    ctx: &mut SetupContext,
    key: &str,
    service: Switch,
    feature: Switch,
) -> Result<()> {
    let resolved = ctx.options.scoped_enabled(service, feature);
    let explicit = ctx.options.scoped_explicit(service, feature);
    ctx.store.with_state(|state| {
        if explicit || !state.contains(key) {
            state.set_bool(key, resolved);
            println!("  {key} = {resolved}");
        } else {
            println!("  {key} already set, leaving untouched");
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Context over temp paths with TLS features disabled, so no routine
    /// reaches the external toolchain.
    pub(crate) fn offline_context(dir: &TempDir) -> SetupContext {
        let mut options = crate::cli::Cli::default_options();
        options.state_file = dir.path().join("security.yml");
        options.ca_dir = dir.path().join("ca");
        options.discovery_ssl = Switch::ExplicitFalse;
        options.scheduler_ssl = Switch::ExplicitFalse;
        options.app_framework_ssl = Switch::ExplicitFalse;
        options.job_framework_ssl = Switch::ExplicitFalse;
        options.console_ssl = Switch::ExplicitFalse;
        options.gateway_auth = Switch::ExplicitFalse;
        SetupContext::new(options)
    }

    #[test]
    fn test_service_order_minters_before_scheduler() {
        let position = |name: ServiceName| {
            SERVICES
                .iter()
                .position(|s| s.name == name)
                .expect("service must be declared")
        };
        let scheduler = position(ServiceName::Scheduler);
        assert!(position(ServiceName::AppFramework) < scheduler);
        assert!(position(ServiceName::JobFramework) < scheduler);
        assert!(position(ServiceName::Gateway) < scheduler);
    }

    #[test]
    fn test_service_display_names() {
        assert_eq!(ServiceName::AppFramework.to_string(), "app-framework");
        assert_eq!(ServiceName::Discovery.to_string(), "discovery");
    }

    #[test]
    fn test_toggle_writes_default_once() {
        let dir = TempDir::new().unwrap();
        let mut ctx = offline_context(&dir);

        toggle(&mut ctx, "do_discovery_auth", Switch::Unset, Switch::Unset).unwrap();
        let state = ctx.store.read().unwrap();
        assert_eq!(state.get_bool("do_discovery_auth"), Some(true));

        // Flip the persisted value by hand; an implicit re-run must not
        // overwrite it.
        ctx.store
            .with_state(|state| {
                state.set_bool("do_discovery_auth", false);
                Ok(())
            })
            .unwrap();
        toggle(&mut ctx, "do_discovery_auth", Switch::Unset, Switch::Unset).unwrap();
        let state = ctx.store.read().unwrap();
        assert_eq!(state.get_bool("do_discovery_auth"), Some(false));
    }

    #[test]
    fn test_toggle_explicit_switch_overwrites() {
        let dir = TempDir::new().unwrap();
        let mut ctx = offline_context(&dir);

        toggle(&mut ctx, "do_discovery_auth", Switch::Unset, Switch::Unset).unwrap();

        // Operator explicitly disables the feature on a later run.
        toggle(
            &mut ctx,
            "do_discovery_auth",
            Switch::Unset,
            Switch::ExplicitFalse,
        )
        .unwrap();
        let state = ctx.store.read().unwrap();
        assert_eq!(state.get_bool("do_discovery_auth"), Some(false));
    }

    #[test]
    fn test_broad_disable_resolves_every_toggle_false() {
        let dir = TempDir::new().unwrap();
        let mut ctx = offline_context(&dir);
        ctx.options.security = Switch::ExplicitFalse;

        toggle(
            &mut ctx,
            "do_discovery_auth",
            Switch::ExplicitTrue,
            Switch::ExplicitTrue,
        )
        .unwrap();
        let state = ctx.store.read().unwrap();
        assert_eq!(state.get_bool("do_discovery_auth"), Some(false));
    }

    #[test]
    fn test_broad_enable_resolves_every_toggle_true() {
        let dir = TempDir::new().unwrap();
        let mut ctx = offline_context(&dir);
        ctx.options.security = Switch::ExplicitTrue;

        toggle(
            &mut ctx,
            "do_discovery_auth",
            Switch::ExplicitFalse,
            Switch::ExplicitFalse,
        )
        .unwrap();
        let state = ctx.store.read().unwrap();
        assert_eq!(state.get_bool("do_discovery_auth"), Some(true));
    }
}
