//! Private registry credential collection
//!
//! Unlike every other service, this one is interactive by nature and runs
//! only when its switch is explicitly enabled. The collected login tuples
//! are stored once; an existing list is never re-prompted.

use super::{Routine, SetupContext};
use crate::error::Result;
use crate::input::collect_registry_logins;
use crate::state::RegistryLogin;

/// Key of the stored registry login list.
pub const LOGINS_KEY: &str = "registry_logins";

pub const ROUTINES: &[Routine] = &[Routine {
    description: "Collect private registry credentials",
    run: logins,
}];

fn logins(ctx: &mut SetupContext) -> Result<()> {
    if !ctx.options.registry_enabled() {
        println!("  registry collection not enabled, skipping");
        return Ok(());
    }
    let existing = ctx.store.read()?;
    if existing.contains(LOGINS_KEY) {
        println!("  registry logins already stored");
        return Ok(());
    }

    // Prompt outside the transaction so a collection failure leaves the
    // state file untouched.
    let collected = collect_registry_logins()?;
    ctx.store.with_state(|state| {
        let count = collected.len();
        state.set_list::<RegistryLogin>(LOGINS_KEY, &collected)?;
        println!("  stored {count} registry logins");
        Ok(())
    })
}
