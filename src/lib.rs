//! keysmith library
//!
//! Core functionality for the one-shot cluster security bootstrap: option
//! resolution, the persisted security-state store, credential generators,
//! the certificate authority, and the per-service setup routines.

pub mod ca;
pub mod cli;
pub mod error;
pub mod exec;
pub mod input;
pub mod options;
pub mod secrets;
pub mod services;
pub mod state;

// Re-export main types for convenience
pub use ca::CertificateAuthority;
pub use cli::Cli;
pub use error::{Result, SetupError};
pub use exec::{ToolOutput, run_tool};
pub use input::{DEFAULT_REGISTRY_URL, PasswordCache, interactive_password};
pub use options::{CertSubject, ResolvedOptions, Switch};
pub use secrets::{default_secret, hashed_digest, random_password, random_secret};
pub use services::{Routine, SERVICES, ServiceDescriptor, ServiceName, SetupContext, run_all};
pub use state::{FrameworkCredential, RegistryLogin, SecurityState, StateStore};
