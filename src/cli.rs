use clap::Parser;
use std::path::PathBuf;

use crate::options::{CertSubject, ResolvedOptions, Switch};

/// Value parser for tri-state switches.
///
/// Delegates to [`Switch::parse_token`] so a bad token is rejected during
/// argument parsing, before any state file is touched.
fn switch_token(token: &str) -> Result<Switch, String> {
    Switch::parse_token(token).map_err(|e| e.to_string())
}

/// keysmith - one-shot security bootstrap for a cluster deployment
///
/// Walks every platform service in a fixed order, generates any missing
/// credentials and certificates, and persists the merged result into the
/// security-state file consumed by the deployment tooling. Safe to re-run:
/// existing secrets are never regenerated.
#[derive(Parser, Debug)]
#[command(name = "keysmith")]
#[command(about = "Generate and persist security credentials for a cluster deployment")]
#[command(version)]
pub struct Cli {
    /// Broad security switch (true/false/1/0/t/f).
    ///
    /// Explicitly passing true enables every feature unconditionally;
    /// explicitly passing false disables every feature. When absent, each
    /// narrower switch decides for itself (defaulting to enabled).
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub security: Option<Switch>,

    /// Enable or disable the discovery service entirely
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub discovery: Option<Switch>,
    /// Enable or disable the application framework manager entirely
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub app_framework: Option<Switch>,
    /// Enable or disable the job framework manager entirely
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub job_framework: Option<Switch>,
    /// Enable or disable the API gateway entirely
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub gateway: Option<Switch>,
    /// Enable or disable the scheduler entirely
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub scheduler: Option<Switch>,
    /// Enable or disable the coordination service entirely
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub coordination: Option<Switch>,
    /// Enable or disable the web console entirely
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub console: Option<Switch>,
    /// Collect private registry credentials (interactive; must be explicitly true)
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub registry: Option<Switch>,

    /// Discovery agent ACL authentication
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub discovery_auth: Option<Switch>,
    /// Discovery agent TLS
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub discovery_ssl: Option<Switch>,
    /// Scheduler operator authentication
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub scheduler_auth: Option<Switch>,
    /// Scheduler TLS
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub scheduler_ssl: Option<Switch>,
    /// Framework authentication against the scheduler
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub scheduler_framework_auth: Option<Switch>,
    /// Application framework authentication
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub app_framework_auth: Option<Switch>,
    /// Application framework TLS
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub app_framework_ssl: Option<Switch>,
    /// Job framework authentication
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub job_framework_auth: Option<Switch>,
    /// Job framework TLS
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub job_framework_ssl: Option<Switch>,
    /// API gateway authentication
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub gateway_auth: Option<Switch>,
    /// Coordination service ACL authentication
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub coordination_auth: Option<Switch>,
    /// Web console authentication
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub console_auth: Option<Switch>,
    /// Web console TLS
    #[arg(long, value_name = "SWITCH", value_parser = switch_token)]
    pub console_ssl: Option<Switch>,

    /// Certificate subject: country code
    #[arg(long, value_name = "C", default_value = "US")]
    pub cert_country: String,
    /// Certificate subject: state or province
    #[arg(long, value_name = "ST", default_value = "Oregon")]
    pub cert_state: String,
    /// Certificate subject: locality
    #[arg(long, value_name = "L", default_value = "Portland")]
    pub cert_locality: String,
    /// Certificate subject: organization
    #[arg(long, value_name = "O", default_value = "Keysmith")]
    pub cert_organization: String,
    /// Certificate subject: organizational unit
    #[arg(long, value_name = "OU", default_value = "Operations")]
    pub cert_unit: String,
    /// Certificate subject: contact email
    #[arg(long, value_name = "EMAIL", default_value = "security@keysmith.dev")]
    pub cert_email: String,

    /// Common name of the discovery service certificate
    #[arg(long, value_name = "CN", default_value = "discovery")]
    pub discovery_cn: String,
    /// Common name of the scheduler certificate
    #[arg(long, value_name = "CN", default_value = "scheduler")]
    pub scheduler_cn: String,
    /// Common name of the web console certificate
    #[arg(long, value_name = "CN", default_value = "console")]
    pub console_cn: String,
    /// Common name of the API gateway certificate
    #[arg(long, value_name = "CN", default_value = "gateway")]
    pub gateway_cn: String,
    /// Common name of the application framework certificate
    #[arg(long, value_name = "CN", default_value = "app-framework")]
    pub app_framework_cn: String,
    /// Common name of the job framework certificate
    #[arg(long, value_name = "CN", default_value = "job-framework")]
    pub job_framework_cn: String,

    /// Prompt for a new console admin password even if one is stored
    #[arg(long)]
    pub change_admin_password: bool,

    /// Skip certificate verification after issuance
    #[arg(long)]
    pub skip_verify: bool,

    /// Path of the security-state file consumed by the deployment tooling
    #[arg(long, value_name = "PATH", default_value = "security.yml")]
    pub state_file: PathBuf,

    /// Root directory of the certificate authority
    #[arg(long, value_name = "PATH", default_value = "ca")]
    pub ca_dir: PathBuf,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Collapse the parsed surface into the immutable option model.
    pub fn into_options(self) -> ResolvedOptions {
        ResolvedOptions {
            security: self.security.unwrap_or_default(),
            discovery: self.discovery.unwrap_or_default(),
            app_framework: self.app_framework.unwrap_or_default(),
            job_framework: self.job_framework.unwrap_or_default(),
            gateway: self.gateway.unwrap_or_default(),
            scheduler: self.scheduler.unwrap_or_default(),
            coordination: self.coordination.unwrap_or_default(),
            console: self.console.unwrap_or_default(),
            registry: self.registry.unwrap_or_default(),
            discovery_auth: self.discovery_auth.unwrap_or_default(),
            discovery_ssl: self.discovery_ssl.unwrap_or_default(),
            scheduler_auth: self.scheduler_auth.unwrap_or_default(),
            scheduler_ssl: self.scheduler_ssl.unwrap_or_default(),
            scheduler_framework_auth: self.scheduler_framework_auth.unwrap_or_default(),
            app_framework_auth: self.app_framework_auth.unwrap_or_default(),
            app_framework_ssl: self.app_framework_ssl.unwrap_or_default(),
            job_framework_auth: self.job_framework_auth.unwrap_or_default(),
            job_framework_ssl: self.job_framework_ssl.unwrap_or_default(),
            gateway_auth: self.gateway_auth.unwrap_or_default(),
            coordination_auth: self.coordination_auth.unwrap_or_default(),
            console_auth: self.console_auth.unwrap_or_default(),
            console_ssl: self.console_ssl.unwrap_or_default(),
            subject: CertSubject {
                country: self.cert_country,
                state: self.cert_state,
                locality: self.cert_locality,
                organization: self.cert_organization,
                unit: self.cert_unit,
                email: self.cert_email,
            },
            discovery_cn: self.discovery_cn,
            scheduler_cn: self.scheduler_cn,
            console_cn: self.console_cn,
            gateway_cn: self.gateway_cn,
            app_framework_cn: self.app_framework_cn,
            job_framework_cn: self.job_framework_cn,
            change_admin_password: self.change_admin_password,
            skip_verify: self.skip_verify,
            state_file: self.state_file,
            ca_dir: self.ca_dir,
        }
    }

    /// Options as resolved from an empty command line (everything implicit).
    pub fn default_options() -> ResolvedOptions {
        <Self as clap::Parser>::try_parse_from(["keysmith"])
            .expect("empty command line must parse")
            .into_options()
    }
}
