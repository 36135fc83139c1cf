//! Resolved option model for the setup run
//!
//! This module replaces stringly-typed enable/disable flags with an explicit
//! tagged tri-state, so "the operator never mentioned this switch" is
//! distinguishable from "the operator passed true".

use crate::error::{Result, SetupError};
use std::path::PathBuf;

/// Tri-state enable switch.
///
/// `Unset` is the implicit default: it resolves to enabled unless the broad
/// switch overrides it. Explicit values record what the operator actually
/// typed and take part in the override law (see
/// [`ResolvedOptions::feature_enabled`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Switch {
    /// Never mentioned on the command line; defaults to enabled.
    #[default]
    Unset,
    /// Operator explicitly passed a true token.
    ExplicitTrue,
    /// Operator explicitly passed a false token.
    ExplicitFalse,
}

impl Switch {
    /// Parse an explicit switch token.
    ///
    /// Accepted tokens are `true`, `false`, `1`, `0`, `t`, `f` in any case.
    /// Anything else (including the empty string) is a fatal input error.
    pub fn parse_token(token: &str) -> Result<Self> {
        match token.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(Self::ExplicitTrue),
            "false" | "f" | "0" => Ok(Self::ExplicitFalse),
            _ => Err(SetupError::flag(format!(
                "unrecognized switch token '{token}' (expected true/false/1/0/t/f)"
            ))),
        }
    }

    /// The boolean this switch resolves to in isolation.
    #[inline]
    pub fn value(self) -> bool {
        !matches!(self, Self::ExplicitFalse)
    }

    /// True when the operator passed this switch explicitly.
    #[inline]
    pub fn is_explicit(self) -> bool {
        !matches!(self, Self::Unset)
    }
}

/// Certificate subject template shared by the authority and every leaf.
#[derive(Debug, Clone)]
pub struct CertSubject {
    pub country: String,
    pub state: String,
    pub locality: String,
    pub organization: String,
    pub unit: String,
    pub email: String,
}

impl CertSubject {
    /// Render as an openssl `-subj` argument with the given common name.
    pub fn subj_arg(&self, common_name: &str) -> String {
        format!(
            "/C={}/ST={}/L={}/O={}/OU={}/CN={}/emailAddress={}",
            self.country,
            self.state,
            self.locality,
            self.organization,
            self.unit,
            common_name,
            self.email
        )
    }
}

/// Immutable result of resolving the command-line surface.
///
/// One broad switch, one switch per service, one per sub-feature, the
/// certificate-subject fields, and per-endpoint common-name overrides.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    /// Broad security switch; absent on the command line means implicit true.
    pub security: Switch,

    // Per-service switches
    pub discovery: Switch,
    pub app_framework: Switch,
    pub job_framework: Switch,
    pub gateway: Switch,
    pub scheduler: Switch,
    pub coordination: Switch,
    pub console: Switch,
    pub registry: Switch,

    // Per-feature switches
    pub discovery_auth: Switch,
    pub discovery_ssl: Switch,
    pub scheduler_auth: Switch,
    pub scheduler_ssl: Switch,
    pub scheduler_framework_auth: Switch,
    pub app_framework_auth: Switch,
    pub app_framework_ssl: Switch,
    pub job_framework_auth: Switch,
    pub job_framework_ssl: Switch,
    pub gateway_auth: Switch,
    pub coordination_auth: Switch,
    pub console_auth: Switch,
    pub console_ssl: Switch,

    /// Certificate subject template.
    pub subject: CertSubject,

    // Common-name overrides, one per certificate-bearing endpoint
    pub discovery_cn: String,
    pub scheduler_cn: String,
    pub console_cn: String,
    pub gateway_cn: String,
    pub app_framework_cn: String,
    pub job_framework_cn: String,

    /// Force re-entry of the console admin password.
    pub change_admin_password: bool,
    /// Skip certificate verification after issuance.
    pub skip_verify: bool,

    /// Path of the persisted security-state file.
    pub state_file: PathBuf,
    /// Root directory of the certificate authority.
    pub ca_dir: PathBuf,
}

impl ResolvedOptions {
    /// Resolve one feature switch under the broad override law.
    ///
    /// An explicit broad `true` enables everything unconditionally; otherwise
    /// the broad value and the feature value are ANDed, with `Unset` valuing
    /// true on both sides. A single `--security false` therefore silently
    /// disables every narrower switch without the caller enumerating them.
    pub fn feature_enabled(&self, feature: Switch) -> bool {
        match self.security {
            Switch::ExplicitTrue => true,
            _ => self.security.value() && feature.value(),
        }
    }

    /// Whether a toggle routine may overwrite an already-persisted value.
    ///
    /// Only an explicit operator choice (broad or narrow) takes that path;
    /// implicit defaults never clobber existing state.
    pub fn feature_explicit(&self, feature: Switch) -> bool {
        self.security.is_explicit() || feature.is_explicit()
    }

    /// Resolve a sub-feature under both its service switch and the broad
    /// override law: broad `ExplicitTrue` wins outright, otherwise all
    /// three switches are ANDed.
    pub fn scoped_enabled(&self, service: Switch, feature: Switch) -> bool {
        match self.security {
            Switch::ExplicitTrue => true,
            _ => self.security.value() && service.value() && feature.value(),
        }
    }

    /// Whether any switch in the scope was passed explicitly this run.
    pub fn scoped_explicit(&self, service: Switch, feature: Switch) -> bool {
        self.security.is_explicit() || service.is_explicit() || feature.is_explicit()
    }

    /// Whether the interactive registry-credential loop should run.
    ///
    /// The registry routine prompts the operator, so it requires its own
    /// switch to be explicitly true; the broad switch can still veto it.
    pub fn registry_enabled(&self) -> bool {
        self.security != Switch::ExplicitFalse && self.registry == Switch::ExplicitTrue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_with(security: Switch, feature: Switch) -> (ResolvedOptions, Switch) {
        let mut opts = crate::cli::Cli::default_options();
        opts.security = security;
        (opts, feature)
    }

    // =========================================================================
    // Switch parse law
    // =========================================================================

    #[test]
    fn test_parse_true_tokens() {
        for token in ["true", "TRUE", "True", "t", "T", "1"] {
            assert_eq!(
                Switch::parse_token(token).unwrap(),
                Switch::ExplicitTrue,
                "token {token:?} should parse as explicit true"
            );
        }
    }

    #[test]
    fn test_parse_false_tokens() {
        for token in ["false", "FALSE", "False", "f", "F", "0"] {
            assert_eq!(
                Switch::parse_token(token).unwrap(),
                Switch::ExplicitFalse,
                "token {token:?} should parse as explicit false"
            );
        }
    }

    #[test]
    fn test_parse_rejects_other_tokens() {
        for token in ["", "yes", "no", "on", "off", "2", "tr ue", "truee"] {
            assert!(
                Switch::parse_token(token).is_err(),
                "token {token:?} should be a parse error"
            );
        }
    }

    #[test]
    fn test_unset_resolves_true() {
        assert!(Switch::Unset.value());
        assert!(!Switch::Unset.is_explicit());
    }

    // =========================================================================
    // Broad override law
    // =========================================================================

    #[test]
    fn test_broad_explicit_false_disables_everything() {
        for feature in [Switch::Unset, Switch::ExplicitTrue, Switch::ExplicitFalse] {
            let (opts, feature) = options_with(Switch::ExplicitFalse, feature);
            assert!(!opts.feature_enabled(feature));
        }
    }

    #[test]
    fn test_broad_explicit_true_enables_everything() {
        for feature in [Switch::Unset, Switch::ExplicitTrue, Switch::ExplicitFalse] {
            let (opts, feature) = options_with(Switch::ExplicitTrue, feature);
            assert!(opts.feature_enabled(feature));
        }
    }

    #[test]
    fn test_implicit_broad_defers_to_feature() {
        let (opts, _) = options_with(Switch::Unset, Switch::Unset);
        assert!(opts.feature_enabled(Switch::Unset));
        assert!(opts.feature_enabled(Switch::ExplicitTrue));
        assert!(!opts.feature_enabled(Switch::ExplicitFalse));
    }

    #[test]
    fn test_explicit_path_requires_operator_input() {
        let (opts, _) = options_with(Switch::Unset, Switch::Unset);
        assert!(!opts.feature_explicit(Switch::Unset));
        assert!(opts.feature_explicit(Switch::ExplicitFalse));

        let (opts, _) = options_with(Switch::ExplicitTrue, Switch::Unset);
        assert!(opts.feature_explicit(Switch::Unset));
    }

    #[test]
    fn test_scoped_resolution_ands_all_three() {
        let (opts, _) = options_with(Switch::Unset, Switch::Unset);
        assert!(opts.scoped_enabled(Switch::Unset, Switch::Unset));
        assert!(!opts.scoped_enabled(Switch::ExplicitFalse, Switch::Unset));
        assert!(!opts.scoped_enabled(Switch::Unset, Switch::ExplicitFalse));

        let (opts, _) = options_with(Switch::ExplicitTrue, Switch::Unset);
        assert!(opts.scoped_enabled(Switch::ExplicitFalse, Switch::ExplicitFalse));

        let (opts, _) = options_with(Switch::ExplicitFalse, Switch::Unset);
        assert!(!opts.scoped_enabled(Switch::ExplicitTrue, Switch::ExplicitTrue));
    }

    #[test]
    fn test_registry_requires_explicit_opt_in() {
        let mut opts = crate::cli::Cli::default_options();
        assert!(!opts.registry_enabled());

        opts.registry = Switch::ExplicitTrue;
        assert!(opts.registry_enabled());

        opts.security = Switch::ExplicitFalse;
        assert!(!opts.registry_enabled());
    }

    #[test]
    fn test_subject_rendering() {
        let subject = CertSubject {
            country: "US".to_string(),
            state: "California".to_string(),
            locality: "San Jose".to_string(),
            organization: "Example".to_string(),
            unit: "Platform".to_string(),
            email: "ops@example.com".to_string(),
        };
        assert_eq!(
            subject.subj_arg("discovery"),
            "/C=US/ST=California/L=San Jose/O=Example/OU=Platform/CN=discovery/emailAddress=ops@example.com"
        );
    }
}
