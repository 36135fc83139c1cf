//! Terminal interaction for the setup run
//!
//! Interactive password collection with confirmation, the registry login
//! loop, and the process-lifetime password cache. Unattended runs (no
//! terminal on stdin) silently substitute generated passwords so automation
//! never blocks on a prompt.

use inquire::{Confirm, Password, PasswordDisplayMode, Text};
use log::info;
use std::collections::HashMap;
use std::io::IsTerminal;

use crate::error::{Result, SetupError};
use crate::secrets::{DEFAULT_PASSWORD_LEN, random_password};
use crate::state::RegistryLogin;

/// Registry URL used when the operator leaves the field blank.
pub const DEFAULT_REGISTRY_URL: &str = "https://index.docker.io/v1/";

/// Process-lifetime map from a logical purpose (e.g. `admin`) to the
/// password obtained for it, so services sharing a purpose reuse one answer
/// instead of re-prompting. Never persisted.
#[derive(Debug, Default)]
pub struct PasswordCache {
    answers: HashMap<String, String>,
}

impl PasswordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, purpose: &str) -> Option<&str> {
        self.answers.get(purpose).map(String::as_str)
    }

    pub fn insert(&mut self, purpose: &str, password: String) {
        self.answers.insert(purpose.to_string(), password);
    }
}

/// Whether stdin is attached to a terminal that can be prompted on.
pub fn attended() -> bool {
    std::io::stdin().is_terminal()
}

/// Obtain a password for `purpose`, preferring the cache.
///
/// On a terminal, prompts twice and re-prompts indefinitely until the
/// confirmation matches. Unattended, falls back to a generated random
/// password. Either way the answer is cached under `purpose` when given.
pub fn interactive_password(
    cache: &mut PasswordCache,
    prompt: &str,
    purpose: Option<&str>,
) -> Result<String> {
    interactive_password_with(cache, prompt, purpose, attended())
}

/// Testable body of [`interactive_password`]; `attended` is injected so the
/// unattended path can be exercised regardless of the test harness's stdin.
pub fn interactive_password_with(
    cache: &mut PasswordCache,
    prompt: &str,
    purpose: Option<&str>,
    attended: bool,
) -> Result<String> {
    if let Some(purpose) = purpose
        && let Some(cached) = cache.get(purpose)
    {
        return Ok(cached.to_string());
    }

    let password = if attended {
        Password::new(prompt)
            .with_display_mode(PasswordDisplayMode::Masked)
            .with_custom_confirmation_message("Confirm password:")
            .with_custom_confirmation_error_message("The passwords do not match.")
            .prompt()
            .map_err(|e| SetupError::prompt(format!("password prompt failed: {e}")))?
    } else {
        info!("no terminal available, generating a random password for {prompt:?}");
        random_password(DEFAULT_PASSWORD_LEN)
    };

    if let Some(purpose) = purpose {
        cache.insert(purpose, password.clone());
    }
    Ok(password)
}

/// Interactive loop collecting one or more private registry logins.
///
/// Each pass asks for username, password, email, and registry URL (blank
/// defaults to the public index), then a yes/no prompt decides whether to
/// add another.
pub fn collect_registry_logins() -> Result<Vec<RegistryLogin>> {
    if !attended() {
        return Err(SetupError::prompt(
            "registry credential collection needs an interactive terminal",
        ));
    }

    let mut logins = Vec::new();
    loop {
        let username = Text::new("Registry username:")
            .prompt()
            .map_err(|e| SetupError::prompt(format!("registry prompt failed: {e}")))?;
        let password = Password::new("Registry password:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .map_err(|e| SetupError::prompt(format!("registry prompt failed: {e}")))?;
        let email = Text::new("Registry email:")
            .prompt()
            .map_err(|e| SetupError::prompt(format!("registry prompt failed: {e}")))?;
        let registry = Text::new("Registry URL:")
            .with_default(DEFAULT_REGISTRY_URL)
            .prompt()
            .map_err(|e| SetupError::prompt(format!("registry prompt failed: {e}")))?;

        logins.push(RegistryLogin {
            username,
            password,
            email,
            registry: if registry.trim().is_empty() {
                DEFAULT_REGISTRY_URL.to_string()
            } else {
                registry
            },
        });

        let another = Confirm::new("Add another registry login?")
            .with_default(false)
            .prompt()
            .map_err(|e| SetupError::prompt(format!("registry prompt failed: {e}")))?;
        if !another {
            break;
        }
    }
    Ok(logins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_round_trip() {
        let mut cache = PasswordCache::new();
        assert!(cache.get("admin").is_none());
        cache.insert("admin", "hunter2".to_string());
        assert_eq!(cache.get("admin"), Some("hunter2"));
    }

    #[test]
    fn test_unattended_generates_and_caches() {
        let mut cache = PasswordCache::new();
        let first =
            interactive_password_with(&mut cache, "Admin password:", Some("admin"), false)
                .unwrap();
        assert_eq!(first.len(), DEFAULT_PASSWORD_LEN);
        assert!(!first.is_empty());

        // Second request for the same purpose returns the identical answer.
        let second =
            interactive_password_with(&mut cache, "Admin password:", Some("admin"), false)
                .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unattended_without_purpose_is_not_cached() {
        let mut cache = PasswordCache::new();
        let first = interactive_password_with(&mut cache, "One-off:", None, false).unwrap();
        let second = interactive_password_with(&mut cache, "One-off:", None, false).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_distinct_purposes_get_distinct_answers() {
        let mut cache = PasswordCache::new();
        let admin =
            interactive_password_with(&mut cache, "Admin:", Some("admin"), false).unwrap();
        let other =
            interactive_password_with(&mut cache, "Other:", Some("other"), false).unwrap();
        assert_ne!(admin, other);
    }
}
