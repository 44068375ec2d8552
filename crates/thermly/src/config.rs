//! CLI configuration: thin wrapper around `thermly_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--url,
//! --username, --password, ...) and prompts for a missing password.

use std::io::IsTerminal;

use secrecy::SecretString;

use thermly_config::ConfigError;
use thermly_core::{ApiVersion, ControllerConfig, Credentials};

use crate::cli::{ApiVersionArg, GlobalOpts};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use thermly_config::{
    Config, Profile, config_path, load_config, save_config, store_password,
};

impl From<ApiVersionArg> for ApiVersion {
    fn from(arg: ApiVersionArg) -> Self {
        match arg {
            ApiVersionArg::Legacy => ApiVersion::Legacy,
            ApiVersionArg::New => ApiVersion::New,
        }
    }
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config
        .active_profile_name(global.profile.as_deref())
        .to_owned()
}

/// Build a `ControllerConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile, flags and env vars alone must name at least
/// a username.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None if global.username.is_none() => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        None => Profile::default(),
    };

    apply_overrides(&mut profile, global);

    let username = thermly_config::resolve_username(&profile, &profile_name)?;
    let password = resolve_password(&profile, &profile_name, global)?;

    Ok(thermly_config::controller_config_with_credentials(
        &profile,
        &cfg.defaults,
        Credentials { username, password },
    )?)
}

/// Flag values win over profile values.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(version) = global.api_version {
        profile.api_version = version.into();
    }
    if let Some(ref url) = global.url {
        profile.url = Some(url.clone());
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if let Some(jobs) = global.jobs {
        profile.max_concurrent_fetches = Some(jobs);
    }
}

/// `--password` flag, then the shared credential chain, then a prompt when
/// attached to a terminal.
fn resolve_password(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<SecretString, CliError> {
    if let Some(ref password) = global.password {
        return Ok(SecretString::from(password.clone()));
    }

    match thermly_config::resolve_password(profile, profile_name) {
        Ok(password) => Ok(password),
        Err(ConfigError::NoCredentials { .. }) if std::io::stdin().is_terminal() => {
            let password = rpassword::prompt_password("Password: ")?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            Ok(SecretString::from(password))
        }
        Err(err) => Err(err.into()),
    }
}

pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}
