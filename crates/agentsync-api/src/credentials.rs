//! Operator credential resolution (§6.4).
//!
//! `Authentication resolution` is an external collaborator per spec — only
//! the provider interface and the resolution order are fixed here, not a
//! production-grade secrets vault or settings-file format.

use std::env;
use std::fs;
use std::io::Read as _;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::CredentialError;

/// A single step in the credential resolution chain.
///
/// Each provider either resolves a token, declines (`Ok(None)` — try the
/// next provider), or fails hard (`Err` — a source existed but could not be
/// read, which aborts the chain rather than silently falling through).
pub trait CredentialProvider {
    /// A short name used in diagnostics (`"explicit-config"`, `"env:FOO"`, …).
    fn name(&self) -> String;

    /// Attempt to resolve a credential. `Ok(None)` means "not applicable
    /// here, try the next provider"; `Err` means a source was found but
    /// could not be used and resolution should stop.
    fn resolve(&self) -> Result<Option<String>, CredentialError>;
}

/// A credential supplied directly (e.g. via CLI flag or loaded config
/// struct) — always wins when present.
pub struct ExplicitConfigProvider(pub Option<String>);

impl CredentialProvider for ExplicitConfigProvider {
    fn name(&self) -> String {
        "explicit-config".to_owned()
    }

    fn resolve(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.0.clone())
    }
}

/// Reads a credential from a named environment variable.
pub struct EnvVarProvider {
    /// The variable name to read.
    pub var_name: String,
}

impl EnvVarProvider {
    /// Create a provider reading the given environment variable.
    #[must_use]
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

impl CredentialProvider for EnvVarProvider {
    fn name(&self) -> String {
        format!("env:{}", self.var_name)
    }

    fn resolve(&self) -> Result<Option<String>, CredentialError> {
        Ok(Self::usable(env::var(&self.var_name).ok()))
    }
}

impl EnvVarProvider {
    /// A present-but-empty value is treated the same as absent.
    fn usable(value: Option<String>) -> Option<String> {
        value.filter(|v| !v.is_empty())
    }
}

/// Reads a credential from a simple encrypted-secrets vault file.
///
/// The vault format is a JSON object `{"<key>": "<token>"}`; "decryption"
/// here is the placeholder the interface boundary requires (§6.4 only fixes
/// the provider chain, not a real crypto scheme). A present-but-unparseable
/// file is a hard failure, not a fall-through.
pub struct VaultProvider {
    /// Path to the vault file.
    pub path: PathBuf,
    /// Key within the vault to read.
    pub key: String,
}

impl CredentialProvider for VaultProvider {
    fn name(&self) -> String {
        format!("vault:{}", self.path.display())
    }

    fn resolve(&self) -> Result<Option<String>, CredentialError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| CredentialError::SourceUnreadable {
            source_path: self.path.display().to_string(),
            detail: e.to_string(),
        })?;
        let parsed: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| CredentialError::SourceUnreadable {
                source_path: self.path.display().to_string(),
                detail: e.to_string(),
            })?;
        Ok(parsed
            .get(&self.key)
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned))
    }
}

/// Reads a credential from a user settings file (`~/.config/<app>/settings.json`
/// style, resolved relative to `XDG_CONFIG_HOME` by the caller).
pub struct SettingsFileProvider {
    /// Path to the settings file.
    pub path: PathBuf,
    /// Key within the settings file to read.
    pub key: String,
}

impl CredentialProvider for SettingsFileProvider {
    fn name(&self) -> String {
        format!("settings-file:{}", self.path.display())
    }

    fn resolve(&self) -> Result<Option<String>, CredentialError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| CredentialError::SourceUnreadable {
            source_path: self.path.display().to_string(),
            detail: e.to_string(),
        })?;
        let parsed: serde_json::Value =
            serde_json::from_str(&contents).map_err(|e| CredentialError::SourceUnreadable {
                source_path: self.path.display().to_string(),
                detail: e.to_string(),
            })?;
        Ok(parsed
            .get(&self.key)
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned))
    }
}

/// Invokes a credential-helper subprocess and reads its stdout as the token.
///
/// Runs without a shell, with a 30s timeout; a nonzero exit or a timeout is
/// a fall-through (`Ok(None)`), not a hard failure — the chain continues to
/// the next provider.
pub struct HelperProvider {
    /// Path to the helper binary.
    pub helper: PathBuf,
    /// Arguments to pass to the helper.
    pub args: Vec<String>,
    /// Timeout before the helper is killed and treated as a fall-through.
    pub timeout: Duration,
}

impl HelperProvider {
    /// Default 30s timeout per §6.4.
    #[must_use]
    pub fn new(helper: PathBuf, args: Vec<String>) -> Self {
        Self {
            helper,
            args,
            timeout: Duration::from_secs(30),
        }
    }
}

impl CredentialProvider for HelperProvider {
    fn name(&self) -> String {
        format!("helper:{}", self.helper.display())
    }

    fn resolve(&self) -> Result<Option<String>, CredentialError> {
        let mut child = Command::new(&self.helper)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CredentialError::HelperFailed {
                helper: self.helper.display().to_string(),
                detail: format!("failed to spawn: {e}"),
            })?;

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    if !status.success() {
                        return Ok(None);
                    }
                    let mut stdout = String::new();
                    if let Some(mut out) = child.stdout.take() {
                        let _ = out.read_to_string(&mut stdout);
                    }
                    let token = stdout.trim();
                    return Ok(if token.is_empty() {
                        None
                    } else {
                        Some(token.to_owned())
                    });
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Ok(None);
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(e) => {
                    return Err(CredentialError::HelperFailed {
                        helper: self.helper.display().to_string(),
                        detail: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Ordered chain of [`CredentialProvider`]s, resolved first-match-wins.
///
/// Construct with [`CredentialChain::standard`] for the default §6.4
/// resolution order, or assemble a custom chain for testing.
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    /// Build an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Append a provider to the end of the chain.
    #[must_use]
    pub fn with(mut self, provider: Box<dyn CredentialProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// The standard §6.4 chain: explicit config, self-hosted password env
    /// var (only when `self_hosted` is true), vault, general env var,
    /// settings file.
    ///
    /// An open question preserved from the source system (spec.md §9): an
    /// env flag resembling `SMARTY_PREFER_ENV_KEY` can invert steps 3 and 4
    /// (vault vs. general env var). This is surfaced as `prefer_env_key`
    /// rather than folded away, matching the spec's instruction to preserve
    /// the ambiguity instead of resolving it.
    #[must_use]
    #[allow(clippy::fn_params_excessive_bools)]
    pub fn standard(
        explicit: Option<String>,
        self_hosted: bool,
        server_password_var: &str,
        vault_path: Option<PathBuf>,
        vault_key: &str,
        general_env_var: &str,
        settings_path: Option<PathBuf>,
        settings_key: &str,
        prefer_env_key: bool,
    ) -> Self {
        let vault: Option<Box<dyn CredentialProvider>> = vault_path.map(|path| {
            Box::new(VaultProvider {
                path,
                key: vault_key.to_owned(),
            }) as Box<dyn CredentialProvider>
        });
        let env_general: Box<dyn CredentialProvider> =
            Box::new(EnvVarProvider::new(general_env_var));

        let mut chain = Self::new().with(Box::new(ExplicitConfigProvider(explicit)));

        if self_hosted {
            chain = chain.with(Box::new(EnvVarProvider::new(server_password_var)));
        }

        chain = if prefer_env_key {
            let chain = chain.with(env_general);
            if let Some(vault) = vault {
                chain.with(vault)
            } else {
                chain
            }
        } else {
            let chain = if let Some(vault) = vault {
                chain.with(vault)
            } else {
                chain
            };
            chain.with(env_general)
        };

        if let Some(path) = settings_path {
            chain = chain.with(Box::new(SettingsFileProvider {
                path,
                key: settings_key.to_owned(),
            }));
        }

        chain
    }

    /// Resolve a credential by trying each provider in order.
    ///
    /// # Errors
    /// Returns [`CredentialError::SourceUnreadable`]/[`CredentialError::HelperFailed`]
    /// if a provider that could apply failed hard, or
    /// [`CredentialError::NoneResolved`] if every provider declined.
    pub fn resolve(&self) -> Result<String, CredentialError> {
        let mut tried = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            tried.push(provider.name());
            if let Some(token) = provider.resolve()? {
                return Ok(token);
            }
        }
        Err(CredentialError::NoneResolved { tried })
    }
}

impl Default for CredentialChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_wins_over_everything() {
        let chain = CredentialChain::new()
            .with(Box::new(ExplicitConfigProvider(Some("explicit-token".into()))))
            .with(Box::new(EnvVarProvider::new(
                "AGENTSYNC_TEST_VAR_UNUSED_1",
            )));
        assert_eq!(chain.resolve().unwrap(), "explicit-token");
    }

    #[test]
    fn falls_through_to_next_provider() {
        let chain = CredentialChain::new()
            .with(Box::new(ExplicitConfigProvider(None)))
            .with(Box::new(ExplicitConfigProvider(Some("second".into()))));
        assert_eq!(chain.resolve().unwrap(), "second");
    }

    #[test]
    fn none_resolved_lists_tried_providers() {
        let chain = CredentialChain::new()
            .with(Box::new(ExplicitConfigProvider(None)))
            .with(Box::new(ExplicitConfigProvider(None)));
        let err = chain.resolve().unwrap_err();
        match err {
            CredentialError::NoneResolved { tried } => assert_eq!(tried.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn env_var_provider_ignores_empty_value() {
        assert_eq!(EnvVarProvider::usable(Some(String::new())), None);
        assert_eq!(EnvVarProvider::usable(Some("token".to_owned())), Some("token".to_owned()));
        assert_eq!(EnvVarProvider::usable(None), None);
    }

    #[test]
    fn vault_provider_missing_file_is_none() {
        let provider = VaultProvider {
            path: PathBuf::from("/nonexistent/vault.json"),
            key: "token".to_owned(),
        };
        assert_eq!(provider.resolve().unwrap(), None);
    }

    #[test]
    fn vault_provider_reads_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        fs::write(&path, r#"{"token": "vault-secret"}"#).unwrap();
        let provider = VaultProvider {
            path,
            key: "token".to_owned(),
        };
        assert_eq!(provider.resolve().unwrap(), Some("vault-secret".to_owned()));
    }

    #[test]
    fn vault_provider_unparseable_file_is_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        fs::write(&path, "not json").unwrap();
        let provider = VaultProvider {
            path,
            key: "token".to_owned(),
        };
        assert!(matches!(
            provider.resolve(),
            Err(CredentialError::SourceUnreadable { .. })
        ));
    }

    #[test]
    fn standard_chain_prefers_self_hosted_password_when_applicable() {
        let chain = CredentialChain::standard(
            None,
            true,
            "AGENTSYNC_TEST_SERVER_PW",
            None,
            "token",
            "AGENTSYNC_TEST_GENERAL_UNUSED",
            None,
            "token",
            false,
        );
        let names: Vec<String> = chain.providers.iter().map(|p| p.name()).collect();
        let server_pw_pos = names.iter().position(|n| n == "env:AGENTSYNC_TEST_SERVER_PW").unwrap();
        let general_pos = names.iter().position(|n| n == "env:AGENTSYNC_TEST_GENERAL_UNUSED").unwrap();
        assert!(server_pw_pos < general_pos);
    }

    #[test]
    fn helper_provider_reads_stdout_on_success() {
        let provider = HelperProvider::new(
            PathBuf::from("/bin/echo"),
            vec!["helper-token".to_owned()],
        );
        assert_eq!(provider.resolve().unwrap(), Some("helper-token".to_owned()));
    }

    #[test]
    fn helper_provider_falls_through_on_nonzero_exit() {
        let provider = HelperProvider::new(PathBuf::from("/bin/false"), vec![]);
        assert_eq!(provider.resolve().unwrap(), None);
    }
}
