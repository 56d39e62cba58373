use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use inquire::Password;
use log::info;
use std::sync::Mutex;

/// Governs the active API credential. Implementations decide whether a
/// usable key is selected and whether the user can be asked for another one.
#[async_trait]
pub trait CredentialGate: Send + Sync {
    /// Whether a usable credential is currently selected.
    fn is_ready(&self) -> bool;

    /// Whether an interactive reselection flow exists.
    fn can_reselect(&self) -> bool {
        false
    }

    /// Runs the interactive selection flow, if any.
    async fn request_selection(&self) -> Result<()> {
        Ok(())
    }

    /// The credential the next client should be bound to.
    fn credential(&self) -> String;
}

/// Non-interactive gate over a key supplied by config or environment.
pub struct EnvGate {
    api_key: String,
}

impl EnvGate {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl CredentialGate for EnvGate {
    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn credential(&self) -> String {
        self.api_key.clone()
    }
}

/// Interactive gate: the key can be (re)entered at the terminal, and every
/// client built after a selection sees the new value.
pub struct PromptGate {
    api_key: Mutex<Option<String>>,
}

impl PromptGate {
    pub fn new(initial: Option<String>) -> Self {
        let initial = initial.filter(|k| !k.trim().is_empty());
        Self {
            api_key: Mutex::new(initial),
        }
    }
}

#[async_trait]
impl CredentialGate for PromptGate {
    fn is_ready(&self) -> bool {
        self.api_key.lock().unwrap().is_some()
    }

    fn can_reselect(&self) -> bool {
        true
    }

    async fn request_selection(&self) -> Result<()> {
        let entered = Password::new("Gemini API key:")
            .without_confirmation()
            .prompt()
            .context("API key selection cancelled")?;

        let entered = entered.trim().to_string();
        if entered.is_empty() {
            bail!("No API key entered");
        }

        *self.api_key.lock().unwrap() = Some(entered);
        info!("API key updated");
        Ok(())
    }

    fn credential(&self) -> String {
        self.api_key.lock().unwrap().clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_gate_readiness() {
        assert!(EnvGate::new("key".to_string()).is_ready());
        assert!(!EnvGate::new(String::new()).is_ready());
        assert!(!EnvGate::new(String::new()).can_reselect());
    }

    #[test]
    fn test_prompt_gate_filters_blank_initial_key() {
        assert!(!PromptGate::new(None).is_ready());
        assert!(!PromptGate::new(Some("   ".to_string())).is_ready());
        assert!(PromptGate::new(Some("key".to_string())).is_ready());
    }

    #[test]
    fn test_prompt_gate_credential_defaults_empty() {
        let gate = PromptGate::new(None);
        assert_eq!(gate.credential(), "");

        let gate = PromptGate::new(Some("abc".to_string()));
        assert_eq!(gate.credential(), "abc");
        assert!(gate.can_reselect());
    }
}
