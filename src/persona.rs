//! # Bot persona
//!
//! [`BotConfig`] is the operator-editable identity of the assistant: its display
//! name, tone, welcome line, the free-text knowledge it should draw on, and
//! whether it answers customers on its own.
//!
//! No field is validated. Empty strings are legal everywhere and are passed to
//! the system instruction as-is.
//!
//! ```rust
//! use applemar_bot::persona::BotConfig;
//!
//! let bot = BotConfig::default();
//! assert_eq!(bot.name, "Applemar AI");
//! assert!(bot.auto_reply_enabled);
//! ```

use serde::{Deserialize, Serialize};

/// Operator-supplied persona and behaviour switches for the reply bot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BotConfig {
    /// Display name the assistant introduces itself with.
    pub name: String,

    /// Free-text personality descriptor.
    pub personality: String,

    /// Greeting shown to new customers. Not used when generating replies.
    pub welcome_message: String,

    /// Whether customer messages are answered automatically.
    pub auto_reply_enabled: bool,

    /// Business knowledge injected into the system instruction.
    pub business_context: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "Applemar AI".to_string(),
            personality: "Sofisticada, prestativa e eficiente.".to_string(),
            welcome_message:
                "Olá! Bem-vindo à Applemar. Como posso elevar a sua experiência hoje?".to_string(),
            auto_reply_enabled: true,
            business_context: "Applemar é uma marca premium de tecnologia e estilo de vida. \
                               Focamos em design minimalista e qualidade superior."
                .to_string(),
        }
    }
}

impl BotConfig {
    /// Flip [`auto_reply_enabled`](Self::auto_reply_enabled) and return the new value.
    pub fn toggle_auto_reply(&mut self) -> bool {
        self.auto_reply_enabled = !self.auto_reply_enabled;
        self.auto_reply_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_business_context() {
        let bot = BotConfig::default();
        assert_eq!(
            bot.business_context,
            "Applemar é uma marca premium de tecnologia e estilo de vida. Focamos em design minimalista e qualidade superior."
        );
    }

    #[test]
    fn test_toggle_auto_reply() {
        let mut bot = BotConfig::default();
        assert!(!bot.toggle_auto_reply());
        assert!(!bot.auto_reply_enabled);
        assert!(bot.toggle_auto_reply());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let bot: BotConfig = serde_yaml::from_str("name: \"Marina\"\n").unwrap();
        assert_eq!(bot.name, "Marina");
        assert_eq!(bot.personality, BotConfig::default().personality);
        assert!(bot.auto_reply_enabled);
    }
}
