//! # System instruction template
//!
//! Renders the persona preamble that conditions the generation service for
//! every turn of a conversation.
//!
//! The rendered text has the following shape, with the three persona fields
//! substituted verbatim:
//!
//! ```text
//! You are "<name>", the professional AI assistant for Applemar.
//! Applemar Brand Personality: Luxury, minimalist, elegant, and efficient.
//! Context: <business_context>
//! Your Personality: <personality>
//! Rules:
//! 1. Always be polite and professional in Portuguese (Brazil/Portugal).
//! 2. If you don't know an answer, politely ask the customer to wait for a human agent.
//! 3. Keep responses concise and well-formatted.
//! 4. Avoid slang unless it fits the high-end brand image.
//! ```
//!
//! ## Behavior notes
//! - Values are inserted as plain text. Braces, quotes and newlines inside a
//!   value are never treated as template syntax, so they cannot disturb the
//!   fixed lines around them.
//! - Business context is not sanitized or length-limited.
//!
//! ```rust
//! use applemar_bot::persona::BotConfig;
//! use applemar_bot::template::system_instruction;
//!
//! let text = system_instruction(&BotConfig::default());
//! assert!(text.starts_with("You are \"Applemar AI\""));
//! ```

use crate::persona::BotConfig;

/// Fixed brand voice line shared by every persona.
pub const BRAND_PERSONALITY: &str =
    "Applemar Brand Personality: Luxury, minimalist, elegant, and efficient.";

/// Behavioural rules appended after the persona lines.
pub const RULES: [&str; 4] = [
    "1. Always be polite and professional in Portuguese (Brazil/Portugal).",
    "2. If you don't know an answer, politely ask the customer to wait for a human agent.",
    "3. Keep responses concise and well-formatted.",
    "4. Avoid slang unless it fits the high-end brand image.",
];

/// Render the system instruction for `bot`.
///
/// Only `name`, `business_context` and `personality` take part; the welcome
/// message and the auto-reply switch are ignored.
pub fn system_instruction(bot: &BotConfig) -> String {
    let mut lines = vec![
        format!(
            "You are \"{}\", the professional AI assistant for Applemar.",
            bot.name
        ),
        BRAND_PERSONALITY.to_string(),
        format!("Context: {}", bot.business_context),
        format!("Your Personality: {}", bot.personality),
        "Rules:".to_string(),
    ];
    lines.extend(RULES.iter().map(|rule| rule.to_string()));

    lines.join("\n")
}
