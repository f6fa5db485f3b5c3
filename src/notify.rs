//! Operator notifications.
//!
//! Components that need to tell the operator something ("settings saved",
//! "device disconnected") take a `&dyn Notifier` instead of printing directly.

use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, SetAttribute, SetForegroundColor},
};
use std::{
    error::Error,
    io::{Write, stdout},
    sync::Mutex,
};

/// Visual weight of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Info,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: ToastKind);
}

/// Prints notifications to stdout in colour.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    fn print(&self, message: &str, kind: ToastKind) -> Result<(), Box<dyn Error>> {
        let mut out = stdout();
        let (marker, color) = match kind {
            ToastKind::Success => ("✔", Color::Green),
            ToastKind::Info => ("ℹ", Color::Rgb {
                r: 0xE2,
                g: 0xA7,
                b: 0x8F,
            }),
        };
        out.execute(SetForegroundColor(color))?;
        out.execute(SetAttribute(Attribute::Bold))?;
        write!(out, "{marker} ")?;
        out.execute(SetAttribute(Attribute::Reset))?;
        out.execute(SetForegroundColor(Color::Reset))?;
        writeln!(out, "{message}")?;
        out.flush()?;
        Ok(())
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, kind: ToastKind) {
        tracing::info!("notification: {}", message);
        if let Err(err) = self.print(message, kind) {
            tracing::warn!("Failed to print notification: {}", err);
        }
    }
}

/// Keeps every notification in memory, in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(String, ToastKind)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, ToastKind)> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, kind: ToastKind) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((message.to_string(), kind));
        }
    }
}
