//! # Application state
//!
//! [`AppState`] bundles everything the operator can change at runtime: the bot
//! persona and whether the WhatsApp instance is paired. It is loaded once from
//! a [`StateStore`] and written back after each change.
//!
//! Two stores are provided:
//!
//! - [`YamlStateStore`] keeps the state in a YAML file (by default
//!   `<config_dir>/state.yaml`). A missing file loads as [`AppState::default`].
//! - [`MemoryStateStore`] keeps it in memory, for tests and embedding.
//!
//! ```rust
//! use applemar_bot::state::{AppState, MemoryStateStore, StateStore};
//!
//! let store = MemoryStateStore::default();
//! let mut state = store.load().unwrap();
//! state.connected = true;
//! store.save(&state).unwrap();
//! assert!(store.load().unwrap().connected);
//! ```

use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::notify::{Notifier, ToastKind};
use crate::persona::BotConfig;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("state format error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("state store lock poisoned")]
    Poisoned,
}

/// Runtime-mutable application state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AppState {
    pub bot: BotConfig,
    pub connected: bool,
}

/// Persistence for [`AppState`].
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<AppState, StateError>;
    fn save(&self, state: &AppState) -> Result<(), StateError>;
}

/// YAML file backed store.
#[derive(Debug, Clone)]
pub struct YamlStateStore {
    path: PathBuf,
}

impl YamlStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for YamlStateStore {
    fn load(&self) -> Result<AppState, StateError> {
        if !self.path.exists() {
            tracing::debug!("No state at {}, using defaults", self.path.display());
            return Ok(AppState::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn save(&self, state: &AppState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_yaml::to_string(state)?)?;
        tracing::info!("Saved state to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: Mutex<AppState>,
}

impl MemoryStateStore {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<AppState, StateError> {
        self.state
            .lock()
            .map(|state| state.clone())
            .map_err(|_| StateError::Poisoned)
    }

    fn save(&self, state: &AppState) -> Result<(), StateError> {
        *self.state.lock().map_err(|_| StateError::Poisoned)? = state.clone();
        Ok(())
    }
}

/// Field edits applied by [`update_settings`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub name: Option<String>,
    pub personality: Option<String>,
    pub welcome_message: Option<String>,
    pub business_context: Option<String>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn apply(self, bot: &mut BotConfig) {
        if let Some(name) = self.name {
            bot.name = name;
        }
        if let Some(personality) = self.personality {
            bot.personality = personality;
        }
        if let Some(welcome_message) = self.welcome_message {
            bot.welcome_message = welcome_message;
        }
        if let Some(business_context) = self.business_context {
            bot.business_context = business_context;
        }
    }
}

/// Apply `update` to the persona, persist, and confirm to the operator.
pub fn update_settings(
    state: &mut AppState,
    update: SettingsUpdate,
    store: &dyn StateStore,
    notifier: &dyn Notifier,
) -> Result<(), StateError> {
    update.apply(&mut state.bot);
    store.save(state)?;
    notifier.notify("Configurações salvas com sucesso!", ToastKind::Success);
    Ok(())
}

/// Flip auto-reply, persist, and announce the new mode.
pub fn toggle_auto_reply(
    state: &mut AppState,
    store: &dyn StateStore,
    notifier: &dyn Notifier,
) -> Result<bool, StateError> {
    let enabled = state.bot.toggle_auto_reply();
    store.save(state)?;
    let message = if enabled {
        "Automação Ativada"
    } else {
        "Automação Desativada"
    };
    notifier.notify(message, ToastKind::Info);
    Ok(enabled)
}
