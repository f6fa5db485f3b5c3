//! Simulated WhatsApp device pairing.
//!
//! Nothing here talks to WhatsApp. [`pair`] walks a progress counter from 0 to
//! 100 in steps of [`PROGRESS_STEP`], one step per tick, then flips the
//! persisted `connected` flag. [`disconnect`] flips it back.

use std::time::Duration;

use crate::{
    notify::{Notifier, ToastKind},
    state::{AppState, StateError, StateStore},
};

pub const PROGRESS_STEP: u8 = 5;
pub const DEFAULT_TICK: Duration = Duration::from_millis(80);

/// Run the pairing animation and mark the instance connected.
///
/// `on_progress` is called with every intermediate percentage, ending at 100.
/// Pairing an already connected instance only reports it.
pub async fn pair(
    state: &mut AppState,
    store: &dyn StateStore,
    notifier: &dyn Notifier,
    tick: Duration,
    mut on_progress: impl FnMut(u8),
) -> Result<(), StateError> {
    if state.connected {
        notifier.notify("WhatsApp já está conectado", ToastKind::Info);
        return Ok(());
    }

    let mut interval = tokio::time::interval(tick);
    let mut progress: u8 = 0;
    loop {
        interval.tick().await;
        on_progress(progress);
        if progress >= 100 {
            break;
        }
        progress = (progress + PROGRESS_STEP).min(100);
    }

    state.connected = true;
    store.save(state)?;
    tracing::info!("Instance paired");
    notifier.notify("WhatsApp sincronizado com sucesso!", ToastKind::Success);
    Ok(())
}

/// Mark the instance disconnected.
pub fn disconnect(
    state: &mut AppState,
    store: &dyn StateStore,
    notifier: &dyn Notifier,
) -> Result<(), StateError> {
    state.connected = false;
    store.save(state)?;
    tracing::info!("Instance disconnected");
    notifier.notify("Dispositivo desconectado", ToastKind::Info);
    Ok(())
}

/// Label for the connection badge.
pub fn status_label(state: &AppState) -> &'static str {
    if state.connected { "ONLINE" } else { "OFFLINE" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::state::MemoryStateStore;

    #[tokio::test]
    async fn test_pair_reports_progress_and_connects() {
        let store = MemoryStateStore::default();
        let notifier = RecordingNotifier::new();
        let mut state = AppState::default();
        let mut seen = Vec::new();

        pair(
            &mut state,
            &store,
            &notifier,
            Duration::from_millis(1),
            |p| seen.push(p),
        )
        .await
        .unwrap();

        assert_eq!(seen.len(), 21);
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[1] == w[0] + PROGRESS_STEP));
        assert!(state.connected);
        assert!(store.load().unwrap().connected);
        assert_eq!(
            notifier.messages(),
            vec![(
                "WhatsApp sincronizado com sucesso!".to_string(),
                ToastKind::Success
            )]
        );
        assert_eq!(status_label(&state), "ONLINE");
    }

    #[tokio::test]
    async fn test_pair_when_connected_is_noop() {
        let store = MemoryStateStore::default();
        let notifier = RecordingNotifier::new();
        let mut state = AppState {
            connected: true,
            ..AppState::default()
        };
        let mut calls = 0;

        pair(&mut state, &store, &notifier, DEFAULT_TICK, |_| calls += 1)
            .await
            .unwrap();

        assert_eq!(calls, 0);
        assert!(!store.load().unwrap().connected);
        assert_eq!(notifier.messages()[0].1, ToastKind::Info);
    }

    #[test]
    fn test_disconnect_persists_and_notifies() {
        let store = MemoryStateStore::new(AppState {
            connected: true,
            ..AppState::default()
        });
        let notifier = RecordingNotifier::new();
        let mut state = store.load().unwrap();

        disconnect(&mut state, &store, &notifier).unwrap();

        assert!(!store.load().unwrap().connected);
        assert_eq!(status_label(&state), "OFFLINE");
        assert_eq!(
            notifier.messages(),
            vec![("Dispositivo desconectado".to_string(), ToastKind::Info)]
        );
    }
}
