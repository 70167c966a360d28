//! Message recall events.

use tracing::debug;

use super::EventHooks;
use crate::bot::AppState;
use crate::client::Undo;

/// Flag the recalled message in the cache, then run the hooks.
///
/// The cached copy stays readable so admin tooling can still show what
/// was recalled.
pub async fn handle_undo(state: &AppState, hooks: &dyn EventHooks, undo: &Undo) -> anyhow::Result<()> {
    let original = state.messages.mark_recalled(&undo.msg_id);
    if original.is_none() {
        debug!("Recalled message {} is no longer cached", undo.msg_id);
    }
    hooks.on_undo(undo, original.as_ref()).await
}
