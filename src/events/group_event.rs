//! Group membership events.

use tracing::{debug, info, warn};

use super::EventHooks;
use crate::bot::AppState;
use crate::client::{GroupEvent, GroupEventKind};

/// Keep caches in step with the group and turn away blacklisted members.
pub async fn handle_group_event(
    state: &AppState,
    hooks: &dyn EventHooks,
    event: &GroupEvent,
) -> anyhow::Result<()> {
    debug!("Group event {:?} in {}", event.kind, event.thread_id);

    if matches!(event.kind, GroupEventKind::AddAdmin | GroupEventKind::RemoveAdmin) {
        state.permissions.invalidate(&event.thread_id);
    }

    let settings = match state.settings.load(&event.thread_id).await {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("Failed to load settings for {}: {}", event.thread_id, e);
            None
        }
    };

    if event.kind == GroupEventKind::Join
        && let Some(settings) = &settings
    {
        for member in &event.members {
            if member.id == state.bot_id() || !settings.is_blacklisted(&member.id) {
                continue;
            }
            match state
                .client
                .remove_user_from_group(&event.thread_id, &member.id)
                .await
            {
                Ok(()) => info!("Removed blacklisted {} from {}", member.id, event.thread_id),
                Err(e) => warn!("Failed to remove blacklisted {}: {}", member.id, e),
            }
        }
    }

    hooks.on_group_event(event, settings.as_ref()).await
}
