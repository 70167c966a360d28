//! Reaction events.

use tracing::debug;

use super::EventHooks;
use crate::client::Reaction;

pub async fn handle_reaction(hooks: &dyn EventHooks, reaction: &Reaction) -> anyhow::Result<()> {
    debug!(
        "Reaction {} on {} by {}",
        reaction.icon, reaction.msg_id, reaction.uid_from
    );
    hooks.on_reaction(reaction).await
}
