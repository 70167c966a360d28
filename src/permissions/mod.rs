//! Permission system for guard exemptions.
//!
//! Resolves whether a sender is the bot itself, an admin at any level, or
//! whitelisted, and whether the bot can enforce anything in the group.
//!
//! ## Usage
//!
//! ```ignore
//! let standing = state.permissions.standing(&msg, &settings).await;
//! if standing.is_admin || !standing.bot_is_admin {
//!     return Verdict::Pass;
//! }
//! ```

mod resolver;

pub use resolver::{Permissions, SenderStanding};
