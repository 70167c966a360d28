//! Persisted models.

mod prophylactic;
mod settings;
mod violation;

pub use prophylactic::ProphylacticConfig;
pub use settings::{CustomRule, GroupSettings, ListEntry, MuteEntry};
pub use violation::{ViolationMap, ViolationRecord};
