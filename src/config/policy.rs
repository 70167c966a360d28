//! Per-guard enforcement policies.

use std::collections::HashMap;
use std::time::Duration;

use super::ConfigError;
use crate::guards::GuardKind;

/// Terminal action once a strike threshold is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Block the user from the group (cannot re-join).
    Block,
    /// Remove the user (may re-join).
    Remove,
}

/// Strike policy of a single guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Strikes inside the decay window that trigger escalation.
    pub threshold: u32,
    /// Strikes older than this stop counting.
    pub decay_window: Duration,
    /// How often the decay sweeper scans this guard's records.
    pub sweep_interval: Duration,
    /// Stored timestamps per record. Never below the threshold, or the
    /// count could not reach it after a sweep.
    pub history_cap: usize,
    pub escalation: Escalation,
}

impl GuardPolicy {
    const fn new(threshold: u32, decay_secs: u64, sweep_secs: u64) -> Self {
        Self {
            threshold,
            decay_window: Duration::from_secs(decay_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
            history_cap: if threshold > 3 { threshold as usize } else { 3 },
            escalation: Escalation::Block,
        }
    }

    /// Built-in defaults for a guard.
    pub fn default_for(kind: GuardKind) -> Self {
        const HALF_HOUR: u64 = 30 * 60;
        const DAY: u64 = 24 * 60 * 60;
        match kind {
            GuardKind::AntiBot | GuardKind::AntiSpam => Self::new(3, HALF_HOUR, 5),
            GuardKind::AntiMedia
            | GuardKind::AntiSticker
            | GuardKind::AntiNotText
            | GuardKind::AntiForward => Self::new(5, HALF_HOUR, 10),
            GuardKind::AntiBadword
            | GuardKind::AntiLink
            | GuardKind::AntiLinkKeyword
            | GuardKind::AntiNude => Self::new(3, DAY, 60),
            // Non-striking guards never consult their policy.
            GuardKind::CustomRule | GuardKind::MuteFilter | GuardKind::BlockList => {
                Self::new(u32::MAX, HALF_HOUR, 60)
            }
        }
    }
}

/// Policies for every guard, with environment overrides applied.
#[derive(Debug, Clone)]
pub struct GuardPolicies {
    policies: HashMap<GuardKind, GuardPolicy>,
}

impl Default for GuardPolicies {
    fn default() -> Self {
        let policies = GuardKind::STRIKING
            .iter()
            .map(|kind| (*kind, GuardPolicy::default_for(*kind)))
            .collect();
        Self { policies }
    }
}

impl GuardPolicies {
    /// Apply `GUARD_<NAME>_THRESHOLD` / `GUARD_<NAME>_DECAY_SECS` overrides.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut policies = Self::default();
        for kind in GuardKind::STRIKING {
            let stem = kind.env_stem();
            let policy = policies
                .policies
                .entry(kind)
                .or_insert_with(|| GuardPolicy::default_for(kind));

            let threshold_key = format!("{}_THRESHOLD", stem);
            if let Some(raw) = lookup(&threshold_key) {
                policy.threshold = parse_positive(&threshold_key, &raw)? as u32;
                policy.history_cap = policy.history_cap.max(policy.threshold as usize);
            }

            let decay_key = format!("{}_DECAY_SECS", stem);
            if let Some(raw) = lookup(&decay_key) {
                policy.decay_window = Duration::from_secs(parse_positive(&decay_key, &raw)?);
            }
        }
        Ok(policies)
    }

    pub fn get(&self, kind: GuardKind) -> GuardPolicy {
        self.policies
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| GuardPolicy::default_for(kind))
    }

    /// Replace a single policy.
    pub fn set(&mut self, kind: GuardKind, policy: GuardPolicy) {
        self.policies.insert(kind, policy);
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 && v <= u32::MAX as u64 => Ok(v),
        _ => Err(ConfigError::Invalid {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Message-rate limits for anti-spam.
#[derive(Debug, Clone)]
pub struct SpamLimits {
    /// More than this many messages inside `window` is spam.
    pub max_messages: usize,
    pub window: Duration,
}

impl Default for SpamLimits {
    fn default() -> Self {
        Self {
            max_messages: 5,
            window: Duration::from_secs(4),
        }
    }
}

/// Classifier confidence thresholds (0-100) for the nudity guard.
#[derive(Debug, Clone, Copy)]
pub struct NudeThresholds {
    pub default: u8,
    pub whitelisted: u8,
}

impl Default for NudeThresholds {
    fn default() -> Self {
        Self {
            default: 40,
            whitelisted: 60,
        }
    }
}

impl NudeThresholds {
    pub fn for_sender(&self, whitelisted: bool) -> u8 {
        if whitelisted { self.whitelisted } else { self.default }
    }
}

/// Upload-burst detection that switches on prophylactic mode.
#[derive(Debug, Clone)]
pub struct ProphylacticPolicy {
    /// More uploads than this inside `burst_window` activates the mode.
    pub burst_uploads: usize,
    pub burst_window: Duration,
    /// How long the mode stays on.
    pub timeout: Duration,
}

impl Default for ProphylacticPolicy {
    fn default() -> Self {
        Self {
            burst_uploads: 10,
            burst_window: Duration::from_secs(10),
            timeout: Duration::from_secs(10 * 60),
        }
    }
}
