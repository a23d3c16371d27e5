use serde::{Serialize, Deserialize};

pub const RESET_VOTE: &str = "reset";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteOptions {
    pub first: String,
    pub second: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteCounts {
    pub first: u64,
    pub second: u64,
}

/// Resolved once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteSettings {
    pub options: VoteOptions,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionSlot {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteChoice {
    Reset,
    Cast(OptionSlot),
}

impl VoteOptions {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// The option label doubles as its counter key in the store.
    pub fn key(&self, slot: OptionSlot) -> &str {
        match slot {
            OptionSlot::First => &self.first,
            OptionSlot::Second => &self.second,
        }
    }

    pub fn keys(&self) -> [&str; 2] {
        [&self.first, &self.second]
    }

    pub fn slot_of(&self, value: &str) -> Option<OptionSlot> {
        if value == self.first {
            Some(OptionSlot::First)
        } else if value == self.second {
            Some(OptionSlot::Second)
        } else {
            None
        }
    }

    /// Name used for the per-option telemetry event and span attribute.
    pub fn event_name(&self, slot: OptionSlot) -> String {
        format!("{} Vote", self.key(slot))
    }
}

impl VoteCounts {
    pub fn get(&self, slot: OptionSlot) -> u64 {
        match slot {
            OptionSlot::First => self.first,
            OptionSlot::Second => self.second,
        }
    }

    pub fn total(&self) -> u64 {
        self.first + self.second
    }
}
