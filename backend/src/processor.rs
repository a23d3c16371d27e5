use std::sync::Arc;

use shared::{OptionSlot, VoteChoice, VoteCounts, VoteSettings};
use tracing::{debug, info};

use crate::{
    error::ApiError,
    store::{CounterStore, StoreError},
    telemetry::{Dimensions, Telemetry},
};

pub const RESET_EVENT: &str = "Votes reset";
pub const RETRIEVE_SPAN: &str = "GET /index - Retrieve Votes";

const SLOTS: [OptionSlot; 2] = [OptionSlot::First, OptionSlot::Second];

/// Turns vote requests into counter reads and writes. Holds no counter
/// state of its own; the store is the only source of truth.
pub struct VoteProcessor {
    store: Arc<dyn CounterStore>,
    telemetry: Arc<dyn Telemetry>,
    settings: VoteSettings,
}

impl VoteProcessor {
    pub fn new(store: Arc<dyn CounterStore>, telemetry: Arc<dyn Telemetry>, settings: VoteSettings) -> Self {
        Self { store, telemetry, settings }
    }

    pub fn settings(&self) -> &VoteSettings {
        &self.settings
    }

    pub fn telemetry(&self) -> Arc<dyn Telemetry> {
        self.telemetry.clone()
    }

    /// Creates missing counters at zero. Existing counters are left alone,
    /// so running this again never loses votes.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        for key in self.settings.options.keys() {
            if self.store.set_if_absent(key, 0).await? {
                info!("Initialized counter {} to 0", key);
            } else {
                debug!("Counter {} already present", key);
            }
        }
        Ok(())
    }

    pub async fn fetch_counts(&self) -> Result<VoteCounts, ApiError> {
        let first = self.read_counter(OptionSlot::First).await?;
        let second = self.read_counter(OptionSlot::Second).await?;
        let counts = VoteCounts { first, second };

        self.telemetry.record_span(RETRIEVE_SPAN, &self.dimensions(&counts));
        Ok(counts)
    }

    pub async fn apply(&self, choice: VoteChoice) -> Result<(), ApiError> {
        match choice {
            VoteChoice::Reset => self.reset().await,
            VoteChoice::Cast(slot) => self.cast(slot).await.map(|_| ()),
        }
    }

    pub async fn reset(&self) -> Result<(), ApiError> {
        for key in self.settings.options.keys() {
            self.store.set(key, 0).await?;
        }

        info!("Votes reset");
        self.telemetry.log_event(RESET_EVENT, &self.dimensions(&VoteCounts::default()));
        Ok(())
    }

    /// Returns the counter value after the increment.
    pub async fn cast(&self, slot: OptionSlot) -> Result<i64, ApiError> {
        let options = &self.settings.options;
        let total = self.store.incr(options.key(slot), 1).await?;

        debug!("{} now at {}", options.key(slot), total);
        self.telemetry.log_event(&options.event_name(slot), &Dimensions::new());
        Ok(total)
    }

    async fn read_counter(&self, slot: OptionSlot) -> Result<u64, ApiError> {
        let key = self.settings.options.key(slot);
        let raw = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| ApiError::MissingCounter(key.to_string()))?;

        raw.parse::<u64>().map_err(|_| ApiError::MalformedCounter {
            key: key.to_string(),
            value: raw.clone(),
        })
    }

    fn dimensions(&self, counts: &VoteCounts) -> Dimensions {
        SLOTS
            .iter()
            .map(|&slot| (self.settings.options.event_name(slot), counts.get(slot)))
            .collect()
    }
}
