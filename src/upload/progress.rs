//! Per-field progress indicators.
//!
//! A page can run several transfers at once, so every progress update is
//! routed by the field id of the event's view, never by whichever field
//! happened to start last.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::field::FieldId;

/// One field's progress bar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressIndicator {
    /// Bar width in percent, 0..=100
    pub percent: u8,
    /// When the bar is due to be cleared
    pub reset_at: Option<Instant>,
}

/// `floor(loaded / total * 100)`, clamped to 0..=100.
///
/// An unknown (zero) total yields 0.
pub fn percent_of(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (loaded as u128 * 100) / total as u128;
    pct.min(100) as u8
}

/// Lookup of progress indicators keyed by field id.
///
/// Owned by the controller that writes it; a fresh registry per controller
/// keeps independent controllers (and tests) isolated.
#[derive(Debug, Default)]
pub struct ProgressRegistry {
    bars: HashMap<FieldId, ProgressIndicator>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) the indicator for a rendered field.
    pub fn register(&mut self, field_id: FieldId) {
        self.bars.insert(field_id, ProgressIndicator::default());
    }

    pub fn unregister(&mut self, field_id: FieldId) {
        self.bars.remove(&field_id);
    }

    pub fn get(&self, field_id: FieldId) -> Option<&ProgressIndicator> {
        self.bars.get(&field_id)
    }

    /// Current width for `field_id`, 0 when unknown.
    pub fn percent(&self, field_id: FieldId) -> u8 {
        self.bars.get(&field_id).map(|b| b.percent).unwrap_or(0)
    }

    /// Set the bar width. Returns `false` when no indicator is registered.
    pub fn set(&mut self, field_id: FieldId, percent: u8) -> bool {
        match self.bars.get_mut(&field_id) {
            Some(bar) => {
                bar.percent = percent.min(100);
                true
            }
            None => false,
        }
    }

    /// Clear the bar once `delay` has passed after `now`.
    pub fn schedule_reset(&mut self, field_id: FieldId, now: Instant, delay: Duration) -> bool {
        match self.bars.get_mut(&field_id) {
            Some(bar) => {
                bar.reset_at = Some(now + delay);
                true
            }
            None => false,
        }
    }

    /// Clear every bar whose reset is due. Returns the fields that were reset.
    pub fn apply_due_resets(&mut self, now: Instant) -> Vec<FieldId> {
        let mut reset = Vec::new();
        for (field_id, bar) in self.bars.iter_mut() {
            if bar.reset_at.is_some_and(|due| due <= now) {
                bar.percent = 0;
                bar.reset_at = None;
                reset.push(*field_id);
            }
        }
        reset.sort();
        reset
    }

    pub fn has_pending_resets(&self) -> bool {
        self.bars.values().any(|b| b.reset_at.is_some())
    }
}
