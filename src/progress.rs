use crate::events::{EventQueue, ReaderEvent};
use crate::position::NavigationState;
use crate::spine::Spine;

/// Word-count-weighted completion estimator.
///
/// The current chapter contributes a fraction of a fraction of the total,
/// `word_count * (page + 1) / (last_page + 1)`, so the estimate survives a
/// reflow changing the chapter's page count. The percentage is recomputed
/// fully each time and may legitimately decrease when navigating backward.
#[derive(Debug, Default)]
pub struct ProgressEstimator {
    /// Cached once per book load; invalidated by `reset`.
    total_words: Option<u64>,
    percent: u8,
}

impl ProgressEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Recompute the estimate; emits `ProgressUpdated` only when the value
    /// changed and is valid. A zero word total (or an empty spine) leaves the
    /// previous value untouched and emits nothing.
    pub fn update(&mut self, state: &NavigationState, spine: &Spine, events: &mut EventQueue) {
        if self.total_words.is_none() && !spine.is_empty() {
            self.total_words = Some(spine.linear_word_count());
        }
        let Some(total) = self.total_words else {
            return;
        };
        if total == 0 {
            return;
        }

        let mut consumed: f64 = spine
            .iter()
            .take(state.chapter)
            .filter(|c| c.linear)
            .map(|c| c.word_count as f64)
            .sum();

        if let Some(current) = spine.get(state.chapter) {
            if current.linear {
                consumed += current.word_count as f64 * (state.page + 1) as f64
                    / (state.pages_in_chapter + 1) as f64;
            }
        }

        let percent = (consumed / total as f64 * 100.0).floor();
        if !percent.is_finite() {
            return;
        }
        let percent = percent.clamp(0.0, 100.0) as u8;

        if percent != self.percent {
            self.percent = percent;
            events.push(ReaderEvent::ProgressUpdated { percent });
        }
    }

    /// Forget the cached word total and the last value (book closed).
    pub fn reset(&mut self) {
        self.total_words = None;
        self.percent = 0;
    }
}
