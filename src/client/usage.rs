//! Token usage accounting for streamed and single-shot completions.

use crate::api::Usage;

/// Running token totals, ready for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// How reported usage folds into the running totals.
///
/// Servers following the event-stream convention report cumulative usage,
/// so the latest value wins. [`UsageStrategy::Sum`] suits servers that
/// report per-chunk deltas instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UsageStrategy {
    #[default]
    Overwrite,
    Sum,
}

/// Folds [`Usage`] values into running totals.
///
/// Each counter starts at zero and folds independently; a field absent from
/// a report leaves its total untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageAccumulator {
    strategy: UsageStrategy,
    totals: UsageTotals,
}

impl UsageAccumulator {
    pub fn new(strategy: UsageStrategy) -> Self {
        Self {
            strategy,
            totals: UsageTotals::default(),
        }
    }

    pub fn record(&mut self, usage: &Usage) {
        fold(&mut self.totals.prompt_tokens, usage.prompt_tokens, self.strategy);
        fold(
            &mut self.totals.completion_tokens,
            usage.completion_tokens,
            self.strategy,
        );
        fold(&mut self.totals.total_tokens, usage.total_tokens, self.strategy);
    }

    pub fn totals(&self) -> UsageTotals {
        self.totals
    }
}

fn fold(slot: &mut u32, reported: Option<u32>, strategy: UsageStrategy) {
    if let Some(value) = reported {
        match strategy {
            UsageStrategy::Overwrite => *slot = value,
            UsageStrategy::Sum => *slot = slot.saturating_add(value),
        }
    }
}
