//! Token accounting for a session.

/// Cumulative token usage. Only grows, except on reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceLedger {
    total_tokens: u64,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tokens: u64) {
        self.total_tokens = self.total_tokens.saturating_add(tokens);
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    /// Share of `budget` consumed so far, in percent. A zero budget reports 0.
    pub fn percent_of(&self, budget: u64) -> f64 {
        if budget == 0 {
            return 0.0;
        }
        (self.total_tokens as f64 / budget as f64) * 100.0
    }

    pub fn reset(&mut self) {
        self.total_tokens = 0;
    }
}
