//! Shared statistics folding used by both source parsers.
//!
//! The parsers share no parsing code, but the way message sequences fold into
//! token and tool-usage statistics has one set of semantics, kept here so the
//! two implementations cannot drift apart.

use std::collections::HashMap;

use crate::types::{TokenStats, TokenUsage, ToolUsageSummary};

/// Folds observed tool invocations into per-tool counts and success rates.
///
/// Tools are reported in first-observation order.
#[derive(Debug, Default)]
pub struct ToolUsageTally {
    counts: HashMap<String, (u64, u64)>,
    order: Vec<String>,
}

impl ToolUsageTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tool invocation and whether it succeeded.
    pub fn record(&mut self, name: &str, success: bool) {
        if !self.counts.contains_key(name) {
            self.order.push(name.to_string());
        }
        let entry = self.counts.entry(name.to_string()).or_insert((0, 0));
        entry.0 += 1;
        if success {
            entry.1 += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Produce the per-tool summaries, one per distinct tool name.
    pub fn into_summaries(self) -> Vec<ToolUsageSummary> {
        let counts = self.counts;
        self.order
            .into_iter()
            .map(|name| {
                let (count, successes) = counts[&name];
                ToolUsageSummary {
                    name,
                    count,
                    success_rate: if count > 0 {
                        successes as f64 / count as f64
                    } else {
                        0.0
                    },
                }
            })
            .collect()
    }
}

/// Folds per-message token usage into totals and the per-usage sequences.
///
/// Only messages that actually carried usage data contribute entries to the
/// three parallel sequences, so they may be shorter than the message list.
/// The cumulative sequence tracks the running input+output total and is
/// non-decreasing by construction.
#[derive(Debug, Default)]
pub struct TokenTally {
    total_input: u64,
    total_output: u64,
    total_cache_read: u64,
    total_cache_creation: u64,
    input_per_message: Vec<u64>,
    output_per_message: Vec<u64>,
    cumulative_tokens: Vec<u64>,
    running_total: u64,
}

impl TokenTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the usage carried by one message.
    pub fn record(&mut self, usage: &TokenUsage) {
        self.total_input += usage.input;
        self.total_output += usage.output;
        self.total_cache_read += usage.cache_read.unwrap_or(0);
        self.total_cache_creation += usage.cache_creation.unwrap_or(0);
        self.input_per_message.push(usage.input);
        self.output_per_message.push(usage.output);
        self.running_total += usage.input + usage.output;
        self.cumulative_tokens.push(self.running_total);
    }

    /// Total input+output tokens recorded so far.
    pub fn total(&self) -> u64 {
        self.total_input + self.total_output
    }

    pub fn into_stats(self) -> TokenStats {
        TokenStats {
            total_input: self.total_input,
            total_output: self.total_output,
            total_cache_read: self.total_cache_read,
            total_cache_creation: self.total_cache_creation,
            input_per_message: self.input_per_message,
            output_per_message: self.output_per_message,
            cumulative_tokens: self.cumulative_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_tally_counts_and_rates() {
        let mut tally = ToolUsageTally::new();
        tally.record("Bash", true);
        tally.record("Read", true);
        tally.record("Bash", false);

        let summaries = tally.into_summaries();
        assert_eq!(summaries.len(), 2);
        // First-observation order
        assert_eq!(summaries[0].name, "Bash");
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].success_rate, 0.5);
        assert_eq!(summaries[1].name, "Read");
        assert_eq!(summaries[1].success_rate, 1.0);
    }

    #[test]
    fn test_token_tally_parallel_sequences() {
        let mut tally = TokenTally::new();
        tally.record(&TokenUsage {
            input: 10,
            output: 5,
            cache_read: Some(100),
            cache_creation: None,
        });
        tally.record(&TokenUsage {
            input: 3,
            output: 7,
            cache_read: None,
            cache_creation: Some(20),
        });

        assert_eq!(tally.total(), 25);
        let stats = tally.into_stats();
        assert_eq!(stats.total_input, 13);
        assert_eq!(stats.total_output, 12);
        assert_eq!(stats.total_cache_read, 100);
        assert_eq!(stats.total_cache_creation, 20);
        assert_eq!(stats.input_per_message, vec![10, 3]);
        assert_eq!(stats.output_per_message, vec![5, 7]);
        assert_eq!(stats.cumulative_tokens, vec![15, 25]);
    }

    #[test]
    fn test_cumulative_is_non_decreasing() {
        let mut tally = TokenTally::new();
        for (input, output) in [(5, 0), (0, 0), (2, 3)] {
            tally.record(&TokenUsage {
                input,
                output,
                cache_read: None,
                cache_creation: None,
            });
        }
        let stats = tally.into_stats();
        assert!(stats
            .cumulative_tokens
            .windows(2)
            .all(|pair| pair[0] <= pair[1]));
    }
}
