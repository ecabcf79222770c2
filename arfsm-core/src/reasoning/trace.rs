//! Analysis helpers over a [`ReasoningTrace`](super::types::ReasoningTrace).
//!
//! The trace itself is just an ordered step log; this module derives
//! summary statistics and a human-readable narrative from it, mirroring
//! what a decision-tree confidence rollup would have done over a graph.

use super::types::{ReasoningTrace, Step};

/// Aggregate statistics over a trace's steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceStats {
    pub step_count: usize,
    pub mean_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
}

impl TraceStats {
    fn from_steps(steps: &[Step]) -> Self {
        if steps.is_empty() {
            return Self { step_count: 0, mean_confidence: 0.0, min_confidence: 0.0, max_confidence: 0.0 };
        }
        let confidences: Vec<f64> = steps.iter().map(|s| s.confidence).collect();
        let sum: f64 = confidences.iter().sum();
        Self {
            step_count: steps.len(),
            mean_confidence: sum / confidences.len() as f64,
            min_confidence: confidences.iter().cloned().fold(f64::INFINITY, f64::min),
            max_confidence: confidences.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Derives rollup statistics and a narrative summary from a trace, without
/// mutating it.
pub struct TraceAnalyzer<'a> {
    trace: &'a ReasoningTrace,
}

impl<'a> TraceAnalyzer<'a> {
    pub fn new(trace: &'a ReasoningTrace) -> Self {
        Self { trace }
    }

    pub fn stats(&self) -> TraceStats {
        TraceStats::from_steps(&self.trace.steps)
    }

    /// Overall confidence, taken as the final step's confidence, or 0.0 for
    /// an empty trace.
    pub fn overall_confidence(&self) -> f64 {
        self.trace.last().map(|s| s.confidence).unwrap_or(0.0)
    }

    /// A terse narrative: one line per step, in order.
    pub fn narrative(&self) -> String {
        if self.trace.steps.is_empty() {
            return format!("goal {}: no steps recorded", self.trace.goal);
        }
        self.trace
            .steps
            .iter()
            .map(|s| format!("{}. {} -> {} ({:.0}% confidence)", s.number, s.action, s.result, s.confidence * 100.0))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_over_empty_trace_are_zero() {
        let trace = ReasoningTrace::new("ep-1", "domain");
        let stats = TraceAnalyzer::new(&trace).stats();
        assert_eq!(stats.step_count, 0);
        assert_eq!(stats.mean_confidence, 0.0);
    }

    #[test]
    fn stats_average_step_confidences() {
        let mut trace = ReasoningTrace::new("ep-2", "domain");
        trace.push("a", "q1", "r1", "why1", 0.2);
        trace.push("b", "q2", "r2", "why2", 0.8);
        let stats = TraceAnalyzer::new(&trace).stats();
        assert_eq!(stats.step_count, 2);
        assert!((stats.mean_confidence - 0.5).abs() < 1e-9);
        assert_eq!(stats.min_confidence, 0.2);
        assert_eq!(stats.max_confidence, 0.8);
    }

    #[test]
    fn overall_confidence_is_last_step() {
        let mut trace = ReasoningTrace::new("ep-3", "domain");
        trace.push("a", "q1", "r1", "why1", 0.2);
        trace.push("b", "q2", "r2", "why2", 0.9);
        assert_eq!(TraceAnalyzer::new(&trace).overall_confidence(), 0.9);
    }
}
