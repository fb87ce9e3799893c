//! Timeout Controller: detects a stuck current-contributor and evicts them
//! so the circuit's queue can advance.

use ceremony_primitives::{Circuit, MillisTimestamp, TimeoutWindow};

/// The contribution budget, in milliseconds, a circuit's current
/// contributor is allowed before being considered stuck.
///
/// `DYNAMIC`: `avgTimings.contributionComputation + avgTimings.verifyCloudFunction`,
/// plus `tolerance_pct` percent of that sum. `FIXED`: the circuit's
/// configured window, verbatim.
pub fn contribution_budget_millis(circuit: &Circuit) -> i64 {
    match circuit.timeout_window {
        TimeoutWindow::Fixed { window_millis } => window_millis,
        TimeoutWindow::Dynamic { tolerance_pct } => {
            let base = circuit.avg_timings.contribution_computation + circuit.avg_timings.verify_cloud_function;
            let tolerance = (base * tolerance_pct as i64) / 100;
            base + tolerance
        }
    }
}

/// Whether the current contributor, who started at `contribution_started_at`,
/// has blown through the circuit's budget as of `now`.
pub fn is_expired(circuit: &Circuit, contribution_started_at: MillisTimestamp, now: MillisTimestamp) -> bool {
    let deadline = contribution_started_at + contribution_budget_millis(circuit);
    deadline < now
}

#[cfg(test)]
mod tests {
    use ceremony_primitives::{AvgTimings, CircuitFiles, CircuitMetadata, WaitingQueue};

    use super::*;

    fn circuit_with(timeout_window: TimeoutWindow, avg_timings: AvgTimings) -> Circuit {
        Circuit {
            id: "c1".into(),
            prefix: "c1".into(),
            sequence_position: 1,
            metadata: CircuitMetadata::default(),
            files: CircuitFiles::default(),
            avg_timings,
            waiting_queue: WaitingQueue::default(),
            timeout_window,
        }
    }

    #[test]
    fn dynamic_budget_matches_worked_example() {
        let circuit = circuit_with(
            TimeoutWindow::Dynamic { tolerance_pct: 20 },
            AvgTimings { full_contribution: 0, verify_cloud_function: 2_000, contribution_computation: 10_000 },
        );
        assert_eq!(contribution_budget_millis(&circuit), 14_400);
    }

    #[test]
    fn eviction_triggers_exactly_past_the_deadline() {
        let circuit = circuit_with(
            TimeoutWindow::Dynamic { tolerance_pct: 20 },
            AvgTimings { full_contribution: 0, verify_cloud_function: 2_000, contribution_computation: 10_000 },
        );
        assert!(!is_expired(&circuit, 0, 14_400));
        assert!(is_expired(&circuit, 0, 14_401));
    }

    #[test]
    fn fixed_budget_ignores_avg_timings() {
        let circuit = circuit_with(TimeoutWindow::Fixed { window_millis: 5_000 }, AvgTimings::default());
        assert!(!is_expired(&circuit, 1_000, 5_999));
        assert!(is_expired(&circuit, 1_000, 6_001));
    }
}
