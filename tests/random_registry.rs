//! Random property-based testing of the issue registry
//!
//! Each seed drives a generated action sequence through a real store and the
//! in-memory reference model; after every step the reloaded store must match
//! the model and both sides must have reported the same output.

use issue_base::generator::{ActionExecutor, ActionGenerator, RegistryAction};
use issue_base::logging::init_test_logging;
use similar_asserts::assert_eq;
use tempfile::TempDir;

fn run_seed(seed: u64, steps: usize) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let actions = ActionGenerator::new(seed).generate(steps);
    let mut executor = ActionExecutor::new(dir.path());

    for (n, action) in actions.iter().enumerate() {
        let outcome = executor
            .step(action)
            .unwrap_or_else(|e| panic!("seed {} step {} '{}' failed: {:#}", seed, n, action, e));

        assert_eq!(
            outcome.expected_output,
            outcome.actual_output,
            "output mismatch at seed {} step {} '{}'",
            seed,
            n,
            action
        );
        assert_eq!(
            outcome.expected,
            outcome.actual,
            "state mismatch at seed {} step {} '{}'",
            seed,
            n,
            action
        );
    }
}

#[test]
fn random_sequences_match_reference() {
    init_test_logging();
    for seed in 0..8 {
        run_seed(seed, 60);
    }
}

#[test]
fn long_sequence_matches_reference() {
    init_test_logging();
    run_seed(42, 300);
}

#[test]
fn same_second_creations_keep_both_issues() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let mut executor = ActionExecutor::new(dir.path());

    for same_second in [false, true, true] {
        let action = RegistryAction::Create {
            name: "burst".to_string(),
            info: None,
            urge: 1,
            same_second,
        };
        executor.step(&action).unwrap();
    }

    let snapshot = executor.reference().snapshot();
    assert_eq!(snapshot.len(), 3);
    assert!(snapshot.iter().all(|i| i.date == snapshot[0].date));
}
