//! Conflict resolution policy
//!
//! Decides skip vs. process for a feature once its conflict status is
//! known. Only the record-level decision lives here — polygon overwrite
//! protection is a separate gate in the writer and applies under every
//! policy.

use super::{ConflictDecisions, ConflictPolicy, DECISION_OVERWRITE};

/// Should this feature be skipped?
///
/// - `skip_all`: skip every conflicting feature
/// - `overwrite_all`: never skip on conflict
/// - `ask`: skip unless the operator opted this feature in
pub fn should_skip(
    has_conflict: bool,
    policy: ConflictPolicy,
    decisions: &ConflictDecisions,
    index: usize,
) -> bool {
    if !has_conflict {
        return false;
    }

    match policy {
        ConflictPolicy::SkipAll => true,
        ConflictPolicy::OverwriteAll => false,
        ConflictPolicy::Ask => decisions
            .get(&index)
            .map(|d| d != DECISION_OVERWRITE)
            .unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn no_conflict_never_skips() {
        let decisions = HashMap::new();
        for policy in [
            ConflictPolicy::SkipAll,
            ConflictPolicy::OverwriteAll,
            ConflictPolicy::Ask,
        ] {
            assert!(!should_skip(false, policy, &decisions, 0));
        }
    }

    #[test]
    fn skip_all_skips_conflicts() {
        assert!(should_skip(true, ConflictPolicy::SkipAll, &HashMap::new(), 0));
    }

    #[test]
    fn overwrite_all_processes_conflicts() {
        assert!(!should_skip(true, ConflictPolicy::OverwriteAll, &HashMap::new(), 0));
    }

    #[test]
    fn ask_skips_without_decision() {
        assert!(should_skip(true, ConflictPolicy::Ask, &HashMap::new(), 3));
    }

    #[test]
    fn ask_processes_with_overwrite_decision() {
        let mut decisions = HashMap::new();
        decisions.insert(3, "overwrite".to_string());
        assert!(!should_skip(true, ConflictPolicy::Ask, &decisions, 3));
        // Decision applies to its own index only
        assert!(should_skip(true, ConflictPolicy::Ask, &decisions, 4));
    }

    #[test]
    fn ask_skips_on_other_decision_values() {
        let mut decisions = HashMap::new();
        decisions.insert(3, "keep".to_string());
        assert!(should_skip(true, ConflictPolicy::Ask, &decisions, 3));
    }
}
