//! Canonical orderings shared by the translator, report generator and harness.
//!
//! Every code path that emits into a report goes through these sorts; the
//! orderings are the cross-cutting determinism contract and are enforced in
//! exactly one place.

use crate::types::{ManualStep, ViewDef, Warning};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Sort warnings into their canonical total order:
/// severity (most severe first), then object name, then message.
pub fn sort_warnings(warnings: &mut [Warning]) {
    warnings.sort();
}

/// Deduplicate manual steps on `(object_name, action)` keeping the first
/// occurrence, then sort by the same key.
pub fn dedup_and_sort_steps(steps: Vec<ManualStep>) -> Vec<ManualStep> {
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    let mut out: Vec<ManualStep> = Vec::with_capacity(steps.len());
    for step in steps {
        let key = (step.object_name.clone(), step.action.clone());
        if seen.insert(key) {
            out.push(step);
        }
    }
    out.sort();
    out
}

/// The outcome of a topological ordering pass over view dependencies.
#[derive(Debug, Clone, Default)]
pub struct ViewOrdering {
    /// View names in creation order.
    pub order: Vec<String>,
    /// One entry per cycle break, naming the view that was forced out.
    pub cycle_breaks: Vec<String>,
}

/// Order views so every view is created after the views it reads from.
///
/// Ties are broken lexically so the order is stable across runs. Cycles are
/// tolerated: the lexically smallest remaining view is forced out and the
/// break is recorded (and logged), never hidden.
pub fn topo_order_views(views: &[ViewDef]) -> ViewOrdering {
    let known: BTreeSet<&str> = views.iter().map(|v| v.name.as_str()).collect();

    // remaining view -> unmet dependencies (only on views in this set)
    let mut pending: BTreeMap<&str, BTreeSet<&str>> = views
        .iter()
        .map(|v| {
            let deps: BTreeSet<&str> = v
                .view_dependencies()
                .filter(|d| known.contains(d) && *d != v.name)
                .collect();
            (v.name.as_str(), deps)
        })
        .collect();

    let mut ordering = ViewOrdering::default();

    while !pending.is_empty() {
        // BTreeMap iteration gives the lexically smallest ready view first.
        let next = pending
            .iter()
            .find(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name);

        let (name, forced) = match next {
            Some(name) => (name, false),
            None => {
                // Cycle: every remaining view waits on another. Force the
                // lexically smallest one out.
                let name = *pending.keys().next().expect("pending is non-empty");
                warn!(view = name, "view dependency cycle broken by lexical tie-break");
                (name, true)
            }
        };

        pending.remove(name);
        for deps in pending.values_mut() {
            deps.remove(name);
        }
        if forced {
            ordering.cycle_breaks.push(name.to_string());
        }
        ordering.order.push(name.to_string());
    }

    ordering
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DependencyKind, RiskLevel, ViewDependency};
    use proptest::prelude::*;

    fn view(name: &str, deps: &[&str]) -> ViewDef {
        ViewDef {
            schema: None,
            name: name.to_string(),
            definition: format!("SELECT 1 -- {name}"),
            dependencies: deps
                .iter()
                .map(|d| ViewDependency {
                    kind: DependencyKind::View,
                    name: d.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_topo_simple_chain() {
        let views = vec![view("v_b", &["v_a"]), view("v_a", &[])];
        let ordering = topo_order_views(&views);
        assert_eq!(ordering.order, vec!["v_a", "v_b"]);
        assert!(ordering.cycle_breaks.is_empty());
    }

    #[test]
    fn test_topo_lexical_tie_break() {
        let views = vec![view("v_c", &[]), view("v_a", &[]), view("v_b", &[])];
        let ordering = topo_order_views(&views);
        assert_eq!(ordering.order, vec!["v_a", "v_b", "v_c"]);
    }

    #[test]
    fn test_topo_dependent_after_dependency() {
        // Mirrors the five-view fixture shape: v_high_salary_employees reads
        // v_active_employees and must come strictly after it.
        let views = vec![
            view("v_active_employees", &[]),
            view("v_dept_employee_count", &[]),
            view("v_employee_details", &[]),
            view("v_high_salary_employees", &["v_active_employees"]),
            view("v_project_summary", &[]),
        ];
        let ordering = topo_order_views(&views);
        let pos = |n: &str| ordering.order.iter().position(|v| v == n).unwrap();
        assert!(pos("v_active_employees") < pos("v_high_salary_employees"));
        assert_eq!(ordering.order.len(), 5);
    }

    #[test]
    fn test_topo_cycle_broken_and_recorded() {
        let views = vec![view("v_a", &["v_b"]), view("v_b", &["v_a"])];
        let ordering = topo_order_views(&views);
        assert_eq!(ordering.order.len(), 2);
        // The lexically smallest view is forced out first.
        assert_eq!(ordering.cycle_breaks, vec!["v_a"]);
        assert_eq!(ordering.order[0], "v_a");
    }

    #[test]
    fn test_topo_ignores_external_dependencies() {
        let views = vec![view("v_a", &["somewhere_else"])];
        let ordering = topo_order_views(&views);
        assert_eq!(ordering.order, vec!["v_a"]);
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let steps = vec![
            ManualStep::new("v1", "rewrite", "first reason"),
            ManualStep::new("v1", "rewrite", "second reason"),
            ManualStep::new("v1", "review", "r"),
        ];
        let out = dedup_and_sort_steps(steps);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].action, "review");
        assert_eq!(out[1].reason, "first reason");
    }

    proptest! {
        #[test]
        fn prop_sort_warnings_is_idempotent(names in proptest::collection::vec("[a-z]{1,6}", 0..20)) {
            let severities = [
                RiskLevel::Safe,
                RiskLevel::Low,
                RiskLevel::Medium,
                RiskLevel::High,
                RiskLevel::Critical,
            ];
            let mut warnings: Vec<Warning> = names
                .iter()
                .enumerate()
                .map(|(i, n)| Warning::new(severities[i % 5], n.clone(), format!("m{i}"), "r"))
                .collect();
            sort_warnings(&mut warnings);
            let once = warnings.clone();
            sort_warnings(&mut warnings);
            prop_assert_eq!(once, warnings);
        }

        #[test]
        fn prop_sorted_warnings_severity_monotone(names in proptest::collection::vec("[a-z]{1,6}", 1..20)) {
            let severities = [RiskLevel::Low, RiskLevel::Critical, RiskLevel::Medium];
            let mut warnings: Vec<Warning> = names
                .iter()
                .enumerate()
                .map(|(i, n)| Warning::new(severities[i % 3], n.clone(), "m", "r"))
                .collect();
            sort_warnings(&mut warnings);
            for pair in warnings.windows(2) {
                prop_assert!(pair[0].severity >= pair[1].severity);
            }
        }

        #[test]
        fn prop_dedup_is_idempotent(keys in proptest::collection::vec(("[a-c]{1,2}", "[a-c]{1,2}"), 0..20)) {
            let steps: Vec<ManualStep> = keys
                .iter()
                .map(|(o, a)| ManualStep::new(o.clone(), a.clone(), "r"))
                .collect();
            let once = dedup_and_sort_steps(steps);
            let twice = dedup_and_sort_steps(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}
