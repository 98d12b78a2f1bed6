//! Text summary builder for headless output.
//!
//! Formats human-readable lines from the dashboard view, the same view the TUI draws.

use crate::simulation::DashboardView;
use std::collections::BTreeMap;
use std::fmt::Display;

/// How many recent events the final summary lists.
const SUMMARY_EVENTS: usize = 5;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// One progress line, printed on stderr whenever the completed count moves.
pub(crate) fn progress_line(view: &DashboardView) -> String {
    let status = view.status.map(|s| s.label()).unwrap_or("-");
    format!(
        "[{status}] {}/{} ({:.1}%) | success {} | elapsed {} | remaining {}",
        view.metrics.completed_iterations,
        view.metrics.total_iterations,
        view.progress_percent(),
        view.success_rate_text(),
        view.elapsed_text(),
        view.remaining_text(),
    )
}

fn join_map<V: Display>(map: &Option<BTreeMap<String, V>>) -> Option<String> {
    let map = map.as_ref().filter(|m| !m.is_empty())?;
    Some(
        map.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

pub(crate) fn build_text_summary(instance: &str, view: &DashboardView) -> TextSummary {
    let m = &view.metrics;
    let mut lines = Vec::new();

    lines.push(format!("Instance: {instance}"));
    lines.push(format!(
        "Status: {} (client: {})",
        view.status.map(|s| s.label()).unwrap_or("-"),
        view.state.label()
    ));
    lines.push(format!(
        "Iterations: {}/{} ({:.1}%)",
        m.completed_iterations,
        m.total_iterations,
        view.progress_percent()
    ));
    lines.push(format!(
        "Decisions: {} allowed / {} denied (success rate {})",
        m.success_count,
        m.failure_count,
        view.success_rate_text()
    ));
    lines.push(format!("Elapsed: {}", view.elapsed_text()));

    if let Some(calls) = join_map(&m.feature_calls) {
        lines.push(format!("Feature calls: {calls}"));
    }
    if let Some(quota) = join_map(&m.quota_remaining) {
        lines.push(format!("Quota remaining: {quota}"));
    }

    let events = view.events.entries();
    if !events.is_empty() {
        lines.push("Recent events:".to_string());
        for ev in events.iter().take(SUMMARY_EVENTS) {
            let verdict = if ev.allowed { "allowed" } else { "denied" };
            lines.push(format!(
                "  #{} {} {} {}",
                ev.iteration, ev.feature_id, verdict, ev.reason
            ));
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SimStatus, SimulationEvent};

    fn finished_view() -> DashboardView {
        let mut view = DashboardView::default();
        view.status = Some(SimStatus::Completed);
        view.metrics.total_iterations = 50;
        view.metrics.completed_iterations = 50;
        view.metrics.success_count = 40;
        view.metrics.failure_count = 10;
        view.metrics.elapsed_seconds = 25.0;
        view.metrics.feature_calls = Some(BTreeMap::from([
            ("export".to_string(), 20),
            ("reports".to_string(), 30),
        ]));
        view
    }

    #[test]
    fn summary_reports_totals_and_rate() {
        let summary = build_text_summary("abc123", &finished_view());
        assert_eq!(summary.lines[0], "Instance: abc123");
        assert!(summary.lines.contains(&"Iterations: 50/50 (100.0%)".to_string()));
        assert!(summary
            .lines
            .contains(&"Decisions: 40 allowed / 10 denied (success rate 80.0%)".to_string()));
        assert!(summary
            .lines
            .contains(&"Feature calls: export=20, reports=30".to_string()));
        assert!(!summary.lines.iter().any(|l| l.starts_with("Quota")));
    }

    #[test]
    fn summary_lists_newest_events_first() {
        let mut view = finished_view();
        let events: Vec<_> = (1..=8)
            .map(|i| SimulationEvent {
                iteration: i,
                feature_id: "reports".into(),
                allowed: true,
                reason: "ok".into(),
                ..Default::default()
            })
            .collect();
        view.events.replace_from(&events);
        let summary = build_text_summary("abc123", &view);
        let listed: Vec<_> = summary
            .lines
            .iter()
            .filter(|l| l.starts_with("  #"))
            .collect();
        assert_eq!(listed.len(), SUMMARY_EVENTS);
        assert_eq!(listed[0], "  #8 reports allowed ok");
    }

    #[test]
    fn progress_line_without_decisions() {
        let mut view = DashboardView::default();
        view.status = Some(SimStatus::Running);
        view.metrics.total_iterations = 10;
        assert_eq!(
            progress_line(&view),
            "[running] 0/10 (0.0%) | success 0% | elapsed - | remaining -"
        );
    }
}
