use chrono::NaiveDate;
use resource_engine::aggregation::aggregate;
use resource_engine::conflict::detect;
use resource_engine::{Allocation, CapacityEngine, EngineConfig, Resource, Severity};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn engine(resources: Vec<Resource>, allocations: Vec<Allocation>) -> CapacityEngine {
    CapacityEngine::from_parts(EngineConfig::default(), resources, allocations, Vec::new())
}

#[test]
fn single_overallocation_is_one_low_episode() {
    let engine = engine(
        vec![Resource::new("electrician", 8.0)],
        vec![
            Allocation::new("a1", "electrician", "wiring", d(2025, 4, 7), d(2025, 4, 9), 60.0),
            Allocation::new("a2", "electrician", "panels", d(2025, 4, 7), d(2025, 4, 9), 60.0),
        ],
    );
    let report = engine.detect_conflicts(None).unwrap();
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.episodes.len(), 1);

    let episode = &report.episodes[0];
    assert_eq!(episode.resource_id, "electrician");
    assert_eq!(episode.date_start, d(2025, 4, 7));
    assert_eq!(episode.date_end, d(2025, 4, 9));
    assert_eq!(episode.day_count, 3);
    assert!((episode.max_excess - 1.6).abs() < 1e-9);
    assert!((episode.peak_load - 9.6).abs() < 1e-9);
    assert_eq!(episode.severity, Severity::Low);
    assert_eq!(episode.allocation_ids, vec!["a1", "a2"]);
    assert_eq!(episode.activity_ids, vec!["panels", "wiring"]);
}

#[test]
fn no_conflict_when_load_never_exceeds_capacity() {
    let allocations = vec![
        Allocation::new("a1", "r", "x", d(2025, 1, 1), d(2025, 1, 31), 50.0),
        Allocation::new("a2", "r", "y", d(2025, 1, 10), d(2025, 1, 20), 50.0),
        Allocation::new("a3", "r", "z", d(2025, 2, 1), d(2025, 2, 3), 100.0),
    ];
    let report = engine(vec![Resource::new("r", 8.0)], allocations)
        .detect_conflicts(Some("r"))
        .unwrap();
    assert!(report.episodes.is_empty());
    assert!(report.is_clean());
}

#[test]
fn episodes_are_maximal_and_every_day_is_over_capacity() {
    let allocations = vec![
        Allocation::new("base", "r", "x", d(2025, 1, 1), d(2025, 1, 31), 80.0),
        Allocation::new("p1", "r", "y", d(2025, 1, 5), d(2025, 1, 8), 40.0),
        Allocation::new("p2", "r", "z", d(2025, 1, 9), d(2025, 1, 10), 30.0),
        Allocation::new("p3", "r", "w", d(2025, 1, 20), d(2025, 1, 21), 200.0),
    ];
    let refs: Vec<&Allocation> = allocations.iter().collect();
    let loads = aggregate(&refs, 8.0, 3660).unwrap();
    let episodes = detect("r", &loads, 8.0).unwrap();

    // p1 and p2 are back to back, so one run from the 5th to the 10th
    assert_eq!(episodes.len(), 2);
    assert_eq!((episodes[0].date_start, episodes[0].date_end), (d(2025, 1, 5), d(2025, 1, 10)));
    assert_eq!(episodes[0].day_count, 6);
    assert_eq!((episodes[1].date_start, episodes[1].date_end), (d(2025, 1, 20), d(2025, 1, 21)));
    assert_eq!(episodes[1].severity, Severity::Critical);

    for episode in &episodes {
        for (date, load) in loads.range(episode.date_start..=episode.date_end) {
            assert!(load.total > 8.0, "{date} inside episode is not over capacity");
        }
        let before = episode.date_start.pred_opt().unwrap();
        let after = episode.date_end.succ_opt().unwrap();
        for edge in [before, after] {
            let total = loads.get(&edge).map(|l| l.total).unwrap_or(0.0);
            assert!(total <= 8.0, "{edge} next to episode is over capacity");
        }
    }
}

#[test]
fn severity_is_monotonic_in_excess() {
    let capacity = 8.0;
    let mut previous = Severity::Low;
    for step in 1..=400 {
        let excess = step as f64 * 0.05;
        let severity = Severity::classify(excess, capacity);
        assert!(severity >= previous, "severity dropped at excess {excess}");
        previous = severity;
    }
    assert_eq!(previous, Severity::Critical);
}

#[test]
fn severity_tiers_match_excess_ratio() {
    let make = |pct: f64| {
        engine(
            vec![Resource::new("r", 10.0)],
            vec![Allocation::new("a", "r", "x", d(2025, 1, 1), d(2025, 1, 1), pct)],
        )
        .detect_conflicts(Some("r"))
        .unwrap()
        .episodes[0]
            .severity
    };
    assert_eq!(make(120.0), Severity::Low);
    assert_eq!(make(130.0), Severity::Medium);
    assert_eq!(make(160.0), Severity::High);
    assert_eq!(make(210.0), Severity::Critical);
}

#[test]
fn batch_detection_skips_invalid_resources_and_keeps_order() {
    let resources = vec![
        Resource::new("alpha", 8.0),
        Resource::new("broken", 0.0),
        Resource::new("gamma", 4.0),
        Resource::new("delta", 8.0),
    ];
    let allocations = vec![
        Allocation::new("g1", "gamma", "x", d(2025, 1, 1), d(2025, 1, 2), 150.0),
        Allocation::new("a1", "alpha", "x", d(2025, 1, 5), d(2025, 1, 5), 150.0),
        Allocation::new("b1", "broken", "x", d(2025, 1, 1), d(2025, 1, 2), 50.0),
        Allocation::new("d1", "delta", "x", d(2025, 1, 9), d(2025, 1, 1), 50.0),
        Allocation::new("o1", "ghost", "x", d(2025, 1, 1), d(2025, 1, 1), 50.0),
    ];
    let report = engine(resources, allocations).detect_conflicts(None).unwrap();

    let owners: Vec<&str> = report.episodes.iter().map(|e| e.resource_id.as_str()).collect();
    assert_eq!(owners, vec!["alpha", "gamma"]);

    let skipped: Vec<&str> = report
        .diagnostics
        .iter()
        .map(|diag| diag.resource_id.as_str())
        .collect();
    assert_eq!(skipped, vec!["broken", "delta", "ghost"]);
    assert!(report.diagnostics[0].reason.contains("non-positive"));
    assert!(report.diagnostics[1].reason.contains("precedes"));
}
