use chrono::NaiveDate;
use resource_engine::repository::{
    AllocationRepository, CsvDirectoryRepository, Dataset, InMemoryRepository, RepositoryError,
    ResourceRepository, load_dataset_from_json, save_dataset_to_json,
};
use resource_engine::{
    Allocation, AssignmentPeriod, CapacityEngine, CostRates, CurvePreset, EngineConfig, GroupBy,
    RateType, Resource, ResourceCategory,
};
use std::fs;
use tempfile::{NamedTempFile, TempDir};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_dataset() -> Dataset {
    let mut period = AssignmentPeriod::new("a1", d(2025, 1, 6), d(2025, 1, 12));
    period.planned_cost = 1_000.0;
    period.actual_cost = 800.0;
    period.earned_value = 900.0;

    let mut dataset = Dataset {
        resources: vec![
            Resource::new("welder", 8.0)
                .with_name("Welder crew")
                .with_category(ResourceCategory::Labor)
                .with_cost_rates(CostRates {
                    hourly_rate: 60.0,
                    overtime_rate: Some(90.0),
                    per_use_cost: None,
                    fixed_cost: Some(250.0),
                    additional_rates: vec![70.0, 80.0],
                }),
            Resource::new("rig", 12.0).with_category(ResourceCategory::Equipment),
        ],
        allocations: vec![
            Allocation::new("a1", "welder", "seams", d(2025, 1, 6), d(2025, 1, 10), 75.0)
                .with_curve("ramp")
                .with_rate_type(RateType::Tier(1)),
            Allocation::new("a2", "welder", "repairs", d(2025, 1, 8), d(2025, 1, 9), 50.0),
        ],
        periods: vec![period],
        ..Dataset::default()
    };
    dataset
        .curves
        .insert("ramp".into(), CurvePreset::BackLoaded.curve());
    dataset
}

#[test]
fn json_dataset_round_trip() {
    let dataset = sample_dataset();
    let tmp = NamedTempFile::new().expect("temp file");
    save_dataset_to_json(&dataset, tmp.path()).unwrap();
    let loaded = load_dataset_from_json(tmp.path()).unwrap();
    assert_eq!(loaded, dataset);

    let engine =
        CapacityEngine::load(EngineConfig::default(), &InMemoryRepository::from(loaded)).unwrap();
    let curve = engine.resolve_curve(Some("ramp")).unwrap();
    assert_eq!(curve, CurvePreset::BackLoaded.curve());
    let report = engine.detect_conflicts(None).unwrap();
    assert_eq!(report.episodes.len(), 1);
    assert_eq!(report.episodes[0].date_start, d(2025, 1, 8));
    assert_eq!(report.episodes[0].date_end, d(2025, 1, 9));
}

#[test]
fn json_dataset_with_bad_curve_is_rejected() {
    let tmp = NamedTempFile::new().expect("temp file");
    fs::write(
        tmp.path(),
        r#"{"resources":[{"id":"r","daily_capacity":8}],"curves":{"bad":[0,10,100]}}"#,
    )
    .unwrap();
    assert!(matches!(
        load_dataset_from_json(tmp.path()),
        Err(RepositoryError::Serialization(_))
    ));
}

#[test]
fn json_dataset_uses_defaults_for_optional_fields() {
    let tmp = NamedTempFile::new().expect("temp file");
    fs::write(
        tmp.path(),
        r#"{
            "resources": [{"id": "r", "daily_capacity": 8}],
            "allocations": [{
                "id": "a", "resource_id": "r", "activity_id": "x",
                "date_start": "2025-01-01", "date_end": "2025-01-02", "percent_units": 50
            }]
        }"#,
    )
    .unwrap();
    let dataset = load_dataset_from_json(tmp.path()).unwrap();
    assert_eq!(dataset.resources[0].category, ResourceCategory::Other);
    assert_eq!(dataset.allocations[0].rate_type, RateType::Standard);
    assert!(dataset.allocations[0].curve_reference.is_none());
    assert!(dataset.periods.is_empty());
}

#[test]
fn csv_directory_loads_all_tables() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("resources.csv"),
        "id,name,daily_capacity,category,hourly_rate,overtime_rate,per_use_cost,fixed_cost,additional_rates\n\
         welder,Welder crew,8,labor,60,90,,250,70;80\n\
         rig,,12,equipment,,,,,\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("allocations.csv"),
        "id,resource_id,activity_id,date_start,date_end,percent_units,curve_reference,rate_type\n\
         a1,welder,seams,2025-01-06,2025-01-10,75,bell,tier_1\n\
         a2,welder,repairs,2025-01-08,2025-01-09,50,,\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("periods.csv"),
        "allocation_id,period_start,period_end,planned_quantity,actual_quantity,remaining_quantity,planned_cost,actual_cost,remaining_cost,earned_value\n\
         a1,2025-01-06,2025-01-12,30,,,1000,800,200,900\n",
    )
    .unwrap();

    let repo = CsvDirectoryRepository::new(dir.path());
    let resources = repo.resources().unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0].cost_rates.additional_rates, vec![70.0, 80.0]);
    assert_eq!(resources[0].cost_rates.per_use_cost, None);
    assert_eq!(resources[1].cost_rates.hourly_rate, 0.0);

    let allocations = repo.allocations().unwrap();
    assert_eq!(allocations[0].rate_type, RateType::Tier(1));
    assert_eq!(allocations[0].curve_reference.as_deref(), Some("bell"));
    assert_eq!(allocations[1].curve_reference, None);

    let periods = repo.assignment_periods().unwrap();
    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].earned_value, 900.0);

    let engine = CapacityEngine::load(EngineConfig::default(), &repo).unwrap();
    let curve = engine.build_s_curve(GroupBy::Week);
    assert_eq!(curve.metrics.bac, 1_000.0);
    assert!((curve.metrics.cpi - 900.0 / 800.0).abs() < 1e-12);
}

#[test]
fn csv_directory_without_periods_file_is_fine() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("resources.csv"), "id,daily_capacity\nr,8\n").unwrap();
    fs::write(
        dir.path().join("allocations.csv"),
        "id,resource_id,activity_id,date_start,date_end,percent_units\na,r,x,2025-01-01,2025-01-01,10\n",
    )
    .unwrap();
    let dataset = CsvDirectoryRepository::new(dir.path()).load_dataset().unwrap();
    assert!(dataset.periods.is_empty());
    assert_eq!(dataset.allocations.len(), 1);
}

#[test]
fn csv_bad_date_is_invalid_data() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("allocations.csv"),
        "id,resource_id,activity_id,date_start,date_end,percent_units\na,r,x,01/02/2025,2025-01-03,10\n",
    )
    .unwrap();
    let err = CsvDirectoryRepository::new(dir.path()).allocations().unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidData(msg) if msg.contains("01/02/2025")));
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_repository_round_trip() {
    use resource_engine::repository::SqliteRepository;

    let tmp = NamedTempFile::new().expect("temp file");
    let dataset = sample_dataset();
    {
        let repo = SqliteRepository::open(tmp.path()).unwrap();
        repo.save_dataset(&dataset).unwrap();
    }

    let repo = SqliteRepository::open(tmp.path()).unwrap();
    let mut resources = repo.resources().unwrap();
    resources.sort_by(|a, b| a.id.cmp(&b.id));
    let mut expected = dataset.resources.clone();
    expected.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(resources, expected);
    assert_eq!(repo.allocations().unwrap(), dataset.allocations);
    assert_eq!(repo.assignment_periods().unwrap(), dataset.periods);
    assert_eq!(
        repo.curves().unwrap().get("ramp"),
        Some(CurvePreset::BackLoaded.curve())
    );

    let engine = CapacityEngine::load(EngineConfig::default(), &repo).unwrap();
    assert_eq!(engine.resources().len(), 2);
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_save_replaces_previous_dataset() {
    use resource_engine::repository::SqliteRepository;

    let repo = SqliteRepository::in_memory().unwrap();
    repo.save_dataset(&sample_dataset()).unwrap();
    let smaller = Dataset {
        resources: vec![Resource::new("solo", 4.0)],
        ..Dataset::default()
    };
    repo.save_dataset(&smaller).unwrap();
    assert_eq!(repo.resources().unwrap(), smaller.resources);
    assert!(repo.allocations().unwrap().is_empty());
    assert!(repo.curves().unwrap().custom_names().next().is_none());
}

#[test]
fn csv_nan_units_become_a_diagnostic_not_a_conflict() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("resources.csv"),
        "id,daily_capacity\ncrane,8\nwelder,8\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("allocations.csv"),
        "id,resource_id,activity_id,date_start,date_end,percent_units\n\
         a1,crane,lift,2025-01-06,2025-01-07,NaN\n\
         a2,welder,seams,2025-01-06,2025-01-07,150\n",
    )
    .unwrap();

    let repo = CsvDirectoryRepository::new(dir.path());
    assert!(repo.allocations().unwrap()[0].percent_units.is_nan());

    let engine = CapacityEngine::load(EngineConfig::default(), &repo).unwrap();
    let report = engine.detect_conflicts(None).unwrap();
    assert_eq!(report.episodes.len(), 1);
    assert_eq!(report.episodes[0].resource_id, "welder");
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].resource_id, "crane");
    assert!(report.diagnostics[0].reason.contains("non-finite"));
}
