#![forbid(unsafe_code)]
use chrono::{Duration, NaiveDate};
use semainier::io::{import_forecast_csv, into_week_forecast};
use semainier::model::{ForecastDay, PlanId, PlanStatus, WeekPlan};
use semainier::storage::{JsonPlanStore, PlanStore, WeekLockRegistry};
use tempfile::tempdir;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn plan(id: &str, week_start: NaiveDate, status: PlanStatus) -> WeekPlan {
    let forecast: Vec<ForecastDay> = (0..7)
        .map(|i| ForecastDay {
            date: week_start + Duration::days(i),
            departures: 1,
            arrivals: 1,
            occupied: 10,
        })
        .collect();
    WeekPlan {
        id: PlanId::new(id),
        week_start,
        status,
        forecast,
        requirements: vec![],
        assignments: vec![],
        alerts: vec![],
    }
}

#[test]
fn save_and_load_roundtrip() {
    let dir = tempdir().unwrap();
    let store = JsonPlanStore::open(dir.path()).unwrap();

    let original = plan("p1", monday(), PlanStatus::Draft);
    store.save(&original).unwrap();

    let loaded = store.load(monday()).unwrap().unwrap();
    assert_eq!(loaded, original);
    assert_eq!(store.load(monday() + Duration::days(7)).unwrap(), None);
}

#[test]
fn non_draft_file_is_never_silently_overwritten() {
    let dir = tempdir().unwrap();
    let store = JsonPlanStore::open(dir.path()).unwrap();

    store
        .save(&plan("p1", monday(), PlanStatus::Published))
        .unwrap();

    // Autre identifiant, même semaine : refusé.
    let err = store.save(&plan("p2", monday(), PlanStatus::Draft)).unwrap_err();
    assert!(err.to_string().contains("PUBLISHED"));

    // Même identifiant : transition de statut autorisée.
    store
        .save(&plan("p1", monday(), PlanStatus::Archived))
        .unwrap();
}

#[test]
fn delete_and_list() {
    let dir = tempdir().unwrap();
    let store = JsonPlanStore::open(dir.path()).unwrap();

    let w1 = monday();
    let w2 = monday() + Duration::days(7);
    store.save(&plan("p1", w1, PlanStatus::Draft)).unwrap();
    store.save(&plan("p2", w2, PlanStatus::Draft)).unwrap();

    assert_eq!(store.list().unwrap(), vec![w1, w2]);
    assert!(store.delete(w1).unwrap());
    assert!(!store.delete(w1).unwrap());
    assert_eq!(store.list().unwrap(), vec![w2]);
}

#[test]
fn forecast_csv_import_and_rejection() {
    let dir = tempdir().unwrap();
    let ok_path = dir.path().join("forecast.csv");
    let mut content = String::from("date,departures,arrivals,occupied\n");
    for i in 0..7 {
        content.push_str(&format!("{},2,1,20\n", monday() + Duration::days(i)));
    }
    std::fs::write(&ok_path, &content).unwrap();

    let days = import_forecast_csv(&ok_path).unwrap();
    assert_eq!(days.len(), 7);
    assert_eq!(days[0].occupied, 20);
    let forecast = into_week_forecast(days).unwrap();
    assert_eq!(forecast.week_start(), monday());

    // Une valeur négative doit être rejetée avec la ligne en cause.
    let bad_path = dir.path().join("bad.csv");
    std::fs::write(
        &bad_path,
        "date,departures,arrivals,occupied\n2025-06-02,-1,0,10\n",
    )
    .unwrap();
    let err = import_forecast_csv(&bad_path).unwrap_err();
    assert!(err.to_string().contains("negative"));
}

#[test]
fn week_lock_serializes_same_week_only() {
    let registry = WeekLockRegistry::new();
    let w1 = monday();
    let w2 = monday() + Duration::days(7);

    let guard = registry.try_lock(w1).unwrap();
    assert!(registry.try_lock(w1).is_none());
    // Une autre semaine reste indépendante.
    assert!(registry.try_lock(w2).is_some());

    drop(guard);
    assert!(registry.try_lock(w1).is_some());
}
