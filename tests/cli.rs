#![forbid(unsafe_code)]
use assert_cmd::Command;
use chrono::{Duration, NaiveDate};
use predicates::prelude::*;
use semainier::model::{Employee, Role, Roster};
use tempfile::tempdir;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn write_fixtures(dir: &std::path::Path) -> (String, String, String) {
    let roster = Roster {
        employees: vec![
            Employee::new("Ana", Role::Fdc, 39.0),
            Employee::new("Bea", Role::Fdc, 39.0),
            Employee::new("Carla", Role::Vdc, 39.0),
            Employee::new("Dora", Role::Vdc, 39.0),
        ],
        teams: vec![],
        templates: vec![],
    };
    let roster_path = dir.join("roster.json");
    std::fs::write(&roster_path, serde_json::to_string_pretty(&roster).unwrap()).unwrap();

    let forecast_path = dir.join("forecast.csv");
    let mut content = String::from("date,departures,arrivals,occupied\n");
    for i in 0..7 {
        content.push_str(&format!("{},1,1,6\n", monday() + Duration::days(i)));
    }
    std::fs::write(&forecast_path, content).unwrap();

    let plans_path = dir.join("plans");
    (
        roster_path.to_string_lossy().into_owned(),
        forecast_path.to_string_lossy().into_owned(),
        plans_path.to_string_lossy().into_owned(),
    )
}

fn cli() -> Command {
    Command::cargo_bin("semainier-cli").unwrap()
}

#[test]
fn generate_then_show_then_export() {
    let dir = tempdir().unwrap();
    let (roster, forecast, plans) = write_fixtures(dir.path());

    cli()
        .args([
            "--roster",
            roster.as_str(),
            "--plans",
            plans.as_str(),
            "generate",
            "--week",
            "2025-06-02",
            "--forecast",
            forecast.as_str(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Semaine du 2025-06-02"));

    cli()
        .args([
            "--roster",
            roster.as_str(),
            "--plans",
            plans.as_str(),
            "show",
            "--week",
            "2025-06-02",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Heures :"));

    let out_csv = dir.path().join("plan.csv").to_string_lossy().into_owned();
    cli()
        .args([
            "--roster",
            roster.as_str(),
            "--plans",
            plans.as_str(),
            "export",
            "--week",
            "2025-06-02",
            "--out-csv",
            out_csv.as_str(),
        ])
        .assert()
        .success();
    let exported = std::fs::read_to_string(&out_csv).unwrap();
    assert!(exported.starts_with("date,block,assignee"));
}

#[test]
fn check_reports_full_coverage() {
    let dir = tempdir().unwrap();
    let (roster, forecast, plans) = write_fixtures(dir.path());

    cli()
        .args([
            "--roster",
            roster.as_str(),
            "--plans",
            plans.as_str(),
            "generate",
            "--week",
            "2025-06-02",
            "--forecast",
            forecast.as_str(),
        ])
        .assert()
        .success();

    cli()
        .args([
            "--roster",
            roster.as_str(),
            "--plans",
            plans.as_str(),
            "check",
            "--week",
            "2025-06-02",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("couverture complète"));
}

#[test]
fn generate_refuses_mismatched_week() {
    let dir = tempdir().unwrap();
    let (roster, forecast, plans) = write_fixtures(dir.path());

    cli()
        .args([
            "--roster",
            roster.as_str(),
            "--plans",
            plans.as_str(),
            "generate",
            "--week",
            "2025-06-09",
            "--forecast",
            forecast.as_str(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2025-06-09"));
}
