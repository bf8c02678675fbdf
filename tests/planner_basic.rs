#![forbid(unsafe_code)]
use chrono::{Duration, NaiveDate};
use semainier::config::{default_templates, PlanningConfig};
use semainier::model::{
    AlertKind, AssigneeRef, Employee, ForecastDay, PlanStatus, Role, Roster, ShiftBlock, Team,
    TeamKind, WeekForecast,
};
use semainier::planner::{PlanError, WeekPlanner};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn flat_forecast(departures: u32, arrivals: u32, occupied: u32) -> WeekForecast {
    let days: Vec<ForecastDay> = (0..7)
        .map(|i| ForecastDay {
            date: monday() + Duration::days(i),
            departures,
            arrivals,
            occupied,
        })
        .collect();
    WeekForecast::new(days).unwrap()
}

/// Six employés : quatre à 39 h, une paire FIXED à 32 h, tous
/// DAY + EVENING.
fn roster_six() -> Roster {
    let mut employees = vec![
        Employee::new("Ana", Role::Fdc, 39.0),
        Employee::new("Bea", Role::Fdc, 39.0),
        Employee::new("Carla", Role::Vdc, 39.0),
        Employee::new("Dora", Role::Vdc, 39.0),
        Employee::new("Emma", Role::Fdc, 32.0),
        Employee::new("Flora", Role::Fdc, 32.0),
    ];
    let team = Team::new(
        "Emma + Flora",
        employees[4].id.clone(),
        employees[5].id.clone(),
        TeamKind::Fixed,
    );
    employees.sort_by(|a, b| a.name.cmp(&b.name));
    Roster {
        employees,
        teams: vec![team],
        templates: default_templates(),
    }
}

fn roster_two() -> Roster {
    Roster {
        employees: vec![
            Employee::new("Ana", Role::Fdc, 39.0),
            Employee::new("Bea", Role::Vdc, 39.0),
        ],
        teams: vec![],
        templates: default_templates(),
    }
}

#[test]
fn week_start_must_be_a_monday() {
    let roster = roster_six();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    let forecast = flat_forecast(2, 1, 10);

    let err = planner
        .generate(monday() + Duration::days(1), &forecast)
        .unwrap_err();
    assert!(matches!(err, PlanError::NotMonday(_)));
}

#[test]
fn forecast_must_match_requested_week() {
    let roster = roster_six();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    let forecast = flat_forecast(2, 1, 10);

    let other_monday = monday() + Duration::days(7);
    let err = planner.generate(other_monday, &forecast).unwrap_err();
    assert!(matches!(err, PlanError::ForecastMismatch { .. }));
}

#[test]
fn generation_is_deterministic() {
    let roster = roster_six();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    let forecast = flat_forecast(3, 3, 27);

    let p1 = planner.generate(monday(), &forecast).unwrap();
    let p2 = planner.generate(monday(), &forecast).unwrap();

    let a1 = serde_json::to_string(&p1.assignments).unwrap();
    let a2 = serde_json::to_string(&p2.assignments).unwrap();
    assert_eq!(a1, a2);
    assert_eq!(p1.alerts, p2.alerts);
}

#[test]
fn regeneration_is_idempotent_and_keeps_identity() {
    let roster = roster_six();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    let forecast = flat_forecast(3, 3, 27);

    let plan = planner.generate(monday(), &forecast).unwrap();
    let once = planner.regenerate(&plan, &forecast).unwrap();
    let twice = planner.regenerate(&once, &forecast).unwrap();

    assert_eq!(once.id, plan.id);
    assert_eq!(once, twice);
}

#[test]
fn non_draft_plan_cannot_be_regenerated() {
    let roster = roster_six();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    let forecast = flat_forecast(3, 3, 27);

    let mut plan = planner.generate(monday(), &forecast).unwrap();
    plan.status = PlanStatus::Published;
    let err = planner.regenerate(&plan, &forecast).unwrap_err();
    assert!(matches!(err, PlanError::PlanNotDraft(_, PlanStatus::Published)));
}

#[test]
fn fixed_pair_shares_days_and_block_all_week() {
    let roster = roster_six();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    let plan = planner.generate(monday(), &flat_forecast(3, 3, 27)).unwrap();

    let team = &roster.teams[0];
    let [a, b] = &team.members;
    for date in plan.days() {
        let of = |id: &semainier::EmployeeId| {
            plan.assignments_on(date)
                .find(|x| x.assignee == AssigneeRef::Employee(id.clone()))
                .map(|x| x.block)
        };
        let (block_a, block_b) = (of(a), of(b));
        assert_eq!(
            block_a, block_b,
            "pair must share working days and block on {date}"
        );
    }
    // La paire atterrit exactement sur le plus petit objectif.
    assert!((plan.hours_of(a) - 32.0).abs() < 0.01);
    assert!((plan.hours_of(b) - 32.0).abs() < 0.01);
}

#[test]
fn employee_has_one_assignment_per_day() {
    let roster = roster_six();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    let plan = planner.generate(monday(), &flat_forecast(3, 3, 27)).unwrap();

    let mut seen = std::collections::BTreeSet::new();
    for a in plan.assignments.iter().filter(|a| !a.is_day_off) {
        assert!(
            seen.insert((a.date, a.assignee.clone())),
            "duplicate assignment for {:?} on {}",
            a.assignee,
            a.date
        );
    }
}

#[test]
fn hours_stay_within_target_or_alerted_elasticity() {
    let roster = roster_six();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    let plan = planner.generate(monday(), &flat_forecast(3, 3, 27)).unwrap();

    for emp in &roster.employees {
        let hours = plan.hours_of(&emp.id);
        let excess = hours - emp.weekly_hours_target;
        if excess > 0.01 {
            let elasticity_alerted = plan
                .alerts
                .iter()
                .any(|a| a.kind == AlertKind::Info && a.block == Some(ShiftBlock::Evening));
            assert!(
                elasticity_alerted,
                "{} exceeds target without an elasticity alert",
                emp.name
            );
            let ceiling = config.elasticity_rule(emp.elasticity).max_extra_hours_week;
            assert!(
                excess <= ceiling + 0.01,
                "{} exceeds the elasticity ceiling ({excess:.2}h > {ceiling:.2}h)",
                emp.name
            );
        }
    }
}

#[test]
fn understaffing_yields_exactly_one_alert_per_day_and_block() {
    let roster = roster_two();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    // 39 occupées → 4 personnes le soir, impossible avec 2 employés.
    let plan = planner.generate(monday(), &flat_forecast(5, 0, 39)).unwrap();

    for date in plan.days() {
        let need = plan.requirement_on(date).unwrap().evening_persons;
        let have = plan.headcount(date, ShiftBlock::Evening) as u32;
        let alerts = plan
            .alerts
            .iter()
            .filter(|a| {
                a.kind == AlertKind::Understaff
                    && a.date == date
                    && a.block == Some(ShiftBlock::Evening)
            })
            .count();
        if have < need {
            assert_eq!(alerts, 1, "one UNDERSTAFF expected on {date}");
        }
    }
}

#[test]
fn reference_scenario_covers_evenings_or_alerts() {
    let roster = roster_six();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    let forecast = flat_forecast(3, 3, 27);
    let plan = planner.generate(monday(), &forecast).unwrap();

    assert_eq!(plan.status, PlanStatus::Draft);
    for date in plan.days() {
        let req = plan.requirement_on(date).unwrap();
        assert_eq!(req.evening_persons, 3);
        let have = plan.headcount(date, ShiftBlock::Evening) as u32;
        let understaffed = plan.alerts.iter().any(|a| {
            a.kind == AlertKind::Understaff
                && a.date == date
                && a.block == Some(ShiftBlock::Evening)
        });
        assert!(
            have >= req.evening_persons || understaffed,
            "evening of {date}: {have} assigned, no alert"
        );
    }
}

#[test]
fn rest_days_are_two_consecutive_days_spread_over_the_week() {
    let roster = roster_six();
    let config = PlanningConfig::default();
    let planner = WeekPlanner::new(&roster, &config);
    let plan = planner.generate(monday(), &flat_forecast(3, 3, 27)).unwrap();

    // Chaque employé travaille au plus 5 jours : 2 jours de repos posés.
    for emp in &roster.employees {
        let worked: Vec<NaiveDate> = plan
            .assignments
            .iter()
            .filter(|a| !a.is_day_off && a.assignee == AssigneeRef::Employee(emp.id.clone()))
            .map(|a| a.date)
            .collect();
        assert!(
            worked.len() <= 5,
            "{} works {} days, rest days were not honored",
            emp.name,
            worked.len()
        );
    }
}
