#![forbid(unsafe_code)]
use chrono::{Duration, NaiveDate};
use semainier::config::PlanningConfig;
use semainier::model::{ForecastDay, WeekForecast};
use semainier::staffing::{
    compute_day_load, compute_requirement, compute_week, evening_persons_needed,
    morning_persons_needed,
};

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn day(departures: u32, arrivals: u32, occupied: u32) -> ForecastDay {
    ForecastDay {
        date: monday(),
        departures,
        arrivals,
        occupied,
    }
}

#[test]
fn evening_threshold_table() {
    assert_eq!(evening_persons_needed(0), 0);
    assert_eq!(evening_persons_needed(10), 1);
    assert_eq!(evening_persons_needed(13), 1);
    assert_eq!(evening_persons_needed(14), 2);
    assert_eq!(evening_persons_needed(25), 2);
    assert_eq!(evening_persons_needed(26), 3);
    assert_eq!(evening_persons_needed(38), 3);
    assert_eq!(evening_persons_needed(39), 4);
}

#[test]
fn day_load_uses_pair_minutes() {
    let cfg = PlanningConfig::default();
    let load = compute_day_load(&day(3, 3, 27), &cfg.tasks);
    // 24 recouches : les arrivées ne se recouchent pas.
    assert_eq!(load.recouches, 24);
    assert_eq!(load.room_work_min, 3 * 50 + 24 * 20);
    assert_eq!(load.couv_work_min, 27 * 15);
}

#[test]
fn morning_floor_applies_only_with_remaining_work() {
    let cfg = PlanningConfig::default();
    // Entraide du soir (3 pers × 5 h) absorbe tout : personne le matin.
    assert_eq!(morning_persons_needed(630, 3, &cfg), 0);
    // Sans soir : 630 min / 480 min arrondit à 1, plancher à 2.
    assert_eq!(morning_persons_needed(630, 0, &cfg), 2);
    // Grosse charge : l'arrondi dépasse le plancher.
    assert_eq!(morning_persons_needed(2000, 0, &cfg), 4);
    // Aucun travail : pas de plancher.
    assert_eq!(morning_persons_needed(0, 0, &cfg), 0);
}

#[test]
fn requirement_for_reference_day() {
    let cfg = PlanningConfig::default();
    let req = compute_requirement(&day(3, 3, 27), &cfg);
    assert_eq!(req.evening_persons, 3);
    assert_eq!(req.morning_persons, 0);
}

#[test]
fn partially_covered_morning_keeps_min_staff() {
    let cfg = PlanningConfig::default();
    // 730 min restants / 480 → 2 personnes, au-dessus du plancher.
    assert_eq!(morning_persons_needed(1030, 1, &cfg), 2);
}

#[test]
fn week_requirements_cover_seven_days() {
    let cfg = PlanningConfig::default();
    let days: Vec<ForecastDay> = (0..7)
        .map(|i| ForecastDay {
            date: monday() + Duration::days(i),
            departures: 2,
            arrivals: 1,
            occupied: 20,
        })
        .collect();
    let forecast = WeekForecast::new(days).unwrap();
    let (loads, reqs) = compute_week(&forecast, &cfg);
    assert_eq!(loads.len(), 7);
    assert_eq!(reqs.len(), 7);
    assert!(reqs.iter().all(|r| r.evening_persons == 2));
}

#[test]
fn forecast_week_is_validated() {
    let mut days: Vec<ForecastDay> = (0..7)
        .map(|i| ForecastDay {
            date: monday() + Duration::days(i),
            departures: 0,
            arrivals: 0,
            occupied: 0,
        })
        .collect();
    assert!(WeekForecast::new(days[..6].to_vec()).is_err());

    // Trou dans la séquence
    days[3].date = days[3].date + Duration::days(1);
    assert!(WeekForecast::new(days.clone()).is_err());

    // Départ un mardi
    let tuesday: Vec<ForecastDay> = (0..7)
        .map(|i| ForecastDay {
            date: monday() + Duration::days(1 + i),
            departures: 0,
            arrivals: 0,
            occupied: 0,
        })
        .collect();
    assert!(WeekForecast::new(tuesday).is_err());
}
