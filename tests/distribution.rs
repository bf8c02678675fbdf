#![forbid(unsafe_code)]
use chrono::NaiveTime;
use semainier::config::PlanningConfig;
use semainier::distribution::{
    check_couverture, distribute, form_units, CouvertureResolution, DayPeriods, DayWorker,
    IdleCandidate, ShiftOrigin, Unit,
};
use semainier::model::{ElasticityLevel, EmployeeId, ShiftBlock, Team, TeamKind};
use semainier::report::format_spare;

fn worker(id: &str, name: &str, elasticity: ElasticityLevel) -> DayWorker {
    DayWorker {
        id: EmployeeId::new(id),
        short_name: name.to_string(),
        origin: ShiftOrigin::Evening,
        elasticity,
    }
}

fn default_periods(cfg: &PlanningConfig) -> DayPeriods {
    DayPeriods::derive(
        cfg.block(ShiftBlock::Day).unwrap(),
        cfg.block(ShiftBlock::Evening).unwrap(),
        cfg.couverture_earliest(),
    )
}

#[test]
fn periods_follow_configured_times() {
    let cfg = PlanningConfig::default();
    let periods = default_periods(&cfg);
    assert_eq!(periods.morning_alone.minutes(), 210); // 09:00-12:30
    assert_eq!(periods.overlap.minutes(), 270); // 13:30-18:00
    assert_eq!(periods.evening_finish.minutes(), 30); // 18:00-18:30
    assert_eq!(periods.couverture.minutes(), 180); // 19:00-22:00
    assert_eq!(
        periods.couverture.start,
        NaiveTime::from_hms_opt(19, 0, 0).unwrap()
    );
}

#[test]
fn configured_pairs_first_then_leftover_solo() {
    let workers: Vec<DayWorker> = ["w1", "w2", "w3", "w4", "w5"]
        .iter()
        .map(|id| worker(id, id, ElasticityLevel::Medium))
        .collect();
    let team = Team::new(
        "w1 + w3",
        workers[0].id.clone(),
        workers[2].id.clone(),
        TeamKind::Fixed,
    );
    let teams = vec![&team];

    let units = form_units(&workers, &teams);
    assert_eq!(units.len(), 3);
    match &units[0] {
        Unit::Pair { a, b, configured } => {
            assert!(*configured);
            assert_eq!(a.id, workers[0].id);
            assert_eq!(b.id, workers[2].id);
        }
        _ => panic!("expected configured pair first"),
    }
    match &units[1] {
        Unit::Pair { configured, .. } => assert!(!configured),
        _ => panic!("expected improvised pair"),
    }
    assert!(matches!(&units[2], Unit::Solo { .. }));
    assert_eq!(units[2].members().len(), 1);
}

#[test]
fn distribution_is_proportional_and_conserves_rooms() {
    let cfg = PlanningConfig::default();
    let workers: Vec<DayWorker> = ["w1", "w2", "w3", "w4"]
        .iter()
        .map(|id| worker(id, id, ElasticityLevel::Medium))
        .collect();
    let team = Team::new(
        "w1 + w3",
        workers[0].id.clone(),
        workers[2].id.clone(),
        TeamKind::Fixed,
    );
    let units = form_units(&workers, &[&team]);
    assert_eq!(units.len(), 2);

    let result = distribute(&units, 4, 10, 210, &cfg.tasks);
    // Quota 200 min/unité : la première paire prend les 4 départs, la
    // seconde les 10 recouches.
    assert_eq!(result.units[0].departs, 4);
    assert_eq!(result.units[0].recouches, 0);
    assert_eq!(result.units[1].departs, 0);
    assert_eq!(result.units[1].recouches, 10);
    assert_eq!(result.departs_remaining, 0);
    assert_eq!(result.recouches_remaining, 0);
    assert_eq!(result.units[0].spare_min, 10);
    assert_eq!(result.units[1].spare_min, 10);
}

#[test]
fn solo_works_at_solo_rate_with_rebalance() {
    let cfg = PlanningConfig::default();
    let solo = [worker("w1", "w1", ElasticityLevel::Medium)];
    let units = form_units(&solo, &[]);

    let result = distribute(&units, 2, 0, 210, &cfg.tasks);
    // Premier passage : 1 départ (quota au ratio solo), le rééquilibrage
    // borné case le second dans la capacité restante.
    assert_eq!(result.units[0].departs, 2);
    assert_eq!(result.units[0].spare_min, 60);
    assert_eq!(result.departs_remaining, 0);
}

#[test]
fn overload_stays_bounded_and_reports_remainder() {
    let cfg = PlanningConfig::default();
    let workers = [
        worker("w1", "w1", ElasticityLevel::Medium),
        worker("w2", "w2", ElasticityLevel::Medium),
    ];
    let units = form_units(&workers, &[]);
    assert_eq!(units.len(), 1);

    let result = distribute(&units, 100, 0, 210, &cfg.tasks);
    // 210 min / 50 min par départ : 4 au maximum, le reste est rendu.
    assert_eq!(result.units[0].departs, 4);
    assert_eq!(result.units[0].spare_min, 10);
    assert_eq!(result.departs_remaining, 96);
}

#[test]
fn couverture_prefers_adding_a_worker_over_elasticity() {
    let cfg = PlanningConfig::default();
    let periods = default_periods(&cfg);
    let evening = [
        worker("w1", "Ana", ElasticityLevel::Medium),
        worker("w2", "Bea", ElasticityLevel::Medium),
    ];
    let idle = [IdleCandidate {
        id: EmployeeId::new("w9"),
        name: "Carla".to_string(),
        remaining_hours: 8.0,
    }];

    // 30 couvertures × 15 min = 450 min > 2 × 180 min de capacité.
    let with_idle = check_couverture(30, &evening, &periods, &cfg, &idle);
    assert!(matches!(
        with_idle.resolution,
        CouvertureResolution::AddWorker { .. }
    ));

    // Sans personne disponible : élasticité plafonnée, arrondie au quart.
    let without_idle = check_couverture(30, &evening, &periods, &cfg, &[]);
    match without_idle.resolution {
        CouvertureResolution::Elasticity {
            extra_min_per_person,
            deficit_min,
        } => {
            assert_eq!(deficit_min, 90);
            assert_eq!(extra_min_per_person, 45);
        }
        other => panic!("expected elasticity, got {other:?}"),
    }
}

#[test]
fn couverture_without_elasticity_is_unresolved() {
    let cfg = PlanningConfig::default();
    let periods = default_periods(&cfg);
    let evening = [
        worker("w1", "Ana", ElasticityLevel::Low),
        worker("w2", "Bea", ElasticityLevel::Low),
    ];
    let check = check_couverture(30, &evening, &periods, &cfg, &[]);
    match check.resolution {
        CouvertureResolution::Unresolved {
            deficit_min,
            extra_persons_needed,
        } => {
            assert_eq!(deficit_min, 90);
            assert_eq!(extra_persons_needed, 1);
        }
        other => panic!("expected unresolved, got {other:?}"),
    }
}

#[test]
fn covered_couverture_reports_spare() {
    let cfg = PlanningConfig::default();
    let periods = default_periods(&cfg);
    let evening = [worker("w1", "Ana", ElasticityLevel::Medium)];
    let check = check_couverture(6, &evening, &periods, &cfg, &[]);
    match check.resolution {
        CouvertureResolution::Covered { spare_min } => assert_eq!(spare_min, 90),
        other => panic!("expected covered, got {other:?}"),
    }
}

#[test]
fn spare_time_formatting() {
    insta::assert_snapshot!(format_spare(90, 2), @"+45min/pers (+1.5h total)");
    insta::assert_snapshot!(format_spare(45, 1), @"+45min");
    insta::assert_snapshot!(format_spare(120, 1), @"+2.0h");
    insta::assert_snapshot!(format_spare(-30, 1), @"-30min");
    insta::assert_snapshot!(format_spare(0, 3), @"0min");
}
