//! Calcul des besoins en personnel à partir d'une journée de prévision.
//!
//! Le soir est dicté par le barème sur le nombre brut de chambres occupées
//! (une couverture par chambre) ; le matin se déduit de la charge en
//! minutes restant après l'entraide apportée par l'équipe du soir.

use crate::config::{PlanningConfig, TaskKind, TaskTimingTable};
use crate::model::{ForecastDay, ShiftBlock, StaffingRequirement, WeekForecast};

/// Barème métier : personnes nécessaires au soir selon les couvertures.
///
/// - > 38 couvertures → 4 personnes
/// - > 25 couvertures → 3 personnes
/// - > 13 couvertures → 2 personnes
/// - 1 à 13 couvertures → 1 personne
/// - 0 couverture → 0 personne
pub fn evening_persons_needed(occupied: u32) -> u32 {
    if occupied > 38 {
        4
    } else if occupied > 25 {
        3
    } else if occupied > 13 {
        2
    } else if occupied > 0 {
        1
    } else {
        0
    }
}

/// Charge de travail d'une journée, en minutes-paire par type de tâche.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayLoad {
    pub date: chrono::NaiveDate,
    pub departs: u32,
    pub recouches: u32,
    pub couvertures: u32,
    /// Minutes de chambres (départs + recouches), base paire.
    pub room_work_min: i64,
    /// Minutes de couvertures.
    pub couv_work_min: i64,
}

impl DayLoad {
    pub fn total_minutes(&self) -> i64 {
        self.room_work_min + self.couv_work_min
    }
}

pub fn compute_day_load(day: &ForecastDay, tasks: &TaskTimingTable) -> DayLoad {
    let depart_min = i64::from(tasks.get(TaskKind::Depart).pair_minutes);
    let recouch_min = i64::from(tasks.get(TaskKind::Recouch).pair_minutes);
    let couv_min = i64::from(tasks.get(TaskKind::Couverture).pair_minutes);

    let departs = day.departures;
    let recouches = day.stays();
    let couvertures = day.occupied;

    DayLoad {
        date: day.date,
        departs,
        recouches,
        couvertures,
        room_work_min: i64::from(departs) * depart_min + i64::from(recouches) * recouch_min,
        couv_work_min: i64::from(couvertures) * couv_min,
    }
}

/// Personnes du matin : charge chambre restante après l'entraide du soir,
/// plancher `min_staff` seulement s'il reste du travail.
pub fn morning_persons_needed(
    room_work_min: i64,
    evening_persons: u32,
    config: &PlanningConfig,
) -> u32 {
    let day_cfg = match config.block(ShiftBlock::Day) {
        Some(cfg) => cfg,
        None => return 0,
    };
    let helps_hours = config
        .block(ShiftBlock::Evening)
        .map(|c| c.helps_other_shift_hours)
        .unwrap_or(0.0);

    let evening_help_min = (f64::from(evening_persons) * helps_hours * 60.0).round() as i64;
    let remaining_min = (room_work_min - evening_help_min).max(0);
    if remaining_min == 0 {
        return 0;
    }

    let shift_min = day_cfg.work_minutes().max(1);
    let persons = (remaining_min as f64 / shift_min as f64).round() as u32;
    persons.max(day_cfg.min_staff)
}

/// Besoin d'une journée : barème du soir puis dérivation du matin.
pub fn compute_requirement(day: &ForecastDay, config: &PlanningConfig) -> StaffingRequirement {
    let load = compute_day_load(day, &config.tasks);
    let evening = evening_persons_needed(day.occupied);
    let morning = morning_persons_needed(load.room_work_min, evening, config);
    StaffingRequirement {
        date: day.date,
        morning_persons: morning,
        evening_persons: evening,
    }
}

/// Charges et besoins pour les 7 jours d'une semaine validée.
pub fn compute_week(
    forecast: &WeekForecast,
    config: &PlanningConfig,
) -> (Vec<DayLoad>, Vec<StaffingRequirement>) {
    let loads: Vec<DayLoad> = forecast
        .days()
        .iter()
        .map(|d| compute_day_load(d, &config.tasks))
        .collect();
    let requirements: Vec<StaffingRequirement> = forecast
        .days()
        .iter()
        .map(|d| compute_requirement(d, config))
        .collect();
    (loads, requirements)
}
