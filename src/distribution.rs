//! Répartition intra-journée : reconstruction des périodes, formation des
//! unités (paires/solo), distribution proportionnelle des chambres et
//! contrôle du déficit de couvertures (ajout de personnel avant
//! élasticité, élasticité plafonnée, sinon alerte).
//!
//! Tout est dérivé : rien de ce module n'est persisté comme état primaire.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::config::{
    round_up_to_quarter, PlanningConfig, ShiftBlockConfig, TaskKind, TaskTimingTable,
    MAX_ELASTICITY_MIN_PER_DAY,
};
use crate::model::{ElasticityLevel, EmployeeId, ForecastDay, Team};

/// Bloc d'origine d'un travailleur présent sur la journée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftOrigin {
    Morning,
    Evening,
}

/// Travailleur affecté à la journée examinée.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayWorker {
    pub id: EmployeeId,
    pub short_name: String,
    pub origin: ShiftOrigin,
    pub elasticity: ElasticityLevel,
}

/// Fenêtre horaire [start, end) d'une journée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Window {
    pub fn minutes(&self) -> i64 {
        ((self.end - self.start).num_minutes()).max(0)
    }
}

/// Les quatre fenêtres séquentielles d'une journée, reconstruites depuis
/// la configuration des blocs — jamais codées en dur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPeriods {
    /// Matin seul : début du bloc jour → pause déjeuner.
    pub morning_alone: Window,
    /// Matin + soir ensemble : fin de pause / début du soir → fin du jour.
    pub overlap: Window,
    /// Soir seul qui termine les chambres, avant sa pause repas.
    pub evening_finish: Window,
    /// Couvertures : après le repas du soir (ou la fenêtre de la tâche).
    pub couverture: Window,
}

impl DayPeriods {
    pub fn derive(
        day: &ShiftBlockConfig,
        evening: &ShiftBlockConfig,
        couverture_earliest: Option<NaiveTime>,
    ) -> Self {
        let overlap_start = day.break_end.max(evening.start);
        let overlap_end = day.end.min(evening.break_start);
        let couv_start = match couverture_earliest {
            Some(t) => evening.break_end.max(t),
            None => evening.break_end,
        };
        Self {
            morning_alone: Window {
                start: day.start,
                end: day.break_start,
            },
            overlap: Window {
                start: overlap_start,
                end: overlap_end.max(overlap_start),
            },
            evening_finish: Window {
                start: day.end,
                end: evening.break_start.max(day.end),
            },
            couverture: Window {
                start: couv_start,
                end: evening.end.max(couv_start),
            },
        }
    }
}

/// Unité de travail : paire (configurée ou improvisée) ou personne seule.
/// Une paire travaille au rythme `pair_minutes`, un solo au rythme
/// `solo_minutes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Unit {
    Pair {
        a: DayWorker,
        b: DayWorker,
        /// Paire issue d'un Team configuré (sinon improvisée pour le jour).
        configured: bool,
    },
    Solo {
        a: DayWorker,
    },
}

impl Unit {
    pub fn members(&self) -> Vec<&DayWorker> {
        match self {
            Unit::Pair { a, b, .. } => vec![a, b],
            Unit::Solo { a } => vec![a],
        }
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Unit::Pair { .. })
    }

    pub fn display(&self) -> String {
        match self {
            Unit::Pair {
                a,
                b,
                configured: true,
            } => format!("({}+{})", a.short_name, b.short_name),
            Unit::Pair {
                a,
                b,
                configured: false,
            } => format!("[{}+{}]", a.short_name, b.short_name),
            Unit::Solo { a } => a.short_name.clone(),
        }
    }
}

/// Forme les unités d'une journée : d'abord les paires configurées dont
/// les deux membres sont présents, puis des paires improvisées avec le
/// reste, au plus un solo.
pub fn form_units(workers: &[DayWorker], teams: &[&Team]) -> Vec<Unit> {
    let mut used = vec![false; workers.len()];
    let mut units = Vec::new();

    for team in teams {
        let pos_a = workers
            .iter()
            .enumerate()
            .position(|(i, w)| !used[i] && w.id == team.members[0]);
        let pos_b = workers
            .iter()
            .enumerate()
            .position(|(i, w)| !used[i] && w.id == team.members[1]);
        if let (Some(ia), Some(ib)) = (pos_a, pos_b) {
            used[ia] = true;
            used[ib] = true;
            units.push(Unit::Pair {
                a: workers[ia].clone(),
                b: workers[ib].clone(),
                configured: true,
            });
        }
    }

    let mut rest: Vec<&DayWorker> = workers
        .iter()
        .enumerate()
        .filter(|(i, _)| !used[*i])
        .map(|(_, w)| w)
        .collect();
    while rest.len() >= 2 {
        let a = rest.remove(0);
        let b = rest.remove(0);
        units.push(Unit::Pair {
            a: a.clone(),
            b: b.clone(),
            configured: false,
        });
    }
    if let Some(a) = rest.pop() {
        units.push(Unit::Solo { a: a.clone() });
    }
    units
}

/// Travail attribué à une unité pour une période.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitWork {
    pub unit: Unit,
    pub departs: u32,
    pub recouches: u32,
    pub spare_min: i64,
}

impl UnitWork {
    fn time_used(&self, tasks: &TaskTimingTable) -> i64 {
        let (d_min, r_min) = unit_rates(&self.unit, tasks);
        i64::from(self.departs) * d_min + i64::from(self.recouches) * r_min
    }
}

fn unit_rates(unit: &Unit, tasks: &TaskTimingTable) -> (i64, i64) {
    let depart = tasks.get(TaskKind::Depart);
    let recouch = tasks.get(TaskKind::Recouch);
    if unit.is_pair() {
        (
            i64::from(depart.pair_minutes),
            i64::from(recouch.pair_minutes),
        )
    } else {
        (
            i64::from(depart.solo_minutes),
            i64::from(recouch.solo_minutes),
        )
    }
}

/// Résultat de la distribution d'une période.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodDistribution {
    pub period_minutes: i64,
    pub units: Vec<UnitWork>,
    pub departs_remaining: u32,
    pub recouches_remaining: u32,
}

impl PeriodDistribution {
    pub fn total_spare_min(&self) -> i64 {
        self.units.iter().map(|u| u.spare_min).sum()
    }

    pub fn rooms_done(&self) -> u32 {
        self.units.iter().map(|u| u.departs + u.recouches).sum()
    }
}

/// Distribue les chambres restantes sur les unités d'une période.
///
/// Chaque unité reçoit un quota proportionnel (travail total / unités),
/// rempli en départs d'abord puis en recouches ; un solo voit son quota
/// réduit au ratio paire/solo. Trois passes de rééquilibrage au maximum
/// poussent le reliquat sur les unités ayant de la capacité, dans l'ordre
/// des unités — le reliquat décroît strictement à chaque attribution, la
/// boucle termine donc toujours.
pub fn distribute(
    units: &[Unit],
    departs: u32,
    recouches: u32,
    period_minutes: i64,
    tasks: &TaskTimingTable,
) -> PeriodDistribution {
    let depart = tasks.get(TaskKind::Depart);
    let recouch = tasks.get(TaskKind::Recouch);
    let depart_pair = i64::from(depart.pair_minutes);
    let recouch_pair = i64::from(recouch.pair_minutes);

    if units.is_empty() || period_minutes <= 0 {
        return PeriodDistribution {
            period_minutes: period_minutes.max(0),
            units: Vec::new(),
            departs_remaining: departs,
            recouches_remaining: recouches,
        };
    }

    let total_work_min = i64::from(departs) * depart_pair + i64::from(recouches) * recouch_pair;
    if total_work_min == 0 {
        let units = units
            .iter()
            .map(|u| UnitWork {
                unit: u.clone(),
                departs: 0,
                recouches: 0,
                spare_min: period_minutes,
            })
            .collect();
        return PeriodDistribution {
            period_minutes,
            units,
            departs_remaining: 0,
            recouches_remaining: 0,
        };
    }

    let quota = total_work_min as f64 / units.len() as f64;
    let mut out: Vec<UnitWork> = Vec::with_capacity(units.len());
    let mut departs_left = departs;
    let mut recouches_left = recouches;

    for unit in units {
        let (d_min, r_min) = unit_rates(unit, tasks);
        // Le quota d'un solo est ramené au ratio de vitesse paire/solo.
        let depart_ratio = depart_pair as f64 / d_min as f64;
        let recouch_ratio = recouch_pair as f64 / r_min as f64;

        let mut unit_departs = 0u32;
        let mut work_done = 0i64;

        if departs_left > 0 {
            let for_quota = ((quota / depart_pair as f64) * depart_ratio) as i64;
            let capacity = period_minutes / d_min;
            unit_departs = departs_left
                .min(for_quota.max(0) as u32)
                .min(capacity.max(0) as u32);
            work_done += i64::from(unit_departs) * d_min;
            departs_left -= unit_departs;
        }

        let mut unit_recouches = 0u32;
        if recouches_left > 0 {
            let quota_left = quota - i64::from(unit_departs) as f64 * depart_pair as f64;
            if quota_left > 0.0 {
                let for_quota = ((quota_left / recouch_pair as f64) * recouch_ratio) as i64;
                let capacity = (period_minutes - work_done) / r_min;
                unit_recouches = recouches_left
                    .min(for_quota.max(0) as u32)
                    .min(capacity.max(0) as u32);
                work_done += i64::from(unit_recouches) * r_min;
                recouches_left -= unit_recouches;
            }
        }

        out.push(UnitWork {
            unit: unit.clone(),
            departs: unit_departs,
            recouches: unit_recouches,
            spare_min: (period_minutes - work_done).max(0),
        });
    }

    // Rééquilibrage borné : au plus 3 passes sur le reliquat.
    for _ in 0..3 {
        if departs_left == 0 && recouches_left == 0 {
            break;
        }
        for work in out.iter_mut() {
            if departs_left == 0 && recouches_left == 0 {
                break;
            }
            let (d_min, r_min) = unit_rates(&work.unit, tasks);
            let mut available = period_minutes - work.time_used(tasks);

            if departs_left > 0 && available >= d_min {
                let extra = u32::try_from(available / d_min)
                    .unwrap_or(u32::MAX)
                    .min(departs_left);
                work.departs += extra;
                departs_left -= extra;
                available -= i64::from(extra) * d_min;
            }
            if recouches_left > 0 && available >= r_min {
                let extra = u32::try_from(available / r_min)
                    .unwrap_or(u32::MAX)
                    .min(recouches_left);
                work.recouches += extra;
                recouches_left -= extra;
                available -= i64::from(extra) * r_min;
            }
            work.spare_min = available.max(0);
        }
    }

    PeriodDistribution {
        period_minutes,
        units: out,
        departs_remaining: departs_left,
        recouches_remaining: recouches_left,
    }
}

/// Employé non affecté ce jour-là mais à qui il reste des heures
/// contractuelles : premier recours face à un déficit de couvertures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleCandidate {
    pub id: EmployeeId,
    pub name: String,
    pub remaining_hours: f64,
}

/// Issue du contrôle couvertures, dans l'ordre de priorité métier :
/// ajouter un travailleur, sinon élasticité plafonnée, sinon alerte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CouvertureResolution {
    Covered {
        spare_min: i64,
    },
    AddWorker {
        deficit_min: i64,
        candidates: Vec<IdleCandidate>,
    },
    Elasticity {
        deficit_min: i64,
        extra_min_per_person: i64,
    },
    Unresolved {
        deficit_min: i64,
        extra_persons_needed: u32,
    },
}

/// Bilan couvertures d'une journée.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouvertureCheck {
    pub work_min: i64,
    pub capacity_min: i64,
    pub period_min: i64,
    pub persons_assigned: u32,
    pub resolution: CouvertureResolution,
}

/// Contrôle la capacité couvertures du soir.
///
/// L'ordre des recours ne doit jamais être inversé : un employé avec des
/// heures disponibles passe toujours avant l'élasticité, et l'élasticité
/// reste plafonnée (par niveau, et à [`MAX_ELASTICITY_MIN_PER_DAY`]).
pub fn check_couverture(
    occupied: u32,
    evening_workers: &[DayWorker],
    periods: &DayPeriods,
    config: &PlanningConfig,
    idle: &[IdleCandidate],
) -> CouvertureCheck {
    let couv_min = i64::from(config.tasks.get(TaskKind::Couverture).pair_minutes);
    let period_min = periods.couverture.minutes();
    let persons = evening_workers.len() as u32;

    let work_min = i64::from(occupied) * couv_min;
    let capacity_min = i64::from(persons) * period_min;
    let deficit_min = work_min - capacity_min;

    let resolution = if deficit_min <= 0 {
        CouvertureResolution::Covered {
            spare_min: -deficit_min,
        }
    } else if !idle.is_empty() {
        CouvertureResolution::AddWorker {
            deficit_min,
            candidates: idle.to_vec(),
        }
    } else {
        let total_elasticity: i64 = evening_workers
            .iter()
            .map(|w| config.elasticity_rule(w.elasticity).max_day_minutes())
            .sum();
        let extra_raw = if persons > 0 {
            deficit_min as f64 / f64::from(persons)
        } else {
            deficit_min as f64
        };
        let extra_per_person = round_up_to_quarter(extra_raw.ceil() as i64);

        if persons > 0
            && extra_per_person <= MAX_ELASTICITY_MIN_PER_DAY
            && deficit_min <= total_elasticity
        {
            CouvertureResolution::Elasticity {
                deficit_min,
                extra_min_per_person: extra_per_person,
            }
        } else {
            let remaining = if extra_raw > MAX_ELASTICITY_MIN_PER_DAY as f64 {
                deficit_min - i64::from(persons) * MAX_ELASTICITY_MIN_PER_DAY
            } else {
                deficit_min - total_elasticity
            };
            let extra_persons = if period_min > 0 && remaining > 0 {
                u32::try_from((remaining + period_min - 1) / period_min).unwrap_or(u32::MAX)
            } else if remaining > 0 {
                1
            } else {
                0
            };
            CouvertureResolution::Unresolved {
                deficit_min,
                extra_persons_needed: extra_persons.max(1),
            }
        }
    };

    CouvertureCheck {
        work_min,
        capacity_min,
        period_min,
        persons_assigned: persons,
        resolution,
    }
}

/// Répartition complète d'une journée sur les quatre fenêtres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayDistribution {
    pub date: NaiveDate,
    pub periods: DayPeriods,
    pub morning: PeriodDistribution,
    pub overlap: PeriodDistribution,
    pub evening: PeriodDistribution,
    /// Chambres impossibles à caser après les trois périodes.
    pub rooms_deficit: u32,
    pub couverture: CouvertureCheck,
}

impl DayDistribution {
    pub fn has_deficit(&self) -> bool {
        self.rooms_deficit > 0
            || !matches!(
                self.couverture.resolution,
                CouvertureResolution::Covered { .. }
            )
    }
}

/// Calcule la répartition d'une journée à partir des effectifs affectés.
///
/// `idle` liste les employés non affectés ce jour avec des heures
/// restantes ; le planificateur s'en sert pour réagir à `AddWorker`.
pub fn compute_day_distribution(
    forecast: &ForecastDay,
    morning_workers: &[DayWorker],
    evening_workers: &[DayWorker],
    teams: &[&Team],
    config: &PlanningConfig,
    idle: &[IdleCandidate],
) -> Option<DayDistribution> {
    let day_cfg = config.block(crate::model::ShiftBlock::Day)?;
    let evening_cfg = config.block(crate::model::ShiftBlock::Evening)?;
    let periods = DayPeriods::derive(day_cfg, evening_cfg, config.couverture_earliest());

    let units_morning = form_units(morning_workers, teams);
    let mut both: Vec<DayWorker> = morning_workers.to_vec();
    both.extend_from_slice(evening_workers);
    let units_overlap = form_units(&both, teams);
    let units_evening = form_units(evening_workers, teams);

    let departs = forecast.departures;
    let recouches = forecast.stays();

    let morning = distribute(
        &units_morning,
        departs,
        recouches,
        periods.morning_alone.minutes(),
        &config.tasks,
    );
    let overlap = distribute(
        &units_overlap,
        morning.departs_remaining,
        morning.recouches_remaining,
        periods.overlap.minutes(),
        &config.tasks,
    );
    let evening = distribute(
        &units_evening,
        overlap.departs_remaining,
        overlap.recouches_remaining,
        periods.evening_finish.minutes(),
        &config.tasks,
    );

    let rooms_deficit = evening.departs_remaining + evening.recouches_remaining;
    let couverture = check_couverture(forecast.occupied, evening_workers, &periods, config, idle);

    Some(DayDistribution {
        date: forecast.date,
        periods,
        morning,
        overlap,
        evening,
        rooms_deficit,
        couverture,
    })
}
