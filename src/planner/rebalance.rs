//! Contrôle couvertures (via la répartition intra-journée) puis phase E :
//! rééquilibrage soir → matin quand le matin reste sous son minimum.

use super::types::{HOURS_EPS, MIN_ASSIGNABLE_HOURS};
use super::{DayInfo, PlanBuild};
use crate::config::MAX_ELASTICITY_MIN_PER_DAY;
use crate::distribution::{
    check_couverture, CouvertureResolution, DayPeriods, DayWorker, IdleCandidate, ShiftOrigin,
};
use crate::model::{
    AlertKind, AssigneeRef, EmployeeId, PlanningAlert, Role, Severity, ShiftBlock,
};

/// Plafond de passes par jour : chaque ajout consomme un candidat, le
/// déficit décroît strictement, la boucle ne peut donc pas tourner au-delà.
const MAX_COUVERTURE_PASSES: u32 = 8;

/// Recours couvertures, dans l'ordre imposé : ajouter un travailleur aux
/// heures disponibles, sinon élasticité plafonnée, sinon alerte UNDERSTAFF.
pub(super) fn resolve_couverture(build: &mut PlanBuild) {
    let (Some(day_cfg), Some(evening_cfg)) = (
        build.config.block(ShiftBlock::Day),
        build.config.block(ShiftBlock::Evening),
    ) else {
        return;
    };
    let periods = DayPeriods::derive(day_cfg, evening_cfg, build.config.couverture_earliest());

    let days = build.days.clone();
    for day in &days {
        let mut passes = 0;
        loop {
            passes += 1;
            if passes > MAX_COUVERTURE_PASSES {
                break;
            }

            let evening_workers = evening_workers_of(build, day);
            let idle = idle_candidates(build, day);
            let check = check_couverture(
                day.couvertures,
                &evening_workers,
                &periods,
                build.config,
                &idle,
            );

            match check.resolution {
                CouvertureResolution::Covered { .. } => break,
                CouvertureResolution::AddWorker { candidates, .. } => {
                    let Some(best) = candidates.first() else { break };
                    let cap = build.states[&best.id].remaining();
                    if build
                        .assign_with_landing(&best.id, day.date, ShiftBlock::Evening, cap)
                        .is_none()
                    {
                        break;
                    }
                    // Capacité accrue : on recontrôle le même jour.
                }
                CouvertureResolution::Elasticity {
                    extra_min_per_person,
                    deficit_min,
                } => {
                    apply_elasticity(build, day, extra_min_per_person, deficit_min);
                    break;
                }
                CouvertureResolution::Unresolved {
                    deficit_min,
                    extra_persons_needed,
                } => {
                    push_understaff(build, day, deficit_min, extra_persons_needed);
                    break;
                }
            }
        }
    }
}

fn evening_workers_of(build: &PlanBuild, day: &DayInfo) -> Vec<DayWorker> {
    build
        .assignments
        .iter()
        .filter(|a| a.date == day.date && a.block == ShiftBlock::Evening && !a.is_day_off)
        .filter_map(|a| match &a.assignee {
            AssigneeRef::Employee(id) => {
                let emp = build.roster.find_employee(id)?;
                Some(DayWorker {
                    id: id.clone(),
                    short_name: emp.short_name().to_string(),
                    origin: ShiftOrigin::Evening,
                    elasticity: emp.elasticity,
                })
            }
            AssigneeRef::Team(_) => None,
        })
        .collect()
}

/// Employés libres ce jour avec des heures restantes, les membres de
/// paires FIXED exclus (les ajouter seuls casserait l'invariant de paire).
fn idle_candidates(build: &PlanBuild, day: &DayInfo) -> Vec<IdleCandidate> {
    let mut idle: Vec<IdleCandidate> = build
        .ordered
        .iter()
        .filter(|id| {
            let state = &build.states[*id];
            !state.in_fixed_pair
                && state.remaining() >= MIN_ASSIGNABLE_HOURS
                && build.is_free_for(*id, day.date, ShiftBlock::Evening)
        })
        .map(|id| IdleCandidate {
            id: id.clone(),
            name: build.employee(id).name.clone(),
            remaining_hours: build.states[id].remaining(),
        })
        .collect();
    idle.sort_by(|a, b| {
        b.remaining_hours
            .partial_cmp(&a.remaining_hours)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    idle
}

/// Étire les vacations du soir dans la limite du plafond par niveau, du
/// plafond journalier absolu et du reliquat hebdomadaire de chacun.
fn apply_elasticity(
    build: &mut PlanBuild,
    day: &DayInfo,
    extra_min_per_person: i64,
    deficit_min: i64,
) {
    let idxs: Vec<usize> = build
        .assignments
        .iter()
        .enumerate()
        .filter(|(_, a)| a.date == day.date && a.block == ShiftBlock::Evening && !a.is_day_off)
        .map(|(i, _)| i)
        .collect();

    let mut total_extra = 0i64;
    for idx in idxs {
        let AssigneeRef::Employee(id) = build.assignments[idx].assignee.clone() else {
            continue;
        };
        let Some(emp) = build.roster.find_employee(&id) else {
            continue;
        };
        let rule = build.config.elasticity_rule(emp.elasticity);
        let state = build.states.get_mut(&id).expect("state");
        let day_cap = rule.max_day_minutes().min(MAX_ELASTICITY_MIN_PER_DAY);
        let week_left = rule.max_week_minutes() - state.extra_minutes_used;
        let extra = extra_min_per_person.min(day_cap).min(week_left).max(0);
        if extra == 0 {
            continue;
        }
        state.extra_minutes_used += extra;
        state.assigned_hours += extra as f64 / 60.0;
        build.assignments[idx].assigned_hours += extra as f64 / 60.0;
        total_extra += extra;
    }

    if total_extra > 0 {
        build.alerts.push(PlanningAlert {
            date: day.date,
            block: Some(ShiftBlock::Evening),
            kind: AlertKind::Info,
            severity: Severity::Low,
            title: "Élasticité utilisée — couvertures".to_string(),
            message: format!(
                "+{} min/personne demandées, {} min absorbées au total",
                extra_min_per_person, total_extra
            ),
        });
    } else {
        // Plafonds déjà épuisés : le déficit reste entier.
        push_understaff(build, day, deficit_min, 1);
    }
}

fn push_understaff(build: &mut PlanBuild, day: &DayInfo, deficit_min: i64, extra_persons: u32) {
    let already = build.alerts.iter().any(|a| {
        a.kind == AlertKind::Understaff
            && a.date == day.date
            && a.block == Some(ShiftBlock::Evening)
    });
    if already {
        return;
    }
    build.alerts.push(PlanningAlert {
        date: day.date,
        block: Some(ShiftBlock::Evening),
        kind: AlertKind::Understaff,
        severity: if extra_persons >= 2 {
            Severity::High
        } else {
            Severity::Medium
        },
        title: "Couvertures non couvertes".to_string(),
        message: format!(
            "Déficit de {} min, {} personne(s) supplémentaire(s) nécessaire(s)",
            deficit_min, extra_persons
        ),
    });
}

/// Phase E : tant qu'un matin reste sous le minimum du bloc DAY et que le
/// soir peut céder quelqu'un sans passer sous son propre minimum, déplace
/// un travailleur mobile (hors paire FIXED) du soir vers le matin. Chaque
/// déplacement réduit le déficit d'une personne : la boucle termine.
pub(super) fn rebalance_mornings(build: &mut PlanBuild) {
    let (Some(day_cfg), Some(evening_cfg)) = (
        build.config.block(ShiftBlock::Day),
        build.config.block(ShiftBlock::Evening),
    ) else {
        return;
    };
    let day_min = day_cfg.min_staff;
    let evening_min = evening_cfg.min_staff;

    let days = build.days.clone();
    for day in &days {
        if day.morning_needed == 0 {
            // Pas de travail chambre ce jour : aucun plancher à imposer.
            continue;
        }
        loop {
            if build.headcount(day.date, ShiftBlock::Day) >= day_min {
                break;
            }
            if build.headcount(day.date, ShiftBlock::Evening) <= evening_min {
                break;
            }
            let Some(idx) = movable_evening_assignment(build, day) else {
                break;
            };

            let moved = build.assignments.remove(idx);
            let AssigneeRef::Employee(id) = moved.assignee.clone() else {
                continue;
            };
            let role = build.employee(&id).role;
            build
                .states
                .get_mut(&id)
                .expect("state")
                .assigned_hours -= moved.assigned_hours;

            let Some(full) = build.pick_template(role, ShiftBlock::Day, false) else {
                break;
            };
            let hours = moved.assigned_hours.min(full.hours());
            let short = hours + HOURS_EPS < full.hours();
            let code = if short {
                build
                    .pick_template(role, ShiftBlock::Day, true)
                    .unwrap_or(full)
                    .code
                    .clone()
            } else {
                full.code.clone()
            };
            build.record(&id, day.date, ShiftBlock::Day, hours, code);
        }
    }
}

/// Vacation du soir déplaçable : employé hors paire FIXED, éligible au
/// bloc DAY. Les FDC passent en premier, puis l'identifiant départage.
fn movable_evening_assignment(build: &PlanBuild, day: &DayInfo) -> Option<usize> {
    let mut candidates: Vec<(bool, EmployeeId, usize)> = Vec::new();
    for (idx, a) in build.assignments.iter().enumerate() {
        if a.date != day.date || a.block != ShiftBlock::Evening || a.is_day_off {
            continue;
        }
        let AssigneeRef::Employee(id) = &a.assignee else {
            continue;
        };
        let state = &build.states[id];
        if state.in_fixed_pair {
            continue;
        }
        let emp = build.employee(id);
        if !emp.can_work_block(ShiftBlock::Day) {
            continue;
        }
        candidates.push((emp.role != Role::Fdc, id.clone(), idx));
    }
    candidates
        .into_iter()
        .min_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)))
        .map(|(_, _, idx)| idx)
}
