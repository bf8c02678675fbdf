//! Phases C et D — complément glouton de la couverture jour par jour,
//! puis complétion des heures contractuelles restantes.

use chrono::NaiveDate;

use super::types::{DEFICIT_WEIGHT, MIN_ASSIGNABLE_HOURS, ROLE_BONUS};
use super::PlanBuild;
use crate::model::{EmployeeId, ShiftBlock};

/// Phase C : pour chaque jour (charge décroissante) et chaque bloc en
/// sous-effectif, affecte les meilleurs candidats disponibles. Un besoin
/// non comblé n'est pas une erreur : il ressortira en alerte.
pub(super) fn fill_coverage(build: &mut PlanBuild) {
    for day in build.days_by_workload() {
        for block in [ShiftBlock::Day, ShiftBlock::Evening] {
            let needed = day.needed(block);
            let mut have = build.headcount(day.date, block);
            if have >= needed {
                continue;
            }

            // Classement : rôle préféré d'abord, puis heures restantes
            // décroissantes, puis identifiant pour rester déterministe.
            let mut candidates: Vec<(bool, i64, EmployeeId)> = Vec::new();
            for id in &build.ordered {
                let state = &build.states[id];
                if state.in_fixed_pair
                    || state.remaining() < MIN_ASSIGNABLE_HOURS
                    || !build.is_free_for(id, day.date, block)
                {
                    continue;
                }
                let preferred = build.employee(id).role.preferred_block() == block;
                let remaining_min = (state.remaining() * 60.0).round() as i64;
                candidates.push((preferred, remaining_min, id.clone()));
            }
            candidates.sort_by(|x, y| {
                y.0.cmp(&x.0)
                    .then(y.1.cmp(&x.1))
                    .then(x.2.cmp(&y.2))
            });

            for (_, _, id) in candidates {
                if have >= needed {
                    break;
                }
                let cap = build.states[&id].remaining();
                if build.assign_with_landing(&id, day.date, block, cap).is_some() {
                    have += 1;
                }
            }
        }
    }
}

/// Phase D : chaque employé encore sous son objectif cherche le meilleur
/// créneau (jour, bloc) restant — charge du jour + déficit pondéré +
/// bonus de rôle — jusqu'à l'objectif ou épuisement des créneaux.
pub(super) fn complete_hours(build: &mut PlanBuild) {
    let mut under: Vec<(i64, EmployeeId)> = build
        .ordered
        .iter()
        .filter(|id| {
            let state = &build.states[*id];
            !state.in_fixed_pair && state.remaining() >= MIN_ASSIGNABLE_HOURS
        })
        .map(|id| {
            let remaining_min = (build.states[id].remaining() * 60.0).round() as i64;
            (remaining_min, id.clone())
        })
        .collect();
    under.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    for (_, id) in under {
        loop {
            let remaining = build.states[&id].remaining();
            if remaining < MIN_ASSIGNABLE_HOURS {
                break;
            }
            let Some((date, block)) = best_slot(build, &id) else {
                break;
            };
            if build.assign_with_landing(&id, date, block, remaining).is_none() {
                break;
            }
        }
    }
}

/// Parcours chronologique, DAY avant EVENING : à score égal le premier
/// créneau rencontré gagne, ce qui fige les égalités.
fn best_slot(build: &PlanBuild, id: &EmployeeId) -> Option<(NaiveDate, ShiftBlock)> {
    let preferred = build.employee(id).role.preferred_block();
    let mut best: Option<(i64, NaiveDate, ShiftBlock)> = None;

    for day in &build.days {
        for block in [ShiftBlock::Day, ShiftBlock::Evening] {
            if !build.is_free_for(id, day.date, block) {
                continue;
            }
            let deficit = i64::from(day.needed(block)) - i64::from(build.headcount(day.date, block));
            let bonus = if preferred == block { ROLE_BONUS } else { 0 };
            let score = day.workload_min + DEFICIT_WEIGHT * deficit + bonus;
            if best.map_or(true, |(s, _, _)| score > s) {
                best = Some((score, day.date, block));
            }
        }
    }
    best.map(|(_, date, block)| (date, block))
}
