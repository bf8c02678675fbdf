//! Phase B — placement des paires FIXED, unité atomique : mêmes jours,
//! même bloc, mêmes heures pour les deux membres toute la semaine.

use super::types::HOURS_EPS;
use super::PlanBuild;
use crate::model::{AlertKind, PlanningAlert, Severity, ShiftBlock, Team};

pub(super) fn place_fixed_pairs(build: &mut PlanBuild) {
    let mut teams: Vec<Team> = build.roster.fixed_pairs().into_iter().cloned().collect();
    teams.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    for team in teams {
        let [a, b] = team.members.clone();
        if !build.states.contains_key(&a) || !build.states.contains_key(&b) {
            continue;
        }
        let (role_a, role_b) = (build.employee(&a).role, build.employee(&b).role);

        // Bloc commun aux deux membres, DAY de préférence.
        let both_day = build.employee(&a).can_work_block(ShiftBlock::Day)
            && build.employee(&b).can_work_block(ShiftBlock::Day);
        let both_evening = build.employee(&a).can_work_block(ShiftBlock::Evening)
            && build.employee(&b).can_work_block(ShiftBlock::Evening);
        let block = if both_day {
            ShiftBlock::Day
        } else if both_evening {
            ShiftBlock::Evening
        } else {
            build.alerts.push(PlanningAlert {
                date: build.days[0].date,
                block: None,
                kind: AlertKind::Warning,
                severity: Severity::Medium,
                title: format!("Paire sans bloc commun — {}", team.name),
                message: "Les deux membres n'ont aucun bloc horaire en commun".to_string(),
            });
            continue;
        };

        // Atterrir sur le plus petit des deux objectifs contractuels.
        let pair_target = build.states[&a]
            .target_hours
            .min(build.states[&b].target_hours);
        let mut assigned = 0.0;

        for day in build.days_by_workload() {
            if assigned + HOURS_EPS >= pair_target {
                break;
            }
            let date = day.date;
            if build.states[&a].rest_days.contains(&date)
                || build.states[&b].rest_days.contains(&date)
                || build.states[&a].days_assigned.contains(&date)
                || build.states[&b].days_assigned.contains(&date)
                || build.employee(&a).is_unavailable_on(date)
                || build.employee(&b).is_unavailable_on(date)
            {
                continue;
            }

            // Heures identiques pour les deux, calées sur la plantilla du
            // premier membre ; variante courte pour le dernier jour.
            let cap = pair_target - assigned;
            let Some(full) = build.pick_template(role_a, block, false) else {
                break;
            };
            let short = cap + HOURS_EPS < full.hours();
            let hours = if short {
                let tpl = build.pick_template(role_a, block, true).unwrap_or(full);
                cap.min(tpl.hours())
            } else {
                full.hours()
            };
            if hours <= 0.0 {
                break;
            }

            for (id, role) in [(&a, role_a), (&b, role_b)] {
                let code = build
                    .pick_template(role, block, short)
                    .map(|t| t.code.clone())
                    .unwrap_or_else(|| format!("{}_{}", role.code(), block.code()));
                build.record(id, date, block, hours, code);
            }
            assigned += hours;
        }

        if assigned + HOURS_EPS < pair_target {
            build.alerts.push(PlanningAlert {
                date: build.days[0].date,
                block: Some(block),
                kind: AlertKind::Warning,
                severity: Severity::Low,
                title: format!("Paire sous objectif — {}", team.name),
                message: format!(
                    "{:.1}h posées sur {:.1}h visées pour la paire",
                    assigned, pair_target
                ),
            });
        }
    }
}
