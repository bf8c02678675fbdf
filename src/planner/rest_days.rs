//! Phase A — pose des jours de repos.
//!
//! Chaque employé sans jours fixes reçoit deux jours consécutifs, choisis
//! parmi les six couples Lun-Mar … Sam-Dim : score = charge cumulée des
//! deux jours + pénalité d'usage, pour étaler les repos sur la semaine.

use std::collections::{BTreeSet, HashSet};

use chrono::{Datelike, NaiveDate, Weekday};

use super::types::REST_PAIR_USAGE_PENALTY;
use super::PlanBuild;
use crate::model::{EmployeeId, Team};

pub(super) fn plan_rest_days(build: &mut PlanBuild) {
    let pair_workload: Vec<i64> = (0..6)
        .map(|i| build.days[i].workload_min + build.days[i + 1].workload_min)
        .collect();
    let mut usage = [0i64; 6];

    // Paires FIXED d'abord : un seul motif de repos partagé.
    let mut teams: Vec<Team> = build.roster.fixed_pairs().into_iter().cloned().collect();
    teams.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    let mut processed: BTreeSet<EmployeeId> = BTreeSet::new();
    for team in &teams {
        let [a, b] = &team.members;
        if !build.states.contains_key(a) || !build.states.contains_key(b) {
            continue;
        }
        let mut fixed: HashSet<Weekday> = HashSet::new();
        fixed.extend(build.employee(a).fixed_days_off.iter().copied());
        fixed.extend(build.employee(b).fixed_days_off.iter().copied());

        let rest = resolve_rest(build, &fixed, &pair_workload, &mut usage, 2);
        build.states.get_mut(a).expect("state").rest_days = rest.clone();
        build.states.get_mut(b).expect("state").rest_days = rest;
        processed.insert(a.clone());
        processed.insert(b.clone());
    }

    let ordered = build.ordered.clone();
    for id in ordered {
        if processed.contains(&id) || build.states[&id].in_fixed_pair {
            continue;
        }
        let fixed: HashSet<Weekday> = build.employee(&id).fixed_days_off.iter().copied().collect();
        let rest = resolve_rest(build, &fixed, &pair_workload, &mut usage, 1);
        build.states.get_mut(&id).expect("state").rest_days = rest;
    }
}

/// Deux jours fixes → repris tels quels. Un seul jour fixe → complété par
/// le couple consécutif le moins cher qui le contient. Sinon → meilleur
/// couple au score charge + usage.
fn resolve_rest(
    build: &PlanBuild,
    fixed: &HashSet<Weekday>,
    pair_workload: &[i64],
    usage: &mut [i64; 6],
    weight: i64,
) -> BTreeSet<NaiveDate> {
    if fixed.len() >= 2 {
        return build
            .days
            .iter()
            .filter(|d| fixed.contains(&d.date.weekday()))
            .map(|d| d.date)
            .collect();
    }

    let candidates: Vec<usize> = match fixed.iter().next() {
        Some(wd) => (0..6)
            .filter(|&i| {
                build.days[i].date.weekday() == *wd || build.days[i + 1].date.weekday() == *wd
            })
            .collect(),
        None => (0..6).collect(),
    };

    let best = candidates
        .into_iter()
        .min_by_key(|&i| (pair_workload[i] + usage[i] * REST_PAIR_USAGE_PENALTY, i))
        .expect("a weekday always belongs to a consecutive pair");
    usage[best] += weight;

    [build.days[best].date, build.days[best + 1].date]
        .into_iter()
        .collect()
}
