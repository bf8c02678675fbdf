//! Optimiseur d'affectation hebdomadaire.
//!
//! Cinq phases déterministes : repos consécutifs, paires fixes, complément
//! individuel de couverture, complétion des heures contractuelles, puis
//! résolution couvertures et rééquilibrage inter-blocs. À entrées
//! identiques (prévision, effectif ordonné, configuration), la sortie est
//! identique : aucun aléa, aucune horloge.

mod fill;
mod pairs;
mod rebalance;
mod rest_days;
mod types;

pub use types::PlanError;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, Weekday};

use crate::config::PlanningConfig;
use crate::model::{
    AlertKind, AssigneeRef, Employee, EmployeeId, PlanId, PlanStatus, PlanningAlert, Role, Roster,
    Severity, ShiftAssignment, ShiftBlock, ShiftTemplate, WeekForecast, WeekPlan,
};
use crate::staffing;
use types::HOURS_EPS;

/// Planificateur : un effectif et une configuration en lecture seule,
/// instantanés pour toute la durée d'une exécution.
pub struct WeekPlanner<'a> {
    roster: &'a Roster,
    config: &'a PlanningConfig,
}

/// État courant d'un employé pendant la construction du plan.
#[derive(Debug, Clone)]
pub(crate) struct EmployeeState {
    pub(crate) target_hours: f64,
    pub(crate) assigned_hours: f64,
    /// Minutes d'élasticité déjà consommées sur la semaine.
    pub(crate) extra_minutes_used: i64,
    pub(crate) days_assigned: BTreeSet<NaiveDate>,
    pub(crate) rest_days: BTreeSet<NaiveDate>,
    pub(crate) in_fixed_pair: bool,
}

impl EmployeeState {
    pub(crate) fn remaining(&self) -> f64 {
        (self.target_hours - self.assigned_hours).max(0.0)
    }
}

/// Synthèse d'une journée pour le classement par charge.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DayInfo {
    pub(crate) date: NaiveDate,
    pub(crate) workload_min: i64,
    pub(crate) morning_needed: u32,
    pub(crate) evening_needed: u32,
    /// Couvertures du jour (= chambres occupées de la prévision).
    pub(crate) couvertures: u32,
}

impl DayInfo {
    pub(crate) fn needed(&self, block: ShiftBlock) -> u32 {
        match block {
            ShiftBlock::Day => self.morning_needed,
            ShiftBlock::Evening => self.evening_needed,
            ShiftBlock::Night => 0,
        }
    }
}

/// Chantier mutable d'une génération : affectations, alertes et états.
pub(crate) struct PlanBuild<'a> {
    pub(crate) roster: &'a Roster,
    pub(crate) config: &'a PlanningConfig,
    pub(crate) days: Vec<DayInfo>,
    /// Identifiants triés par (nom, id) : l'ordre de parcours stable.
    pub(crate) ordered: Vec<EmployeeId>,
    pub(crate) states: BTreeMap<EmployeeId, EmployeeState>,
    pub(crate) assignments: Vec<ShiftAssignment>,
    pub(crate) alerts: Vec<PlanningAlert>,
}

impl<'a> PlanBuild<'a> {
    /// Jours triés par charge décroissante, date croissante à égalité.
    pub(crate) fn days_by_workload(&self) -> Vec<DayInfo> {
        let mut days = self.days.clone();
        days.sort_by(|a, b| b.workload_min.cmp(&a.workload_min).then(a.date.cmp(&b.date)));
        days
    }

    pub(crate) fn headcount(&self, date: NaiveDate, block: ShiftBlock) -> u32 {
        self.assignments
            .iter()
            .filter(|a| a.date == date && a.block == block && !a.is_day_off)
            .count() as u32
    }

    pub(crate) fn employee(&self, id: &EmployeeId) -> &Employee {
        self.roster
            .find_employee(id)
            .expect("state keyed on roster employees")
    }

    /// Plantilla pour (rôle, bloc, courte), avec replis : même bloc tous
    /// rôles, puis variante pleine.
    pub(crate) fn pick_template(
        &self,
        role: Role,
        block: ShiftBlock,
        short: bool,
    ) -> Option<&'a ShiftTemplate> {
        self.roster
            .template_for(role, block, short)
            .or_else(|| self.roster.any_template_for(block, short))
            .or_else(|| self.roster.template_for(role, block, false))
            .or_else(|| self.roster.any_template_for(block, false))
    }

    /// Crée une vacation en atterrissant exactement sur `cap` heures si la
    /// plantilla pleine dépasse : variante courte et heures plafonnées, de
    /// sorte qu'on ne dépasse jamais l'objectif contractuel.
    pub(crate) fn assign_with_landing(
        &mut self,
        id: &EmployeeId,
        date: NaiveDate,
        block: ShiftBlock,
        cap: f64,
    ) -> Option<f64> {
        let role = self.employee(id).role;
        let full = self.pick_template(role, block, false)?;
        let (template, hours) = if cap + HOURS_EPS < full.hours() {
            let short = self.pick_template(role, block, true).unwrap_or(full);
            (short, cap.min(short.hours()))
        } else {
            (full, full.hours())
        };
        if hours <= 0.0 {
            return None;
        }
        let code = template.code.clone();
        self.record(id, date, block, hours, code);
        Some(hours)
    }

    pub(crate) fn record(
        &mut self,
        id: &EmployeeId,
        date: NaiveDate,
        block: ShiftBlock,
        hours: f64,
        template_code: String,
    ) {
        self.assignments.push(ShiftAssignment {
            date,
            assignee: AssigneeRef::Employee(id.clone()),
            template_code,
            block,
            assigned_hours: hours,
            is_day_off: false,
        });
        let state = self.states.get_mut(id).expect("known employee");
        state.assigned_hours += hours;
        state.days_assigned.insert(date);
    }

    /// Un employé peut-il prendre une vacation ce jour-là dans ce bloc ?
    pub(crate) fn is_free_for(&self, id: &EmployeeId, date: NaiveDate, block: ShiftBlock) -> bool {
        let emp = self.employee(id);
        let state = &self.states[id];
        !state.rest_days.contains(&date)
            && !state.days_assigned.contains(&date)
            && !emp.is_unavailable_on(date)
            && emp.can_work_block(block)
    }
}

impl<'a> WeekPlanner<'a> {
    pub fn new(roster: &'a Roster, config: &'a PlanningConfig) -> Self {
        Self { roster, config }
    }

    /// Génère le plan de la semaine commençant `week_start` (un lundi).
    ///
    /// Un besoin non couvert n'est pas une erreur : le plan revient en
    /// DRAFT avec ses alertes.
    pub fn generate(
        &self,
        week_start: NaiveDate,
        forecast: &WeekForecast,
    ) -> Result<WeekPlan, PlanError> {
        self.generate_inner(week_start, forecast, PlanId::random())
    }

    /// Régénère un plan DRAFT : suppression puis recalcul complet, même
    /// identifiant. Refusé pour tout autre statut.
    pub fn regenerate(
        &self,
        plan: &WeekPlan,
        forecast: &WeekForecast,
    ) -> Result<WeekPlan, PlanError> {
        if plan.status != PlanStatus::Draft {
            return Err(PlanError::PlanNotDraft(
                plan.id.as_str().to_string(),
                plan.status,
            ));
        }
        self.generate_inner(plan.week_start, forecast, plan.id.clone())
    }

    fn generate_inner(
        &self,
        week_start: NaiveDate,
        forecast: &WeekForecast,
        id: PlanId,
    ) -> Result<WeekPlan, PlanError> {
        if week_start.weekday() != Weekday::Mon {
            return Err(PlanError::NotMonday(week_start));
        }
        if forecast.week_start() != week_start {
            return Err(PlanError::ForecastMismatch {
                expected: week_start,
                got: forecast.week_start(),
            });
        }
        self.config.validate()?;
        if self.roster.any_template_for(ShiftBlock::Day, false).is_none() {
            return Err(PlanError::MissingTemplate("DAY"));
        }
        if self
            .roster
            .any_template_for(ShiftBlock::Evening, false)
            .is_none()
        {
            return Err(PlanError::MissingTemplate("EVENING"));
        }

        let (loads, requirements) = staffing::compute_week(forecast, self.config);
        let days: Vec<DayInfo> = loads
            .iter()
            .zip(requirements.iter())
            .map(|(load, req)| DayInfo {
                date: load.date,
                workload_min: load.total_minutes(),
                morning_needed: req.morning_persons,
                evening_needed: req.evening_persons,
                couvertures: load.couvertures,
            })
            .collect();

        let mut ordered: Vec<EmployeeId> = self.roster.employees.iter().map(|e| e.id.clone()).collect();
        ordered.sort_by(|a, b| {
            let ea = self.roster.find_employee(a).map(|e| e.name.as_str()).unwrap_or("");
            let eb = self.roster.find_employee(b).map(|e| e.name.as_str()).unwrap_or("");
            ea.cmp(eb).then(a.cmp(b))
        });

        let mut states = BTreeMap::new();
        for emp in &self.roster.employees {
            states.insert(
                emp.id.clone(),
                EmployeeState {
                    target_hours: emp.weekly_hours_target,
                    assigned_hours: 0.0,
                    extra_minutes_used: 0,
                    days_assigned: BTreeSet::new(),
                    rest_days: BTreeSet::new(),
                    in_fixed_pair: self.roster.team_of(&emp.id).is_some(),
                },
            );
        }

        let mut build = PlanBuild {
            roster: self.roster,
            config: self.config,
            days,
            ordered,
            states,
            assignments: Vec::new(),
            alerts: Vec::new(),
        };

        tracing::debug!(week = %week_start, "phase A: rest days");
        rest_days::plan_rest_days(&mut build);
        tracing::debug!(week = %week_start, "phase B: fixed pairs");
        pairs::place_fixed_pairs(&mut build);
        tracing::debug!(week = %week_start, "phase C: coverage fill");
        fill::fill_coverage(&mut build);
        tracing::debug!(week = %week_start, "phase D: hour completion");
        fill::complete_hours(&mut build);
        tracing::debug!(week = %week_start, "couverture check");
        rebalance::resolve_couverture(&mut build);
        tracing::debug!(week = %week_start, "phase E: morning rebalance");
        rebalance::rebalance_mornings(&mut build);

        self.collect_alerts(&mut build);

        let mut assignments = build.assignments;
        assignments.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.block.cmp(&b.block))
                .then(a.assignee.cmp(&b.assignee))
        });

        Ok(WeekPlan {
            id,
            week_start,
            status: PlanStatus::Draft,
            forecast: forecast.days().to_vec(),
            requirements,
            assignments,
            alerts: build.alerts,
        })
    }

    /// Alertes finales : un UNDERSTAFF exactement par (jour, bloc) en
    /// déficit, un avertissement par employé sous son objectif.
    fn collect_alerts(&self, build: &mut PlanBuild) {
        let days = build.days.clone();
        for day in &days {
            for block in [ShiftBlock::Day, ShiftBlock::Evening] {
                let needed = day.needed(block);
                let have = build.headcount(day.date, block);
                let already = build.alerts.iter().any(|a| {
                    a.kind == AlertKind::Understaff
                        && a.date == day.date
                        && a.block == Some(block)
                });
                if have < needed && !already {
                    let deficit = needed - have;
                    build.alerts.push(PlanningAlert {
                        date: day.date,
                        block: Some(block),
                        kind: AlertKind::Understaff,
                        severity: if deficit >= 2 {
                            Severity::High
                        } else {
                            Severity::Medium
                        },
                        title: format!("Manque de personnel — {}", block.code()),
                        message: format!(
                            "{} personne(s) affectée(s) pour un besoin de {}",
                            have, needed
                        ),
                    });
                }
            }
        }

        let ordered = build.ordered.clone();
        for id in &ordered {
            let (assigned, target) = {
                let state = &build.states[id];
                (state.assigned_hours, state.target_hours)
            };
            let shortfall = target - assigned;
            if shortfall > HOURS_EPS {
                let name = build.employee(id).name.clone();
                build.alerts.push(PlanningAlert {
                    // Alerte hebdomadaire : rattachée au lundi du plan.
                    date: days[0].date,
                    block: None,
                    kind: AlertKind::Warning,
                    severity: Severity::Low,
                    title: format!("Heures manquantes — {}", name),
                    message: format!(
                        "{:.1}h affectées sur {:.1}h contractuelles (manque {:.1}h)",
                        assigned, target, shortfall
                    ),
                });
            }
        }
    }
}
