use crate::distribution::{
    CouvertureResolution, DayDistribution, PeriodDistribution, UnitWork, Window,
};
use crate::model::{AssigneeRef, Roster, ShiftBlock, WeekPlan};

/// Rendu d'une répartition de journée (texte, futur HTML, etc.).
pub trait BreakdownRenderer {
    fn render(&self, day: &DayDistribution) -> String;
}

/// Formate un temps libre par personne et en total.
pub fn format_spare(minutes: i64, num_workers: u32) -> String {
    if minutes == 0 {
        return String::from("0min");
    }
    let sign = if minutes > 0 { '+' } else { '-' };
    let abs = minutes.abs();
    let total = if abs < 60 {
        format!("{sign}{abs}min")
    } else {
        format!("{sign}{:.1}h", abs as f64 / 60.0)
    };
    if num_workers > 1 {
        let per = abs as f64 / f64::from(num_workers);
        let per_str = if per < 60.0 {
            format!("{sign}{}min/pers", per as i64)
        } else {
            format!("{sign}{:.1}h/pers", per / 60.0)
        };
        format!("{per_str} ({total} total)")
    } else {
        total
    }
}

fn unit_work_label(work: &UnitWork) -> String {
    let mut buf = itoa::Buffer::new();
    let mut s = String::new();
    if work.departs > 0 {
        s.push_str(buf.format(work.departs));
        s.push('D');
    }
    if work.recouches > 0 {
        if !s.is_empty() {
            s.push('+');
        }
        s.push_str(buf.format(work.recouches));
        s.push('R');
    }
    if s.is_empty() {
        s.push_str("libre");
    }
    s
}

fn spare_suffix(spare: i64) -> String {
    if spare <= 0 {
        String::new()
    } else if spare >= 60 {
        if spare % 60 == 0 {
            format!(" +{}h", spare / 60)
        } else {
            format!(" +{}h{:02}", spare / 60, spare % 60)
        }
    } else {
        format!(" +{spare}min")
    }
}

fn period_line(dist: &PeriodDistribution) -> String {
    if dist.units.is_empty() {
        return String::from("personne");
    }
    dist.units
        .iter()
        .map(|u| {
            format!(
                "{}:{}{}",
                u.unit.display(),
                unit_work_label(u),
                spare_suffix(u.spare_min)
            )
        })
        .collect::<Vec<_>>()
        .join(" · ")
}

fn window_label(w: &Window) -> String {
    format!("{}-{}", w.start.format("%H:%M"), w.end.format("%H:%M"))
}

/// Gabarit texte : une ligne par période, puis le bilan couvertures.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextBreakdown;

impl BreakdownRenderer for TextBreakdown {
    fn render(&self, day: &DayDistribution) -> String {
        let mut out = String::new();
        out.push_str(&format!("Répartition du {}\n", day.date));
        out.push_str(&format!(
            "  matin seul   {} : {}\n",
            window_label(&day.periods.morning_alone),
            period_line(&day.morning)
        ));
        out.push_str(&format!(
            "  chevauchement {} : {}\n",
            window_label(&day.periods.overlap),
            period_line(&day.overlap)
        ));
        out.push_str(&format!(
            "  soir termine {} : {}\n",
            window_label(&day.periods.evening_finish),
            period_line(&day.evening)
        ));

        let couv = &day.couverture;
        out.push_str(&format!(
            "  couvertures  {} : {} pers · travail {}min / capacité {}min\n",
            window_label(&day.periods.couverture),
            couv.persons_assigned,
            couv.work_min,
            couv.capacity_min
        ));
        match &couv.resolution {
            CouvertureResolution::Covered { spare_min } => {
                out.push_str(&format!(
                    "    marge {}\n",
                    format_spare(*spare_min, couv.persons_assigned.max(1))
                ));
            }
            CouvertureResolution::AddWorker {
                deficit_min,
                candidates,
            } => {
                let names: Vec<&str> = candidates.iter().take(3).map(|c| c.name.as_str()).collect();
                out.push_str(&format!(
                    "    déficit {}min — ajouter : {}\n",
                    deficit_min,
                    names.join(", ")
                ));
            }
            CouvertureResolution::Elasticity {
                deficit_min,
                extra_min_per_person,
            } => {
                out.push_str(&format!(
                    "    déficit {}min — +{}min/pers en élasticité\n",
                    deficit_min, extra_min_per_person
                ));
            }
            CouvertureResolution::Unresolved {
                deficit_min,
                extra_persons_needed,
            } => {
                out.push_str(&format!(
                    "    déficit {}min — sans couverture possible ({} pers manquante(s))\n",
                    deficit_min, extra_persons_needed
                ));
            }
        }
        if day.rooms_deficit > 0 {
            out.push_str(&format!("  chambres non casées : {}\n", day.rooms_deficit));
        }
        out
    }
}

/// Synthèse texte d'un plan : couverture par jour, heures par employé,
/// alertes.
pub fn render_plan_summary(plan: &WeekPlan, roster: &Roster) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Semaine du {} — statut {}\n",
        plan.week_start, plan.status
    ));

    for date in plan.days() {
        let (need_m, need_e) = plan
            .requirement_on(date)
            .map(|r| (r.morning_persons, r.evening_persons))
            .unwrap_or((0, 0));
        out.push_str(&format!(
            "  {} : DAY {}/{} · EVENING {}/{}\n",
            date,
            plan.headcount(date, ShiftBlock::Day),
            need_m,
            plan.headcount(date, ShiftBlock::Evening),
            need_e
        ));
    }

    out.push_str("Heures :\n");
    let mut employees: Vec<_> = roster.employees.iter().collect();
    employees.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    for emp in employees {
        out.push_str(&format!(
            "  {} : {:.1}h / {:.1}h\n",
            emp.name,
            plan.hours_of(&emp.id),
            emp.weekly_hours_target
        ));
    }

    if plan.alerts.is_empty() {
        out.push_str("Aucune alerte\n");
    } else {
        out.push_str(&format!("Alertes ({}) :\n", plan.alerts.len()));
        for alert in &plan.alerts {
            let block = alert.block.map(|b| b.code()).unwrap_or("-");
            out.push_str(&format!(
                "  [{:?}/{:?}] {} {} — {}\n",
                alert.kind, alert.severity, alert.date, block, alert.title
            ));
        }
    }
    out
}

/// Nom d'un assigné pour les exports et résumés.
pub fn assignee_name<'a>(roster: &'a Roster, assignee: &'a AssigneeRef) -> &'a str {
    match assignee {
        AssigneeRef::Employee(id) => roster
            .find_employee(id)
            .map(|e| e.name.as_str())
            .unwrap_or_else(|| id.as_str()),
        AssigneeRef::Team(id) => roster
            .find_team(id)
            .map(|t| t.name.as_str())
            .unwrap_or_else(|| id.as_str()),
    }
}
