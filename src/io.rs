use crate::config::PlanningConfig;
use crate::model::{ForecastDay, Roster, WeekForecast, WeekPlan};
use crate::report::assignee_name;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::Path;

/// Import de prévision depuis CSV : header `date,departures,arrivals,occupied`.
/// Toute valeur négative ou malformée est rejetée ligne par ligne.
pub fn import_forecast_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<ForecastDay>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut out = Vec::new();
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let date_raw = rec.get(0).context("missing date")?.trim();
        let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
            .with_context(|| format!("row {}: invalid date {date_raw}", row + 1))?;
        let departures = parse_count(rec.get(1), "departures", row)?;
        let arrivals = parse_count(rec.get(2), "arrivals", row)?;
        let occupied = parse_count(rec.get(3), "occupied", row)?;
        out.push(ForecastDay {
            date,
            departures,
            arrivals,
            occupied,
        });
    }
    Ok(out)
}

fn parse_count(field: Option<&str>, name: &str, row: usize) -> anyhow::Result<u32> {
    let raw = field
        .with_context(|| format!("row {}: missing {name}", row + 1))?
        .trim();
    let value: i64 = raw
        .parse()
        .with_context(|| format!("row {}: invalid {name} value {raw:?}", row + 1))?;
    if value < 0 {
        bail!("row {}: {name} cannot be negative ({value})", row + 1);
    }
    u32::try_from(value).with_context(|| format!("row {}: {name} out of range", row + 1))
}

/// Import de prévision JSON (tableau de jours). Les compteurs négatifs
/// sont rejetés par le typage.
pub fn import_forecast_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<ForecastDay>> {
    let data = fs::read(&path)
        .with_context(|| format!("reading {}", path.as_ref().display()))?;
    let days: Vec<ForecastDay> =
        serde_json::from_slice(&data).with_context(|| "parsing forecast JSON")?;
    Ok(days)
}

/// Valide une liste de jours en semaine complète (7 jours, lundi).
pub fn into_week_forecast(days: Vec<ForecastDay>) -> anyhow::Result<WeekForecast> {
    WeekForecast::new(days).map_err(anyhow::Error::msg)
}

/// Charge l'effectif depuis JSON et vérifie sa cohérence interne.
pub fn load_roster_json<P: AsRef<Path>>(path: P) -> anyhow::Result<Roster> {
    let data = fs::read(&path)
        .with_context(|| format!("reading {}", path.as_ref().display()))?;
    let roster: Roster = serde_json::from_slice(&data).with_context(|| "parsing roster JSON")?;
    if roster.employees.is_empty() {
        bail!("roster has no employees");
    }
    for emp in &roster.employees {
        if emp.weekly_hours_target <= 0.0 || emp.weekly_hours_target > 48.0 {
            bail!(
                "employee {}: weekly_hours_target {} out of range",
                emp.name,
                emp.weekly_hours_target
            );
        }
        if emp.fixed_days_off.len() > 2 {
            bail!("employee {}: more than 2 fixed days off", emp.name);
        }
        if emp.allowed_blocks.is_empty() {
            bail!("employee {}: no allowed shift block", emp.name);
        }
    }
    for team in &roster.teams {
        if team.members[0] == team.members[1] {
            bail!("team {}: both members are the same employee", team.name);
        }
        for member in &team.members {
            if roster.find_employee(member).is_none() {
                bail!("team {}: unknown member {}", team.name, member.as_str());
            }
        }
    }
    Ok(roster)
}

/// Charge la configuration depuis JSON et la valide.
pub fn load_config_json<P: AsRef<Path>>(path: P) -> anyhow::Result<PlanningConfig> {
    let data = fs::read(&path)
        .with_context(|| format!("reading {}", path.as_ref().display()))?;
    let config: PlanningConfig =
        serde_json::from_slice(&data).with_context(|| "parsing config JSON")?;
    config.validate()?;
    Ok(config)
}

/// Export CSV des vacations : header
/// `date,block,assignee,template,hours,day_off`.
pub fn export_assignments_csv<P: AsRef<Path>>(
    path: P,
    plan: &WeekPlan,
    roster: &Roster,
) -> anyhow::Result<()> {
    let mut w = WriterBuilder::new().has_headers(true).from_path(path)?;
    w.write_record(["date", "block", "assignee", "template", "hours", "day_off"])?;
    for a in &plan.assignments {
        let assignee = assignee_name(roster, &a.assignee);
        let date = a.date.to_string();
        let hours = format!("{:.2}", a.assigned_hours);
        let day_off = if a.is_day_off { "true" } else { "false" };
        w.write_record([
            date.as_str(),
            a.block.code(),
            assignee,
            a.template_code.as_str(),
            hours.as_str(),
            day_off,
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Export JSON du plan (jolie mise en forme).
pub fn export_plan_json<P: AsRef<Path>>(path: P, plan: &WeekPlan) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(plan)?;
    fs::write(path, s)?;
    Ok(())
}
