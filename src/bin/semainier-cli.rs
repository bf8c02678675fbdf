#![forbid(unsafe_code)]
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use semainier::distribution::{DayWorker, ShiftOrigin};
use semainier::{
    config::default_templates,
    io,
    model::{AssigneeRef, PlanStatus, Roster, ShiftBlock, WeekForecast, WeekPlan},
    report::{render_plan_summary, BreakdownRenderer, TextBreakdown},
    AlertKind, DayDistribution, JsonPlanStore, PlanStore, PlanningConfig, WeekLockRegistry,
    WeekPlanner,
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de planification hebdomadaire housekeeping (sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Répertoire des plans JSON
    #[arg(long, global = true, default_value = "plans")]
    plans: String,

    /// Fichier JSON d'effectif
    #[arg(long, global = true, default_value = "roster.json")]
    roster: String,

    /// Fichier JSON de configuration (valeurs par défaut sinon)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Générer le plan d'une semaine depuis une prévision
    Generate {
        /// Lundi de la semaine (AAAA-MM-JJ)
        #[arg(long)]
        week: String,
        /// Prévision CSV ou JSON (selon l'extension)
        #[arg(long)]
        forecast: String,
    },

    /// Régénérer un plan DRAFT existant
    Regenerate {
        #[arg(long)]
        week: String,
        /// Nouvelle prévision ; sinon l'instantané du plan est réutilisé
        #[arg(long)]
        forecast: Option<String>,
    },

    /// Afficher la synthèse d'un plan, ou la répartition d'un jour
    Show {
        #[arg(long)]
        week: String,
        /// Date du jour à détailler (AAAA-MM-JJ)
        #[arg(long)]
        day: Option<String>,
    },

    /// Contrôler la répartition intra-journée de la semaine
    Check {
        #[arg(long)]
        week: String,
        /// Export CSV des déficits (optionnel)
        #[arg(long)]
        report: Option<String>,
    },

    /// Exporter un plan
    Export {
        #[arg(long)]
        week: String,
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let mut roster = io::load_roster_json(&cli.roster)
        .with_context(|| format!("loading roster {}", cli.roster))?;
    if roster.templates.is_empty() {
        roster.templates = default_templates();
    }
    let config = match &cli.config {
        Some(path) => io::load_config_json(path)?,
        None => PlanningConfig::default(),
    };
    let store = JsonPlanStore::open(&cli.plans)?;

    let code = match cli.cmd {
        Commands::Generate { week, forecast } => {
            let week: NaiveDate = week.parse().context("invalid week date")?;
            let days = load_forecast_file(&forecast)?;
            let forecast = io::into_week_forecast(days)?;
            if forecast.week_start() != week {
                bail!(
                    "forecast starts {} but --week is {}",
                    forecast.week_start(),
                    week
                );
            }

            let locks = WeekLockRegistry::new();
            let _guard = locks.lock(week);
            if let Some(existing) = store.load(week)? {
                if existing.status == PlanStatus::Draft {
                    store.delete(week)?;
                } else {
                    bail!(
                        "a {} plan already exists for week {}",
                        existing.status,
                        week
                    );
                }
            }

            let planner = WeekPlanner::new(&roster, &config);
            let plan = planner.generate(week, &forecast)?;
            store.save(&plan)?;
            print!("{}", render_plan_summary(&plan, &roster));
            exit_code_for(&plan)
        }

        Commands::Regenerate { week, forecast } => {
            let week: NaiveDate = week.parse().context("invalid week date")?;
            let plan = store
                .load(week)?
                .with_context(|| format!("no plan for week {week}"))?;
            let forecast = match forecast {
                Some(path) => io::into_week_forecast(load_forecast_file(&path)?)?,
                None => WeekForecast::new(plan.forecast.clone()).map_err(anyhow::Error::msg)?,
            };

            let locks = WeekLockRegistry::new();
            let _guard = locks.lock(week);
            let planner = WeekPlanner::new(&roster, &config);
            let new_plan = planner.regenerate(&plan, &forecast)?;
            store.delete(week)?;
            store.save(&new_plan)?;
            print!("{}", render_plan_summary(&new_plan, &roster));
            exit_code_for(&new_plan)
        }

        Commands::Show { week, day } => {
            let week: NaiveDate = week.parse().context("invalid week date")?;
            let plan = store
                .load(week)?
                .with_context(|| format!("no plan for week {week}"))?;
            match day {
                None => print!("{}", render_plan_summary(&plan, &roster)),
                Some(raw) => {
                    let date: NaiveDate = raw.parse().context("invalid day date")?;
                    let dist = distribution_for(&plan, &roster, &config, date)
                        .with_context(|| format!("day {date} is not in this plan"))?;
                    print!("{}", TextBreakdown.render(&dist));
                }
            }
            0
        }

        Commands::Check { week, report } => {
            let week: NaiveDate = week.parse().context("invalid week date")?;
            let plan = store
                .load(week)?
                .with_context(|| format!("no plan for week {week}"))?;

            let mut deficits = Vec::new();
            for date in plan.days() {
                if let Some(dist) = distribution_for(&plan, &roster, &config, date) {
                    if dist.has_deficit() {
                        deficits.push(dist);
                    }
                }
            }

            if deficits.is_empty() {
                println!("OK: couverture complète");
                0
            } else {
                eprintln!("{} jour(s) en déficit", deficits.len());
                for dist in &deficits {
                    eprint!("{}", TextBreakdown.render(dist));
                }
                if let Some(path) = report {
                    let mut w = csv::Writer::from_path(path)?;
                    w.write_record(["date", "rooms_deficit", "couverture"])?;
                    for dist in &deficits {
                        let date = dist.date.to_string();
                        let rooms = dist.rooms_deficit.to_string();
                        w.write_record([date.as_str(), rooms.as_str(), couverture_code(dist)])?;
                    }
                    w.flush()?;
                }
                // Code 2 = plan utilisable mais incomplet
                2
            }
        }

        Commands::Export {
            week,
            out_json,
            out_csv,
        } => {
            let week: NaiveDate = week.parse().context("invalid week date")?;
            let plan = store
                .load(week)?
                .with_context(|| format!("no plan for week {week}"))?;
            if let Some(path) = out_json {
                io::export_plan_json(path, &plan)?;
            }
            if let Some(path) = out_csv {
                io::export_assignments_csv(path, &plan, &roster)?;
            }
            0
        }
    };

    std::process::exit(code);
}

fn load_forecast_file(path: &str) -> Result<Vec<semainier::ForecastDay>> {
    if path.ends_with(".json") {
        io::import_forecast_json(path)
    } else {
        io::import_forecast_csv(path)
    }
}

fn exit_code_for(plan: &WeekPlan) -> i32 {
    if plan.alerts.iter().any(|a| a.kind == AlertKind::Understaff) {
        2
    } else {
        0
    }
}

fn couverture_code(dist: &DayDistribution) -> &'static str {
    use semainier::distribution::CouvertureResolution::*;
    match dist.couverture.resolution {
        Covered { .. } => "covered",
        AddWorker { .. } => "add_worker",
        Elasticity { .. } => "elasticity",
        Unresolved { .. } => "unresolved",
    }
}

/// Reconstruit la répartition d'un jour à partir des vacations du plan.
fn distribution_for(
    plan: &WeekPlan,
    roster: &Roster,
    config: &PlanningConfig,
    date: NaiveDate,
) -> Option<DayDistribution> {
    let forecast_day = plan.forecast.iter().find(|d| d.date == date)?;
    let workers = |block: ShiftBlock, origin: ShiftOrigin| -> Vec<DayWorker> {
        plan.assignments_on(date)
            .filter(|a| a.block == block)
            .filter_map(|a| match &a.assignee {
                AssigneeRef::Employee(id) => {
                    let emp = roster.find_employee(id)?;
                    Some(DayWorker {
                        id: id.clone(),
                        short_name: emp.short_name().to_string(),
                        origin,
                        elasticity: emp.elasticity,
                    })
                }
                AssigneeRef::Team(_) => None,
            })
            .collect()
    };
    let morning = workers(ShiftBlock::Day, ShiftOrigin::Morning);
    let evening = workers(ShiftBlock::Evening, ShiftOrigin::Evening);
    let teams: Vec<&semainier::Team> = roster.teams.iter().collect();
    semainier::compute_day_distribution(forecast_day, &morning, &evening, &teams, config, &[])
}
