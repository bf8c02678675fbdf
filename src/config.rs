use anyhow::{bail, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{ElasticityLevel, Role, ShiftBlock, ShiftTemplate};

/// Plafond absolu d'élasticité par personne et par jour, quel que soit le
/// niveau configuré. Arrondi au quart d'heure par [`round_up_to_quarter`].
pub const MAX_ELASTICITY_MIN_PER_DAY: i64 = 60;

/// Arrondit des minutes d'élasticité au quart d'heure supérieur.
pub fn round_up_to_quarter(minutes: i64) -> i64 {
    if minutes <= 0 {
        return 0;
    }
    ((minutes + 14) / 15) * 15
}

/// Type de tâche housekeeping. DEPART avant RECOUCH dans la distribution ;
/// COUVERTURE est réservée au soir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskKind {
    Depart,
    Recouch,
    Couverture,
}

impl TaskKind {
    pub fn code(&self) -> &'static str {
        match self {
            TaskKind::Depart => "DEPART",
            TaskKind::Recouch => "RECOUCH",
            TaskKind::Couverture => "COUVERTURE",
        }
    }
}

/// Chronométrage d'un type de tâche : minutes en paire, minutes en solo
/// (toujours ≥ paire), personnes requises, fenêtre horaire éventuelle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTiming {
    pub pair_minutes: u32,
    pub solo_minutes: u32,
    pub persons_required: u32,
    #[serde(default)]
    pub earliest_start: Option<NaiveTime>,
    #[serde(default)]
    pub latest_end: Option<NaiveTime>,
}

impl TaskTiming {
    fn validate(&self, kind: TaskKind) -> Result<()> {
        if self.pair_minutes == 0 {
            bail!("task {}: pair_minutes must be > 0", kind.code());
        }
        if self.solo_minutes < self.pair_minutes {
            bail!(
                "task {}: solo_minutes ({}) cannot be below pair_minutes ({})",
                kind.code(),
                self.solo_minutes,
                self.pair_minutes
            );
        }
        if self.persons_required == 0 {
            bail!("task {}: persons_required must be ≥ 1", kind.code());
        }
        Ok(())
    }
}

/// Table de chronométrage par type de tâche.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTimingTable {
    tasks: BTreeMap<TaskKind, TaskTiming>,
}

impl TaskTimingTable {
    pub fn new(tasks: BTreeMap<TaskKind, TaskTiming>) -> Self {
        Self { tasks }
    }

    pub fn get(&self, kind: TaskKind) -> &TaskTiming {
        self.tasks
            .get(&kind)
            .unwrap_or_else(|| fallback_timing(kind))
    }

    pub fn validate(&self) -> Result<()> {
        for (kind, timing) in &self.tasks {
            timing.validate(*kind)?;
        }
        Ok(())
    }
}

impl Default for TaskTimingTable {
    fn default() -> Self {
        let mut tasks = BTreeMap::new();
        tasks.insert(
            TaskKind::Depart,
            TaskTiming {
                pair_minutes: 50,
                solo_minutes: 75,
                persons_required: 2,
                earliest_start: NaiveTime::from_hms_opt(11, 0, 0),
                latest_end: None,
            },
        );
        tasks.insert(
            TaskKind::Recouch,
            TaskTiming {
                pair_minutes: 20,
                solo_minutes: 30,
                persons_required: 2,
                earliest_start: NaiveTime::from_hms_opt(9, 0, 0),
                latest_end: None,
            },
        );
        tasks.insert(
            TaskKind::Couverture,
            TaskTiming {
                pair_minutes: 15,
                solo_minutes: 15,
                persons_required: 1,
                earliest_start: NaiveTime::from_hms_opt(19, 0, 0),
                latest_end: NaiveTime::from_hms_opt(22, 0, 0),
            },
        );
        Self { tasks }
    }
}

fn fallback_timing(kind: TaskKind) -> &'static TaskTiming {
    // Valeurs de repli si une table partielle arrive d'un fichier de config.
    static DEPART: TaskTiming = TaskTiming {
        pair_minutes: 50,
        solo_minutes: 75,
        persons_required: 2,
        earliest_start: None,
        latest_end: None,
    };
    static RECOUCH: TaskTiming = TaskTiming {
        pair_minutes: 20,
        solo_minutes: 30,
        persons_required: 2,
        earliest_start: None,
        latest_end: None,
    };
    static COUVERTURE: TaskTiming = TaskTiming {
        pair_minutes: 15,
        solo_minutes: 15,
        persons_required: 1,
        earliest_start: None,
        latest_end: None,
    };
    match kind {
        TaskKind::Depart => &DEPART,
        TaskKind::Recouch => &RECOUCH,
        TaskKind::Couverture => &COUVERTURE,
    }
}

/// Configuration d'un bloc horaire : bornes, pause, effectif minimum et
/// heures d'entraide apportées à l'autre bloc pendant le chevauchement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftBlockConfig {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub break_start: NaiveTime,
    pub break_end: NaiveTime,
    pub min_staff: u32,
    #[serde(default)]
    pub helps_other_shift_hours: f64,
}

impl ShiftBlockConfig {
    /// Minutes travaillées effectives (pause déduite).
    pub fn work_minutes(&self) -> i64 {
        let span = (self.end - self.start).num_minutes();
        let pause = (self.break_end - self.break_start).num_minutes();
        span - pause
    }

    pub fn work_hours(&self) -> f64 {
        self.work_minutes() as f64 / 60.0
    }

    fn validate(&self, block: ShiftBlock) -> Result<()> {
        if self.end <= self.start {
            bail!("block {}: end must be after start", block.code());
        }
        if self.break_end < self.break_start {
            bail!("block {}: break end precedes break start", block.code());
        }
        if self.break_start < self.start || self.break_end > self.end {
            bail!("block {}: break must lie within the block", block.code());
        }
        if self.min_staff == 0 {
            bail!("block {}: min_staff must be ≥ 1", block.code());
        }
        if !self.helps_other_shift_hours.is_finite() || self.helps_other_shift_hours < 0.0 {
            bail!("block {}: helps_other_shift_hours must be ≥ 0", block.code());
        }
        Ok(())
    }
}

/// Plafonds d'heures sup pour un niveau d'élasticité.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElasticityRule {
    pub max_extra_hours_day: f64,
    pub max_extra_hours_week: f64,
}

impl ElasticityRule {
    pub fn max_day_minutes(&self) -> i64 {
        (self.max_extra_hours_day * 60.0).round() as i64
    }

    pub fn max_week_minutes(&self) -> i64 {
        (self.max_extra_hours_week * 60.0).round() as i64
    }
}

/// Instantané de configuration, construit une fois et passé en lecture
/// seule au planificateur : aucun cache mutable ne survit à une exécution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningConfig {
    pub tasks: TaskTimingTable,
    pub blocks: BTreeMap<ShiftBlock, ShiftBlockConfig>,
    pub elasticity: BTreeMap<ElasticityLevel, ElasticityRule>,
}

impl PlanningConfig {
    pub fn block(&self, block: ShiftBlock) -> Option<&ShiftBlockConfig> {
        self.blocks.get(&block)
    }

    pub fn elasticity_rule(&self, level: ElasticityLevel) -> ElasticityRule {
        self.elasticity
            .get(&level)
            .copied()
            .unwrap_or(ElasticityRule {
                max_extra_hours_day: 0.0,
                max_extra_hours_week: 0.0,
            })
    }

    /// Heure de début des couvertures : fin de pause du soir, ou plus tard
    /// si la fenêtre de la tâche l'exige.
    pub fn couverture_earliest(&self) -> Option<NaiveTime> {
        self.tasks.get(TaskKind::Couverture).earliest_start
    }

    pub fn validate(&self) -> Result<()> {
        self.tasks.validate()?;
        if !self.blocks.contains_key(&ShiftBlock::Day) {
            bail!("configuration must define the DAY block");
        }
        if !self.blocks.contains_key(&ShiftBlock::Evening) {
            bail!("configuration must define the EVENING block");
        }
        for (block, cfg) in &self.blocks {
            cfg.validate(*block)?;
        }
        for (level, rule) in &self.elasticity {
            if rule.max_extra_hours_day < 0.0 || rule.max_extra_hours_week < 0.0 {
                bail!("elasticity {:?}: ceilings must be ≥ 0", level);
            }
        }
        Ok(())
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        let mut blocks = BTreeMap::new();
        blocks.insert(
            ShiftBlock::Day,
            ShiftBlockConfig {
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                break_start: NaiveTime::from_hms_opt(12, 30, 0).unwrap(),
                break_end: NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
                min_staff: 2,
                helps_other_shift_hours: 0.0,
            },
        );
        blocks.insert(
            ShiftBlock::Evening,
            ShiftBlockConfig {
                start: NaiveTime::from_hms_opt(13, 30, 0).unwrap(),
                end: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                break_start: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
                break_end: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
                min_staff: 1,
                helps_other_shift_hours: 5.0,
            },
        );

        let mut elasticity = BTreeMap::new();
        elasticity.insert(
            ElasticityLevel::Low,
            ElasticityRule {
                max_extra_hours_day: 0.0,
                max_extra_hours_week: 0.0,
            },
        );
        elasticity.insert(
            ElasticityLevel::Medium,
            ElasticityRule {
                max_extra_hours_day: 1.0,
                max_extra_hours_week: 3.0,
            },
        );
        elasticity.insert(
            ElasticityLevel::High,
            ElasticityRule {
                max_extra_hours_day: 2.0,
                max_extra_hours_week: 6.0,
            },
        );

        Self {
            tasks: TaskTimingTable::default(),
            blocks,
            elasticity,
        }
    }
}

/// Plantillas par défaut alignées sur les blocs par défaut : 8 h pleines,
/// variante courte de 7 h pour tomber juste sur 39 h (4×8 + 7).
pub fn default_templates() -> Vec<ShiftTemplate> {
    let t = |h: u32, m: u32| NaiveTime::from_hms_opt(h, m, 0).unwrap();
    let mut out = Vec::new();
    for role in [Role::Fdc, Role::Vdc] {
        out.push(ShiftTemplate {
            code: format!("{}_MATIN", role.code()),
            role,
            block: ShiftBlock::Day,
            start_time: t(9, 0),
            end_time: t(18, 0),
            break_minutes: 60,
            is_short: false,
        });
        out.push(ShiftTemplate {
            code: format!("{}_MATIN_COURT", role.code()),
            role,
            block: ShiftBlock::Day,
            start_time: t(9, 0),
            end_time: t(17, 0),
            break_minutes: 60,
            is_short: true,
        });
        out.push(ShiftTemplate {
            code: format!("{}_SOIR", role.code()),
            role,
            block: ShiftBlock::Evening,
            start_time: t(13, 30),
            end_time: t(22, 0),
            break_minutes: 30,
            is_short: false,
        });
        out.push(ShiftTemplate {
            code: format!("{}_SOIR_COURT", role.code()),
            role,
            block: ShiftBlock::Evening,
            start_time: t(14, 30),
            end_time: t(22, 0),
            break_minutes: 30,
            is_short: true,
        });
    }
    out
}
