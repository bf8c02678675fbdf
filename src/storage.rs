use crate::model::{PlanStatus, WeekPlan};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex};
use tempfile::NamedTempFile;

pub trait PlanStore {
    /// Charge le plan d'une semaine, s'il existe.
    fn load(&self, week_start: NaiveDate) -> anyhow::Result<Option<WeekPlan>>;
    /// Sauvegarde atomique. Un plan par semaine ; un fichier non-DRAFT
    /// n'est jamais écrasé silencieusement.
    fn save(&self, plan: &WeekPlan) -> anyhow::Result<()>;
    /// Supprime le plan d'une semaine. Retourne false s'il n'existait pas.
    fn delete(&self, week_start: NaiveDate) -> anyhow::Result<bool>;
    /// Semaines présentes, triées.
    fn list(&self) -> anyhow::Result<Vec<NaiveDate>>;
}

/// Stockage JSON : un fichier `plan-AAAA-MM-JJ.json` par semaine.
pub struct JsonPlanStore {
    dir: PathBuf,
}

impl JsonPlanStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating plan directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, week_start: NaiveDate) -> PathBuf {
        self.dir.join(format!("plan-{}.json", week_start))
    }
}

impl PlanStore for JsonPlanStore {
    fn load(&self, week_start: NaiveDate) -> anyhow::Result<Option<WeekPlan>> {
        let path = self.path_for(week_start);
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let plan: WeekPlan = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(plan))
    }

    fn save(&self, plan: &WeekPlan) -> anyhow::Result<()> {
        if let Some(existing) = self.load(plan.week_start)? {
            if existing.status != PlanStatus::Draft && existing.id != plan.id {
                bail!(
                    "a {} plan already exists for week {}",
                    existing.status,
                    plan.week_start
                );
            }
        }
        let json = serde_json::to_vec_pretty(plan)?;
        let mut tmp = NamedTempFile::new_in(&self.dir).with_context(|| "creating temp file")?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(plan.week_start))
            .with_context(|| "atomic rename")?;
        Ok(())
    }

    fn delete(&self, week_start: NaiveDate) -> anyhow::Result<bool> {
        let path = self.path_for(week_start);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        Ok(true)
    }

    fn list(&self) -> anyhow::Result<Vec<NaiveDate>> {
        let mut weeks = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(date_part) = name
                .strip_prefix("plan-")
                .and_then(|s| s.strip_suffix(".json"))
            else {
                continue;
            };
            if let Ok(date) = date_part.parse::<NaiveDate>() {
                weeks.push(date);
            }
        }
        weeks.sort();
        Ok(weeks)
    }
}

/// Sérialise les générations concurrentes d'une même semaine : au plus une
/// génération en vol par `week_start`, les autres semaines restent
/// indépendantes.
#[derive(Default)]
pub struct WeekLockRegistry {
    held: Mutex<BTreeSet<NaiveDate>>,
    released: Condvar,
}

impl WeekLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bloque jusqu'à obtention du verrou de la semaine. Le verrou se
    /// libère au drop du garde.
    pub fn lock(&self, week_start: NaiveDate) -> WeekLockGuard<'_> {
        let mut held = self.held.lock().expect("lock registry poisoned");
        while held.contains(&week_start) {
            held = self.released.wait(held).expect("lock registry poisoned");
        }
        held.insert(week_start);
        WeekLockGuard {
            registry: self,
            week_start,
        }
    }

    /// Variante non bloquante.
    pub fn try_lock(&self, week_start: NaiveDate) -> Option<WeekLockGuard<'_>> {
        let mut held = self.held.lock().expect("lock registry poisoned");
        if held.contains(&week_start) {
            return None;
        }
        held.insert(week_start);
        Some(WeekLockGuard {
            registry: self,
            week_start,
        })
    }
}

pub struct WeekLockGuard<'a> {
    registry: &'a WeekLockRegistry,
    week_start: NaiveDate,
}

impl Drop for WeekLockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .registry
            .held
            .lock()
            .expect("lock registry poisoned");
        held.remove(&self.week_start);
        self.registry.released.notify_all();
    }
}
