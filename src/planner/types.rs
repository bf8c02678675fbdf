use crate::model::PlanStatus;
use chrono::NaiveDate;
use thiserror::Error;

/// Préconditions dures de la génération. Tout le reste (déficits de
/// couverture, heures manquantes) passe par les alertes douces du plan.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("week start {0} is not a Monday")]
    NotMonday(NaiveDate),
    #[error("forecast covers week starting {got}, expected {expected}")]
    ForecastMismatch {
        expected: NaiveDate,
        got: NaiveDate,
    },
    #[error("plan {0} cannot be regenerated in status {1}")]
    PlanNotDraft(String, PlanStatus),
    #[error("no shift template available for block {0}")]
    MissingTemplate(&'static str),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Tolérance de comparaison des heures décimales.
pub(crate) const HOURS_EPS: f64 = 0.01;

/// En dessous d'une heure restante, on ne crée plus de vacation.
pub(crate) const MIN_ASSIGNABLE_HOURS: f64 = 1.0;

/// Pénalité d'usage d'un couple de jours de repos (phase repos) : chaque
/// employé déjà posé sur le couple renchérit son score.
pub(crate) const REST_PAIR_USAGE_PENALTY: i64 = 500;

/// Poids du déficit d'un bloc dans le score de complétion d'heures.
pub(crate) const DEFICIT_WEIGHT: i64 = 100;

/// Bonus quand le bloc correspond au rôle préféré de l'employé.
pub(crate) const ROLE_BONUS: i64 = 50;
