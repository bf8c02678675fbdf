use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifiant fort pour Employee
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifiant fort pour Team (paire)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(String);

impl TeamId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifiant fort pour WeekPlan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_owned())
    }
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Bloc horaire de la journée. DAY et EVENING portent toute la logique
/// (entraide inter-blocs, couvertures) ; NIGHT n'existe que comme
/// contrainte d'éligibilité.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShiftBlock {
    Day,
    Evening,
    Night,
}

impl ShiftBlock {
    pub fn code(&self) -> &'static str {
        match self {
            ShiftBlock::Day => "DAY",
            ShiftBlock::Evening => "EVENING",
            ShiftBlock::Night => "NIGHT",
        }
    }
}

/// Rôle housekeeping : femme de chambre (matin de préférence) ou
/// valet du soir (couvertures de préférence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Fdc,
    Vdc,
}

impl Role {
    pub fn code(&self) -> &'static str {
        match self {
            Role::Fdc => "FDC",
            Role::Vdc => "VDC",
        }
    }

    /// Bloc où ce rôle est affecté en priorité.
    pub fn preferred_block(&self) -> ShiftBlock {
        match self {
            Role::Fdc => ShiftBlock::Day,
            Role::Vdc => ShiftBlock::Evening,
        }
    }
}

/// Niveau d'élasticité : plafond d'heures sup tolérées par employé.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElasticityLevel {
    Low,
    Medium,
    High,
}

/// Période d'indisponibilité d'un employé (intervalle de dates inclusif).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if end < start {
            return Err("unavailability end must not precede start".to_string());
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Employé du service des étages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub role: Role,
    /// Heures hebdomadaires contractuelles (ex : 39.0, 24.0).
    pub weekly_hours_target: f64,
    #[serde(default = "default_elasticity")]
    pub elasticity: ElasticityLevel,
    pub allowed_blocks: std::collections::BTreeSet<ShiftBlock>,
    /// Jours de repos fixes (0 à 2). Vide = le système choisit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixed_days_off: Vec<Weekday>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<DateRange>,
}

fn default_elasticity() -> ElasticityLevel {
    ElasticityLevel::Medium
}

impl Employee {
    pub fn new<N: Into<String>>(name: N, role: Role, weekly_hours_target: f64) -> Self {
        let mut allowed = std::collections::BTreeSet::new();
        allowed.insert(ShiftBlock::Day);
        allowed.insert(ShiftBlock::Evening);
        Self {
            id: EmployeeId::random(),
            name: name.into(),
            role,
            weekly_hours_target,
            elasticity: ElasticityLevel::Medium,
            allowed_blocks: allowed,
            fixed_days_off: Vec::new(),
            unavailable: Vec::new(),
        }
    }

    pub fn can_work_block(&self, block: ShiftBlock) -> bool {
        self.allowed_blocks.contains(&block)
    }

    pub fn is_unavailable_on(&self, date: NaiveDate) -> bool {
        self.unavailable.iter().any(|r| r.contains(date))
    }

    /// Prénom court pour l'affichage des répartitions.
    pub fn short_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

/// Type de paire : seules les paires FIXED sont des contraintes dures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamKind {
    Fixed,
    Preferred,
    Temporary,
}

/// Paire de travail : deux employés planifiés ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub members: [EmployeeId; 2],
    pub kind: TeamKind,
}

impl Team {
    pub fn new<N: Into<String>>(name: N, a: EmployeeId, b: EmployeeId, kind: TeamKind) -> Self {
        Self {
            id: TeamId::random(),
            name: name.into(),
            members: [a, b],
            kind,
        }
    }

    pub fn has_member(&self, id: &EmployeeId) -> bool {
        self.members.iter().any(|m| m == id)
    }

    pub fn partner_of(&self, id: &EmployeeId) -> Option<&EmployeeId> {
        match &self.members {
            [a, b] if a == id => Some(b),
            [a, b] if b == id => Some(a),
            _ => None,
        }
    }
}

/// Plantilla de vacation : horaires concrets pour un rôle et un bloc.
/// La variante courte (`is_short`) sert à tomber juste sur les heures
/// restantes d'un contrat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftTemplate {
    pub code: String,
    pub role: Role,
    pub block: ShiftBlock,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub break_minutes: u32,
    #[serde(default)]
    pub is_short: bool,
}

impl ShiftTemplate {
    /// Minutes travaillées effectives (pause déduite).
    pub fn work_minutes(&self) -> i64 {
        let span = (self.end_time - self.start_time).num_minutes();
        span - i64::from(self.break_minutes)
    }

    pub fn hours(&self) -> f64 {
        self.work_minutes() as f64 / 60.0
    }
}

/// Effectif complet fourni au planificateur : employés, paires, plantillas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    pub employees: Vec<Employee>,
    pub teams: Vec<Team>,
    pub templates: Vec<ShiftTemplate>,
}

impl Roster {
    pub fn find_employee(&self, id: &EmployeeId) -> Option<&Employee> {
        self.employees.iter().find(|e| &e.id == id)
    }

    pub fn find_team(&self, id: &TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| &t.id == id)
    }

    /// Paires FIXED dont les deux membres existent dans l'effectif.
    pub fn fixed_pairs(&self) -> Vec<&Team> {
        self.teams
            .iter()
            .filter(|t| t.kind == TeamKind::Fixed)
            .filter(|t| t.members.iter().all(|m| self.find_employee(m).is_some()))
            .collect()
    }

    pub fn team_of(&self, id: &EmployeeId) -> Option<&Team> {
        self.teams
            .iter()
            .find(|t| t.kind == TeamKind::Fixed && t.has_member(id))
    }

    pub fn template_for(&self, role: Role, block: ShiftBlock, short: bool) -> Option<&ShiftTemplate> {
        self.templates
            .iter()
            .find(|t| t.role == role && t.block == block && t.is_short == short)
    }

    /// Plantilla d'un bloc tous rôles confondus, en secours quand le rôle
    /// exact n'a pas de plantilla propre.
    pub fn any_template_for(&self, block: ShiftBlock, short: bool) -> Option<&ShiftTemplate> {
        self.templates
            .iter()
            .find(|t| t.block == block && t.is_short == short)
    }
}

/// Journée de prévision d'occupation. Les compteurs sont des entiers non
/// signés : une valeur négative est rejetée dès le parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub departures: u32,
    pub arrivals: u32,
    pub occupied: u32,
}

impl ForecastDay {
    /// Recouches = chambres occupées qui ne sont pas des arrivées du jour.
    pub fn stays(&self) -> u32 {
        self.occupied.saturating_sub(self.arrivals)
    }
}

/// Prévision validée : exactement 7 jours consécutifs à partir d'un lundi.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ForecastDay>", into = "Vec<ForecastDay>")]
pub struct WeekForecast {
    days: Vec<ForecastDay>,
}

impl WeekForecast {
    pub fn new(days: Vec<ForecastDay>) -> Result<Self, String> {
        if days.len() != 7 {
            return Err(format!("forecast must cover 7 days, got {}", days.len()));
        }
        if days[0].date.weekday() != Weekday::Mon {
            return Err(format!(
                "forecast must start on a Monday, got {}",
                days[0].date
            ));
        }
        for (i, pair) in days.windows(2).enumerate() {
            let next = pair[0].date.succ_opt().ok_or("date overflow")?;
            if pair[1].date != next {
                return Err(format!("forecast days not consecutive at index {}", i + 1));
            }
        }
        Ok(Self { days })
    }

    pub fn week_start(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn days(&self) -> &[ForecastDay] {
        &self.days
    }

    pub fn day(&self, date: NaiveDate) -> Option<&ForecastDay> {
        self.days.iter().find(|d| d.date == date)
    }
}

impl TryFrom<Vec<ForecastDay>> for WeekForecast {
    type Error = String;
    fn try_from(days: Vec<ForecastDay>) -> Result<Self, String> {
        WeekForecast::new(days)
    }
}

impl From<WeekForecast> for Vec<ForecastDay> {
    fn from(f: WeekForecast) -> Self {
        f.days
    }
}

/// Besoin en personnel dérivé d'une journée de prévision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingRequirement {
    pub date: NaiveDate,
    pub morning_persons: u32,
    pub evening_persons: u32,
}

/// Clé typée d'affectation : employé individuel ou paire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssigneeRef {
    Employee(EmployeeId),
    Team(TeamId),
}

impl AssigneeRef {
    pub fn as_str(&self) -> &str {
        match self {
            AssigneeRef::Employee(id) => id.as_str(),
            AssigneeRef::Team(id) => id.as_str(),
        }
    }
}

/// Vacation affectée à une date, pour un employé ou une paire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftAssignment {
    pub date: NaiveDate,
    pub assignee: AssigneeRef,
    pub template_code: String,
    pub block: ShiftBlock,
    pub assigned_hours: f64,
    #[serde(default)]
    pub is_day_off: bool,
}

/// Statut du plan. Seul un DRAFT peut être régénéré.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    Draft,
    Review,
    Approved,
    Published,
    Archived,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlanStatus::Draft => "DRAFT",
            PlanStatus::Review => "REVIEW",
            PlanStatus::Approved => "APPROVED",
            PlanStatus::Published => "PUBLISHED",
            PlanStatus::Archived => "ARCHIVED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Understaff,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Alerte douce produite pendant la génération. Un déficit de couverture
/// n'est jamais une erreur : il se signale ici et le plan reste utilisable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningAlert {
    pub date: NaiveDate,
    pub block: Option<ShiftBlock>,
    pub kind: AlertKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

/// Plan hebdomadaire : l'horaire de travail de chaque employé.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub id: PlanId,
    /// Toujours un lundi.
    pub week_start: NaiveDate,
    pub status: PlanStatus,
    pub forecast: Vec<ForecastDay>,
    pub requirements: Vec<StaffingRequirement>,
    pub assignments: Vec<ShiftAssignment>,
    pub alerts: Vec<PlanningAlert>,
}

impl WeekPlan {
    pub fn week_end(&self) -> NaiveDate {
        self.week_start + chrono::Duration::days(6)
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        (0..7)
            .map(|i| self.week_start + chrono::Duration::days(i))
            .collect()
    }

    pub fn assignments_on(&self, date: NaiveDate) -> impl Iterator<Item = &ShiftAssignment> {
        self.assignments
            .iter()
            .filter(move |a| a.date == date && !a.is_day_off)
    }

    pub fn headcount(&self, date: NaiveDate, block: ShiftBlock) -> usize {
        self.assignments_on(date)
            .filter(|a| a.block == block)
            .count()
    }

    pub fn hours_of(&self, id: &EmployeeId) -> f64 {
        self.assignments
            .iter()
            .filter(|a| !a.is_day_off && a.assignee == AssigneeRef::Employee(id.clone()))
            .map(|a| a.assigned_hours)
            .sum()
    }

    pub fn requirement_on(&self, date: NaiveDate) -> Option<&StaffingRequirement> {
        self.requirements.iter().find(|r| r.date == date)
    }
}
