use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub type PeriodId = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Teaching,
    Break,
    Lunch,
}

impl PeriodKind {
    pub fn is_teaching(self) -> bool {
        matches!(self, PeriodKind::Teaching)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodKind::Teaching => "teaching",
            PeriodKind::Break => "break",
            PeriodKind::Lunch => "lunch",
        }
    }
}

/// One row of the bell schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodDefinition {
    pub id: PeriodId,
    pub label: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub kind: PeriodKind,
}

impl PeriodDefinition {
    pub fn new(
        id: PeriodId,
        label: impl Into<String>,
        start: NaiveTime,
        end: NaiveTime,
        kind: PeriodKind,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            start,
            end,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct WeekGridError {
    message: String,
}

impl WeekGridError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The weekly grid a timetable is laid out on: the school days and the
/// bell schedule shared by every class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekGrid {
    days: Vec<Weekday>,
    periods: Vec<PeriodDefinition>,
}

/// Serializable form of [`WeekGrid`], loaded from JSON by the adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekGridConfig {
    days: Vec<Weekday>,
    periods: Vec<PeriodDefinition>,
}

impl Default for WeekGrid {
    fn default() -> Self {
        Self::standard()
    }
}

impl WeekGrid {
    pub const SCHOOL_DAYS: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    /// Monday to Friday, eight 45 minute lessons with a morning break after
    /// period 3 and lunch after period 5.
    pub fn standard() -> Self {
        let mut periods = Vec::new();
        let mut start = hm(8, 0);
        let mut lesson = 1u8;
        // Break and lunch take the ids after the last lesson so lesson
        // numbers stay 1..=8 as printed on the grid.
        let mut pause_id = 9u8;
        for slot in 0..10 {
            let (kind, minutes) = match slot {
                3 => (PeriodKind::Break, 15),
                6 => (PeriodKind::Lunch, 45),
                _ => (PeriodKind::Teaching, 45),
            };
            let end = start + chrono::Duration::minutes(minutes);
            let (id, label) = match kind {
                PeriodKind::Teaching => {
                    let id = lesson;
                    lesson += 1;
                    (id, format!("Period {id}"))
                }
                PeriodKind::Break => {
                    let id = pause_id;
                    pause_id += 1;
                    (id, "Break".to_string())
                }
                PeriodKind::Lunch => {
                    let id = pause_id;
                    pause_id += 1;
                    (id, "Lunch".to_string())
                }
            };
            periods.push(PeriodDefinition::new(id, label, start, end, kind));
            start = end;
        }
        Self {
            days: Self::SCHOOL_DAYS.to_vec(),
            periods,
        }
    }

    pub fn from_config(config: &WeekGridConfig) -> Result<Self, WeekGridError> {
        if config.days.is_empty() {
            return Err(WeekGridError::new("week grid requires at least one day"));
        }
        let mut seen_days = HashSet::new();
        for day in &config.days {
            if !Self::SCHOOL_DAYS.contains(day) {
                return Err(WeekGridError::new(format!(
                    "{day} is not a school day (Mon..Fri)"
                )));
            }
            if !seen_days.insert(day.num_days_from_monday()) {
                return Err(WeekGridError::new(format!("day {day} listed twice")));
            }
        }
        let mut seen_periods = HashSet::new();
        for period in &config.periods {
            if !seen_periods.insert(period.id) {
                return Err(WeekGridError::new(format!(
                    "period id {} listed twice",
                    period.id
                )));
            }
            if period.end <= period.start {
                return Err(WeekGridError::new(format!(
                    "period {} ends at {} before it starts at {}",
                    period.id, period.end, period.start
                )));
            }
        }

        let mut days = config.days.clone();
        days.sort_by_key(|d| d.num_days_from_monday());
        let mut periods = config.periods.clone();
        periods.sort_by_key(|p| p.start);
        Ok(Self { days, periods })
    }

    pub fn to_config(&self) -> WeekGridConfig {
        WeekGridConfig::from(self)
    }

    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    /// Periods in bell order (by start time).
    pub fn periods(&self) -> &[PeriodDefinition] {
        &self.periods
    }

    pub fn period(&self, period_id: PeriodId) -> Option<&PeriodDefinition> {
        self.periods.iter().find(|p| p.id == period_id)
    }

    pub fn is_school_day(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    pub fn has_period(&self, period_id: PeriodId) -> bool {
        self.period(period_id).is_some()
    }

    /// Unknown periods count as non-teaching.
    pub fn is_teaching_period(&self, period_id: PeriodId) -> bool {
        self.period(period_id)
            .map(|p| p.kind.is_teaching())
            .unwrap_or(false)
    }

    pub fn teaching_periods(&self) -> impl Iterator<Item = &PeriodDefinition> {
        self.periods.iter().filter(|p| p.kind.is_teaching())
    }

    /// Number of teaching slots a single class has per week.
    pub fn teaching_slot_count(&self) -> usize {
        self.days.len() * self.teaching_periods().count()
    }
}

impl WeekGridConfig {
    pub fn new<I, J>(days: I, periods: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = PeriodDefinition>,
    {
        Self {
            days: days.into_iter().collect(),
            periods: periods.into_iter().collect(),
        }
    }

    pub fn days(&self) -> &[Weekday] {
        &self.days
    }

    pub fn periods(&self) -> &[PeriodDefinition] {
        &self.periods
    }
}

impl Default for WeekGridConfig {
    fn default() -> Self {
        WeekGridConfig::from(&WeekGrid::default())
    }
}

impl From<&WeekGrid> for WeekGridConfig {
    fn from(grid: &WeekGrid) -> Self {
        Self {
            days: grid.days.clone(),
            periods: grid.periods.clone(),
        }
    }
}

/// Parses `mon`, `Monday`, `1` (Monday = 1) style day names.
pub fn parse_day(input: &str) -> Option<Weekday> {
    let trimmed = input.trim();
    if let Ok(n) = trimmed.parse::<u8>() {
        return match n {
            1 => Some(Weekday::Mon),
            2 => Some(Weekday::Tue),
            3 => Some(Weekday::Wed),
            4 => Some(Weekday::Thu),
            5 => Some(Weekday::Fri),
            _ => None,
        };
    }
    trimmed.parse::<Weekday>().ok()
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}
