//! Curriculum calendar: month grid, month navigation, the selected day's
//! events and reminder instants.
//!
//! DESIGN
//! ======
//! The grid is Sunday-first. It starts with one blank cell per weekday before
//! the 1st, followed by one cell per day of the month. "Today" is the UTC
//! calendar date, matching how schedule dates are written on the wire.

use std::collections::BTreeMap;
use std::fmt;

use records::{ScheduleEntry, ScheduleFilter, SessionKind};
use time::macros::format_description;
use time::{Date, Duration, Month, PrimitiveDateTime, Time};

use super::{LoadContext, format_date, heading, parse_date};
use crate::net::http::ApiError;

/// Minutes before an event's start at which its reminder fires.
pub const REMINDER_LEAD_MINUTES: i64 = 15;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

// =============================================================================
// MONTH
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: Month,
}

impl YearMonth {
    #[must_use]
    pub fn of(date: Date) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    /// Parse `YYYY-MM`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (year, month) = raw.trim().split_once('-')?;
        let year = year.parse::<i32>().ok()?;
        let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
        Date::from_calendar_date(year, month, 1).ok()?;
        Some(Self { year, month })
    }

    #[must_use]
    pub fn previous(self) -> Self {
        match self.month {
            Month::January => Self { year: self.year - 1, month: Month::December },
            month => Self { year: self.year, month: month.previous() },
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        match self.month {
            Month::December => Self { year: self.year + 1, month: Month::January },
            month => Self { year: self.year, month: month.next() },
        }
    }

    #[must_use]
    pub fn days(self) -> u8 {
        time::util::days_in_year_month(self.year, self.month)
    }

    fn first_day(self) -> Option<Date> {
        Date::from_calendar_date(self.year, self.month, 1).ok()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, u8::from(self.month))
    }
}

// =============================================================================
// GRID
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarDay {
    pub day: u8,
    pub date: Date,
    pub has_events: bool,
    pub is_today: bool,
    pub is_selected: bool,
}

/// Grid cells for `month`: leading `None`s up to the first weekday, then
/// every day of the month.
#[must_use]
pub fn month_grid(
    month: YearMonth,
    events: &BTreeMap<Date, Vec<ScheduleEntry>>,
    today: Date,
    selected: Date,
) -> Vec<Option<CalendarDay>> {
    let Some(first) = month.first_day() else {
        return Vec::new();
    };
    let leading = usize::from(first.weekday().number_days_from_sunday());

    let mut cells: Vec<Option<CalendarDay>> = vec![None; leading];
    for day in 1..=month.days() {
        let Ok(date) = Date::from_calendar_date(month.year, month.month, day) else {
            continue;
        };
        cells.push(Some(CalendarDay {
            day,
            date,
            has_events: events.get(&date).is_some_and(|e| !e.is_empty()),
            is_today: date == today,
            is_selected: date == selected,
        }));
    }
    cells
}

/// Group entries by calendar date, each day sorted by start time.
/// Entries with an unparseable date are dropped.
#[must_use]
pub fn group_by_date(entries: Vec<ScheduleEntry>) -> BTreeMap<Date, Vec<ScheduleEntry>> {
    let mut grouped: BTreeMap<Date, Vec<ScheduleEntry>> = BTreeMap::new();
    for entry in entries {
        match parse_date(&entry.date) {
            Some(date) => grouped.entry(date).or_default().push(entry),
            None => tracing::debug!(id = %entry.id, date = %entry.date, "skipping schedule entry with bad date"),
        }
    }
    for day in grouped.values_mut() {
        day.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    }
    grouped
}

// =============================================================================
// REMINDERS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reminder {
    pub title: String,
    pub location: String,
    pub at: PrimitiveDateTime,
}

impl Reminder {
    /// Body text of the reminder.
    #[must_use]
    pub fn message(&self) -> String {
        format!("Starting in {REMINDER_LEAD_MINUTES} minutes at {}", self.location)
    }
}

/// Reminder instant for `entry`, or `None` if its date or start time does
/// not parse or the lead time falls before the earliest representable date.
#[must_use]
pub fn reminder_for(entry: &ScheduleEntry) -> Option<Reminder> {
    let date = parse_date(&entry.date)?;
    let start = Time::parse(entry.start_time.trim(), format_description!("[hour]:[minute]")).ok()?;
    let at = PrimitiveDateTime::new(date, start).checked_sub(Duration::minutes(REMINDER_LEAD_MINUTES))?;
    Some(Reminder { title: entry.title.clone(), location: entry.location.clone(), at })
}

/// Reminders still ahead of `now`.
#[must_use]
pub fn pending_reminders(entries: &[ScheduleEntry], now: PrimitiveDateTime) -> Vec<Reminder> {
    entries
        .iter()
        .filter_map(reminder_for)
        .filter(|r| r.at > now)
        .collect()
}

// =============================================================================
// VIEW
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct CurriculumView {
    pub month: YearMonth,
    pub today: Date,
    pub selected: Date,
    pub cells: Vec<Option<CalendarDay>>,
    pub day_events: Vec<ScheduleEntry>,
    pub reminders: Vec<Reminder>,
}

impl CurriculumView {
    /// Build the view for `month` with `selected` highlighted.
    #[must_use]
    pub fn build(entries: Vec<ScheduleEntry>, month: YearMonth, selected: Date, today: Date) -> Self {
        let grouped = group_by_date(entries);
        let cells = month_grid(month, &grouped, today, selected);
        let day_events = grouped.get(&selected).cloned().unwrap_or_default();
        let reminders = day_events.iter().filter_map(reminder_for).collect();
        Self { month, today, selected, cells, day_events, reminders }
    }
}

/// Read `month` (`YYYY-MM`) and `day` (`YYYY-MM-DD`) from the location.
///
/// A selected day moves the calendar to its month unless `month` is given.
/// Defaults are today's month and today.
#[must_use]
pub fn view_position(location: &crate::routes::Location, today: Date) -> (YearMonth, Date) {
    let selected = location.param("day").and_then(parse_date).unwrap_or(today);
    let month = location
        .param("month")
        .and_then(YearMonth::parse)
        .unwrap_or_else(|| YearMonth::of(selected));
    (month, selected)
}

pub async fn load(cx: &LoadContext) -> Result<CurriculumView, ApiError> {
    let entries = cx
        .platform
        .schedule(&cx.token, &ScheduleFilter::default())
        .await?;
    let (month, selected) = view_position(&cx.location, cx.today);
    Ok(CurriculumView::build(entries, month, selected, cx.today))
}

fn kind_label(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Lecture => "lecture",
        SessionKind::Lab => "lab",
        SessionKind::Seminar => "seminar",
        SessionKind::Workshop => "workshop",
        SessionKind::Other => "session",
    }
}

impl fmt::Display for CurriculumView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, &format!("Curriculum {}", self.month))?;
        writeln!(
            f,
            "< /curriculum?month={}    /curriculum?month={} >",
            self.month.previous(),
            self.month.next()
        )?;
        writeln!(f)?;
        writeln!(f, "{}", WEEKDAYS.map(|d| format!("{d:>5}")).concat())?;

        for week in self.cells.chunks(7) {
            let row: String = week
                .iter()
                .map(|cell| match cell {
                    None => "     ".to_owned(),
                    Some(day) => {
                        let mark = match (day.is_selected, day.is_today) {
                            (true, _) => '>',
                            (false, true) => '@',
                            (false, false) => ' ',
                        };
                        let events = if day.has_events { '*' } else { ' ' };
                        format!(" {mark}{:>2}{events}", day.day)
                    }
                })
                .collect();
            writeln!(f, "{}", row.trim_end())?;
        }
        writeln!(f)?;
        writeln!(f, "> selected   @ today   * has sessions")?;
        writeln!(f)?;

        heading(f, &format!("Sessions on {}", format_date(self.selected)))?;
        if self.day_events.is_empty() {
            writeln!(f, "No sessions scheduled.")?;
        }
        for entry in &self.day_events {
            writeln!(
                f,
                "{}-{} {} [{}]",
                entry.start_time,
                entry.end_time,
                entry.title,
                kind_label(entry.kind)
            )?;
            writeln!(f, "    {} | {}", entry.teacher, entry.location)?;
        }
        for reminder in &self.reminders {
            writeln!(
                f,
                "Reminder {} {}: {}",
                format_date(reminder.at.date()),
                short_time(reminder.at.time()),
                reminder.message()
            )?;
        }
        Ok(())
    }
}

fn short_time(t: Time) -> String {
    format!("{:02}:{:02}", t.hour(), t.minute())
}

#[cfg(test)]
#[path = "curriculum_test.rs"]
mod tests;
