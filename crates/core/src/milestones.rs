//! Standard pregnancy milestones.
//!
//! Two sets exist: a fixed catalog of 21 checkpoints that is generated on
//! demand for display, and five default milestones persisted when a
//! pregnancy is created.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::week::DUE_WEEK;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneCategory {
    Appointment,
    Development,
    Milestone,
}

#[derive(Debug, Clone, Copy)]
struct CatalogEntry {
    week: i64,
    title: &'static str,
    description: &'static str,
    category: MilestoneCategory,
}

const fn entry(
    week: i64,
    title: &'static str,
    description: &'static str,
    category: MilestoneCategory,
) -> CatalogEntry {
    CatalogEntry {
        week,
        title,
        description,
        category,
    }
}

use MilestoneCategory::{Appointment, Development, Milestone};

const CATALOG: [CatalogEntry; 21] = [
    entry(8, "First Prenatal Visit", "Confirm pregnancy and establish care", Appointment),
    entry(10, "Baby's Heart Starts Beating", "Baby's heart begins to beat", Development),
    entry(12, "12-Week Scan", "First ultrasound and genetic screening", Appointment),
    entry(14, "Second Trimester Begins", "Morning sickness often improves", Milestone),
    entry(16, "Gender Reveal Possible", "Sex can often be determined", Development),
    entry(18, "Anatomy Scan Prep", "Prepare for detailed ultrasound", Appointment),
    entry(20, "20-Week Anatomy Scan", "Detailed ultrasound examination", Appointment),
    entry(20, "Halfway Point!", "You're halfway through pregnancy", Milestone),
    entry(22, "Baby's Movements", "You may start feeling kicks", Development),
    entry(24, "Viability Milestone", "Baby can survive outside womb", Milestone),
    entry(26, "Glucose Screening", "Test for gestational diabetes", Appointment),
    entry(28, "Third Trimester Begins", "Final pregnancy phase starts", Milestone),
    entry(28, "28-Week Checkup", "Regular monitoring increases", Appointment),
    entry(32, "32-Week Checkup", "Monitor baby's growth and position", Appointment),
    entry(34, "Baby Shower Time", "Celebrate with friends and family", Milestone),
    entry(36, "36-Week Checkup", "Weekly visits often begin", Appointment),
    entry(37, "Full Term!", "Baby is considered full term", Milestone),
    entry(38, "38-Week Checkup", "Final preparations", Appointment),
    entry(39, "39-Week Checkup", "Any day now!", Appointment),
    entry(40, "Due Date", "Your estimated due date", Milestone),
    entry(41, "Post-Due Checkup", "Monitor if past due date", Appointment),
];

/// A catalog milestone placed on a concrete date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedMilestone {
    pub week: i64,
    pub title: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub category: MilestoneCategory,
    pub date: NaiveDate,
    pub is_past: bool,
    pub is_current: bool,
}

/// Calendar date on which `week` starts.
///
/// Counted forward from the conception date (shifted back two weeks) when
/// known, otherwise backward from the due date.
pub fn milestone_date(week: i64, due: NaiveDate, conception: Option<NaiveDate>) -> NaiveDate {
    match conception {
        Some(conceived) => conceived + Duration::days((week - 1) * 7 - 14),
        None => due - Duration::days((DUE_WEEK - week) * 7),
    }
}

/// The full catalog, dated and flagged relative to `current_week`.
pub fn generate(
    due: NaiveDate,
    conception: Option<NaiveDate>,
    current_week: i64,
) -> Vec<GeneratedMilestone> {
    CATALOG
        .iter()
        .map(|entry| GeneratedMilestone {
            week: entry.week,
            title: entry.title,
            description: entry.description,
            category: entry.category,
            date: milestone_date(entry.week, due, conception),
            is_past: entry.week < current_week,
            is_current: entry.week == current_week,
        })
        .collect()
}

/// A milestone row to persist at pregnancy creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMilestone {
    pub milestone_type: &'static str,
    pub title: &'static str,
    pub scheduled_date: NaiveDate,
    pub week_number: i64,
}

/// (type, title, days relative to the due date, week)
const DEFAULT_SCHEDULE: [(&str, &str, i64, i64); 5] = [
    ("first_appointment", "First Doctor Appointment", -245, 8),
    ("12_week_scan", "12 Week Scan", -196, 12),
    ("20_week_scan", "20 Week Anatomy Scan", -140, 20),
    ("36_week_appointment", "36 Week Appointment", -42, 36),
    ("due_date", "Due Date", 0, 40),
];

pub fn default_milestones(due: NaiveDate) -> Vec<NewMilestone> {
    DEFAULT_SCHEDULE
        .iter()
        .map(|&(milestone_type, title, offset, week_number)| NewMilestone {
            milestone_type,
            title,
            scheduled_date: due + Duration::days(offset),
            week_number,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn catalog_is_fixed_regardless_of_current_week() {
        let early = generate(due(), None, 5);
        let late = generate(due(), None, 39);
        assert_eq!(early.len(), 21);
        let key = |m: &GeneratedMilestone| (m.week, m.title, m.category);
        assert_eq!(
            early.iter().map(key).collect::<Vec<_>>(),
            late.iter().map(key).collect::<Vec<_>>()
        );
        assert_eq!(early.first().map(|m| m.week), Some(8));
        assert_eq!(early.last().map(|m| m.week), Some(41));
    }

    #[test]
    fn past_and_current_flags() {
        let list = generate(due(), None, 20);
        let twenty: Vec<_> = list.iter().filter(|m| m.week == 20).collect();
        assert_eq!(twenty.len(), 2);
        assert!(twenty.iter().all(|m| m.is_current && !m.is_past));
        assert!(list.iter().filter(|m| m.week < 20).all(|m| m.is_past));
        assert!(list.iter().filter(|m| m.week > 20).all(|m| !m.is_past && !m.is_current));
    }

    #[test]
    fn dates_from_due_date() {
        assert_eq!(milestone_date(40, due(), None), due());
        assert_eq!(milestone_date(38, due(), None), due() - Duration::days(14));
    }

    #[test]
    fn dates_from_conception() {
        let conceived = NaiveDate::from_ymd_opt(2024, 9, 8).unwrap();
        assert_eq!(milestone_date(3, due(), Some(conceived)), conceived);
        assert_eq!(milestone_date(1, due(), Some(conceived)), conceived - Duration::days(14));
    }

    #[test]
    fn default_schedule_offsets() {
        let rows = default_milestones(due());
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].scheduled_date, due() - Duration::days(245));
        assert_eq!(rows[0].week_number, 8);
        assert_eq!(rows[4].milestone_type, "due_date");
        assert_eq!(rows[4].scheduled_date, due());
    }
}
