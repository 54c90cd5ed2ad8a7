//! Employee model.
//!
//! Employees perform tasks whose required position matches their own.
//! Each has a fixed weekly set of days off.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::WorkCalendar;

/// An employee on the project roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Unique employee identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Role/position, matched against `PlanTask::position`.
    pub position: String,
    /// Weekday names that are never worked (e.g. "Saturday", "Sun").
    #[serde(default)]
    pub days_off: Vec<String>,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
}

impl Employee {
    /// Creates an employee who works every day.
    pub fn new(id: impl Into<String>, position: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            position: position.into(),
            days_off: Vec::new(),
            email: None,
        }
    }

    /// Sets the employee name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a day off by name.
    pub fn with_day_off(mut self, day: impl Into<String>) -> Self {
        self.days_off.push(day.into());
        self
    }

    /// Sets the contact email.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Whether this employee can fill the given position.
    ///
    /// Comparison ignores surrounding whitespace and letter case.
    /// An empty position matches nobody.
    pub fn matches_position(&self, position: &str) -> bool {
        let wanted = position.trim();
        !wanted.is_empty() && self.position.trim().to_lowercase() == wanted.to_lowercase()
    }

    /// Parsed days off. Unrecognized names are skipped.
    pub fn weekdays_off(&self) -> Vec<Weekday> {
        self.days_off
            .iter()
            .filter_map(|name| parse_weekday(name))
            .collect()
    }

    /// Day-off names that are not weekdays.
    pub fn unknown_days_off(&self) -> Vec<&str> {
        self.days_off
            .iter()
            .filter(|name| parse_weekday(name).is_none())
            .map(|s| s.as_str())
            .collect()
    }

    /// Working calendar built from the days off.
    pub fn calendar(&self) -> WorkCalendar {
        WorkCalendar::from_days_off(self.weekdays_off())
    }
}

/// Parses an English weekday name, full or abbreviated, in any case.
pub fn parse_weekday(name: &str) -> Option<Weekday> {
    name.trim().parse::<Weekday>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_builder() {
        let e = Employee::new("E1", "Developer")
            .with_name("Anna")
            .with_day_off("Saturday")
            .with_day_off("Sunday")
            .with_email("anna@example.com");

        assert_eq!(e.id, "E1");
        assert_eq!(e.name, "Anna");
        assert_eq!(e.days_off.len(), 2);
        assert_eq!(e.email.as_deref(), Some("anna@example.com"));
        assert_eq!(e.weekdays_off(), vec![Weekday::Sat, Weekday::Sun]);
    }

    #[test]
    fn test_position_matching() {
        let e = Employee::new("E1", "Developer");
        assert!(e.matches_position("developer"));
        assert!(e.matches_position(" Developer "));
        assert!(!e.matches_position("Designer"));
        assert!(!e.matches_position(""));
    }

    #[test]
    fn test_weekday_parsing() {
        assert_eq!(parse_weekday("monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Fri"), Some(Weekday::Fri));
        assert_eq!(parse_weekday(" SUNDAY "), Some(Weekday::Sun));
        assert_eq!(parse_weekday("someday"), None);
    }

    #[test]
    fn test_unknown_days_off() {
        let e = Employee::new("E1", "Dev")
            .with_day_off("Saturday")
            .with_day_off("Holiday");
        assert_eq!(e.unknown_days_off(), vec!["Holiday"]);
        assert_eq!(e.weekdays_off(), vec![Weekday::Sat]);
        assert!(e.calendar().is_day_off(Weekday::Sat));
    }
}
