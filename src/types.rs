use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp layout used for `date` and for plain identifiers
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Issue status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    Closed,
}

impl Status {
    /// Get the string representation of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "open",
            Status::Closed => "closed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Issue structure
///
/// `id` is the record's file stem. It equals `date` unless a creation in the
/// same second forced a suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub name: String,
    pub info: Option<String>,
    pub date: String,
    pub urge: u32,
    pub closed: bool,
}

impl Issue {
    pub fn new(id: String, name: String, date: String) -> Self {
        Self {
            id,
            name,
            info: None,
            date,
            urge: 0,
            closed: false,
        }
    }

    pub fn status(&self) -> Status {
        if self.closed {
            Status::Closed
        } else {
            Status::Open
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} - '{}'", self.name, self.date)?;
        match &self.info {
            Some(info) => writeln!(f, "    INFO: {}", info)?,
            None => writeln!(f, "    INFO: None")?,
        }
        if self.closed {
            writeln!(f, "    STATUS: CLOSED")?;
        } else {
            writeln!(f, "    URGE: {}°", self.urge)?;
            writeln!(f, "    STATUS: OPEN")?;
        }
        if self.id != self.date {
            writeln!(f, "    ID: {}", self.id)?;
        }
        Ok(())
    }
}

/// Fields gathered from the user before an issue is created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueDraft {
    pub name: String,
    pub info: Option<String>,
    pub urge: u32,
}

impl IssueDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn with_urge(mut self, urge: u32) -> Self {
        self.urge = urge;
        self
    }

    /// Parse a typed urgency answer; anything that is not a non-negative
    /// integer counts as 0.
    pub fn parse_urge(answer: &str) -> u32 {
        answer.trim().parse().unwrap_or(0)
    }
}

/// Answer to "an issue with this name already exists, override?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Unrecognized(String),
}

impl Confirmation {
    /// Empty input takes the prompt's default, which is yes.
    pub fn parse(answer: &str) -> Self {
        let normalized = answer.trim().to_lowercase();
        match normalized.as_str() {
            "" | "y" | "yes" => Confirmation::Yes,
            "n" | "no" => Confirmation::No,
            _ => Confirmation::Unrecognized(normalized),
        }
    }
}

/// Format a creation time the way `date` and plain identifiers are stored
pub fn format_date(at: DateTime<Local>) -> String {
    at.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_confirmation_tri_state() {
        assert_eq!(Confirmation::parse(""), Confirmation::Yes);
        assert_eq!(Confirmation::parse("Y"), Confirmation::Yes);
        assert_eq!(Confirmation::parse(" yes "), Confirmation::Yes);
        assert_eq!(Confirmation::parse("n"), Confirmation::No);
        assert_eq!(Confirmation::parse("NO"), Confirmation::No);
        assert_eq!(
            Confirmation::parse("maybe"),
            Confirmation::Unrecognized("maybe".to_string())
        );
    }

    #[test]
    fn test_parse_urge_defaults_to_zero() {
        assert_eq!(IssueDraft::parse_urge("7"), 7);
        assert_eq!(IssueDraft::parse_urge(" 3 "), 3);
        assert_eq!(IssueDraft::parse_urge(""), 0);
        assert_eq!(IssueDraft::parse_urge("high"), 0);
        assert_eq!(IssueDraft::parse_urge("-2"), 0);
    }

    #[test]
    fn test_format_date() {
        let at = Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(format_date(at), "2024-01-01 10:00:00");
    }

    #[test]
    fn test_display_open_and_closed() {
        let mut issue = Issue::new(
            "2024-01-01 10:00:00".to_string(),
            "Fix bug".to_string(),
            "2024-01-01 10:00:00".to_string(),
        );
        issue.info = Some("NPE on save".to_string());
        issue.urge = 7;

        let shown = issue.to_string();
        assert!(shown.starts_with("Fix bug - '2024-01-01 10:00:00'\n"));
        assert!(shown.contains("    INFO: NPE on save\n"));
        assert!(shown.contains("    URGE: 7°\n"));
        assert!(shown.contains("    STATUS: OPEN\n"));
        assert!(!shown.contains("ID:"));

        issue.closed = true;
        issue.id = "2024-01-01 10:00:00-a1b2".to_string();
        let shown = issue.to_string();
        assert!(shown.contains("    STATUS: CLOSED\n"));
        assert!(!shown.contains("URGE"));
        assert!(shown.contains("    ID: 2024-01-01 10:00:00-a1b2\n"));
        assert_eq!(issue.status(), Status::Closed);
    }
}
