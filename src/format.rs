use crate::error::{IssueError, Result};
use crate::types::Issue;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File extension of issue records
pub const RECORD_EXTENSION: &str = "is";

/// On-disk body of one issue file
///
/// The identifier is not stored; it is the file stem.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    pub name: String,
    #[serde(default)]
    pub info: Option<String>,
    pub date: String,
    #[serde(default)]
    pub urge: u32,
    #[serde(default)]
    pub closed: bool,
}

/// Render an issue as the contents of its record file
pub fn issue_to_record(issue: &Issue) -> Result<String> {
    let record = Record {
        name: issue.name.clone(),
        info: issue.info.clone(),
        date: issue.date.clone(),
        urge: issue.urge,
        closed: issue.closed,
    };

    let mut output = serde_json::to_string_pretty(&record)?;
    output.push('\n');
    Ok(output)
}

/// Parse the contents of a record file into an issue
///
/// `path` is only used to describe failures.
pub fn record_to_issue(issue_id: &str, content: &[u8], path: &Path) -> Result<Issue> {
    let record: Record = serde_json::from_slice(content).map_err(|e| {
        let mut reason = e.to_string();

        // Name the required fields that are absent, if the body is an object at all
        if let Ok(serde_json::Value::Object(map)) =
            serde_json::from_slice::<serde_json::Value>(content)
        {
            let missing: Vec<&str> = ["name", "date"]
                .into_iter()
                .filter(|field| !map.contains_key(*field))
                .collect();
            if !missing.is_empty() {
                reason.push_str(&format!(" (missing required fields: {})", missing.join(", ")));
            }
        }

        IssueError::MalformedRecord {
            path: path.to_path_buf(),
            reason,
        }
    })?;

    Ok(Issue {
        id: issue_id.to_string(),
        name: record.name,
        info: record.info,
        date: record.date,
        urge: record.urge,
        closed: record.closed,
    })
}

/// File name of the record holding `issue_id`
pub fn record_file_name(issue_id: &str) -> String {
    format!("{}.{}", issue_id, RECORD_EXTENSION)
}
