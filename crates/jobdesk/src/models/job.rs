//! Job and project records as returned by the jobs API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true once the job can no longer change on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

/// Kind of processing a job performs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Parse,
    Extract,
    Analyze,
    Convert,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::Parse,
        JobType::Extract,
        JobType::Analyze,
        JobType::Convert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Parse => "parse",
            JobType::Extract => "extract",
            JobType::Analyze => "analyze",
            JobType::Convert => "convert",
        }
    }

    /// Label used by selectors.
    pub fn label(&self) -> &'static str {
        match self {
            JobType::Parse => "Parse Document",
            JobType::Extract => "Extract Data",
            JobType::Analyze => "Analyze Content",
            JobType::Convert => "Convert Format",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|job_type| job_type.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownJobType(s.to_string()))
    }
}

/// A project, either listed on its own or referenced from a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Project {
    pub id: String,
    pub name: String,
}

/// A processing job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    /// Server-assigned identifier.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    /// Completion percentage, meaningful while running.
    #[serde(default)]
    pub progress: u8,
    /// Elapsed processing time in milliseconds, set once terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
}

impl Job {
    /// Title shown in the table: the job name, or "<type> Job".
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{} Job", self.job_type),
        }
    }

    /// Name used in notifications: the job name, or its id.
    pub fn label(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.id,
        }
    }

    /// First eight characters of the id.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(8) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    /// Progress clamped to 0..=100; pending jobs always report 0.
    pub fn progress_percent(&self) -> u8 {
        match self.status {
            JobStatus::Pending => 0,
            _ => self.progress.min(100),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Formats a millisecond duration for display ("850ms", "12.5s", "3m 20s", "1h 5m").
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms < 1_000 {
        return format!("{}ms", duration_ms);
    }
    let secs = duration_ms / 1_000;
    if secs < 60 {
        return format!("{:.1}s", duration_ms as f64 / 1_000.0);
    }
    if secs < 3_600 {
        return format!("{}m {}s", secs / 60, secs % 60);
    }
    format!("{}h {}m", secs / 3_600, (secs % 3_600) / 60)
}
