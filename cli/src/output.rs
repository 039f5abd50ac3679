//! Plain-text rendering of view models.

use std::fmt::Write as _;

use jobdesk::models::{format_duration, Job};
use jobdesk::view::{JobRow, JobsView};
use jobdesk::{Notification, Tone};

const NAME_WIDTH: usize = 28;

pub fn render_list(view: &JobsView) -> String {
    let mut out = String::new();
    let stats = &view.header.stats;
    let _ = writeln!(
        out,
        "{} jobs | pending {} | running {} | completed {} | failed {}",
        stats.total, stats.pending, stats.running, stats.completed, stats.failed
    );

    if let Some(error) = &view.error {
        let _ = writeln!(out, "error: {}", error.message);
    }

    if view.table.is_empty() {
        let _ = writeln!(out, "\nNo jobs found.");
        if view.filters.has_active_filters {
            let _ = writeln!(out, "Try adjusting your filters.");
        }
    } else {
        let _ = writeln!(
            out,
            "\n{:<10} {:<width$} {:<8} {:<10} {:>4} {:>9}  {}",
            "ID",
            "NAME",
            "TYPE",
            "STATUS",
            "%",
            "DURATION",
            "PROJECT",
            width = NAME_WIDTH
        );
        for row in &view.table.rows {
            out.push_str(&render_row(row));
            out.push('\n');
        }
    }

    let pagination = &view.pagination;
    let _ = writeln!(
        out,
        "\npage {} of {}",
        pagination.page,
        pagination.total_pages.max(1)
    );
    let query = if view.query_string.is_empty() {
        "(none)"
    } else {
        view.query_string.as_str()
    };
    let _ = writeln!(out, "query: {}", query);
    out
}

fn render_row(row: &JobRow) -> String {
    format!(
        "{:<10} {:<width$} {:<8} {:<10} {:>4} {:>9}  {}",
        row.short_id,
        truncate(&row.display_name, NAME_WIDTH),
        row.job_type.as_str(),
        row.status.as_str(),
        row.progress,
        row.duration.as_deref().unwrap_or("-"),
        row.project.as_deref().unwrap_or("-"),
        width = NAME_WIDTH
    )
}

pub fn render_job(job: &Job) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", job.display_name());
    let _ = writeln!(out, "  id:       {}", job.id);
    let _ = writeln!(out, "  type:     {}", job.job_type.label());
    let _ = writeln!(out, "  status:   {}", job.status);
    let _ = writeln!(out, "  progress: {}%", job.progress_percent());
    if let Some(duration) = job.duration {
        let _ = writeln!(out, "  duration: {}", format_duration(duration));
    }
    if let Some(project) = &job.project {
        let _ = writeln!(out, "  project:  {} ({})", project.name, project.id);
    }
    let _ = writeln!(
        out,
        "  created:  {}",
        job.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out
}

pub fn render_notification(notification: &Notification) -> String {
    let marker = match notification.tone {
        Tone::Success => "ok",
        Tone::Error => "error",
    };
    format!(
        "[{}] {}: {}",
        marker, notification.title, notification.description
    )
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut cut: String = value.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long job name", 10), "a very ...");
    }

    #[test]
    fn test_render_notification() {
        let notification = Notification::error("Failed to start job", "Job is already running");
        assert_eq!(
            render_notification(&notification),
            "[error] Failed to start job: Job is already running"
        );
    }

    #[test]
    fn test_render_job_includes_project() {
        let job: Job = serde_json::from_value(serde_json::json!({
            "id": "j-1",
            "name": "Invoices",
            "type": "extract",
            "status": "completed",
            "progress": 100,
            "duration": 3_000,
            "created_at": "2026-03-01T09:30:00Z",
            "project": {"id": "p-1", "name": "Finance"}
        }))
        .unwrap();
        let out = render_job(&job);
        assert!(out.starts_with("Invoices\n"));
        assert!(out.contains("type:     Extract Data"));
        assert!(out.contains("project:  Finance (p-1)"));
        assert!(out.contains("duration: 3.0s"));
    }
}
