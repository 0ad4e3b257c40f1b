//! Markdown report generation
//!
//! This module renders a finished session as a human-readable Markdown report:
//! session metadata, page counters, images by type, the image listing, failed
//! images, and the warnings and errors from the event log.

use super::SessionSummary;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Longest image listing written to the report
const MAX_LISTED_IMAGES: usize = 200;

/// Longest list of log entries per section
const MAX_LISTED_EVENTS: usize = 50;

/// Writes the Markdown report for a session
///
/// # Arguments
///
/// * `summary` - The session summary
/// * `output_path` - Path where the Markdown file should be written
pub fn generate_markdown_report(
    summary: &SessionSummary,
    output_path: &Path,
) -> std::io::Result<()> {
    let markdown = format_markdown_report(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Report written to {}", output_path.display());
    Ok(())
}

/// Formats a session summary as Markdown
pub fn format_markdown_report(summary: &SessionSummary) -> String {
    let mut md = String::new();

    md.push_str("# Image-Trawler Crawl Report\n\n");

    // Session metadata
    md.push_str("## Session\n\n");
    if let Some(seed) = &summary.seed {
        md.push_str(&format!("- **Seed**: {}\n", seed));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    if let Some(started) = summary.started_at {
        md.push_str(&format!("- **Started**: {}\n", started.to_rfc3339()));
    }
    if let Some(finished) = summary.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = summary.duration_seconds {
        md.push_str(&format!("- **Duration**: {} seconds\n", duration));
    }
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Page counters
    md.push_str("## Pages\n\n");
    md.push_str(&format!("- **Visited**: {}\n", summary.pages_visited));
    md.push_str(&format!("- **Failed**: {}\n", summary.pages_failed));
    md.push_str(&format!(
        "- **Deepest Level**: {}\n",
        summary.max_depth_reached
    ));
    md.push_str(&format!("- **Left in Queue**: {}\n", summary.queue_length));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    // Images by type
    md.push_str("## Images by Type\n\n");
    md.push_str("| Type | Count |\n");
    md.push_str("|------|-------|\n");
    for (image_type, count) in &summary.images_by_type {
        md.push_str(&format!("| {} | {} |\n", image_type, count));
    }
    md.push_str(&format!(
        "| **Total** | {} ({} selected) |\n\n",
        summary.images_found, summary.images_selected
    ));

    // Image listing
    if !summary.images.is_empty() {
        match summary.filter {
            Some(filter) => md.push_str(&format!("## Images ({} only)\n\n", filter)),
            None => md.push_str("## Images\n\n"),
        }
        md.push_str("| Filename | Type | Size | Source | URL |\n");
        md.push_str("|----------|------|------|--------|-----|\n");

        for image in summary.images.iter().take(MAX_LISTED_IMAGES) {
            let size = match (image.width, image.height) {
                (Some(w), Some(h)) => format!("{}x{}", w, h),
                (Some(w), None) => format!("{}w", w),
                (None, Some(h)) => format!("{}h", h),
                (None, None) => "-".to_string(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                image.filename, image.image_type, size, image.source_url, image.url
            ));
        }
        if summary.images.len() > MAX_LISTED_IMAGES {
            md.push_str(&format!(
                "\n... and {} more\n",
                summary.images.len() - MAX_LISTED_IMAGES
            ));
        }
        md.push('\n');
    }

    // Failed images
    if !summary.failed_images.is_empty() {
        md.push_str("## Failed Images\n\n");
        for url in &summary.failed_images {
            md.push_str(&format!("- {}\n", url));
        }
        md.push('\n');
    }

    for (title, events) in [("Warnings", &summary.warnings), ("Errors", &summary.errors)] {
        if events.is_empty() {
            continue;
        }
        md.push_str(&format!("## {}\n\n", title));
        for event in events.iter().take(MAX_LISTED_EVENTS) {
            md.push_str(&format!("- {}\n", event));
        }
        if events.len() > MAX_LISTED_EVENTS {
            md.push_str(&format!(
                "\n... and {} more\n",
                events.len() - MAX_LISTED_EVENTS
            ));
        }
        md.push('\n');
    }

    md
}
