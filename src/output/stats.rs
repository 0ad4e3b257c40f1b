//! Console statistics for a finished crawl

use super::SessionSummary;

/// Prints a session summary to stdout in a formatted manner
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &SessionSummary) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    if let Some(seed) = &summary.seed {
        println!("  Seed: {}", seed);
    }
    println!("  Status: {}", summary.status);
    if let Some(duration) = summary.duration_seconds {
        println!("  Duration: {}s", duration);
    }
    println!("  Pages visited: {}", summary.pages_visited);
    println!("  Pages failed: {}", summary.pages_failed);
    println!("  Deepest level reached: {}", summary.max_depth_reached);
    if summary.queue_length > 0 {
        println!("  Pages left in queue: {}", summary.queue_length);
    }
    println!();

    println!(
        "Images ({} found, {} selected):",
        summary.images_found, summary.images_selected
    );
    // Largest groups first
    let mut type_counts: Vec<_> = summary.images_by_type.iter().collect();
    type_counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    for (image_type, count) in type_counts {
        let percentage = if summary.images_found > 0 {
            (*count as f64 / summary.images_found as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", image_type, count, percentage);
    }
    println!();

    if let Some(filter) = summary.filter {
        println!("{} images:", filter);
        for image in &summary.images {
            println!("  - {} ({})", image.url, image.filename);
        }
        println!();
    }

    if !summary.failed_images.is_empty() {
        println!("Failed Images ({}):", summary.failed_images.len());
        for url in &summary.failed_images {
            println!("  - {}", url);
        }
        println!();
    }

    if !summary.errors.is_empty() {
        println!("Errors ({}):", summary.errors.len());
        for event in summary.errors.iter().take(20) {
            println!("  {}", event);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages fetched successfully)",
        summary.success_rate(),
        summary.pages_visited.saturating_sub(summary.pages_failed),
        summary.pages_visited
    );
}
