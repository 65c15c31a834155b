use std::fmt::Write;

use crate::snapshot::Snapshot;

use super::styling::{accent, heading, label};
use super::tables::{count_cell, create_cyan_header, create_table, percentage_cell, swatch_cell};

/// Prints a human-readable summary of a [`Snapshot`] to stdout.
///
/// Shows an overview of the profile counters followed by the `max_languages`
/// largest languages. The JSON report always carries every language.
pub fn print_summary(snapshot: &Snapshot, max_languages: usize) {
    println!("{}", render_summary(snapshot, max_languages));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{emoji} {}", heading(title));
}

fn render_summary(snapshot: &Snapshot, max_languages: usize) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");
    let _ = writeln!(
        output,
        "  {} {} ({})\n  {} {}\n",
        label("User:"),
        accent(&snapshot.display_name),
        snapshot.username,
        label("Collected at:"),
        snapshot.collected_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );

    let mut overview = create_table();
    overview.set_header(create_cyan_header(&["Metric", "Value"]));
    let rows = [
        ("Stars", snapshot.stars),
        ("Forks", snapshot.forks),
        ("Contributions", snapshot.contributions),
        ("Repositories", snapshot.repos_count as u64),
        ("Lines added", snapshot.lines_added),
        ("Lines deleted", snapshot.lines_deleted),
        ("Lines changed", snapshot.lines_changed()),
        ("Views (14 days)", snapshot.views),
    ];
    for (name, value) in rows {
        overview.add_row(vec![comfy_table::Cell::new(name), count_cell(value)]);
    }
    let _ = writeln!(output, "{overview}\n");

    add_section_header(&mut output, "🗂️", "Languages");
    let languages = snapshot.top_languages(max_languages);
    if languages.is_empty() {
        let _ = writeln!(output, "  {}", label("No languages found"));
        return output;
    }

    let mut table = create_table();
    table.set_header(create_cyan_header(&["Language", "Bytes", "Share", "Color"]));
    for language in &languages {
        table.add_row(vec![
            comfy_table::Cell::new(&language.name),
            count_cell(language.size),
            percentage_cell(language.percentage),
            swatch_cell(&language.color),
        ]);
    }
    let _ = writeln!(output, "{table}");

    let hidden = snapshot.languages.len() - languages.len();
    if hidden > 0 {
        let _ = writeln!(output, "  {}", label(format!("+{hidden} more languages")));
    }

    output
}
