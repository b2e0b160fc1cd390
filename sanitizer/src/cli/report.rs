//! Human-readable run report.

use crate::domain::RunResult;

const HEADERS: [&str; 2] = ["Updated", "Count"];

/// Render the updated counts as an ASCII table.
///
/// # Example
///
/// ```
/// use gdpr_sanitizer::cli::render_table;
/// use gdpr_sanitizer::domain::{ExclusionSet, RunResult, SiteScope};
///
/// let result = RunResult {
///     users_updated: 2,
///     comments_updated: 3,
///     comments_skipped: 0,
///     scope: SiteScope::SingleSite,
///     exclusions: ExclusionSet::new(),
/// };
///
/// assert!(render_table(&result).contains("| Users    | 2     |"));
/// ```
#[must_use]
pub fn render_table(result: &RunResult) -> String {
    let rows = [
        ("Users", result.users_updated.to_string()),
        ("Comments", result.comments_updated.to_string()),
    ];
    let label_width = rows
        .iter()
        .map(|(label, _)| label.len())
        .chain([HEADERS[0].len()])
        .max()
        .unwrap_or_default();
    let count_width = rows
        .iter()
        .map(|(_, count)| count.len())
        .chain([HEADERS[1].len()])
        .max()
        .unwrap_or_default();

    let border = format!("+{}+{}+", "-".repeat(label_width + 2), "-".repeat(count_width + 2));
    let line =
        |label: &str, count: &str| format!("| {label:<label_width$} | {count:<count_width$} |");

    let mut lines = vec![border.clone(), line(HEADERS[0], HEADERS[1]), border.clone()];
    lines.extend(rows.iter().map(|(label, count)| line(label, count)));
    lines.push(border);
    lines.join("\n")
}

/// Success message naming the kept users and the site, when either applies.
#[must_use]
pub fn success_message(result: &RunResult) -> String {
    let site = result.scope.site();
    if result.exclusions.is_empty() {
        match site {
            Some(site) => format!("All comments and users on site '{site}' rewritten."),
            None => "All comments and users rewritten.".to_owned(),
        }
    } else {
        let kept = &result.exclusions;
        match site {
            Some(site) => {
                format!("All comments and users except: '{kept}' on site '{site}' rewritten.")
            }
            None => format!("All comments and users except: '{kept}' rewritten."),
        }
    }
}
