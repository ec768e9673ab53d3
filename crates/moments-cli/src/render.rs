//! Terminal output for the preview grid and analysis results.

use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use crate::session::AnalysisOutcome;
use crate::upload::{ImageCollection, PREVIEW_COLUMNS};

const CELL_WIDTH: usize = 18;

/// Preview grid of file names and sizes, row by row.
pub fn render_preview(images: &ImageCollection) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", format!("已选择 {} 张图片", images.len()).cyan().bold()));

    for (row, chunk) in images.visible().chunks(PREVIEW_COLUMNS).enumerate() {
        let cells: Vec<String> = chunk
            .iter()
            .enumerate()
            .map(|(col, image)| {
                let index = row * PREVIEW_COLUMNS + col + 1;
                let label = format!("{}.{}", index, truncate(&image.name, CELL_WIDTH - 4));
                format!("{:<width$}", label, width = CELL_WIDTH)
            })
            .collect();
        out.push_str(cells.join(" ").trim_end());
        out.push('\n');
    }

    if images.hidden_count() > 0 {
        out.push_str(&format!(
            "{}\n",
            format!("还有 {} 张未展示，使用 --show-all 查看全部", images.hidden_count()).dimmed()
        ));
    }
    out
}

fn truncate(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let kept: String = name.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept)
}

/// The analysis as the user sees it: the report body, with headings
/// highlighted, preceded by a notice when only narrative text came back.
pub fn render_outcome(outcome: &AnalysisOutcome, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    if outcome.narrative().is_some() {
        out.push_str(&format!("{}\n\n", AnalysisOutcome::NARRATIVE_NOTICE.yellow()));
    }
    for line in outcome.to_markdown(&generated_at.with_timezone(&Local)).lines() {
        let styled = if let Some(title) = line.strip_prefix("# ") {
            title.cyan().bold().to_string()
        } else if let Some(section) = line.strip_prefix("## ") {
            section.green().bold().to_string()
        } else if let Some(sub) = line.strip_prefix("### ") {
            sub.bold().to_string()
        } else {
            line.to_string()
        };
        out.push_str(&styled);
        out.push('\n');
    }
    out
}
