//! Markdown export of an analysis.

use chrono::NaiveDateTime;

use crate::analysis::AnalysisReport;

pub const REPORT_TITLE: &str = "朋友圈分析报告";

/// Builds the downloadable Markdown report. `generated_at` is printed as-is,
/// so callers pass the wall-clock time they want shown.
///
/// Only sections present in `report` are emitted. `raw_text` is appended under
/// its own heading; callers pass it only when the narrative is what was shown,
/// i.e. when no structured data came back.
pub fn build_report_markdown(
    report: Option<&AnalysisReport>,
    raw_text: Option<&str>,
    generated_at: NaiveDateTime,
) -> String {
    let mut lines: Vec<String> = vec![
        format!("# {}", REPORT_TITLE),
        String::new(),
        format!("- 生成时间：{}", generated_at.format("%Y-%m-%d %H:%M:%S")),
        String::new(),
    ];

    if let Some(report) = report {
        push_sections(&mut lines, report);
    }

    if let Some(raw) = raw_text.filter(|raw| !raw.trim().is_empty()) {
        lines.push("## 原始文本结果".to_string());
        lines.push(String::new());
        lines.push(raw.to_string());
        lines.push(String::new());
    }

    lines.join("\n").trim().to_string()
}

fn push_sections(lines: &mut Vec<String>, report: &AnalysisReport) {
    if let Some(personality) = &report.personality {
        lines.push("## 人物画像".to_string());
        if !personality.tags.is_empty() {
            lines.push(format!("- 标签：{}", personality.tags.join("、")));
        }
        push_paragraph(lines, personality.description.as_deref());
        lines.push(String::new());
    }

    if !report.interests.is_empty() {
        lines.push("## 兴趣爱好".to_string());
        for interest in &report.interests {
            let name = interest.name.as_deref().unwrap_or("兴趣");
            match interest.level.as_deref() {
                Some(level) => lines.push(format!("- **{}**（{}）", name, level)),
                None => lines.push(format!("- **{}**", name)),
            }
            if let Some(description) = &interest.description {
                lines.push(format!("  - {}", description));
            }
        }
        lines.push(String::new());
    }

    if let Some(lifestyle) = &report.lifestyle {
        lines.push("## 生活方式".to_string());
        if !lifestyle.habits.is_empty() {
            lines.push(format!("- 习惯：{}", lifestyle.habits.join("、")));
        }
        push_paragraph(lines, lifestyle.description.as_deref());
        lines.push(String::new());
    }

    if let Some(values) = &report.values {
        lines.push("## 价值观分析".to_string());
        let labelled = [
            ("事业观", &values.career),
            ("感情观", &values.relationship),
            ("家庭观", &values.family),
            ("人生观", &values.life),
        ];
        for (label, value) in labelled {
            if let Some(value) = value {
                lines.push(format!("- {}：{}", label, value));
            }
        }
        lines.push(String::new());
    }

    if let Some(emotion) = &report.emotion {
        lines.push("## 情绪状态".to_string());
        if let Some(state) = &emotion.state {
            lines.push(format!("- 状态：{}", state));
        }
        push_paragraph(lines, emotion.description.as_deref());
        lines.push(String::new());
    }

    if let Some(suggestions) = &report.suggestions {
        lines.push("## 交友建议".to_string());
        push_list(lines, "聊天话题推荐", &suggestions.topics);
        push_list(lines, "开场白建议", &suggestions.openings);
        if let Some(dating) = suggestions.dating.as_ref().filter(|d| !d.is_empty()) {
            lines.push("### 约会建议".to_string());
            if !dating.places.is_empty() {
                lines.push("- 地点".to_string());
                lines.extend(dating.places.iter().map(|place| format!("  - {}", place)));
            }
            if !dating.activities.is_empty() {
                lines.push("- 活动".to_string());
                lines.extend(
                    dating
                        .activities
                        .iter()
                        .map(|activity| format!("  - {}", activity)),
                );
            }
            lines.push(String::new());
        }
        push_list(lines, "注意事项", &suggestions.warnings);
        push_list(lines, "互动策略", &suggestions.strategy);
    }
}

fn push_paragraph(lines: &mut Vec<String>, text: Option<&str>) {
    if let Some(text) = text {
        lines.push(String::new());
        lines.push(text.to_string());
    }
}

fn push_list(lines: &mut Vec<String>, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(format!("### {}", heading));
    lines.extend(items.iter().map(|item| format!("- {}", item)));
    lines.push(String::new());
}
