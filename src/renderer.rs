// src/renderer.rs

use crate::error::Result;
use crate::report::{DetailRow, LanguageStats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Both the stats and the details table
    #[default]
    All,
    /// Per-language status counts
    Stats,
    /// One row per target file
    Details,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Org-mode style text tables
    #[default]
    Table,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Pipe-delimited table in the org-mode layout.
struct Table {
    headers: Vec<&'static str>,
    aligns: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn render(&self) -> String {
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                self.rows
                    .iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| -> String {
            let padded: Vec<String> = cells
                .iter()
                .zip(&widths)
                .zip(&self.aligns)
                .map(|((cell, &width), align)| match align {
                    Align::Left => format!(" {cell:<width$} "),
                    Align::Right => format!(" {cell:>width$} "),
                })
                .collect();
            format!("|{}|", padded.join("|"))
        };

        let headers: Vec<String> = self.headers.iter().map(|h| h.to_string()).collect();
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();

        let mut out = line(&headers);
        out.push('\n');
        out.push_str(&format!("|{}|\n", rule.join("+")));
        for row in &self.rows {
            out.push_str(&line(row));
            out.push('\n');
        }
        out
    }
}

pub fn stats_table(stats: &BTreeMap<String, LanguageStats>) -> String {
    Table {
        headers: vec!["Language", "Total", "Open", "Updated", "Completed"],
        aligns: vec![Align::Left, Align::Right, Align::Right, Align::Right, Align::Right],
        rows: stats
            .iter()
            .map(|(lang, s)| {
                vec![
                    lang.clone(),
                    s.total.to_string(),
                    s.open.to_string(),
                    s.updated.to_string(),
                    s.completed.to_string(),
                ]
            })
            .collect(),
    }
    .render()
}

pub fn details_table(details: &[DetailRow]) -> String {
    Table {
        headers: vec![
            "Basefile",
            "Status",
            "Source Language",
            "Word Count",
            "Target Language",
            "Percent Completed",
            "Percent Updated",
        ],
        aligns: vec![
            Align::Left,
            Align::Left,
            Align::Left,
            Align::Right,
            Align::Left,
            Align::Left,
            Align::Left,
        ],
        rows: details
            .iter()
            .map(|row| {
                vec![
                    row.basefile.clone(),
                    row.status.to_string(),
                    row.source_language.clone(),
                    row.word_count.to_string(),
                    row.target_language.clone(),
                    row.percent_completed.to_string(),
                    row.percent_updated.to_string(),
                ]
            })
            .collect(),
    }
    .render()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a BTreeMap<String, LanguageStats>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a [DetailRow]>,
}

/// Renders the selected reports in the selected format.
pub fn render(
    kind: ReportKind,
    format: OutputFormat,
    stats: &BTreeMap<String, LanguageStats>,
    details: &[DetailRow],
) -> Result<String> {
    let with_stats = matches!(kind, ReportKind::All | ReportKind::Stats);
    let with_details = matches!(kind, ReportKind::All | ReportKind::Details);

    match format {
        OutputFormat::Json => {
            let report = JsonReport {
                stats: with_stats.then_some(stats),
                details: with_details.then_some(details),
            };
            let mut out = serde_json::to_string_pretty(&report)?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Table => {
            let mut sections = Vec::new();
            if with_stats {
                sections.push(stats_table(stats));
            }
            if with_details {
                sections.push(details_table(details));
            }
            Ok(sections.join("\n"))
        }
    }
}

/// Writes to `path`, or to stdout when there is none.
pub fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
    use crate::report::Percent;

    fn sample_stats() -> BTreeMap<String, LanguageStats> {
        BTreeMap::from([
            ("en".to_string(), LanguageStats::default()),
            (
                "fr".to_string(),
                LanguageStats {
                    total: 1,
                    completed: 1,
                    ..Default::default()
                },
            ),
        ])
    }

    fn sample_details() -> Vec<DetailRow> {
        vec![DetailRow {
            basefile: "file.md".into(),
            status: Status::Completed,
            source_language: "en".into(),
            word_count: 1,
            target_language: "fr".into(),
            percent_completed: Percent::Ratio(1.0),
            percent_updated: Percent::Zero,
        }]
    }

    #[test]
    fn stats_table_layout() {
        let expected = "\
| Language | Total | Open | Updated | Completed |
|----------+-------+------+---------+-----------|
| en       |     0 |    0 |       0 |         0 |
| fr       |     1 |    0 |       0 |         1 |
";
        assert_eq!(stats_table(&sample_stats()), expected);
    }

    #[test]
    fn details_table_has_all_columns() {
        let table = details_table(&sample_details());
        let mut lines = table.lines();
        assert_eq!(
            lines.next().unwrap(),
            "| Basefile | Status    | Source Language | Word Count | Target Language | Percent Completed | Percent Updated |"
        );
        lines.next();
        assert_eq!(
            lines.next().unwrap(),
            "| file.md  | completed | en              |          1 | fr              | 100.0%            | 0%              |"
        );
    }

    #[test]
    fn json_respects_report_kind() {
        let out = render(ReportKind::Stats, OutputFormat::Json, &sample_stats(), &sample_details()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["stats"]["fr"]["completed"], 1);
        assert!(value.get("details").is_none());

        let out = render(ReportKind::Details, OutputFormat::Json, &sample_stats(), &sample_details()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["details"][0]["percent_completed"], "100.0%");
        assert_eq!(value["details"][0]["status"], "completed");
    }

    #[test]
    fn writes_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.txt");
        write_output(Some(&path), "hello\n").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hello\n");
    }
}
