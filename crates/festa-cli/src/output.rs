//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use festa_domain::{AnalysisContext, Batch, BatchItem, ItemStatus, StructuredRecord};
use festa_gatekeeper::{DeadlineReview, ReviewStatus};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Longest cell text before truncation
const MAX_CELL_CHARS: usize = 48;

/// Output formatter.
#[derive(Debug, Clone)]
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format a list of records.
    pub fn format_records(&self, records: &[StructuredRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
            OutputFormat::Table => Ok(self.format_records_table(records)),
            OutputFormat::Quiet => Ok(records
                .iter()
                .map(|r| r.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
        }
    }

    fn format_records_table(&self, records: &[StructuredRecord]) -> String {
        if records.is_empty() {
            return self.colorize("No records found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["ID", "Name", "Deadline", "Topics", "Capacity", "Created"]);

        for record in records {
            let deadline = match (record.deadline_persian(), record.deadline_gregorian()) {
                (Some(p), Some(g)) => format!("{} ({})", p, g),
                (Some(p), None) => p.to_string(),
                (None, Some(g)) => g.to_string(),
                (None, None) => "-".to_string(),
            };
            builder.push_record([
                record.id.short(),
                truncate(record.label(), MAX_CELL_CHARS),
                deadline,
                truncate(&record.topics.join(", "), MAX_CELL_CHARS),
                record
                    .capacity
                    .as_ref()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                record.created_at.format("%Y-%m-%d").to_string(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format one record in full.
    pub fn format_record(&self, record: &StructuredRecord, with_raw_text: bool) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
            OutputFormat::Quiet => Ok(record.id.to_string()),
            OutputFormat::Table => Ok(self.format_record_table(record, with_raw_text)),
        }
    }

    /// Format one record in full, followed by its latest batch.
    pub fn format_record_with_batch(
        &self,
        record: &StructuredRecord,
        last_batch: Option<&Batch>,
        with_raw_text: bool,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&serde_json::json!({
                "record": record,
                "last_batch": last_batch,
            }))?),
            OutputFormat::Quiet => Ok(record.id.to_string()),
            OutputFormat::Table => {
                let mut out = self.format_record_table(record, with_raw_text);
                if let Some(batch) = last_batch {
                    out.push_str("\n\n");
                    out.push_str(&self.colorize("Last analysis:", "cyan"));
                    out.push('\n');
                    out.push_str(&self.format_batch_table(batch));
                }
                Ok(out)
            }
        }
    }

    fn format_record_table(&self, record: &StructuredRecord, with_raw_text: bool) -> String {
        let or_dash = |v: Option<&str>| v.unwrap_or("-").to_string();
        let sources = record
            .source_descriptors
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut rows: Vec<(&str, String)> = vec![
            ("ID", record.id.to_string()),
            ("Input", format!("{} ({})", record.display_name, record.source_kind)),
        ];
        if !sources.is_empty() {
            rows.push(("Files", sources));
        }
        rows.extend([
            ("Name", or_dash(record.name.as_deref())),
            ("Topics", record.topics.join(", ")),
            ("Objectives", or_dash(record.objectives.as_deref())),
            (
                "Max photos",
                record
                    .capacity
                    .as_ref()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            ("Deadline (Jalali)", or_dash(record.deadline_persian())),
            ("Deadline (Gregorian)", or_dash(record.deadline_gregorian())),
        ]);
        if let Some(discarded) = &record.superseded_gregorian {
            rows.push(("Discarded Gregorian", discarded.clone()));
        }
        rows.push(("Image size", or_dash(record.image_size.as_deref())));
        rows.push(("Submission", or_dash(record.submission_method.as_deref())));
        for source in &record.source_attributions {
            rows.push(("Source", format!("{} <{}>", source.title, source.uri)));
        }
        rows.push((
            "Smart analysis",
            record
                .smart_analysis
                .as_ref()
                .map(|c| c.generated_at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "none".to_string()),
        ));
        rows.push(("Updated", record.updated_at.format("%Y-%m-%d %H:%M").to_string()));

        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (field, value) in rows {
            builder.push_record([field.to_string(), value]);
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        let mut out = table.to_string();

        if let Some(context) = &record.smart_analysis {
            out.push_str("\n\n");
            out.push_str(&self.format_context(context));
        }
        if with_raw_text {
            out.push_str("\n\n");
            out.push_str(&self.colorize("Extracted text:", "cyan"));
            out.push('\n');
            out.push_str(&record.raw_text);
        }
        out
    }

    /// Format an analysis context with its sources.
    pub fn format_context(&self, context: &AnalysisContext) -> String {
        let mut lines = vec![self.colorize("Smart analysis:", "cyan"), context.text.clone()];
        if let Some(notes) = &context.user_notes {
            lines.push(format!("Notes: {}", notes));
        }
        if !context.sources.is_empty() {
            lines.push(String::new());
            lines.push("Sources:".to_string());
            for source in &context.sources {
                lines.push(format!("  - {} <{}>", source.title, source.uri));
            }
        }
        lines.join("\n")
    }

    /// Format a finished batch.
    pub fn format_batch(&self, batch: &Batch) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(batch)?),
            OutputFormat::Quiet => Ok(batch
                .items
                .iter()
                .map(|i| format!("{}\t{}\t{}", i.input.name, i.status(), score_text(i)))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => Ok(self.format_batch_table(batch)),
        }
    }

    fn format_batch_table(&self, batch: &Batch) -> String {
        let mut builder = Builder::default();
        builder.push_record(["#", "Photo", "Status", "Score", "Critique", "Editing notes"]);

        for (index, item) in batch.items.iter().enumerate() {
            let (critique, notes) = match (&item.result, &item.error) {
                (Some(result), _) => (
                    format!("{} {}", result.critique, result.score_reasoning),
                    result.editing_notes.clone().unwrap_or_else(|| "-".to_string()),
                ),
                (None, Some(error)) => (error.clone(), "-".to_string()),
                (None, None) => ("-".to_string(), "-".to_string()),
            };
            builder.push_record([
                (index + 1).to_string(),
                truncate(&item.input.name, MAX_CELL_CHARS),
                self.status_text(item.status()),
                score_text(item),
                truncate(critique.trim(), MAX_CELL_CHARS * 2),
                truncate(&notes, MAX_CELL_CHARS * 2),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        format!(
            "{}\nBatch {} ({}): {}",
            table,
            batch.id.short(),
            batch.focus,
            self.colorize(&batch.status().to_string(), "cyan")
        )
    }

    /// One line of batch progress.
    pub fn progress_line(&self, index: usize, total: usize, item: &BatchItem) -> String {
        format!(
            "[{}/{}] {} {}",
            index + 1,
            total,
            item.input.name,
            self.status_text(item.status())
        )
    }

    /// Format a deadline review for confirmation.
    pub fn format_review(&self, review: &DeadlineReview) -> String {
        let mut lines = vec![
            format!("Deadline (Jalali):    {}", review.persian.as_deref().unwrap_or("-")),
            format!("Deadline (Gregorian): {}", review.gregorian.as_deref().unwrap_or("-")),
        ];
        for note in &review.notes {
            if note.is_warning() {
                lines.push(self.warning(&note.to_string()));
            } else {
                lines.push(self.info(&note.to_string()));
            }
        }
        if review.status == ReviewStatus::Clear {
            lines.push(self.success("Deadline looks consistent"));
        }
        lines.join("\n")
    }

    fn status_text(&self, status: ItemStatus) -> String {
        let color = match status {
            ItemStatus::Done => "green",
            ItemStatus::Failed => "red",
            ItemStatus::Cancelled => "yellow",
            ItemStatus::Running => "blue",
            ItemStatus::Queued => "",
        };
        self.colorize(&status.to_string(), color)
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn score_text(item: &BatchItem) -> String {
    item.result
        .as_ref()
        .map(|r| format!("{:.1}", r.score))
        .unwrap_or_else(|| "-".to_string())
}

/// Shorten to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use festa_domain::{Capacity, ContentKind, ItemAnalysis, ItemInput, TopicFocus};

    fn record() -> StructuredRecord {
        let mut r = StructuredRecord::new("poster.pdf", ContentKind::Document, "raw text");
        r.name = Some("Nature Lens".to_string());
        r.topics = vec!["Nature".to_string(), "Wildlife".to_string()];
        r.capacity = Some(Capacity::Count(5));
        r.set_deadline_persian("1403/02/10").unwrap();
        r
    }

    fn batch() -> Batch {
        let inputs = ["a.jpg", "b.jpg"]
            .iter()
            .map(|n| ItemInput {
                name: n.to_string(),
                mime: "image/jpeg".to_string(),
                bytes: vec![],
                note: None,
            })
            .collect();
        let mut b = Batch::new(record().id, TopicFocus::Holistic, inputs);
        b.items[0].transition(ItemStatus::Running).unwrap();
        b.items[0].result = Some(ItemAnalysis {
            critique: "Good light".to_string(),
            score: 8.0,
            score_reasoning: "On topic".to_string(),
            editing_notes: Some("Crop left".to_string()),
        });
        b.items[0].transition(ItemStatus::Done).unwrap();
        b.items[1].transition(ItemStatus::Cancelled).unwrap();
        b.items[1].error = Some("cancelled by user".to_string());
        b
    }

    #[test]
    fn test_records_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_records(&[record()]).unwrap();
        assert!(output.contains("Nature Lens"));
        assert!(output.contains("1403/02/10 (2024-04-29)"));
        assert!(output.contains("Nature, Wildlife"));
    }

    #[test]
    fn test_records_json() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_records(&[record()]).unwrap();
        let parsed: Vec<StructuredRecord> = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_records_quiet() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let r = record();
        let output = formatter.format_records(&[r.clone()]).unwrap();
        assert_eq!(output, r.id.to_string());
    }

    #[test]
    fn test_empty_records() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_records(&[]).unwrap();
        assert!(output.contains("No records found"));
    }

    #[test]
    fn test_record_detail_with_raw_text() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_record(&record(), true).unwrap();
        assert!(output.contains("Deadline (Gregorian)"));
        assert!(output.contains("Extracted text:"));
        assert!(output.contains("raw text"));
    }

    #[test]
    fn test_record_with_last_batch() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let b = batch();
        let output = formatter
            .format_record_with_batch(&record(), Some(&b), false)
            .unwrap();
        assert!(output.contains("Last analysis:"));
        assert!(output.contains("Crop left"));

        let json = Formatter::new(OutputFormat::Json, false)
            .format_record_with_batch(&record(), Some(&b), false)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["record"]["name"], "Nature Lens");
        assert_eq!(parsed["last_batch"]["items"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_batch_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_batch(&batch()).unwrap();
        assert!(output.contains("8.0"));
        assert!(output.contains("Crop left"));
        assert!(output.contains("cancelled by user"));
        assert!(output.contains("cancelled"));
    }

    #[test]
    fn test_progress_line() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let b = batch();
        assert_eq!(formatter.progress_line(0, 2, &b.items[0]), "[1/2] a.jpg done");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("جشنواره عکس طبیعت", 5), "جشنو…");
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
    }
}
