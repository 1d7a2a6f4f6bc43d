//! Analyze command implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use festa_analyzer::BatchAnalyzer;
use festa_domain::{Batch, BatchStore, ItemInput, ItemStatus, OperationKind, TopicFocus};
use festa_extractor::content::guess_mime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cli::{AnalyzeArgs, RemovePhotoArgs};
use crate::config::OutputFormat;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::session::Session;

/// Parse `--note FILE=TEXT` values into a map keyed by file name.
pub fn parse_notes(raw: &[String]) -> Result<HashMap<String, String>> {
    let mut notes = HashMap::new();
    for entry in raw {
        let (file, text) = entry.split_once('=').ok_or_else(|| {
            CliError::InvalidInput(format!("Note '{}' is not FILE=TEXT", entry))
        })?;
        let file = file.trim();
        if file.is_empty() {
            return Err(CliError::InvalidInput(format!("Note '{}' names no file", entry)));
        }
        notes.insert(file.to_string(), text.trim().to_string());
    }
    Ok(notes)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("photo")
        .to_string()
}

/// Read photos into batch items, attaching notes by file name or path.
pub fn read_photos(paths: &[PathBuf], notes: &HashMap<String, String>) -> Result<Vec<ItemInput>> {
    let mut used = 0;
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let name = file_name(path);
        let mime = match guess_mime(&name) {
            Some(mime) if mime.starts_with("image/") => mime,
            _ => {
                return Err(CliError::InvalidInput(format!(
                    "{} is not a JPEG or PNG photo",
                    path.display()
                )))
            }
        };
        let bytes = std::fs::read(path)?;
        let note = notes
            .get(&name)
            .or_else(|| notes.get(&*path.to_string_lossy()))
            .cloned();
        if note.is_some() {
            used += 1;
        }
        items.push(ItemInput {
            name,
            mime: mime.to_string(),
            bytes,
            note,
        });
    }
    if used < notes.len() {
        return Err(CliError::InvalidInput(
            "A --note names a file that is not in the batch".to_string(),
        ));
    }
    Ok(items)
}

/// Print a line whenever an item changes state
fn print_progress(
    mut progress: watch::Receiver<Option<Batch>>,
    formatter: Formatter,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut seen: Vec<ItemStatus> = Vec::new();
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            let Some(batch) = snapshot else { continue };
            seen.resize(batch.items.len(), ItemStatus::Queued);
            for (index, item) in batch.items.iter().enumerate() {
                if item.status() != seen[index] {
                    seen[index] = item.status();
                    eprintln!(
                        "{}",
                        formatter.progress_line(index, batch.items.len(), item)
                    );
                }
            }
        }
    })
}

/// Execute the analyze command.
pub async fn execute_analyze(
    args: AnalyzeArgs,
    session: &Session,
    formatter: &Formatter,
) -> Result<()> {
    let mut record = session.resolve(&args.id)?;
    let context = record.smart_analysis.clone().ok_or_else(|| {
        CliError::InvalidInput(format!(
            "{} has no smart analysis yet; run `festa context {}` first",
            record.label(),
            record.id.short()
        ))
    })?;

    let notes = parse_notes(&args.notes)?;
    let items = read_photos(&args.photos, &notes)?;
    let focus = args
        .topic
        .as_deref()
        .map(TopicFocus::parse)
        .unwrap_or(TopicFocus::Holistic);

    let mut analyzer = BatchAnalyzer::new(session.inference()?, session.config.analyzer.clone());
    let printer = (formatter.format() == OutputFormat::Table)
        .then(|| print_progress(analyzer.subscribe(), formatter.clone()));

    let interrupt = session.cancel_on_ctrl_c(OperationKind::AnalyzeBatch);
    let run = analyzer
        .analyze(&session.coordinator, &record, items, &context, focus)
        .await;
    interrupt.abort();
    let summary = analyzer.metrics().summary();
    // Closing the watch sender ends the printer loop
    drop(analyzer);
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    let run = run?;

    session.with_store(|s| s.save_batch(&run.batch))?;
    record.last_batch_id = Some(run.batch.id);
    session.update(record)?;

    println!("{}", formatter.format_batch(&run.batch)?);
    if formatter.format() == OutputFormat::Table {
        println!();
        println!("{}", summary);
    }
    Ok(())
}

/// Execute the remove-photo command.
pub fn execute_remove_photo(
    args: RemovePhotoArgs,
    session: &Session,
    formatter: &Formatter,
) -> Result<()> {
    let record = session.resolve(&args.id)?;
    let no_batch = || {
        CliError::InvalidInput(format!("{} has no saved analysis", record.label()))
    };
    let batch_id = record.last_batch_id.ok_or_else(no_batch)?;
    let mut batch = session
        .with_store(|s| s.get_batch(batch_id))?
        .ok_or_else(no_batch)?;

    let removed = batch
        .remove_item(args.number as usize - 1)
        .map_err(CliError::InvalidInput)?;
    session.with_store(|s| s.save_batch(&batch))?;
    info!("Removed '{}' from batch {}", removed.input.name, batch.id);

    match formatter.format() {
        OutputFormat::Table => {
            println!(
                "{}",
                formatter.success(&format!("Removed {}", removed.input.name))
            );
            if !batch.items.is_empty() {
                println!("{}", formatter.format_batch(&batch)?);
            }
        }
        _ => println!("{}", formatter.format_batch(&batch)?),
    }
    Ok(())
}
