//! Extract command implementation.

use std::io::Read;
use std::sync::Arc;

use festa_extractor::{IngestOutcome, IngestPipeline, IngestReport, InputFile, InputSet};
use festa_gatekeeper::{ConfirmationGate, UserInteraction};
use tracing::debug;

use crate::cli::ExtractArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::prompt::{confirm, TerminalInteraction};
use crate::session::Session;

/// Build the input set from files, `--text` or stdin.
pub fn input_set(args: &ExtractArgs) -> Result<InputSet> {
    if let Some(text) = &args.text {
        return Ok(InputSet::Text(text.clone()));
    }
    if args.stdin {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(InputSet::Text(text));
    }
    if args.files.is_empty() {
        return Err(CliError::InvalidInput(
            "Give files, --text or --stdin".to_string(),
        ));
    }
    let files = args
        .files
        .iter()
        .map(|path| InputFile::from_path(path))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(InputSet::Files(files))
}

/// Execute the extract command.
pub async fn execute_extract(
    args: ExtractArgs,
    session: &Session,
    formatter: &Formatter,
) -> Result<()> {
    let input = input_set(&args)?;
    let kind = input.operation_kind();

    let interaction: Arc<dyn UserInteraction> =
        Arc::new(TerminalInteraction::new(formatter.clone(), args.yes));
    let pipeline = IngestPipeline::new(
        session.inference()?,
        interaction,
        session.store(),
        session.coordinator.clone(),
        session.config.extractor.clone(),
    )
    .with_gate(ConfirmationGate::new(session.config.gate.clone()));

    let interrupt = session.cancel_on_ctrl_c(kind);
    let mut report = pipeline.run(input, false).await;

    // Structuring can be repeated from the text already extracted
    while let Some((extraction, display_name)) = retry_candidate(&report) {
        if args.yes || !confirm("Structuring failed. Try again with the same text?").await? {
            break;
        }
        debug!("Retrying structuring for {}", display_name);
        report = pipeline.retry_structure(extraction, &display_name).await;
    }
    interrupt.abort();

    match report.outcome {
        IngestOutcome::Committed(record) => {
            println!("{}", formatter.success(&format!("Saved {}", record.label())));
            println!("{}", formatter.format_record(&record, false)?);
            Ok(())
        }
        IngestOutcome::ReturnedToEdit(record) => {
            println!(
                "{}",
                formatter.info(&format!(
                    "Not saved. Edit the announcement for {} and extract again",
                    record.label()
                ))
            );
            Ok(())
        }
        IngestOutcome::Cancelled => {
            println!("{}", formatter.warning("Cancelled; nothing was saved"));
            Ok(())
        }
        IngestOutcome::Failed(e) => Err(e.into()),
    }
}

/// The stage-1 output to restructure, when the run failed after extraction
fn retry_candidate(
    report: &IngestReport,
) -> Option<(festa_domain::ExtractionResult, String)> {
    match &report.outcome {
        IngestOutcome::Failed(e) if e.is_retryable() => Some((
            report.extraction.clone()?,
            report.display_name.clone()?,
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use festa_domain::{RecordQuery, RecordStore};

    fn extract_args(argv: &[&str]) -> ExtractArgs {
        match Cli::parse_from(argv).command {
            Command::Extract(args) => args,
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_text_input() {
        let args = extract_args(&["festa", "extract", "--text", "Contest deadline 1403/02/10"]);
        match input_set(&args).unwrap() {
            InputSet::Text(text) => assert!(text.contains("1403/02/10")),
            _ => panic!("Expected text input"),
        }
    }

    #[test]
    fn test_file_input_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poster.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let args = extract_args(&["festa", "extract", path.to_str().unwrap()]);
        match input_set(&args).unwrap() {
            InputSet::Files(files) => {
                assert_eq!(files.len(), 1);
                assert_eq!(files[0].mime, "image/png");
                assert_eq!(files[0].bytes.len(), 4);
            }
            _ => panic!("Expected file input"),
        }
    }

    #[test]
    fn test_missing_file() {
        let args = extract_args(&["festa", "extract", "/nonexistent/poster.pdf"]);
        assert!(input_set(&args).is_err());
    }

    #[tokio::test]
    async fn test_offline_text_extraction_is_saved() {
        let session = Session::in_memory(crate::Config::default()).unwrap();
        let formatter = Formatter::new(crate::config::OutputFormat::Quiet, false);
        let args = extract_args(&[
            "festa",
            "extract",
            "-y",
            "--text",
            "Nature photo contest. Topics: landscape, wildlife. Deadline 1403/02/10. Up to 5 photos.",
        ]);

        execute_extract(args, &session, &formatter).await.unwrap();

        let records = session.with_store(|s| s.list(&RecordQuery::default())).unwrap();
        assert_eq!(records.len(), 1);
    }
}
