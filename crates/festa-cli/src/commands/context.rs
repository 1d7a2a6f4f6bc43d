//! Context command implementation.

use festa_analyzer::ContextBuilder;
use festa_domain::{OperationKind, StageOutcome};

use crate::cli::ContextArgs;
use crate::error::Result;
use crate::output::Formatter;
use crate::session::Session;

/// Execute the context command.
pub async fn execute_context(
    args: ContextArgs,
    session: &Session,
    formatter: &Formatter,
) -> Result<()> {
    let mut record = session.resolve(&args.id)?;
    let builder = ContextBuilder::new(session.inference()?, session.config.analyzer.clone());

    println!(
        "{}",
        formatter.info(&format!("Researching {}...", record.label()))
    );
    let interrupt = session.cancel_on_ctrl_c(OperationKind::SmartAnalysis);
    let run = builder
        .run(&session.coordinator, &record, args.notes.as_deref())
        .await;
    interrupt.abort();

    match run?.outcome {
        StageOutcome::Done(context) => {
            record.smart_analysis = Some(context);
            let record = session.update(record)?;
            if let Some(context) = &record.smart_analysis {
                println!("{}", formatter.format_context(context));
            }
            println!("{}", formatter.success("Smart analysis saved"));
        }
        StageOutcome::Cancelled => {
            println!("{}", formatter.warning("Cancelled; the record was not changed"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, OutputFormat};
    use festa_domain::{ContentKind, RecordStore, StructuredRecord};

    #[tokio::test]
    async fn test_context_is_saved_on_record() {
        let session = Session::in_memory(Config::default()).unwrap();
        let mut record = StructuredRecord::new("poster.pdf", ContentKind::Document, "text");
        record.name = Some("Nature Lens".to_string());
        session.with_store(|s| s.create(record.clone())).unwrap();

        let args = ContextArgs {
            id: record.id.short(),
            notes: Some("Prefers documentary work".to_string()),
        };
        execute_context(args, &session, &Formatter::new(OutputFormat::Quiet, false))
            .await
            .unwrap();

        let saved = session.resolve(&record.id.to_string()).unwrap();
        let context = saved.smart_analysis.unwrap();
        assert!(!context.text.is_empty());
        assert_eq!(context.user_notes.as_deref(), Some("Prefers documentary work"));
    }

    #[tokio::test]
    async fn test_unnamed_record_is_rejected() {
        let session = Session::in_memory(Config::default()).unwrap();
        let record = StructuredRecord::new("poster.pdf", ContentKind::Document, "text");
        session.with_store(|s| s.create(record.clone())).unwrap();

        let args = ContextArgs {
            id: record.id.to_string(),
            notes: None,
        };
        let result =
            execute_context(args, &session, &Formatter::new(OutputFormat::Quiet, false)).await;
        assert!(result.is_err());
    }
}
