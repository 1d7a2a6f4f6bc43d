//! List, show and delete commands.

use festa_domain::{BatchStore, RecordQuery, RecordStore};
use tracing::{info, warn};

use crate::cli::{DeleteArgs, ListArgs, ShowArgs};
use crate::error::Result;
use crate::output::Formatter;
use crate::prompt::confirm;
use crate::session::Session;

/// Execute the list command.
pub fn execute_list(args: ListArgs, session: &Session, formatter: &Formatter) -> Result<()> {
    let query = RecordQuery {
        name_contains: args.name,
        limit: args.limit,
    };
    let records = session.with_store(|s| s.list(&query))?;
    println!("{}", formatter.format_records(&records)?);
    Ok(())
}

/// Execute the show command.
pub fn execute_show(args: ShowArgs, session: &Session, formatter: &Formatter) -> Result<()> {
    let record = session.resolve(&args.id)?;
    let last_batch = match record.last_batch_id {
        Some(batch_id) => {
            let batch = session.with_store(|s| s.get_batch(batch_id))?;
            if batch.is_none() {
                warn!("Record {} points at missing batch {}", record.id, batch_id);
            }
            batch
        }
        None => None,
    };
    println!(
        "{}",
        formatter.format_record_with_batch(&record, last_batch.as_ref(), args.raw)?
    );
    Ok(())
}

/// Execute the delete command.
pub async fn execute_delete(
    args: DeleteArgs,
    session: &Session,
    formatter: &Formatter,
) -> Result<()> {
    let records = args
        .ids
        .iter()
        .map(|id| session.resolve(id))
        .collect::<Result<Vec<_>>>()?;

    if !args.yes {
        for record in &records {
            println!("  {} {}", record.id.short(), record.label());
        }
        if !confirm(&format!("Delete {} record(s)?", records.len())).await? {
            println!("{}", formatter.info("Nothing deleted"));
            return Ok(());
        }
    }

    for record in &records {
        if session.with_store(|s| s.delete(record.id))? {
            info!("Deleted record {}", record.id);
            println!(
                "{}",
                formatter.success(&format!("Deleted {}", record.label()))
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, OutputFormat};
    use festa_domain::{ContentKind, StructuredRecord};

    fn seeded() -> (Session, Vec<StructuredRecord>) {
        let session = Session::in_memory(Config::default()).unwrap();
        let mut records = Vec::new();
        for name in ["Nature Lens", "City Nights"] {
            let mut r = StructuredRecord::new(format!("{}.pdf", name), ContentKind::Document, "");
            r.name = Some(name.to_string());
            session.with_store(|s| s.create(r.clone())).unwrap();
            records.push(r);
        }
        (session, records)
    }

    #[test]
    fn test_list_and_show() {
        let (session, records) = seeded();
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let args = ListArgs {
            name: Some("city".to_string()),
            limit: None,
        };
        assert!(execute_list(args, &session, &formatter).is_ok());

        let args = ShowArgs {
            id: records[0].id.to_string(),
            raw: true,
        };
        assert!(execute_show(args, &session, &formatter).is_ok());
    }

    #[test]
    fn test_show_with_missing_batch() {
        let (session, mut records) = seeded();
        let mut r = records.remove(0);
        r.last_batch_id = Some(festa_domain::BatchId::new());
        session.update(r.clone()).unwrap();

        let args = ShowArgs {
            id: r.id.to_string(),
            raw: false,
        };
        assert!(execute_show(args, &session, &Formatter::new(OutputFormat::Json, false)).is_ok());
    }

    #[tokio::test]
    async fn test_delete_with_yes() {
        let (session, records) = seeded();
        let args = DeleteArgs {
            ids: vec![records[0].id.to_string()],
            yes: true,
        };
        execute_delete(args, &session, &Formatter::new(OutputFormat::Quiet, false))
            .await
            .unwrap();

        let remaining = session.with_store(|s| s.list(&RecordQuery::default())).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, records[1].id);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_deletes_nothing() {
        let (session, records) = seeded();
        let args = DeleteArgs {
            ids: vec![records[0].id.to_string(), "ffffffff".to_string()],
            yes: true,
        };
        let result =
            execute_delete(args, &session, &Formatter::new(OutputFormat::Quiet, false)).await;
        assert!(result.is_err());

        let remaining = session.with_store(|s| s.list(&RecordQuery::default())).unwrap();
        assert_eq!(remaining.len(), 2);
    }
}
