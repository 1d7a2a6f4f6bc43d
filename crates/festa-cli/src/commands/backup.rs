//! Export and import commands.

use festa_store::{export_json, import_json, ImportMode};

use crate::cli::{ExportArgs, ImportArgs};
use crate::error::Result;
use crate::output::Formatter;
use crate::prompt::confirm;
use crate::session::Session;

/// Execute the export command.
pub fn execute_export(args: ExportArgs, session: &Session, formatter: &Formatter) -> Result<()> {
    let json = session.with_store(|s| export_json(&*s))?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!(
                "{}",
                formatter.success(&format!("Backup written to {}", path.display()))
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Execute the import command.
pub async fn execute_import(
    args: ImportArgs,
    session: &Session,
    formatter: &Formatter,
) -> Result<()> {
    let json = std::fs::read_to_string(&args.file)?;
    let mode = if args.merge {
        ImportMode::Merge
    } else {
        ImportMode::Replace
    };

    if mode == ImportMode::Replace
        && !args.yes
        && !confirm("Replace every saved record with the backup?").await?
    {
        println!("{}", formatter.info("Nothing imported"));
        return Ok(());
    }

    let summary = session.with_store(|s| import_json(s, &json, mode))?;
    println!(
        "{}",
        formatter.success(&format!(
            "Imported: {} created, {} updated, {} removed",
            summary.created, summary.updated, summary.removed
        ))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, OutputFormat};
    use festa_domain::{ContentKind, RecordQuery, RecordStore, StructuredRecord};

    fn record(name: &str) -> StructuredRecord {
        let mut r = StructuredRecord::new(format!("{}.pdf", name), ContentKind::Document, "");
        r.name = Some(name.to_string());
        r
    }

    #[tokio::test]
    async fn test_export_then_replace_import() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("backup.json");
        let formatter = Formatter::new(OutputFormat::Quiet, false);

        let source = Session::in_memory(Config::default()).unwrap();
        source.with_store(|s| s.create(record("Nature Lens"))).unwrap();
        execute_export(
            ExportArgs {
                output: Some(backup.clone()),
            },
            &source,
            &formatter,
        )
        .unwrap();

        let target = Session::in_memory(Config::default()).unwrap();
        target.with_store(|s| s.create(record("Stale"))).unwrap();
        execute_import(
            ImportArgs {
                file: backup,
                merge: false,
                yes: true,
            },
            &target,
            &formatter,
        )
        .await
        .unwrap();

        let records = target.with_store(|s| s.list(&RecordQuery::default())).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("Nature Lens"));
    }

    #[tokio::test]
    async fn test_merge_keeps_existing() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("backup.json");
        std::fs::write(
            &backup,
            serde_json::to_string(&[record("Imported")]).unwrap(),
        )
        .unwrap();

        let session = Session::in_memory(Config::default()).unwrap();
        session.with_store(|s| s.create(record("Existing"))).unwrap();
        execute_import(
            ImportArgs {
                file: backup,
                merge: true,
                yes: false,
            },
            &session,
            &Formatter::new(OutputFormat::Quiet, false),
        )
        .await
        .unwrap();

        let records = session.with_store(|s| s.list(&RecordQuery::default())).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_backup_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("backup.json");
        std::fs::write(&backup, "{not json").unwrap();

        let session = Session::in_memory(Config::default()).unwrap();
        let result = execute_import(
            ImportArgs {
                file: backup,
                merge: true,
                yes: true,
            },
            &session,
            &Formatter::new(OutputFormat::Quiet, false),
        )
        .await;
        assert!(result.is_err());
    }
}
