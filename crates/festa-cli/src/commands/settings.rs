//! Config command implementation.

use std::path::Path;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;

/// Execute the config command against the file at `path`.
pub fn execute_config(
    args: ConfigArgs,
    config: &Config,
    path: &Path,
    formatter: &Formatter,
) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
            if config.gemini.api_key.is_some() {
                println!("{}", formatter.info("API key is set from the environment"));
            }
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init { force } => init(path, force, formatter)?,
    }
    Ok(())
}

fn init(path: &Path, force: bool, formatter: &Formatter) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists; use --force to overwrite",
            path.display()
        )));
    }
    Config::default().save_to(path)?;
    println!(
        "{}",
        formatter.success(&format!("Wrote {}", path.display()))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let formatter = Formatter::new(OutputFormat::Table, false);

        let init_args = |force| ConfigArgs {
            action: ConfigAction::Init { force },
        };
        execute_config(init_args(false), &Config::default(), &path, &formatter).unwrap();
        assert!(path.exists());
        assert!(execute_config(init_args(false), &Config::default(), &path, &formatter).is_err());
        assert!(execute_config(init_args(true), &Config::default(), &path, &formatter).is_ok());
        assert!(Config::load_from(&path).is_ok());
    }
}
