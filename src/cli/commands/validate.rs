//! Configuration validation without running anything.

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::error::WardenError;

/// Validate each configuration file in turn, stopping at the first failure.
///
/// # Errors
///
/// Returns a config error describing the first invalid file.
pub fn run(args: &ValidateArgs) -> Result<(), WardenError> {
    for path in &args.files {
        let config = crate::config::load(path)?;
        match args.format {
            OutputFormat::Human => {
                println!(
                    "{}: ok ({} boss template(s))",
                    path.display(),
                    config.bosses.len(),
                );
            }
            OutputFormat::Json => {
                let line = serde_json::json!({
                    "file": path.display().to_string(),
                    "valid": true,
                    "bosses": config.bosses.len(),
                });
                println!("{line}");
            }
        }
    }
    Ok(())
}
