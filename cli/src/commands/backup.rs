use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use memento_core::Journal;
use memento_core::date::today_string;

use super::helpers::confirm;

pub(crate) fn default_backup_name(date: &str) -> String {
    format!("mementomori-backup-{date}.json")
}

/// Writes the backup to `output`, to stdout for `-`, or to
/// `mementomori-backup-<today>.json` in the current directory.
pub(crate) fn cmd_export(journal: &Journal, output: Option<&Path>, json: bool) -> Result<()> {
    let text = journal.export_json()?;

    if output == Some(Path::new("-")) {
        println!("{text}");
        return Ok(());
    }

    let path = output.map_or_else(
        || PathBuf::from(default_backup_name(&today_string())),
        Path::to_path_buf,
    );
    std::fs::write(&path, &text)
        .with_context(|| format!("Failed to write backup: {}", path.display()))?;

    if json {
        println!("{}", serde_json::json!({ "exported": path.display().to_string() }));
    } else {
        println!("Exported to {}", path.display());
    }
    Ok(())
}

pub(crate) fn cmd_import(journal: &Journal, file: &Path, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read backup: {}", file.display()))?;
    let data = journal
        .import_json(&text)
        .with_context(|| format!("Import of {} failed; nothing was changed", file.display()))?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "importedRecords": data.records.len(),
                "recordsReplaced": !data.records.is_empty(),
                "version": data.version,
            })
        );
    } else {
        if data.settings.is_configured() {
            println!("Imported settings (target date {})", data.settings.target_date);
        } else {
            println!("The file has no target date; settings are now unset.");
        }
        if data.records.is_empty() {
            println!("The file has no entries; existing entries were kept.");
        } else {
            println!("Replaced all entries with {} from the file", data.records.len());
        }
    }
    Ok(())
}

pub(crate) fn cmd_clear(journal: &Journal, yes: bool, json: bool) -> Result<()> {
    if !yes && !confirm("Delete all settings and journal entries? This cannot be undone.")? {
        bail!("Aborted");
    }
    journal.clear_all()?;

    if json {
        println!("{}", serde_json::json!({ "cleared": true }));
    } else {
        println!("All data deleted");
    }
    Ok(())
}
