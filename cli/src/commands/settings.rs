use anyhow::Result;

use memento_core::Journal;
use memento_core::date::{self, format_str_for_display};

pub(crate) fn cmd_settings_set(
    journal: &Journal,
    target_date: &str,
    passcode: Option<String>,
    json: bool,
) -> Result<()> {
    let today = date::today();
    let target = super::helpers::resolve_date(Some(target_date), today)?;
    let target = target.format(date::DATE_FORMAT).to_string();

    let settings = journal.set_target_date(&target, passcode, today)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        println!(
            "Target date set to {}",
            format_str_for_display(&settings.target_date)
        );
        if settings.passcode.is_some() {
            println!("  Passcode saved");
        }
    }

    Ok(())
}

pub(crate) fn cmd_settings_show(journal: &Journal, json: bool) -> Result<()> {
    let settings = journal.settings()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else if settings.is_configured() {
        println!(
            "Target date: {} ({})",
            settings.target_date,
            format_str_for_display(&settings.target_date)
        );
        println!(
            "Passcode: {}",
            if settings.passcode.is_some() {
                "set"
            } else {
                "not set"
            }
        );
    } else {
        eprintln!("No target date set. Use `memento settings set <YYYY-MM-DD>` to set one.");
    }

    Ok(())
}
