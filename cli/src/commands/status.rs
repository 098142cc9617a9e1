use anyhow::Result;

use memento_core::Journal;
use memento_core::date;

pub(crate) fn cmd_status(journal: &Journal, json: bool) -> Result<()> {
    let status = journal.status(date::today())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", status.today_display);

    let (Some(target), Some(remaining)) = (&status.target_display, status.displayed_remaining())
    else {
        if status.is_configured() {
            eprintln!(
                "The saved target date is not a valid date. Use `memento settings set <YYYY-MM-DD>` to fix it."
            );
        } else {
            eprintln!("No target date set. Use `memento settings set <YYYY-MM-DD>` to set one.");
        }
        return Ok(());
    };

    if status.expired {
        println!("The target date {target} has passed. Remaining days: 0");
    } else {
        println!("{remaining} days remaining until {target}");
    }
    if let Some(p) = status.progress {
        println!("{}  {p:.1}%", progress_bar(p, 30));
    }

    let mark = |done: bool| if done { "done" } else { "not yet" };
    println!(
        "Today: morning {}, evening {}",
        mark(status.morning_done),
        mark(status.evening_done)
    );
    Ok(())
}

#[allow(clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "[----]");
        assert_eq!(progress_bar(50.0, 4), "[##--]");
        assert_eq!(progress_bar(100.0, 4), "[####]");
        assert_eq!(progress_bar(150.0, 4), "[####]");
    }
}
