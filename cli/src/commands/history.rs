use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use memento_core::date::format_str_for_display;
use memento_core::{DayRecord, Journal, LogFilter, LogView};

use super::helpers::preview;

const PREVIEW_CHARS: usize = 40;

pub(crate) fn cmd_log(
    journal: &Journal,
    filter: &str,
    search: Option<&str>,
    json: bool,
) -> Result<()> {
    let filter: LogFilter = filter.parse()?;
    let view = journal.log(filter, search)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!(
        "All: {}  Complete: {}  Incomplete: {}",
        view.total, view.complete, view.incomplete
    );

    if view.records.is_empty() {
        if search.is_some_and(|s| !s.trim().is_empty()) {
            eprintln!("No entries match the search.");
        } else {
            eprintln!("No entries yet. Use `memento morning` or `memento evening` to write one.");
        }
        return Ok(());
    }

    println!("{}", render_table(&view));
    Ok(())
}

fn render_table(view: &LogView) -> String {
    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "AM")]
        morning: &'static str,
        #[tabled(rename = "PM")]
        evening: &'static str,
        #[tabled(rename = "Preview")]
        preview: String,
        #[tabled(rename = "Updated")]
        updated: String,
    }

    let mark = |done: bool| if done { "✓" } else { "○" };
    let rows: Vec<DayRow> = view
        .records
        .iter()
        .map(|r: &DayRecord| DayRow {
            date: format_str_for_display(&r.date),
            morning: mark(r.morning.is_some()),
            evening: mark(r.evening.is_some()),
            preview: r
                .evening
                .as_ref()
                .map(|e| e.answers.most_vital.as_str())
                .or_else(|| r.morning.as_ref().map(|m| m.answers.usage.as_str()))
                .map(|t| preview(t, PREVIEW_CHARS))
                .unwrap_or_default(),
            updated: r
                .last_updated()
                .map(|u| u.get(..16).unwrap_or(u).replace('T', " "))
                .unwrap_or_default(),
        })
        .collect();

    Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::center()))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use memento_core::{Backend, EveningAnswers, MemoryStore, MorningAnswers};

    #[test]
    fn test_render_table_rows() {
        let journal = Journal::open(Backend::Local, MemoryStore::new()).unwrap();
        journal
            .save_morning(
                "2024-05-01",
                MorningAnswers {
                    usage: "Finish the draft".to_string(),
                    regret: "No".to_string(),
                    free_text: None,
                },
                "2024-05-01T07:15:00.000+09:00",
            )
            .unwrap();
        journal
            .save_evening(
                "2024-05-02",
                EveningAnswers {
                    most_vital: "Long walk".to_string(),
                    waste: "News".to_string(),
                    tomorrow: "Skip news".to_string(),
                    free_text: None,
                },
                "2024-05-02T22:40:00.000+09:00",
            )
            .unwrap();

        let view = journal.log(LogFilter::All, None).unwrap();
        let table = render_table(&view);
        assert!(table.contains("Finish the draft"));
        assert!(table.contains("Long walk"));
        assert!(table.contains("2024-05-02 22:40"));
        let walk = table.find("Long walk").unwrap();
        let draft = table.find("Finish the draft").unwrap();
        assert!(walk < draft, "newest entry should come first");
    }
}
