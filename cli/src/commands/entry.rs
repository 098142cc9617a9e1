use anyhow::Result;

use memento_core::date::{format_str_for_display, now_timestamp};
use memento_core::{DayRecord, EveningAnswers, Journal, MorningAnswers};

use super::helpers::{answer_or_prompt, parse_date};

pub(crate) const MORNING_QUESTIONS: [&str; 2] = [
    "How will you use this day?",
    "Will you regret spending it that way?",
];

pub(crate) const EVENING_QUESTIONS: [&str; 3] = [
    "What used your life most fully today?",
    "What did you waste?",
    "What will you change tomorrow?",
];

pub(crate) struct MorningArgs {
    pub usage: Option<String>,
    pub regret: Option<String>,
    pub note: Option<String>,
}

pub(crate) struct EveningArgs {
    pub most_vital: Option<String>,
    pub waste: Option<String>,
    pub tomorrow: Option<String>,
    pub note: Option<String>,
}

pub(crate) fn cmd_morning(
    journal: &Journal,
    args: MorningArgs,
    date: Option<&str>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let answers = MorningAnswers {
        usage: answer_or_prompt(args.usage, MORNING_QUESTIONS[0])?,
        regret: answer_or_prompt(args.regret, MORNING_QUESTIONS[1])?,
        free_text: args.note,
    };
    let day = journal.save_morning(&date, answers, &now_timestamp())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&day)?);
    } else {
        println!("Saved morning entry for {}", format_str_for_display(&date));
    }
    Ok(())
}

pub(crate) fn cmd_evening(
    journal: &Journal,
    args: EveningArgs,
    date: Option<&str>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let answers = EveningAnswers {
        most_vital: answer_or_prompt(args.most_vital, EVENING_QUESTIONS[0])?,
        waste: answer_or_prompt(args.waste, EVENING_QUESTIONS[1])?,
        tomorrow: answer_or_prompt(args.tomorrow, EVENING_QUESTIONS[2])?,
        free_text: args.note,
    };
    let day = journal.save_evening(&date, answers, &now_timestamp())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&day)?);
    } else {
        println!("Saved evening entry for {}", format_str_for_display(&date));
    }
    Ok(())
}

pub(crate) fn cmd_show(journal: &Journal, date: Option<&str>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    let day = journal.day(&date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&day)?);
    } else {
        print!("{}", render_day(&day));
    }
    Ok(())
}

fn render_day(day: &DayRecord) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "{}", format_str_for_display(&day.date));

    match &day.morning {
        Some(m) => {
            let _ = writeln!(out, "\nMorning (updated {})", m.updated_at);
            let _ = writeln!(out, "  {}\n    {}", MORNING_QUESTIONS[0], m.answers.usage);
            let _ = writeln!(out, "  {}\n    {}", MORNING_QUESTIONS[1], m.answers.regret);
            if let Some(note) = &m.answers.free_text {
                let _ = writeln!(out, "  Notes\n    {note}");
            }
        }
        None => {
            let _ = writeln!(out, "\nMorning: not written");
        }
    }

    match &day.evening {
        Some(e) => {
            let _ = writeln!(out, "\nEvening (updated {})", e.updated_at);
            let _ = writeln!(out, "  {}\n    {}", EVENING_QUESTIONS[0], e.answers.most_vital);
            let _ = writeln!(out, "  {}\n    {}", EVENING_QUESTIONS[1], e.answers.waste);
            let _ = writeln!(out, "  {}\n    {}", EVENING_QUESTIONS[2], e.answers.tomorrow);
            if let Some(note) = &e.answers.free_text {
                let _ = writeln!(out, "  Notes\n    {note}");
            }
        }
        None => {
            let _ = writeln!(out, "\nEvening: not written");
        }
    }
    out
}
