mod backup;
mod entry;
mod helpers;
mod history;
mod settings;
mod status;

pub(crate) use backup::{cmd_clear, cmd_export, cmd_import};
pub(crate) use entry::{EveningArgs, MorningArgs, cmd_evening, cmd_morning, cmd_show};
pub(crate) use history::cmd_log;
pub(crate) use settings::{cmd_settings_set, cmd_settings_show};
pub(crate) use status::cmd_status;
