use serde_json::Value;

use crate::error::{Result, StorageError};
use crate::schema::{AppData, DATA_VERSION, DayRecord, Schema, Settings, normalize_records};
use crate::store::KeyValueStore;

pub const SETTINGS_KEY: &str = "mementomori_settings";
pub const RECORDS_KEY: &str = "mementomori_records";

/// Persistence contract for settings and day records.
///
/// Absence is `Ok(None)`, never an error. Implementations validate before
/// every write and never leave a write half-done.
pub trait StorageAdapter: Send {
    fn get_settings(&self) -> Result<Option<Settings>>;
    fn set_settings(&self, settings: &Settings) -> Result<()>;

    fn get_day_record(&self, date: &str) -> Result<Option<DayRecord>>;
    fn set_day_record(&self, record: &DayRecord) -> Result<()>;
    /// Ascending by date, one record per date.
    fn get_all_day_records(&self) -> Result<Vec<DayRecord>>;

    fn export_data(&self) -> Result<AppData>;
    /// Replaces settings, and replaces records unless `data.records` is empty.
    /// Settings without a target date leave the settings unset.
    fn import_data(&self, data: &AppData) -> Result<()>;
    fn clear_data(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Local,
    /// Remote-synced storage. Selectable, not implemented.
    Remote,
}

impl Backend {
    /// Reads the remote switch: only a literal `true` selects remote.
    #[must_use]
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("true") => Self::Remote,
            _ => Self::Local,
        }
    }
}

/// Builds the adapter for `backend` over `store`.
pub fn open_adapter<S>(backend: Backend, store: S) -> Result<Box<dyn StorageAdapter>>
where
    S: KeyValueStore + 'static,
{
    match backend {
        Backend::Local => Ok(Box::new(LocalStorageAdapter::new(store))),
        Backend::Remote => {
            log::error!("event=adapter_open module=adapter backend=remote status=unsupported");
            Err(StorageError::Unsupported(
                "the remote storage backend is not implemented yet",
            ))
        }
    }
}

/// Settings and the whole record collection as two JSON entries of a
/// key-value store. Every record write rewrites the full collection.
pub struct LocalStorageAdapter<S> {
    store: S,
}

impl<S: KeyValueStore> LocalStorageAdapter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    fn write_settings(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        if !self.store.is_available() {
            return Ok(());
        }
        let text = serde_json::to_string(settings)?;
        self.store.set_item(SETTINGS_KEY, &text)?;
        Ok(())
    }

    fn write_records(&self, records: &[DayRecord]) -> Result<()> {
        let text = serde_json::to_string(records)?;
        self.store.set_item(RECORDS_KEY, &text)?;
        Ok(())
    }

    fn read_records(&self) -> Result<Vec<DayRecord>> {
        let Some(text) = self.store.get_item(RECORDS_KEY)? else {
            return Ok(Vec::new());
        };
        let items = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                log::warn!("event=records_read module=adapter status=invalid reason=not_array");
                return Ok(Vec::new());
            }
            Err(e) => {
                log::warn!("event=records_read module=adapter status=invalid reason=json err={e}");
                return Ok(Vec::new());
            }
        };
        let total = items.len();
        let records: Vec<DayRecord> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match DayRecord::parse(item) {
                Ok(r) => Some(r),
                Err(e) => {
                    log::warn!("event=record_skip module=adapter index={i} err={e}");
                    None
                }
            })
            .collect();
        if records.len() < total {
            log::warn!(
                "event=records_read module=adapter status=partial kept={} dropped={}",
                records.len(),
                total - records.len()
            );
        }
        Ok(normalize_records(records))
    }
}

/// Runs `f`, logging any failure before handing it back to the caller.
fn logged<T>(op: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let result = f();
    if let Err(e) = &result {
        log::error!("event={op} module=adapter status=error err={e}");
    }
    result
}

impl<S: KeyValueStore> StorageAdapter for LocalStorageAdapter<S> {
    fn get_settings(&self) -> Result<Option<Settings>> {
        if !self.store.is_available() {
            return Ok(None);
        }
        let text = logged("settings_read", || Ok(self.store.get_item(SETTINGS_KEY)?))?;
        let Some(text) = text else {
            return Ok(None);
        };
        // corrupt settings are treated as unset
        let parsed = serde_json::from_str::<Value>(&text)
            .map_err(StorageError::from)
            .and_then(|v| Settings::parse(&v).map_err(StorageError::from));
        match parsed {
            Ok(settings) => Ok(Some(settings)),
            Err(e) => {
                log::warn!("event=settings_read module=adapter status=invalid err={e}");
                Ok(None)
            }
        }
    }

    fn set_settings(&self, settings: &Settings) -> Result<()> {
        logged("settings_write", || self.write_settings(settings))
    }

    fn get_day_record(&self, date: &str) -> Result<Option<DayRecord>> {
        let records = self.get_all_day_records()?;
        Ok(records.into_iter().find(|r| r.date == date))
    }

    fn set_day_record(&self, record: &DayRecord) -> Result<()> {
        logged("record_write", || {
            record.validate()?;
            if !self.store.is_available() {
                return Ok(());
            }
            let mut records = self.read_records()?;
            match records.iter_mut().find(|r| r.date == record.date) {
                Some(existing) => *existing = record.clone(),
                None => records.push(record.clone()),
            }
            records.sort_by(|a, b| a.date.cmp(&b.date));
            self.write_records(&records)
        })
    }

    fn get_all_day_records(&self) -> Result<Vec<DayRecord>> {
        if !self.store.is_available() {
            return Ok(Vec::new());
        }
        logged("records_read", || self.read_records())
    }

    fn export_data(&self) -> Result<AppData> {
        logged("export", || {
            let settings = self.get_settings()?.unwrap_or_default();
            let records = self.get_all_day_records()?;
            let data = AppData {
                settings,
                records,
                version: DATA_VERSION.to_string(),
            };
            data.validate()?;
            Ok(data)
        })
    }

    fn import_data(&self, data: &AppData) -> Result<()> {
        logged("import", || {
            data.validate()?;
            if !self.store.is_available() {
                return Ok(());
            }
            // placeholder settings restore the unset state
            if data.settings.is_configured() {
                self.write_settings(&data.settings)?;
            } else {
                self.store.remove_item(SETTINGS_KEY)?;
            }
            if !data.records.is_empty() {
                self.write_records(&normalize_records(data.records.clone()))?;
            }
            log::info!(
                "event=import module=adapter status=ok records={} version={}",
                data.records.len(),
                data.version
            );
            Ok(())
        })
    }

    fn clear_data(&self) -> Result<()> {
        logged("clear", || {
            if !self.store.is_available() {
                return Ok(());
            }
            self.store.remove_item(SETTINGS_KEY)?;
            self.store.remove_item(RECORDS_KEY)?;
            log::info!("event=clear module=adapter status=ok");
            Ok(())
        })
    }
}
