//! Persisted card order.
//!
//! The order lives under [`ORDER_KEY`] in a small JSON object file so other
//! client-side preferences can share the file without clobbering each other.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// Key holding the ordered card ids.
pub const ORDER_KEY: &str = "dashboardCardOrder";

#[derive(Debug)]
pub enum OrderError {
    Io(io::Error),
    /// The state file or the stored value is not what we wrote.
    Parse(String),
}

impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderError::Io(e) => write!(f, "state file I/O error: {}", e),
            OrderError::Parse(msg) => write!(f, "state file is malformed: {}", msg),
        }
    }
}

impl std::error::Error for OrderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrderError::Io(e) => Some(e),
            OrderError::Parse(_) => None,
        }
    }
}

impl From<io::Error> for OrderError {
    fn from(e: io::Error) -> Self {
        OrderError::Io(e)
    }
}

/// Where the card order is read from and written to.
pub trait OrderStore {
    /// Stored ids, empty when nothing was saved yet.
    fn load(&self) -> Result<Vec<String>, OrderError>;

    fn save(&mut self, order: &[String]) -> Result<(), OrderError>;
}

/// Apply a stored order to the cards currently present.
///
/// Stored ids come first (unknown or repeated ones skipped), then every
/// remaining card in its current order.
pub fn restore_order(current: &[String], stored: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(current.len());
    for id in stored {
        if current.contains(id) && !out.contains(id) {
            out.push(id.clone());
        }
    }
    for id in current {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

// ============================================================
// File-backed store
// ============================================================

#[derive(Debug, Clone)]
pub struct FileOrderStore {
    path: PathBuf,
}

impl FileOrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> Result<Map<String, Value>, OrderError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(OrderError::Parse("top level is not an object".to_string())),
            Err(e) => Err(OrderError::Parse(e.to_string())),
        }
    }
}

impl OrderStore for FileOrderStore {
    fn load(&self) -> Result<Vec<String>, OrderError> {
        let map = self.read_object()?;
        match map.get(ORDER_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| OrderError::Parse(format!("{}: {}", ORDER_KEY, e))),
        }
    }

    fn save(&mut self, order: &[String]) -> Result<(), OrderError> {
        // keep unrelated keys; a corrupt file is replaced
        let mut map = self.read_object().unwrap_or_default();
        map.insert(
            ORDER_KEY.to_string(),
            Value::Array(order.iter().cloned().map(Value::String).collect()),
        );
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string_pretty(&Value::Object(map))
            .map_err(|e| OrderError::Parse(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), cards = order.len(), "card order saved");
        Ok(())
    }
}

// ============================================================
// In-memory store
// ============================================================

/// Store that keeps the order in memory only.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrderStore {
    order: Vec<String>,
    saves: usize,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times [`OrderStore::save`] was called.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl OrderStore for MemoryOrderStore {
    fn load(&self) -> Result<Vec<String>, OrderError> {
        Ok(self.order.clone())
    }

    fn save(&mut self, order: &[String]) -> Result<(), OrderError> {
        self.order = order.to_vec();
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_restore_order() {
        let current = ids(&["card-a", "card-b", "card-c", "card-new"]);
        let stored = ids(&["card-c", "card-gone", "card-a", "card-c"]);
        assert_eq!(
            restore_order(&current, &stored),
            ["card-c", "card-a", "card-b", "card-new"]
        );
        assert_eq!(restore_order(&current, &[]), current);
        assert!(restore_order(&[], &stored).is_empty());
    }

    #[test]
    fn test_file_round_trip_with_new_hosts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = FileOrderStore::new(&path);
        assert!(store.load().unwrap().is_empty());
        store.save(&ids(&["card-b", "card-a"])).unwrap();

        // reload with a superset of hosts
        let reloaded = FileOrderStore::new(&path);
        let stored = reloaded.load().unwrap();
        let current = ids(&["card-a", "card-b", "card-c"]);
        assert_eq!(
            restore_order(&current, &stored),
            ["card-b", "card-a", "card-c"]
        );
    }

    #[test]
    fn test_save_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"theme":"dark","dashboardCardOrder":["x"]}"#).unwrap();

        let mut store = FileOrderStore::new(&path);
        assert_eq!(store.load().unwrap(), ["x"]);
        store.save(&ids(&["y", "z"])).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value[ORDER_KEY], serde_json::json!(["y", "z"]));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();
        let mut store = FileOrderStore::new(&path);
        assert!(matches!(store.load(), Err(OrderError::Parse(_))));

        fs::write(&path, r#"{"dashboardCardOrder": 5}"#).unwrap();
        assert!(matches!(store.load(), Err(OrderError::Parse(_))));

        // saving over a corrupt file recovers it
        store.save(&ids(&["a"])).unwrap();
        assert_eq!(store.load().unwrap(), ["a"]);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryOrderStore::new();
        assert!(store.load().unwrap().is_empty());
        store.save(&ids(&["a"])).unwrap();
        assert_eq!(store.load().unwrap(), ["a"]);
        assert_eq!(store.saves(), 1);
    }
}
