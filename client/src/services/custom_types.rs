//! User-defined block types.
//!
//! The entity model accepts any type string; this store only supplies the
//! vocabulary offered by the block form. A store returns the full list after
//! every mutation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Storage key (and default file stem) of the persisted list.
pub const CUSTOM_TYPES_KEY: &str = "event-scheduler-custom-types";

/// Built-in block types, in display order.
pub const DEFAULT_EVENT_TYPES: [&str; 4] = ["performance", "setup", "break", "other"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEventType {
    pub id: i64,
    pub name: String,
    /// CSS colour, e.g. `#ff8800`.
    pub color: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CustomTypeError {
    #[error("Custom type store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Custom type store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Custom type name is required")]
    EmptyName,
}

pub type CustomTypeResult<T> = Result<T, CustomTypeError>;

/// Key-value collaborator holding the custom type list.
pub trait CustomTypeStore: Send + Sync {
    fn get(&self) -> CustomTypeResult<Vec<CustomEventType>>;

    /// Append `custom_type` and return the new list.
    fn save(&self, custom_type: CustomEventType) -> CustomTypeResult<Vec<CustomEventType>>;

    /// Replace the entry with the same id, if any, and return the list.
    fn update(&self, custom_type: CustomEventType) -> CustomTypeResult<Vec<CustomEventType>>;

    /// Remove the entry with `id`, if any, and return the list.
    fn delete(&self, id: i64) -> CustomTypeResult<Vec<CustomEventType>>;
}

fn apply_update(types: &mut [CustomEventType], custom_type: CustomEventType) {
    match types.iter_mut().find(|t| t.id == custom_type.id) {
        Some(slot) => *slot = custom_type,
        None => log::debug!("No custom type with id {} to update", custom_type.id),
    }
}

/// Id for a new custom type: one past the largest existing id.
pub fn next_custom_type_id(types: &[CustomEventType]) -> i64 {
    types.iter().map(|t| t.id).max().unwrap_or(0).saturating_add(1)
}

/// Create and persist a new custom type.
pub fn create_custom_type(
    store: &dyn CustomTypeStore,
    name: &str,
    color: &str,
) -> CustomTypeResult<CustomEventType> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CustomTypeError::EmptyName);
    }
    let created = CustomEventType {
        id: next_custom_type_id(&store.get()?),
        name: name.to_string(),
        color: color.to_string(),
    };
    store.save(created.clone())?;
    Ok(created)
}

/// One entry of the block type picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeOption {
    /// Stored in `Block::block_type`.
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Built-in types followed by the custom ones, whose values are lower-cased.
pub fn event_type_options(custom: &[CustomEventType]) -> Vec<TypeOption> {
    let builtin = DEFAULT_EVENT_TYPES.iter().map(|t| {
        let mut label = t.to_string();
        if let Some(first) = label.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        TypeOption {
            value: t.to_string(),
            label,
            color: None,
        }
    });
    let custom = custom.iter().map(|t| TypeOption {
        value: t.name.to_lowercase(),
        label: t.name.clone(),
        color: Some(t.color.clone()),
    });
    builtin.chain(custom).collect()
}

// ==================== In-memory ====================

/// Volatile store, shared between clones.
#[derive(Clone, Default)]
pub struct InMemoryCustomTypeStore {
    types: Arc<RwLock<Vec<CustomEventType>>>,
}

impl InMemoryCustomTypeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CustomTypeStore for InMemoryCustomTypeStore {
    fn get(&self) -> CustomTypeResult<Vec<CustomEventType>> {
        Ok(self.types.read().clone())
    }

    fn save(&self, custom_type: CustomEventType) -> CustomTypeResult<Vec<CustomEventType>> {
        let mut types = self.types.write();
        types.push(custom_type);
        Ok(types.clone())
    }

    fn update(&self, custom_type: CustomEventType) -> CustomTypeResult<Vec<CustomEventType>> {
        let mut types = self.types.write();
        apply_update(&mut types, custom_type);
        Ok(types.clone())
    }

    fn delete(&self, id: i64) -> CustomTypeResult<Vec<CustomEventType>> {
        let mut types = self.types.write();
        types.retain(|t| t.id != id);
        Ok(types.clone())
    }
}

// ==================== JSON file ====================

/// Store persisted as a JSON array in a single file.
///
/// A missing file reads as an empty list. Writes replace the whole file.
pub struct JsonFileCustomTypeStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl JsonFileCustomTypeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// Store at `<dir>/event-scheduler-custom-types.json`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", CUSTOM_TYPES_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> CustomTypeResult<Vec<CustomEventType>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(CustomTypeError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|source| CustomTypeError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, types: &[CustomEventType]) -> CustomTypeResult<()> {
        let body = serde_json::to_string_pretty(types).map_err(|source| {
            CustomTypeError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, body).map_err(|source| {
            log::warn!("Failed to write custom types to {}: {}", self.path.display(), source);
            CustomTypeError::Io {
                path: self.path.clone(),
                source,
            }
        })
    }

    fn modify<F>(&self, f: F) -> CustomTypeResult<Vec<CustomEventType>>
    where
        F: FnOnce(&mut Vec<CustomEventType>),
    {
        let _guard = self.lock.write();
        let mut types = self.read()?;
        f(&mut types);
        self.write(&types)?;
        Ok(types)
    }
}

impl CustomTypeStore for JsonFileCustomTypeStore {
    fn get(&self) -> CustomTypeResult<Vec<CustomEventType>> {
        let _guard = self.lock.read();
        self.read()
    }

    fn save(&self, custom_type: CustomEventType) -> CustomTypeResult<Vec<CustomEventType>> {
        self.modify(|types| types.push(custom_type))
    }

    fn update(&self, custom_type: CustomEventType) -> CustomTypeResult<Vec<CustomEventType>> {
        self.modify(|types| apply_update(types, custom_type))
    }

    fn delete(&self, id: i64) -> CustomTypeResult<Vec<CustomEventType>> {
        self.modify(|types| types.retain(|t| t.id != id))
    }
}
