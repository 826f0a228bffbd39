use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, mpsc};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::model::{
    ChangeListeners, FetchError, FetchOutcome, ModelChange, ModelError, ModelFacade, OUTPUTS_GROUP,
    PropertyRow, PropertySet, TYPE_GROUP, lock,
};

/// In-process model backed by a JSON document of the form
/// `{ "<object path>": { "<group>": <value>, ... }, ... }`.
///
/// Fetches are answered from a background thread so callers observe the same
/// asynchronous contract a remote model would give them.
pub struct DocumentModel {
    source: Option<PathBuf>,
    objects: Arc<Mutex<Map<String, Value>>>,
    listeners: ChangeListeners,
    repaint: Mutex<Option<egui::Context>>,
}

enum RowWrite {
    Written,
    ReadOnly,
    Missing,
}

impl DocumentModel {
    pub fn empty() -> Self {
        Self::with_objects(Map::new(), None)
    }

    pub fn open(path: &Path) -> Result<Self, ModelError> {
        let objects = read_document(path)?;
        info!(path = %path.display(), objects = objects.len(), "opened model document");
        Ok(Self::with_objects(objects, Some(path.to_path_buf())))
    }

    fn with_objects(objects: Map<String, Value>, source: Option<PathBuf>) -> Self {
        Self {
            source,
            objects: Arc::new(Mutex::new(objects)),
            listeners: ChangeListeners::default(),
            repaint: Mutex::new(None),
        }
    }

    /// Wakes the UI whenever a background fetch completes.
    pub fn set_repaint_context(&self, ctx: egui::Context) {
        *lock(&self.repaint) = Some(ctx);
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn object_paths(&self) -> Vec<String> {
        lock(&self.objects).keys().cloned().collect()
    }

    /// Re-reads the backing file and notifies every listener.
    ///
    /// A model without a backing file only broadcasts the change.
    pub fn reload(&self) -> Result<(), ModelError> {
        if let Some(path) = &self.source {
            let objects = read_document(path)?;
            info!(path = %path.display(), objects = objects.len(), "reloaded model document");
            *lock(&self.objects) = objects;
        }
        self.notify(ModelChange::everything());
        Ok(())
    }

    fn notify(&self, change: ModelChange) {
        self.listeners.broadcast(&change);
        debug!(
            path = change.path.as_deref().unwrap_or("*"),
            listeners = self.listeners.len(),
            "model changed"
        );
        if let Some(ctx) = lock(&self.repaint).as_ref() {
            ctx.request_repaint();
        }
    }
}

impl ModelFacade for DocumentModel {
    fn subscribe(&self) -> mpsc::Receiver<ModelChange> {
        self.listeners.subscribe()
    }

    fn get_component(&self, path: &str, reply: mpsc::Sender<FetchOutcome>) {
        let objects = Arc::clone(&self.objects);
        let repaint = lock(&self.repaint).clone();
        let path = path.to_string();
        std::thread::spawn(move || {
            let result = lookup(&lock(&objects), &path);
            let _ = reply.send(FetchOutcome { path, result });
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        });
    }

    fn set_value(&self, path: &str, name: &str, value: Value) -> Result<(), ModelError> {
        let write = {
            let mut objects = lock(&self.objects);
            let Some(Value::Object(groups)) = objects.get_mut(path) else {
                return Err(ModelError::UnknownObject(path.to_string()));
            };
            write_row_value(groups, name, value)
        };
        match write {
            RowWrite::Written => {
                debug!(path, name, "property value written");
                self.notify(ModelChange::object(path));
                Ok(())
            }
            RowWrite::ReadOnly => Err(ModelError::ReadOnly {
                path: path.to_string(),
                name: name.to_string(),
            }),
            RowWrite::Missing => Err(ModelError::UnknownProperty {
                path: path.to_string(),
                name: name.to_string(),
            }),
        }
    }
}

fn read_document(path: &Path) -> Result<Map<String, Value>, ModelError> {
    let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&json)
}

fn parse_document(json: &str) -> Result<Map<String, Value>, ModelError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(objects) => Ok(objects),
        _ => Err(ModelError::InvalidDocument),
    }
}

fn lookup(objects: &Map<String, Value>, path: &str) -> Result<PropertySet, FetchError> {
    match objects.get(path) {
        Some(Value::Object(groups)) => Ok(groups.clone()),
        Some(other) => Err(FetchError::new(
            500,
            "Internal Server Error",
            format!("{path} is not a component: {other}"),
        )),
        None => Err(FetchError::not_found(path)),
    }
}

// Outputs and connected rows are computed elsewhere; a match there only
// counts if no writable row with the same name exists.
fn write_row_value(groups: &mut PropertySet, name: &str, value: Value) -> RowWrite {
    let mut outcome = RowWrite::Missing;
    for (group, rows) in groups.iter_mut() {
        if group == TYPE_GROUP {
            continue;
        }
        let Some(row) = rows
            .as_array_mut()
            .and_then(|rows| rows.iter_mut().find(|row| row_name(row) == Some(name)))
        else {
            continue;
        };
        let connected = PropertyRow::from_value(row).is_some_and(|row| row.is_connected());
        if group == OUTPUTS_GROUP || connected {
            outcome = RowWrite::ReadOnly;
            continue;
        }
        if let Some(fields) = row.as_object_mut() {
            fields.insert("value".to_string(), value);
            return RowWrite::Written;
        }
    }
    outcome
}

fn row_name(row: &Value) -> Option<&str> {
    row.get("name").and_then(Value::as_str)
}
