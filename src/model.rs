use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError, mpsc};

use serde::Deserialize;
use serde_json::{Map, Value};

/// Group that names the object's class; never shown as a tab.
pub const TYPE_GROUP: &str = "type";
/// Group holding computed values; always rendered read-only.
pub const OUTPUTS_GROUP: &str = "Outputs";

/// Property groups of one model object, in the order the model reported them.
pub type PropertySet = Map<String, Value>;

/// Failure to fetch an object's properties from the model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status} {status_text}")]
pub struct FetchError {
    pub status: u16,
    pub status_text: String,
    /// Raw response body, shown verbatim to the user.
    pub payload: String,
}

impl FetchError {
    pub fn new(status: u16, status_text: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            payload: payload.into(),
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(404, "Not Found", format!("{path} not found in model"))
    }
}

/// Reply to a single `get_component` request.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Path that was requested, which may no longer be the panel's subject.
    pub path: String,
    pub result: Result<PropertySet, FetchError>,
}

/// Notification broadcast to every listener when the model changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChange {
    /// Object that changed, or `None` when the whole document changed.
    pub path: Option<String>,
}

impl ModelChange {
    pub fn everything() -> Self {
        Self { path: None }
    }

    pub fn object(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Returns `true` if this change can affect what is shown for `subject`.
    ///
    /// Document-wide changes touch everything. An object change touches the
    /// object itself plus its ancestors and descendants in the dotted tree.
    pub fn touches(&self, subject: &str) -> bool {
        match self.path.as_deref() {
            None => true,
            Some(path) => {
                path == subject || is_ancestor(path, subject) || is_ancestor(subject, path)
            }
        }
    }
}

fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('.'))
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no object named `{0}` in model")]
    UnknownObject(String),
    #[error("object `{path}` has no property `{name}`")]
    UnknownProperty { path: String, name: String },
    #[error("property `{name}` of `{path}` is read-only")]
    ReadOnly { path: String, name: String },
    #[error("failed to read model file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse model document")]
    Parse(#[from] serde_json::Error),
    #[error("model document must be a JSON object keyed by object path")]
    InvalidDocument,
}

/// The host model as seen by an editor panel.
///
/// Fetches are asynchronous: `get_component` returns immediately and exactly
/// one [`FetchOutcome`] is later sent on `reply`.
pub trait ModelFacade {
    /// Registers a change listener. The subscription lasts as long as the
    /// returned receiver is alive.
    fn subscribe(&self) -> mpsc::Receiver<ModelChange>;

    fn get_component(&self, path: &str, reply: mpsc::Sender<FetchOutcome>);

    /// Writes the `value` field of property `name` on object `path`.
    fn set_value(&self, path: &str, name: &str, value: Value) -> Result<(), ModelError>;
}

/// Fan-out list of change subscribers; disconnected receivers are dropped on
/// the next broadcast.
#[derive(Default)]
pub struct ChangeListeners {
    senders: Mutex<Vec<mpsc::Sender<ModelChange>>>,
}

impl ChangeListeners {
    pub fn subscribe(&self) -> mpsc::Receiver<ModelChange> {
        let (tx, rx) = mpsc::channel();
        lock(&self.senders).push(tx);
        rx
    }

    pub fn broadcast(&self, change: &ModelChange) {
        lock(&self.senders).retain(|tx| tx.send(change.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        lock(&self.senders).len()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One entry of a group whose value is a list of property objects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropertyRow {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub low: Option<Value>,
    #[serde(default)]
    pub high: Option<Value>,
    /// Source expression(s) driving this property, if any.
    #[serde(default)]
    pub connected: Value,
}

impl PropertyRow {
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Parses a whole group as rows. Returns `None` unless every item is a row.
    pub fn rows_of(group: &Value) -> Option<Vec<Self>> {
        group.as_array()?.iter().map(Self::from_value).collect()
    }

    /// Connected properties are driven by another object and cannot be set.
    pub fn is_connected(&self) -> bool {
        match &self.connected {
            Value::Bool(connected) => *connected,
            Value::String(source) => !source.is_empty(),
            Value::Array(sources) => !sources.is_empty(),
            _ => false,
        }
    }

    pub fn display_value(&self) -> String {
        display_json(&self.value)
    }

    /// Human-readable `[low, high]` bounds, if either is present.
    pub fn range_hint(&self) -> Option<String> {
        match (&self.low, &self.high) {
            (None, None) => None,
            (low, high) => Some(format!(
                "range: [{}, {}]",
                low.as_ref().map_or_else(|| "-inf".to_string(), display_json),
                high.as_ref().map_or_else(|| "inf".to_string(), display_json),
            )),
        }
    }
}

/// Formats a JSON scalar for display; strings are shown without quotes.
pub fn display_json(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_touches_subject_ancestors_and_descendants() {
        let change = ModelChange::object("top.dis1");
        assert!(change.touches("top.dis1"));
        assert!(change.touches("top"));
        assert!(change.touches("top.dis1.sub"));
        assert!(!change.touches("top.dis2"));
        assert!(!change.touches("top.dis10"));
        assert!(ModelChange::everything().touches("anything"));
    }

    #[test]
    fn listeners_prune_dropped_receivers() {
        let listeners = ChangeListeners::default();
        let kept = listeners.subscribe();
        let dropped = listeners.subscribe();
        drop(dropped);
        assert_eq!(listeners.len(), 2);

        listeners.broadcast(&ModelChange::everything());
        assert_eq!(listeners.len(), 1);
        assert_eq!(kept.try_recv().ok(), Some(ModelChange::everything()));
    }

    #[test]
    fn rows_of_requires_every_item_to_be_a_row() {
        let group = json!([
            { "name": "x1", "value": 1.0, "low": 0.0 },
            { "name": "z1", "value": 5.0, "connected": "coupler.z1" }
        ]);
        let rows = PropertyRow::rows_of(&group).expect("rows");
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].is_connected());
        assert!(rows[1].is_connected());
        assert_eq!(rows[0].range_hint().as_deref(), Some("range: [0.0, inf]"));

        assert!(PropertyRow::rows_of(&json!([{ "name": "a" }, "loose"])).is_none());
        assert!(PropertyRow::rows_of(&json!({ "name": "a" })).is_none());
    }

    #[test]
    fn display_json_strips_string_quotes() {
        assert_eq!(display_json(&json!("abc")), "abc");
        assert_eq!(display_json(&json!(3.5)), "3.5");
        assert_eq!(display_json(&Value::Null), "");
        assert_eq!(display_json(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn fetch_error_displays_status_line() {
        let err = FetchError::not_found("top.missing");
        assert_eq!(err.to_string(), "404 Not Found");
        assert_eq!(err.payload, "top.missing not found in model");
    }
}
