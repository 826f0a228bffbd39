use std::fmt;

use serde_json::Value;

use crate::model::{OUTPUTS_GROUP, PropertySet, TYPE_GROUP};

/// Width units reserved per tab; one extra slot is kept for padding.
pub const TAB_WIDTH_UNIT: f32 = 75.0;
/// Tab labels are cut to this many characters.
pub const TAB_LABEL_MAX_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Widget-safe identifier derived from a dotted instance name.
pub struct PanelId(String);

impl PanelId {
    /// `"a.b.c"` becomes `"a-b-c"`; anything outside `[A-Za-z0-9_-]` becomes `_`.
    pub fn from_dotted(name: &str) -> Self {
        let id = name
            .chars()
            .map(|c| match c {
                '.' => '-',
                c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => c,
                _ => '_',
            })
            .collect();
        Self(id)
    }

    pub fn egui_id(&self) -> egui::Id {
        egui::Id::new(&self.0)
    }

    pub fn child(&self, part: &str) -> egui::Id {
        self.egui_id().with(part)
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    /// No subject path.
    Empty,
    /// Subject set, fetch in flight.
    Pending,
    /// Subject set, tabs built from the last successful fetch.
    Rendered,
}

impl PanelState {
    pub fn is_loaded(self) -> bool {
        self != PanelState::Empty
    }
}

#[derive(Debug, Clone, PartialEq)]
/// One tab and the group it displays.
pub struct TabPane {
    pub group: String,
    pub label: String,
    pub editable: bool,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
/// Tabs built from one fetched property set.
pub struct PanelLayout {
    /// Object the properties were fetched for; edits in these panes go here.
    pub subject: String,
    pub panes: Vec<TabPane>,
    pub width: f32,
}

impl PanelLayout {
    /// Builds one pane per group except `type`, keeping the model's order.
    pub fn build(subject: &str, properties: PropertySet) -> Self {
        let panes: Vec<TabPane> = properties
            .into_iter()
            .filter(|(group, _)| group != TYPE_GROUP)
            .map(|(group, value)| TabPane {
                label: tab_label(&group),
                editable: is_editable_group(&group),
                group,
                value,
            })
            .collect();
        let width = panel_width(panes.len());
        Self {
            subject: subject.to_string(),
            panes,
            width,
        }
    }

    pub fn tab_count(&self) -> usize {
        self.panes.len()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.panes.iter().map(|pane| pane.label.as_str()).collect()
    }
}

/// First ten characters of the group name. Names sharing a prefix collide.
pub fn tab_label(group: &str) -> String {
    group.chars().take(TAB_LABEL_MAX_CHARS).collect()
}

pub fn panel_width(tab_count: usize) -> f32 {
    (tab_count + 1) as f32 * TAB_WIDTH_UNIT
}

pub fn is_editable_group(group: &str) -> bool {
    group != OUTPUTS_GROUP
}
