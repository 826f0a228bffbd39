use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use crate::model::{ModelFacade, PropertyRow, display_json};

/// Everything a renderer needs to draw one property group.
pub struct GroupContext<'a> {
    pub model: &'a dyn ModelFacade,
    pub subject: &'a str,
    pub group: &'a str,
    pub value: &'a Value,
    pub editable: bool,
}

/// Draws a single property group into its tab pane.
pub trait PropertiesRenderer {
    /// Drops per-pane state; called whenever the panel rebuilds its tabs.
    fn reset(&mut self) {}

    fn render(&mut self, ui: &mut egui::Ui, group: GroupContext<'_>);
}

type RowKey = (String, String);

/// Default renderer: a Name/Value/Units/Description grid for row groups and
/// a collapsible JSON tree for anything else.
#[derive(Default)]
pub struct PropertyTable {
    drafts: HashMap<RowKey, String>,
    errors: HashMap<RowKey, String>,
}

impl PropertiesRenderer for PropertyTable {
    fn reset(&mut self) {
        self.drafts.clear();
        self.errors.clear();
    }

    fn render(&mut self, ui: &mut egui::Ui, group: GroupContext<'_>) {
        match PropertyRow::rows_of(group.value) {
            Some(rows) if rows.is_empty() => {
                ui.weak("No properties");
            }
            Some(rows) => self.render_rows(ui, &group, &rows),
            None => render_json_tree(ui, group.group, group.value),
        }
    }
}

impl PropertyTable {
    fn render_rows(&mut self, ui: &mut egui::Ui, group: &GroupContext<'_>, rows: &[PropertyRow]) {
        egui::Grid::new(("property_table", group.subject, group.group))
            .num_columns(4)
            .striped(true)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                ui.strong("Name");
                ui.strong("Value");
                ui.strong("Units");
                ui.strong("Description");
                ui.end_row();

                for row in rows {
                    let name = ui.label(&row.name);
                    if let Some(range) = row.range_hint() {
                        name.on_hover_text(range);
                    }
                    if group.editable && !row.is_connected() {
                        self.value_editor(ui, group, row);
                    } else {
                        let value = ui.monospace(row.display_value());
                        if row.is_connected() {
                            value.on_hover_text(format!(
                                "connected to {}",
                                display_json(&row.connected)
                            ));
                        }
                    }
                    ui.label(row.units.as_deref().unwrap_or(""));
                    ui.label(row.desc.as_deref().unwrap_or(""));
                    ui.end_row();
                }
            });
    }

    fn value_editor(&mut self, ui: &mut egui::Ui, group: &GroupContext<'_>, row: &PropertyRow) {
        let key = (group.group.to_string(), row.name.clone());
        let current = row.display_value();
        let draft = self
            .drafts
            .entry(key.clone())
            .or_insert_with(|| current.clone());

        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(draft)
                    .id(value_editor_id(group.subject, group.group, &row.name))
                    .desired_width(120.0)
                    .font(egui::TextStyle::Monospace),
            );
            if response.lost_focus() && *draft != current {
                match group
                    .model
                    .set_value(group.subject, &row.name, parse_edit(draft))
                {
                    Ok(()) => {
                        self.errors.remove(&key);
                    }
                    Err(err) => {
                        warn!(
                            path = group.subject,
                            name = %row.name,
                            error = %err,
                            "property edit rejected"
                        );
                        self.errors.insert(key.clone(), err.to_string());
                    }
                }
            }
            if let Some(message) = self.errors.get(&key) {
                ui.colored_label(ui.visuals().error_fg_color, "⚠")
                    .on_hover_text(message);
            }
        });
    }
}

fn value_editor_id(subject: &str, group: &str, name: &str) -> egui::Id {
    egui::Id::new(("property_value", subject, group, name))
}

/// Parses edited text as JSON, falling back to a plain string.
pub fn parse_edit(text: &str) -> Value {
    serde_json::from_str(text.trim()).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn render_json_tree(ui: &mut egui::Ui, label: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            egui::CollapsingHeader::new(label)
                .default_open(true)
                .show(ui, |ui| {
                    for (key, child) in map {
                        render_json_tree(ui, key, child);
                    }
                });
        }
        Value::Array(items) => {
            egui::CollapsingHeader::new(format!("{label} [{}]", items.len()))
                .default_open(true)
                .show(ui, |ui| {
                    for (index, child) in items.iter().enumerate() {
                        render_json_tree(ui, &index.to_string(), child);
                    }
                });
        }
        scalar => {
            ui.horizontal(|ui| {
                ui.label(format!("{label}:"));
                ui.monospace(display_json(scalar));
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::model::{FetchOutcome, ModelChange, ModelError};

    #[derive(Default)]
    struct WriteLog {
        writes: Mutex<Vec<(String, String, Value)>>,
        read_only: bool,
    }

    impl ModelFacade for WriteLog {
        fn subscribe(&self) -> mpsc::Receiver<ModelChange> {
            mpsc::channel().1
        }

        fn get_component(&self, _path: &str, _reply: mpsc::Sender<FetchOutcome>) {}

        fn set_value(&self, path: &str, name: &str, value: Value) -> Result<(), ModelError> {
            if self.read_only {
                return Err(ModelError::ReadOnly {
                    path: path.to_string(),
                    name: name.to_string(),
                });
            }
            self.writes
                .lock()
                .unwrap()
                .push((path.to_string(), name.to_string(), value));
            Ok(())
        }
    }

    fn render_once(table: &mut PropertyTable, model: &WriteLog, value: &Value, editable: bool) {
        render_frame(&egui::Context::default(), table, model, value, editable, |_| {});
    }

    fn render_frame(
        ctx: &egui::Context,
        table: &mut PropertyTable,
        model: &WriteLog,
        value: &Value,
        editable: bool,
        before: impl Fn(&egui::Context),
    ) {
        let _ = ctx.run(Default::default(), |ctx| {
            before(ctx);
            egui::CentralPanel::default().show(ctx, |ui| {
                table.render(
                    ui,
                    GroupContext {
                        model,
                        subject: "top.dis1",
                        group: "Inputs",
                        value,
                        editable,
                    },
                );
            });
        });
    }

    #[test]
    fn parse_edit_prefers_json() {
        assert_eq!(parse_edit("2.5"), json!(2.5));
        assert_eq!(parse_edit(" true "), json!(true));
        assert_eq!(parse_edit("[1, 2]"), json!([1, 2]));
        assert_eq!(parse_edit("\"quoted\""), json!("quoted"));
        assert_eq!(parse_edit("plain text"), json!("plain text"));
    }

    #[test]
    fn editable_rows_get_drafts_and_read_only_rows_do_not() {
        let model = WriteLog::default();
        let rows = json!([
            { "name": "x1", "value": 1.0 },
            { "name": "z1", "value": 5.0, "connected": "coupler.z1" }
        ]);

        let mut table = PropertyTable::default();
        render_once(&mut table, &model, &rows, true);
        assert_eq!(
            table.drafts.get(&("Inputs".to_string(), "x1".to_string())),
            Some(&"1.0".to_string())
        );
        assert!(!table
            .drafts
            .contains_key(&("Inputs".to_string(), "z1".to_string())));

        let mut read_only = PropertyTable::default();
        render_once(&mut read_only, &model, &rows, false);
        assert!(read_only.drafts.is_empty());
        assert!(model.writes.lock().unwrap().is_empty());
    }

    /// Focuses `x1`, replaces its draft with `text`, then drops focus.
    fn edit_x1(table: &mut PropertyTable, model: &WriteLog, text: &str) {
        let rows = json!([{ "name": "x1", "value": 1.0 }]);
        let id = value_editor_id("top.dis1", "Inputs", "x1");
        let ctx = egui::Context::default();

        render_frame(&ctx, table, model, &rows, true, |ctx| {
            ctx.memory_mut(|mem| mem.request_focus(id));
        });
        table
            .drafts
            .insert(("Inputs".to_string(), "x1".to_string()), text.to_string());
        render_frame(&ctx, table, model, &rows, true, |ctx| {
            ctx.memory_mut(|mem| mem.surrender_focus(id));
        });
    }

    #[test]
    fn losing_focus_commits_parsed_edit() {
        let model = WriteLog::default();
        let mut table = PropertyTable::default();
        edit_x1(&mut table, &model, "2.5");

        assert_eq!(
            *model.writes.lock().unwrap(),
            [("top.dis1".to_string(), "x1".to_string(), json!(2.5))]
        );
        assert!(table.errors.is_empty());
    }

    #[test]
    fn rejected_edit_is_flagged_on_its_row() {
        let model = WriteLog {
            read_only: true,
            ..Default::default()
        };
        let mut table = PropertyTable::default();
        edit_x1(&mut table, &model, "2.5");

        assert!(model.writes.lock().unwrap().is_empty());
        let error = table
            .errors
            .get(&("Inputs".to_string(), "x1".to_string()))
            .expect("rejection recorded");
        assert!(error.contains("read-only"));
    }

    #[test]
    fn reset_discards_drafts() {
        let model = WriteLog::default();
        let mut table = PropertyTable::default();
        render_once(&mut table, &model, &json!([{ "name": "x1", "value": 1 }]), true);
        assert_eq!(table.drafts.len(), 1);

        table.reset();
        assert!(table.drafts.is_empty());
    }

    #[test]
    fn non_row_groups_render_as_tree() {
        let model = WriteLog::default();
        let mut table = PropertyTable::default();
        render_once(
            &mut table,
            &model,
            &json!({ "driver": "driver", "components": ["dis1", "dis2"] }),
            true,
        );
        assert!(table.drafts.is_empty());
    }
}
