use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    config::AppConfig,
    document::DocumentModel,
    editor::{ComponentEditor, RefreshScope},
    model::ModelFacade,
    renderer::PropertyTable,
    tabs::TabStrip,
};

pub struct EditorApp {
    model: Arc<DocumentModel>,
    editor: ComponentEditor,
    path_input: String,
    status: String,
    show_editor: bool,
    config: AppConfig,
}

impl EditorApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        model: Arc<DocumentModel>,
        initial_path: String,
        refresh_scope: RefreshScope,
    ) -> Self {
        model.set_repaint_context(cc.egui_ctx.clone());
        let facade: Arc<dyn ModelFacade> = model.clone();
        let editor = ComponentEditor::new(
            "component_editor.main",
            facade,
            Box::new(PropertyTable::default()),
            Box::new(TabStrip::default()),
            &initial_path,
        )
        .with_refresh_scope(refresh_scope);
        Self {
            model,
            editor,
            path_input: initial_path,
            status: String::new(),
            show_editor: true,
            config,
        }
    }

    fn load(&mut self, path: String) {
        let path = path.trim().to_string();
        if path.is_empty() {
            self.status = "Object path is empty".to_string();
            return;
        }
        info!(path = %path, "loading object");
        self.editor.load_object(&path);
        self.path_input = path;
        self.status.clear();
        self.show_editor = true;
    }

    fn reload_model(&mut self) {
        match self.model.reload() {
            Ok(()) => {
                self.status = match self.model.source() {
                    Some(path) => format!("Reloaded {}", path.display()),
                    None => "Model has no backing file".to_string(),
                };
            }
            Err(err) => {
                warn!(error = %err, "model reload failed");
                self.status = format!("Reload failed: {err}");
            }
        }
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("main_menu").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Object");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.path_input)
                        .desired_width(260.0)
                        .hint_text("e.g. prob.dis1")
                        .font(egui::TextStyle::Monospace),
                );
                let submitted =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                let mut picked: Option<String> = None;
                egui::ComboBox::from_id_salt("object_picker")
                    .selected_text("Objects")
                    .show_ui(ui, |ui| {
                        for path in self.model.object_paths() {
                            if ui.selectable_label(false, &path).clicked() {
                                picked = Some(path);
                            }
                        }
                    });

                if submitted || ui.button("Load").clicked() {
                    picked = Some(self.path_input.clone());
                }
                if let Some(path) = picked {
                    self.load(path);
                }

                ui.separator();
                if ui.button("Reload Model").clicked() {
                    self.reload_model();
                }
                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(&self.status);
                }
            });
        });
    }
}

fn window_title(subject: &str) -> String {
    if subject.is_empty() {
        "Properties".to_string()
    } else {
        format!("Properties — {subject}")
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Track window size for saving on exit
        if let Some(rect) = ctx.input(|i| i.viewport().inner_rect) {
            self.config.window_width = Some(rect.width());
            self.config.window_height = Some(rect.height());
        }

        self.show_top_bar(ctx);

        // Empty central panel as background (required by egui)
        egui::CentralPanel::default().show(ctx, |_ui| {});

        let width = self.editor.width();
        egui::Window::new(window_title(self.editor.subject_path()))
            .id(self.editor.id().child("window"))
            .open(&mut self.show_editor)
            .default_pos([10.0, 50.0])
            .default_width(width)
            .min_width(width)
            .default_height(480.0)
            .show(ctx, |ui| {
                self.editor.show(ui);
            });

        // A closed window still follows the model so it is current when reopened.
        if !self.show_editor {
            self.editor.poll();
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let subject = self.editor.subject_path();
        self.config.last_path = self.editor.state().is_loaded().then(|| subject.to_string());
        if let Some(path) = self.model.source() {
            self.config.model_path = Some(path.to_path_buf());
        }
        self.config.save();
    }
}

#[cfg(test)]
mod tests {
    use super::window_title;

    #[test]
    fn window_title_names_subject_when_loaded() {
        assert_eq!(window_title(""), "Properties");
        assert_eq!(window_title("prob.dis1"), "Properties — prob.dis1");
    }
}
