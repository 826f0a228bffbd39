use std::sync::{Arc, mpsc};

use tracing::{debug, error};

use crate::model::{FetchError, FetchOutcome, ModelChange, ModelFacade, PropertySet};
use crate::renderer::{GroupContext, PropertiesRenderer};
use crate::state::{PanelId, PanelLayout, PanelState, panel_width};
use crate::tabs::TabWidget;

const PANE_LEFT_PADDING: i8 = 10;

/// Which model changes make a loaded panel refetch its subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshScope {
    /// Every change, regardless of which object it names.
    #[default]
    Any,
    /// Only document-wide changes and changes to the subject's branch.
    Subject,
}

/// Blocking alert raised when a fetch fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorAlert {
    pub message: String,
}

/// Secondary window holding the raw body of a failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub title: String,
    pub payload: String,
    open: bool,
}

/// Tabbed property editor bound to one object of a [`ModelFacade`].
pub struct ComponentEditor {
    id: PanelId,
    model: Arc<dyn ModelFacade>,
    renderer: Box<dyn PropertiesRenderer>,
    tabs: Box<dyn TabWidget>,
    refresh_scope: RefreshScope,
    subject_path: String,
    changes: mpsc::Receiver<ModelChange>,
    reply_tx: mpsc::Sender<FetchOutcome>,
    reply_rx: mpsc::Receiver<FetchOutcome>,
    in_flight: usize,
    layout: Option<PanelLayout>,
    width: f32,
    alert: Option<ErrorAlert>,
    error_report: Option<ErrorReport>,
}

impl ComponentEditor {
    /// Subscribes to `model` and, if `initial_path` is non-empty, starts
    /// loading it.
    pub fn new(
        name: &str,
        model: Arc<dyn ModelFacade>,
        renderer: Box<dyn PropertiesRenderer>,
        tabs: Box<dyn TabWidget>,
        initial_path: &str,
    ) -> Self {
        let changes = model.subscribe();
        let (reply_tx, reply_rx) = mpsc::channel();
        let mut editor = Self {
            id: PanelId::from_dotted(name),
            model,
            renderer,
            tabs,
            refresh_scope: RefreshScope::default(),
            subject_path: String::new(),
            changes,
            reply_tx,
            reply_rx,
            in_flight: 0,
            layout: None,
            width: panel_width(0),
            alert: None,
            error_report: None,
        };
        if !initial_path.is_empty() {
            editor.load_object(initial_path);
        }
        editor
    }

    pub fn with_refresh_scope(mut self, scope: RefreshScope) -> Self {
        self.refresh_scope = scope;
        self
    }

    pub fn id(&self) -> &PanelId {
        &self.id
    }

    pub fn subject_path(&self) -> &str {
        &self.subject_path
    }

    pub fn state(&self) -> PanelState {
        if self.subject_path.is_empty() {
            PanelState::Empty
        } else if self.in_flight > 0 || self.layout.is_none() {
            PanelState::Pending
        } else {
            PanelState::Rendered
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Makes `path` the subject and requests its properties.
    ///
    /// Returns immediately; the outcome is applied by a later [`poll`](Self::poll).
    /// Overlapping loads are not sequenced: each outcome is applied in the
    /// order it arrives.
    pub fn load_object(&mut self, path: &str) -> &mut Self {
        if self.subject_path != path {
            self.subject_path = path.to_string();
        }
        debug!(panel = %self.id, path, "requesting properties");
        self.in_flight += 1;
        self.model.get_component(path, self.reply_tx.clone());
        self
    }

    /// Drains pending model changes and fetch outcomes.
    pub fn poll(&mut self) {
        while let Ok(change) = self.changes.try_recv() {
            self.on_model_changed(&change);
        }
        while let Ok(outcome) = self.reply_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            match outcome.result {
                Ok(properties) => self.on_success(&outcome.path, properties),
                Err(failure) => {
                    debug!(panel = %self.id, requested = %outcome.path, "fetch failed");
                    self.on_error(failure);
                }
            }
        }
    }

    /// Replaces the current tabs with one per group of `properties`.
    ///
    /// The panes stay bound to `path`, the object they were fetched for, even
    /// after the subject moves on or is cleared by an error.
    pub fn on_success(&mut self, path: &str, properties: PropertySet) {
        self.renderer.reset();
        let layout = PanelLayout::build(path, properties);
        self.width = layout.width;
        self.tabs.activate(self.id.egui_id(), layout.tab_count());
        debug!(
            panel = %self.id,
            path,
            tabs = layout.tab_count(),
            width = layout.width,
            "properties rendered"
        );
        self.layout = Some(layout);
    }

    /// Clears the subject, then raises the alert and payload window.
    ///
    /// The alert is formatted after the subject is cleared, so it names an
    /// empty path. Tabs from an earlier load stay in place.
    pub fn on_error(&mut self, failure: FetchError) {
        self.subject_path.clear();
        let message = format!(
            "Error getting properties for {} ({}: {})",
            self.subject_path, failure.status, failure.status_text
        );
        error!(
            panel = %self.id,
            status = failure.status,
            status_text = %failure.status_text,
            payload = %failure.payload,
            "error getting properties"
        );
        self.alert = Some(ErrorAlert { message });
        self.error_report = Some(ErrorReport {
            title: format!("Error {}: {}", failure.status, failure.status_text),
            payload: failure.payload,
            open: true,
        });
    }

    /// Reloads the current subject, if any, subject to the refresh scope.
    pub fn on_model_changed(&mut self, change: &ModelChange) {
        if self.subject_path.is_empty() {
            return;
        }
        if self.refresh_scope == RefreshScope::Subject && !change.touches(&self.subject_path) {
            return;
        }
        let path = self.subject_path.clone();
        self.load_object(&path);
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        self.poll();
        ui.set_min_width(self.width);

        match &self.layout {
            Some(layout) if layout.tab_count() > 0 => {
                let labels = layout.labels();
                let active = self.tabs.show(ui, &labels);
                if let Some(pane) = layout.panes.get(active) {
                    pane_frame(ui.visuals()).show(ui, |ui| {
                        egui::ScrollArea::vertical()
                            .id_salt(self.id.child(&pane.group))
                            .auto_shrink([false, true])
                            .show(ui, |ui| {
                                self.renderer.render(
                                    ui,
                                    GroupContext {
                                        model: self.model.as_ref(),
                                        subject: &layout.subject,
                                        group: &pane.group,
                                        value: &pane.value,
                                        editable: pane.editable,
                                    },
                                );
                            });
                    });
                }
            }
            Some(_) => {
                ui.weak("No properties");
            }
            None if self.state() == PanelState::Pending => {
                ui.spinner();
            }
            None => {
                ui.weak("No object loaded");
            }
        }

        self.show_alert(ui.ctx());
        self.show_error_report(ui.ctx());
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(alert) = &self.alert else { return };
        let mut dismissed = false;
        let response = egui::Modal::new(self.id.child("alert")).show(ctx, |ui| {
            ui.set_width(320.0);
            ui.heading("Error");
            ui.label(&alert.message);
            ui.add_space(8.0);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });
        if dismissed || response.should_close() {
            self.dismiss_alert();
        }
    }

    fn show_error_report(&mut self, ctx: &egui::Context) {
        let window_id = self.id.child("error_report");
        let Some(ErrorReport {
            title,
            payload,
            open,
        }) = &mut self.error_report
        else {
            return;
        };
        egui::Window::new(title.as_str())
            .id(window_id)
            .open(open)
            .default_size([480.0, 320.0])
            .show(ctx, |ui| {
                egui::ScrollArea::both().show(ui, |ui| {
                    ui.monospace(payload.as_str());
                });
            });
        if !*open {
            self.error_report = None;
        }
    }
}

/// Fixed style for every tab pane: left padding, panel fill, thin border.
fn pane_frame(visuals: &egui::Visuals) -> egui::Frame {
    egui::Frame::new()
        .inner_margin(egui::Margin {
            left: PANE_LEFT_PADDING,
            right: 4,
            top: 4,
            bottom: 4,
        })
        .fill(visuals.faint_bg_color)
        .stroke(visuals.widgets.noninteractive.bg_stroke)
}
