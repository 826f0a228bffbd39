use tracing::trace;

/// Tab behaviour attached to an editor's content container.
pub trait TabWidget {
    /// Called once the tab layout for `container` is in place.
    fn activate(&mut self, container: egui::Id, tab_count: usize);

    /// Draws the tab row and returns the index of the selected tab.
    fn show(&mut self, ui: &mut egui::Ui, labels: &[&str]) -> usize;
}

/// Row of selectable labels; activation resets the selection to the first tab.
#[derive(Debug)]
pub struct TabStrip {
    container: egui::Id,
    tab_count: usize,
    active: usize,
}

impl Default for TabStrip {
    fn default() -> Self {
        Self {
            container: egui::Id::NULL,
            tab_count: 0,
            active: 0,
        }
    }
}

impl TabWidget for TabStrip {
    fn activate(&mut self, container: egui::Id, tab_count: usize) {
        self.container = container;
        self.tab_count = tab_count;
        self.active = 0;
        trace!(?container, tab_count, "tabs activated");
    }

    fn show(&mut self, ui: &mut egui::Ui, labels: &[&str]) -> usize {
        self.tab_count = labels.len();
        self.active = self.active.min(labels.len().saturating_sub(1));
        ui.push_id(self.container.with("tabs"), |ui| {
            ui.horizontal_wrapped(|ui| {
                for (index, label) in labels.iter().enumerate() {
                    if ui.selectable_label(self.active == index, *label).clicked() {
                        self.active = index;
                    }
                }
            });
        });
        ui.separator();
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_resets_selection() {
        let mut tabs = TabStrip::default();
        tabs.activate(egui::Id::new("panel"), 3);
        tabs.active = 2;

        tabs.activate(egui::Id::new("other"), 3);
        assert_eq!(tabs.active, 0);
        assert_eq!(tabs.container, egui::Id::new("other"));
        assert_eq!(tabs.tab_count, 3);
    }

    #[test]
    fn show_clamps_selection_to_available_labels() {
        let mut tabs = TabStrip::default();
        tabs.activate(egui::Id::new("panel"), 4);
        tabs.active = 3;

        let ctx = egui::Context::default();
        let mut active = None;
        let _ = ctx.run(Default::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                active = Some(tabs.show(ui, &["Inputs", "Outputs"]));
            });
        });
        assert_eq!(active, Some(1));
    }
}
