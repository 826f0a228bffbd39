mod app;
mod config;
mod document;
mod editor;
mod model;
mod renderer;
mod state;
mod tabs;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use app::EditorApp;
use config::AppConfig;
use document::DocumentModel;
use editor::RefreshScope;
use tracing::{info, warn};

const MODEL_ENV: &str = "COMPONENT_EDITOR_MODEL";
const REFRESH_ENV: &str = "COMPONENT_EDITOR_REFRESH";

fn parse_refresh_scope(value: &str) -> RefreshScope {
    match value.trim().to_ascii_lowercase().as_str() {
        "subject" | "path" | "scoped" => RefreshScope::Subject,
        _ => RefreshScope::Any,
    }
}

fn resolve_refresh_scope(env_value: Option<&str>, config: &AppConfig) -> RefreshScope {
    if let Some(raw) = env_value {
        return parse_refresh_scope(raw);
    }
    if let Some(raw) = config.refresh_scope.as_deref() {
        return parse_refresh_scope(raw);
    }
    RefreshScope::Any
}

fn resolve_model_path(
    arg: Option<PathBuf>,
    env_value: Option<PathBuf>,
    config: &AppConfig,
) -> Option<PathBuf> {
    arg.or(env_value).or_else(|| config.model_path.clone())
}

fn resolve_initial_path(arg: Option<String>, config: &AppConfig) -> String {
    arg.or_else(|| config.last_path.clone()).unwrap_or_default()
}

fn open_model(path: &Path) -> anyhow::Result<DocumentModel> {
    DocumentModel::open(path).with_context(|| format!("opening model {}", path.display()))
}

fn load_model(path: Option<&Path>) -> DocumentModel {
    let Some(path) = path else {
        info!("no model document given; starting with an empty model");
        return DocumentModel::empty();
    };
    match open_model(path) {
        Ok(model) => model,
        Err(err) => {
            let message = format!("{err:#}");
            warn!(error = %message, "falling back to an empty model");
            DocumentModel::empty()
        }
    }
}

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::load();
    let mut args = std::env::args().skip(1);
    let model_arg = args.next().map(PathBuf::from);
    let path_arg = args.next();

    let model_path = resolve_model_path(
        model_arg,
        std::env::var_os(MODEL_ENV).map(PathBuf::from),
        &config,
    );
    let refresh_scope = resolve_refresh_scope(std::env::var(REFRESH_ENV).ok().as_deref(), &config);
    let initial_path = resolve_initial_path(path_arg, &config);
    info!(
        model = ?model_path,
        subject = %initial_path,
        scope = ?refresh_scope,
        "starting component editor"
    );
    let model = Arc::new(load_model(model_path.as_deref()));

    let width = config.window_width.unwrap_or(1000.0);
    let height = config.window_height.unwrap_or(700.0);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Component Editor")
            .with_app_id("component-editor")
            .with_inner_size([width, height]),
        ..Default::default()
    };

    eframe::run_native(
        "component-editor",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(EditorApp::new(
                cc,
                config,
                model,
                initial_path,
                refresh_scope,
            )))
        }),
    )
}
