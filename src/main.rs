//! nodeflow - Desktop Entry Point
//!
//! Opens a demo pipeline over synthetic noisy sines with editable controls
//! for every node.

use nodeflow::{NodeflowApp, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,nodeflow=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting nodeflow");

    let settings = Settings::load_or_default();
    if let Some(path) = &settings.last_provenance {
        tracing::info!("Last provenance file: {:?}", path);
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("nodeflow"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "nodeflow",
        native_options,
        Box::new(|cc| {
            if settings.dark_mode {
                cc.egui_ctx.set_visuals(egui::Visuals::dark());
            } else {
                cc.egui_ctx.set_visuals(egui::Visuals::light());
            }

            Ok(Box::new(NodeflowApp::new(cc, settings)))
        }),
    );

    tracing::info!("Shutting down...");
    result
}
