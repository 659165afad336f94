//! Desktop session: a demo pipeline with live controls, status and log.
//!
//! The session owns one container. Controls live in a side panel; each frame
//! drains the container's edit events so a parameter change re-runs the
//! pipeline from the edited stage before the next repaint.

use crate::config::{Settings, TempFile};
use crate::controls::EguiControlPanel;
use crate::error::{Result, ResultExt};
use crate::library;
use crate::pipeline::{
    Cell, Container, Payload, PipelineStatus, RunOutcome, RunReport, TablePayload,
};
use crate::{args, SessionConfig};
use egui::{Color32, RichText, Ui};
use std::cell::RefCell;
use std::f64::consts::PI;
use std::path::PathBuf;
use std::rc::Rc;

/// Rows in the demo table.
pub const DEMO_ROWS: usize = 8;
/// Samples per demo series.
pub const DEMO_SAMPLES: usize = 512;

pub struct NodeflowApp {
    container: Container,
    panel: Rc<RefCell<EguiControlPanel>>,
    settings: Settings,
    last_report: Option<RunReport>,
    last_error: Option<String>,
}

impl NodeflowApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        Self::with_settings(settings)
    }

    /// Build the demo session without a window (used by `new` and tests).
    pub fn with_settings(settings: Settings) -> Self {
        let panel = Rc::new(RefCell::new(EguiControlPanel::new()));
        let mut container = Container::with_config(demo_table(DEMO_ROWS, DEMO_SAMPLES), SessionConfig::from(&settings));
        container.set_binder(panel.clone());

        container
            .chain(&library::splice().node(args!["trace", 0, DEMO_SAMPLES as i64]))
            .chain(&library::normalize().node(args!["spliced"]))
            .chain(&library::rfft().node(args!["normalize"]));

        let report = container.execute_pipeline(false);
        tracing::info!("Demo pipeline ready: {}", container.status());

        Self {
            container,
            panel,
            settings,
            last_report: Some(report),
            last_error: None,
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Re-run whatever the controls edited since the last frame.
    pub fn pump_events(&mut self) -> bool {
        match self.container.process_events() {
            Some(report) => {
                self.last_report = Some(report);
                true
            }
            None => false,
        }
    }

    fn save_provenance(&mut self) -> Result<PathBuf> {
        let dir = self.data_dir()?;
        let path = dir.join("provenance.json");
        self.container.save_provenance(&path)?;
        self.settings.last_provenance = Some(path.clone());
        self.settings.save().context("Failed to remember provenance path")?;
        Ok(path)
    }

    /// Write the payload next to the provenance file, via a scratch file so a
    /// failed write never leaves a truncated export behind.
    fn export_payload(&self) -> Result<PathBuf> {
        let dir = self.data_dir()?;
        let dest = dir.join("payload.json");
        let scratch = TempFile::in_data_dir(&self.settings, "payload", "json")?;
        let payload = self.container.payload();
        payload.to_file(scratch.path(), payload.default_key())?;
        scratch.persist(&dest)
    }

    fn data_dir(&self) -> Result<PathBuf> {
        match self.settings.data_dir.clone() {
            Some(dir) => {
                std::fs::create_dir_all(&dir)?;
                Ok(dir)
            }
            None => crate::config::ensure_app_data_dir(),
        }
    }

    fn report_result(&mut self, what: &str, result: Result<PathBuf>) {
        match result {
            Ok(path) => {
                tracing::info!("{} written to {:?}", what, path);
                self.last_error = None;
            }
            Err(e) => {
                tracing::error!("Failed to write {}: {}", what, e);
                self.last_error = Some(format!("{}: {}", what, e));
            }
        }
    }

    fn render_menu(&mut self, ui: &mut Ui) {
        egui::MenuBar::new().ui(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Save Provenance").clicked() {
                    let result = self.save_provenance();
                    self.report_result("Provenance", result);
                    ui.close();
                }
                if ui.button("Export Payload").clicked() {
                    let result = self.export_payload();
                    self.report_result("Payload", result);
                    ui.close();
                }
            });
            ui.menu_button("Pipeline", |ui| {
                if ui.button("Re-run All").clicked() {
                    self.last_report = Some(self.container.execute_pipeline(false));
                    ui.close();
                }
                if ui.button("Clear Log").clicked() {
                    self.container.clear_log();
                    ui.close();
                }
            });
        });
    }

    fn render_status(&self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 8.0;

            let (color, text) = match self.container.status() {
                PipelineStatus::Idle => (Color32::GRAY, "Idle".to_string()),
                PipelineStatus::Processing { node } => (Color32::YELLOW, format!("Processing node: {}", node)),
                PipelineStatus::Completed => (Color32::GREEN, "Pipeline completed successfully".to_string()),
                PipelineStatus::Failed { message, .. } => (Color32::RED, format!("Failure: {}", message)),
            };
            ui.colored_label(color, "●");
            ui.label(RichText::new(text).small());

            if let Some(report) = &self.last_report {
                ui.separator();
                ui.label(
                    RichText::new(format!(
                        "Run {:?}: {} stage(s) from {}",
                        report.run, report.executed, report.start
                    ))
                    .small(),
                );
            }

            if let Some(err) = &self.last_error {
                ui.separator();
                ui.colored_label(Color32::RED, RichText::new(err).small());
            }
        });
    }

    fn render_log(&self, ui: &mut Ui) {
        ui.heading("Execution Log");
        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("execution_log")
                .num_columns(4)
                .striped(true)
                .spacing([10.0, 4.0])
                .show(ui, |ui| {
                    ui.strong("Node");
                    ui.strong("Run");
                    ui.strong("Outcome");
                    ui.strong("Parameters");
                    ui.end_row();

                    for (label, entry) in self.container.log().entries_named() {
                        ui.label(label);
                        ui.label(format!("{:?}", entry.run));
                        ui.label(format!("{:?}", entry.outcome));
                        ui.label(entry.params.to_string());
                        ui.end_row();
                    }
                });

            if let Some(RunReport {
                outcome: RunOutcome::Failed { trace, .. },
                ..
            }) = &self.last_report
            {
                ui.add_space(16.0);
                ui.heading("Failure Trace");
                ui.label(RichText::new(trace).monospace());
            }
        });
    }

    fn render_payload(&self, ui: &mut Ui) {
        ui.heading("Payload");
        ui.separator();
        match self.container.payload() {
            Payload::Table(table) => {
                ui.label(format!("Table, {} row(s)", table.n_rows()));
                for name in table.column_names() {
                    let lengths = table
                        .series(name)
                        .map(|rows| rows.first().map(|r| r.len()).unwrap_or(0))
                        .ok();
                    match lengths {
                        Some(n) => ui.label(format!("• {} (series of {})", name, n)),
                        None => ui.label(format!("• {}", name)),
                    };
                }
            }
            Payload::Array(array) => {
                ui.label(format!("Array, {} row(s)", array.n_rows()));
            }
        }
    }
}

impl eframe::App for NodeflowApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.pump_events() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| self.render_menu(ui));

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| self.render_status(ui));

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                if self.panel.borrow_mut().show(ui) > 0 {
                    ctx.request_repaint();
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_payload(ui);
            ui.add_space(16.0);
            self.render_log(ui);
        });
    }
}

/// Noisy sines of increasing frequency in column `trace`, with a `label` per row.
pub fn demo_table(rows: usize, samples: usize) -> TablePayload {
    let mut traces = Vec::with_capacity(rows);
    let mut labels = Vec::with_capacity(rows);
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;

    for row in 0..rows {
        let freq = (row + 1) as f64 * 3.0;
        let series = (0..samples)
            .map(|i| {
                // xorshift noise
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                let noise = (seed % 1000) as f64 / 1000.0 - 0.5;
                (2.0 * PI * freq * i as f64 / samples as f64).sin() + 0.2 * noise
            })
            .collect();
        traces.push(Cell::Series(series));
        labels.push(Cell::Text(format!("sine_{}", row)));
    }

    let mut table = TablePayload::new();
    // Both columns have `rows` cells, so neither insert can fail.
    let _ = table.set_column("trace", traces);
    let _ = table.set_column("label", labels);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TABLE_KEY;

    fn settings() -> Settings {
        Settings {
            show_controls: true,
            ..Settings::default()
        }
    }

    #[test]
    fn test_demo_table_shape() {
        let t = demo_table(3, 16);
        assert_eq!(t.n_rows(), 3);
        assert!(t.series("trace").unwrap().iter().all(|r| r.len() == 16));
    }

    #[test]
    fn test_demo_session_runs_and_binds_controls() {
        let app = NodeflowApp::with_settings(settings());
        assert_eq!(app.container().status(), &PipelineStatus::Completed);
        assert_eq!(app.container().log().len(), 3);
        assert_eq!(app.panel.borrow().len(), 3);

        let table = app.container().payload().table().unwrap();
        assert_eq!(table.series("fft").unwrap()[0].len(), DEMO_SAMPLES / 2 + 1);
    }

    #[test]
    fn test_edit_through_panel_node_reruns() {
        let mut app = NodeflowApp::with_settings(settings());
        let splice = app.panel.borrow().nodes().next().cloned().unwrap();
        splice.set_param("stop", 64);

        assert!(app.pump_events());
        assert_eq!(app.container().log().len(), 6);
        let table = app.container().payload().table().unwrap();
        assert_eq!(table.series("fft").unwrap()[0].len(), 33);
    }

    #[test]
    fn test_export_payload_stores_array_under_array_key() {
        use crate::pipeline::{ArrayPayload, ARRAY_KEY};

        let dir = tempfile::tempdir().unwrap();
        let mut app = NodeflowApp::with_settings(Settings {
            data_dir: Some(dir.path().to_path_buf()),
            ..settings()
        });
        let array = ArrayPayload::new(vec![vec![1.0, 2.0]], vec!["row".into()]).unwrap();
        app.container = Container::with_config(array.clone(), SessionConfig::headless());

        let path = app.export_payload().unwrap();
        assert_eq!(ArrayPayload::from_file(&path, ARRAY_KEY).unwrap(), array);
        assert!(Payload::from_file(&path, TABLE_KEY).is_err());
        let leftovers = std::fs::read_dir(dir.path().join("tmp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_export_payload_writes_table() {
        let dir = tempfile::tempdir().unwrap();
        let app = NodeflowApp::with_settings(Settings {
            data_dir: Some(dir.path().to_path_buf()),
            ..settings()
        });
        let path = app.export_payload().unwrap();
        let loaded = TablePayload::from_file(&path, TABLE_KEY).unwrap();
        assert_eq!(loaded.n_rows(), DEMO_ROWS);
    }
}
