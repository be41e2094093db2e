use eframe::egui;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use purifier_core::{run as run_purifier, PurifySettings};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GuiConfig {
    input_path: String,
    purify_hallow: bool,
}

fn config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir().or_else(dirs::data_dir)?;
    base.push("WorldPurifier");
    base.push("gui_config.json");
    Some(base)
}

fn load_config() -> GuiConfig {
    if let Some(path) = config_path() {
        if let Ok(data) = fs::read_to_string(&path) {
            match serde_json::from_str::<GuiConfig>(&data) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring unreadable {}: {e}", path.display()),
            }
        }
    }
    GuiConfig::default()
}

fn save_config(cfg: &GuiConfig) {
    if let Some(path) = config_path() {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Ok(data) = serde_json::to_string_pretty(cfg) {
            let _ = fs::write(path, data);
        }
    }
}

/// The game keeps worlds under Documents/My Games/Terraria/Worlds.
fn detect_worlds_dir() -> Option<PathBuf> {
    let dir = dirs::document_dir()?
        .join("My Games")
        .join("Terraria")
        .join("Worlds");
    dir.is_dir().then_some(dir)
}

struct PurifierApp {
    input_path: String,
    purify_hallow: bool,
    dry_run: bool,

    is_running: bool,
    log: String,
    result_rx: Option<mpsc::Receiver<String>>,
    start_time: Option<Instant>,
}

impl Default for PurifierApp {
    fn default() -> Self {
        let cfg = load_config();
        Self {
            input_path: cfg.input_path,
            purify_hallow: cfg.purify_hallow,
            dry_run: false,
            is_running: false,
            log: String::new(),
            result_rx: None,
            start_time: None,
        }
    }
}

impl PurifierApp {
    fn push_log(&mut self, line: &str) {
        if !self.log.is_empty() {
            self.log.push('\n');
        }
        self.log.push_str(line);
    }

    fn start(&mut self) {
        save_config(&GuiConfig {
            input_path: self.input_path.clone(),
            purify_hallow: self.purify_hallow,
        });

        let mut settings = PurifySettings::new(self.input_path.trim());
        settings.purify_hallow = self.purify_hallow;
        settings.dry_run = self.dry_run;

        let (tx, rx) = mpsc::channel();
        self.result_rx = Some(rx);
        self.is_running = true;
        self.start_time = Some(Instant::now());
        self.push_log(&format!("Purifying {}...", settings.input_path.display()));

        thread::spawn(move || {
            let message = match run_purifier(settings) {
                Ok(report) => {
                    let by = report.scan.by_biome;
                    let mut msg = format!(
                        "Purified {} of {} tile records (corruption {}, crimson {}, hallow {}).",
                        report.scan.tiles_purified,
                        report.scan.records,
                        by.corruption,
                        by.crimson,
                        by.hallow
                    );
                    match report.output_path {
                        Some(path) => msg.push_str(&format!("\nSaved to {}", path.display())),
                        None => msg.push_str("\nDry run; nothing was written."),
                    }
                    msg
                }
                Err(e) => format!("Purifier error: {e}"),
            };
            let _ = tx.send(message);
        });
    }
}

impl eframe::App for PurifierApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let finished: Vec<String> = self
            .result_rx
            .as_ref()
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default();
        for msg in finished {
            if let Some(start) = self.start_time.take() {
                self.push_log(&format!("Finished in {:.1}s", start.elapsed().as_secs_f32()));
            }
            self.push_log(&msg);
            self.is_running = false;
            self.result_rx = None;
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("World Purifier");
            ui.separator();

            ui.horizontal(|ui| {
                ui.label("World file:");
                ui.text_edit_singleline(&mut self.input_path);
                if ui.button("Browse...").clicked() {
                    let mut dialog = rfd::FileDialog::new().add_filter("World", &["wld"]);
                    if let Some(dir) = detect_worlds_dir() {
                        dialog = dialog.set_directory(dir);
                    }
                    if let Some(path) = dialog.pick_file() {
                        self.input_path = path.display().to_string();
                    }
                }
            });

            ui.checkbox(&mut self.purify_hallow, "Remove all traces of the hallow as well");
            ui.checkbox(&mut self.dry_run, "Dry run (only count infected tiles)");

            ui.separator();

            let can_run = !self.is_running && !self.input_path.trim().is_empty();
            ui.horizontal(|ui| {
                if ui.add_enabled(can_run, egui::Button::new("Purify")).clicked() {
                    self.start();
                }
                if self.is_running {
                    ui.spinner();
                }
            });

            ui.separator();
            ui.label("Log:");
            egui::ScrollArea::vertical()
                .id_source("log_scroll")
                .show(ui, |ui| {
                    ui.monospace(&self.log);
                });
        });

        if self.is_running {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([520.0, 360.0]),
        ..Default::default()
    };
    eframe::run_native(
        "World Purifier",
        native_options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Box::new(PurifierApp::default())
        }),
    )
}
