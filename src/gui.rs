#![windows_subsystem = "windows"]

use collatz_viz::history::TABLE_COLUMNS;
use collatz_viz::playback::{MAX_FRAME_MS, MIN_FRAME_MS};
use collatz_viz::report::timestamp;
use collatz_viz::*;
use eframe::egui;
use egui_plot::{Line, Plot};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("collatz_gui=info,collatz_viz=warn")))
        .init();

    // 第1引数で設定ファイルを指定できる
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = match Config::load_or_default(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 700.0])
            .with_title("Collatz Conjecture"),
        ..Default::default()
    };
    eframe::run_native(
        "collatz-viz",
        options,
        Box::new(move |cc| {
            install_cjk_font(&cc.egui_ctx, config.gui.font.as_deref());
            Ok(Box::new(CollatzApp::new(config)))
        }),
    )
}

const CJK_FONT_CANDIDATES: [&str; 5] = [
    "C:\\Windows\\Fonts\\YuGothR.ttc",
    "C:\\Windows\\Fonts\\meiryo.ttc",
    "/System/Library/Fonts/ヒラギノ角ゴシック W3.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
];

/// 読めた最初のフォントファイル
fn first_readable_font(candidates: &[PathBuf]) -> Option<(PathBuf, Vec<u8>)> {
    candidates
        .iter()
        .find_map(|p| std::fs::read(p).ok().map(|data| (p.clone(), data)))
}

/// 設定のフォントを優先し、無ければ OS 標準の日本語フォントを探す
fn install_cjk_font(ctx: &egui::Context, configured: Option<&Path>) {
    let candidates: Vec<PathBuf> = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(CJK_FONT_CANDIDATES.iter().map(PathBuf::from))
        .collect();
    let Some((path, data)) = first_readable_font(&candidates) else {
        warn!("no CJK font found; Japanese labels may not render");
        return;
    };
    info!(font = %path.display(), "CJK font loaded");

    let mut fonts = egui::FontDefinitions::default();
    fonts.font_data.insert("cjk".to_owned(), egui::FontData::from_owned(data));
    fonts.families
        .entry(egui::FontFamily::Proportional)
        .or_default()
        .insert(0, "cjk".to_owned());
    fonts.families
        .entry(egui::FontFamily::Monospace)
        .or_default()
        .push("cjk".to_owned());
    ctx.set_fonts(fonts);
}

/// 表示中の 1 回分の結果
struct CurrentRun {
    playback: Playback,
    processing_time_us: f64,
    steps: u64,
}

struct CollatzApp {
    config: Config,
    dark_mode: bool,
    seed_input: String,
    frame_ms: u64,
    current: Option<CurrentRun>,
    history: History,
    error: Option<String>,
    save_message: Option<String>,
}

impl CollatzApp {
    fn new(config: Config) -> Self {
        Self {
            dark_mode: config.gui.dark_mode,
            frame_ms: config.gui.frame_ms(),
            seed_input: String::new(),
            current: None,
            history: History::new(),
            error: None,
            save_message: None,
            config,
        }
    }

    fn run(&mut self) {
        let seed = match Seed::from_raw(&RawValue::from(self.seed_input.as_str()), self.config.engine.coercion) {
            Ok(s) => s,
            Err(e) => {
                self.error = Some(e.to_string());
                return;
            }
        };
        match run_sequence(&seed, &self.config.sequence_options()) {
            Ok(trajectory) => {
                let entry = self.history.record(&trajectory);
                info!(seed = %seed, steps = entry.steps, "run recorded");
                self.current = Some(CurrentRun {
                    processing_time_us: entry.processing_time_us(),
                    steps: entry.steps,
                    playback: Playback::new(&trajectory, self.frame_ms, Instant::now()),
                });
                self.error = None;
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    fn save_history(&mut self) {
        let dir = self.config.output.dir.clone();
        self.save_message = Some(match write_history(&dir, &self.history) {
            Ok(path) => format!("保存: {}", path.display()),
            Err(e) => {
                warn!(error = %e, "could not save history");
                e.to_string()
            }
        });
    }

    // ─── 上部: 設定と入力 ──────────────────────
    fn ui_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Collatz Conjecture");
            ui.separator();
            if ui.checkbox(&mut self.dark_mode, "ダークモード").changed() {
                // 次フレームで反映
                ui.ctx().request_repaint();
            }
        });
        ui.separator();
        ui.horizontal(|ui| {
            ui.label("開始値 (整数):");
            let resp = ui.add(egui::TextEdit::singleline(&mut self.seed_input).desired_width(200.0));
            let entered = resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("実行").clicked() || entered {
                self.run();
            }
        });
        ui.horizontal(|ui| {
            ui.label(format!("描画間隔 {}-{} (ms):", MIN_FRAME_MS, MAX_FRAME_MS));
            let resp = ui.add(egui::DragValue::new(&mut self.frame_ms).range(MIN_FRAME_MS..=MAX_FRAME_MS));
            if resp.changed() {
                if let Some(run) = self.current.as_mut() {
                    run.playback.set_frame_ms(self.frame_ms);
                }
            }
            if let Some(run) = self.current.as_mut() {
                if ui.button("再生し直す").clicked() {
                    run.playback.restart(Instant::now());
                }
                if ui.button("全表示").clicked() {
                    run.playback.finish();
                }
            }
        });
        if let Some(ref err) = self.error {
            ui.colored_label(egui::Color32::from_rgb(220, 50, 50), err);
        }
    }

    // ─── 中央: 折れ線グラフ ──────────────────────
    fn ui_chart(&mut self, ui: &mut egui::Ui, height: f32) {
        let Some(run) = self.current.as_mut() else {
            ui.label("整数を入力するとグラフを描画します。");
            return;
        };

        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(format!("Processing Time: {:.3} us", run.processing_time_us)).strong());
            ui.separator();
            ui.label(egui::RichText::new(format!("Number Steps: {}", run.steps)).strong());
        });

        let points = run.playback.visible().to_vec();
        let x_max = run.playback.all_points().len() as f64;
        let y_max = run.playback.max_value();
        Plot::new("collatz_line")
            .height(height)
            .x_axis_label("Step #")
            .y_axis_label("Value")
            .include_x(1.0)
            .include_x(x_max)
            .include_y(0.0)
            .include_y(y_max)
            .show(ui, |plot_ui| {
                plot_ui.line(Line::new(points).name("CC"));
            });
    }

    // ─── 下部: 履歴テーブル ──────────────────────
    fn ui_history(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("履歴");
            ui.add_enabled_ui(!self.history.is_empty(), |ui| {
                if ui.button("CSV保存").clicked() {
                    self.save_history();
                }
            });
            if let Some(ref msg) = self.save_message {
                ui.colored_label(egui::Color32::GREEN, msg);
            }
        });
        egui::ScrollArea::vertical().id_salt("history_scroll").show(ui, |ui| {
            egui::Grid::new("history_grid").striped(true).show(ui, |ui| {
                for col in TABLE_COLUMNS {
                    ui.strong(col);
                }
                ui.end_row();
                for entry in &self.history {
                    for cell in History::row_strings(entry) {
                        ui.label(cell);
                    }
                    ui.end_row();
                }
            });
        });
    }
}

impl eframe::App for CollatzApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(if self.dark_mode { egui::Visuals::dark() } else { egui::Visuals::light() });

        let now = Instant::now();
        if let Some(run) = self.current.as_mut() {
            run.playback.advance(now);
            if let Some(wait) = run.playback.time_until_next(now) {
                ctx.request_repaint_after(wait);
            }
        }

        egui::TopBottomPanel::top("controls").show(ctx, |ui| self.ui_controls(ui));
        egui::TopBottomPanel::bottom("history")
            .resizable(true)
            .default_height(180.0)
            .show(ctx, |ui| self.ui_history(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            let height = (ui.available_height() - 30.0).max(100.0);
            self.ui_chart(ui, height);
        });
    }
}

fn write_history(dir: &Path, history: &History) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("gui_history_{}.csv", timestamp()));
    history.write_csv(BufWriter::new(File::create(&path)?))?;
    Ok(path)
}
