// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based ROI viewer
//!
//! Renders the camera feed to the terminal using Unicode half-block
//! characters, overlays the ROIs, and shows the last decode result.

use crate::app::frame_processor::tasks::UpscaleSettings;
use crate::app::frame_processor::{DecodeEngine, DecodeResult, DecodeWorker, Roi};
use crate::app::{Action, ControlLevels, Notice, RoiEditor};
use crate::backends::camera::{
    CameraControls, CameraProperty, CaptureSession, Frame, FrameSlot,
};
use crate::config::Config;
use crate::constants::{controls, roi, timing};
use crate::errors::{CameraError, DecodeError};
use crate::storage;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    style::Style, widgets::Widget,
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Run the terminal viewer
///
/// The ROI layout is written back to `config_path` on exit.
pub fn run(config: Config, config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut viewer = Viewer::new(config);

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut viewer);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let config = viewer.shutdown();
    if let Some(path) = config_path
        && let Err(e) = config.save(&path)
    {
        error!(error = %e, "Failed to save ROI layout");
        eprintln!("Could not save ROI layout: {}", e);
    }

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    viewer: &mut Viewer,
) -> Result<(), Box<dyn std::error::Error>> {
    viewer.apply(Action::ToggleCamera);

    loop {
        viewer.drain_results();
        viewer.expire_notice();

        let frame = viewer.slot.latest();
        terminal.draw(|f| {
            let area = f.area();

            // Bottom two lines: result and status
            let camera_area = Rect {
                height: area.height.saturating_sub(2),
                ..area
            };
            let result_area = Rect {
                y: area.y + area.height.saturating_sub(2),
                height: 1.min(area.height),
                ..area
            };
            let status_area = Rect {
                y: area.y + area.height.saturating_sub(1),
                height: 1.min(area.height),
                ..area
            };

            f.render_widget(
                FrameWidget {
                    frame: frame.as_deref(),
                    rois: viewer.editor.rois(),
                    selected: viewer.editor.selected(),
                },
                camera_area,
            );
            f.render_widget(
                StatusBar {
                    message: &viewer.result_line(),
                    color: Color::Black,
                },
                result_area,
            );
            let (status, color) = viewer.status_line();
            f.render_widget(
                StatusBar {
                    message: &status,
                    color,
                },
                status_area,
            );
        })?;

        // Handle input with timeout for frame updates
        if event::poll(timing::INPUT_POLL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Some(action) = key_action(key)
            && !viewer.apply(action)
        {
            break;
        }
    }

    Ok(())
}

/// Map a key press to an action
pub fn key_action(key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
        roi::FINE_STEP
    } else {
        roi::STEP
    };

    let action = match key.code {
        KeyCode::Char('c') if ctrl => Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('h') | KeyCode::Char('?') => Action::ToggleHelp,
        KeyCode::Char('o') => Action::ToggleCamera,
        KeyCode::Char(' ') | KeyCode::Enter => Action::Decode,
        KeyCode::Char('c') => Action::ToggleContinuous,
        KeyCode::Char('a') => Action::AddRoi,
        KeyCode::Char('x') | KeyCode::Delete => Action::RemoveRoi,
        KeyCode::Tab => Action::SelectNext,
        KeyCode::Char('p') => Action::SaveCrops,
        KeyCode::Char('[') => Action::Rotate(-roi::ROTATE_STEP_DEG),
        KeyCode::Char(']') => Action::Rotate(roi::ROTATE_STEP_DEG),
        KeyCode::Char('f') => Action::AdjustFocus(-controls::STEP),
        KeyCode::Char('F') => Action::AdjustFocus(controls::STEP),
        KeyCode::Char('b') => Action::AdjustBrightness(-controls::STEP),
        KeyCode::Char('B') => Action::AdjustBrightness(controls::STEP),
        KeyCode::Left if ctrl => Action::Resize(-step, 0),
        KeyCode::Right if ctrl => Action::Resize(step, 0),
        KeyCode::Up if ctrl => Action::Resize(0, -step),
        KeyCode::Down if ctrl => Action::Resize(0, step),
        KeyCode::Left => Action::Move(-step, 0),
        KeyCode::Right => Action::Move(step, 0),
        KeyCode::Up => Action::Move(0, -step),
        KeyCode::Down => Action::Move(0, step),
        _ => return None,
    };
    Some(action)
}

/// State owned by the running viewer
struct Viewer {
    config: Config,
    slot: Arc<FrameSlot>,
    session: Option<CaptureSession>,
    controls: CameraControls,
    worker: DecodeWorker,
    results: mpsc::UnboundedReceiver<DecodeResult>,
    editor: RoiEditor,
    levels: ControlLevels,
    last_result: Option<DecodeResult>,
    notice: Option<Notice>,
    show_help: bool,
}

impl Viewer {
    fn new(config: Config) -> Self {
        let engine = DecodeEngine::new(config.upscale.build());
        let (worker, results) = DecodeWorker::new(engine);
        let editor = RoiEditor::from_rois(config.rois.clone());
        worker.update_regions(editor.rois());

        info!(
            rois = editor.len(),
            upscale = upscale_label(&config.upscale),
            "Viewer ready"
        );

        Self {
            controls: CameraControls::for_device(config.device_index),
            slot: Arc::new(FrameSlot::new()),
            session: None,
            worker,
            results,
            editor,
            levels: ControlLevels::default(),
            last_result: None,
            notice: None,
            show_help: false,
            config,
        }
    }

    /// Apply an action; returns `false` when the viewer should exit
    fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return false,
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::ToggleCamera => {
                if self.session.is_some() {
                    self.stop_camera();
                } else {
                    self.open_camera();
                }
            }
            Action::Decode => self.decode_once(),
            Action::ToggleContinuous => self.toggle_continuous(),
            Action::AddRoi => {
                let index = self.editor.add_default();
                self.notice = Some(Notice::info(format!("Added ROI {}", index)));
            }
            Action::RemoveRoi => {
                if let Some(removed) = self.editor.remove_selected() {
                    self.notice = Some(Notice::info(format!("Removed ROI {}", removed)));
                }
            }
            Action::SelectNext => self.editor.select_next(),
            Action::Move(dx, dy) => self.editor.move_selected(dx, dy),
            Action::Resize(dw, dh) => self.editor.resize_selected(dw, dh),
            Action::Rotate(deg) => self.editor.rotate_selected(deg),
            Action::SaveCrops => self.save_crops(),
            Action::AdjustFocus(delta) => {
                let value = self.levels.step_focus(delta);
                self.set_control(CameraProperty::Focus, value);
            }
            Action::AdjustBrightness(delta) => {
                let value = self.levels.step_brightness(delta);
                self.set_control(CameraProperty::Brightness, value);
            }
        }

        self.worker.update_regions(self.editor.rois());
        true
    }

    fn open_camera(&mut self) {
        let requested = self.config.capture_settings();
        match CaptureSession::open_v4l2(requested, Arc::clone(&self.slot)) {
            Ok(session) => {
                let format = session.format();
                let notice = if format.width != requested.width
                    || format.height != requested.height
                    || format.framerate.is_some_and(|fps| fps != requested.framerate)
                {
                    format!(
                        "Camera running at {} (requested {}x{} @ {}fps)",
                        format, requested.width, requested.height, requested.framerate
                    )
                } else {
                    format!("Camera running at {}", format)
                };
                self.notice = Some(Notice::info(notice));
                self.session = Some(session);
            }
            Err(e) => {
                warn!(error = %e, "Failed to open camera");
                self.notice = Some(Notice::error(e.to_string()));
            }
        }
    }

    fn stop_camera(&mut self) {
        if self.worker.stop_continuous() {
            info!("Continuous decode stopped with the camera");
        }
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
        self.notice = Some(Notice::info("Camera stopped"));
    }

    fn decode_once(&mut self) {
        match self.worker.request(self.slot.latest(), self.editor.rois()) {
            Ok(()) => self.notice = Some(Notice::info("Decoding...")),
            Err(e) => self.notice = Some(Notice::info(e.to_string())),
        }
    }

    fn toggle_continuous(&mut self) {
        if self.worker.stop_continuous() {
            self.notice = Some(Notice::info("Continuous decoding off"));
            return;
        }
        if self.editor.is_empty() {
            self.notice = Some(Notice::info(DecodeError::NoRegions.to_string()));
            return;
        }
        self.worker.update_regions(self.editor.rois());
        match self
            .worker
            .start_continuous(Arc::clone(&self.slot), self.config.continuous_interval())
        {
            Ok(()) => self.notice = Some(Notice::info("Continuous decoding on")),
            Err(e) => self.notice = Some(Notice::info(e.to_string())),
        }
    }

    fn save_crops(&mut self) {
        if self.editor.is_empty() {
            self.notice = Some(Notice::info(DecodeError::NoRegions.to_string()));
            return;
        }
        let Some(frame) = self.slot.latest() else {
            self.notice = Some(Notice::info(DecodeError::NoFrame.to_string()));
            return;
        };

        let dir = self.config.output_dir();
        self.notice = Some(match storage::save_roi_crops(&frame, self.editor.rois(), &dir) {
            Ok(saved) => Notice::info(format!("Saved {} ROI(s) to {}", saved.len(), dir.display())),
            Err(e) => {
                error!(error = %e, "Failed to save ROI crops");
                Notice::error(e.to_string())
            }
        });
    }

    fn set_control(&mut self, property: CameraProperty, value: i32) {
        self.notice = Some(match self.controls.set(property, value) {
            Ok(actual) => Notice::info(format!("{} set to {}", property, actual)),
            Err(e @ CameraError::Unsupported(_)) => Notice::info(e.to_string()),
            Err(e) => Notice::error(e.to_string()),
        });
    }

    /// Keep only the newest result
    fn drain_results(&mut self) {
        while let Ok(result) = self.results.try_recv() {
            info!(summary = %result.summary(), "Decode result");
            self.last_result = Some(result);
        }
    }

    fn expire_notice(&mut self) {
        if self.notice.as_ref().is_some_and(Notice::is_expired) {
            self.notice = None;
        }
    }

    fn result_line(&self) -> String {
        match &self.last_result {
            Some(result) => format!(
                "{}  (frame {}, {} ms)",
                result.summary(),
                result.frame_sequence,
                result.elapsed_ms
            ),
            None => DecodeResult::default().summary(),
        }
    }

    fn status_line(&self) -> (String, Color) {
        if let Some(notice) = &self.notice {
            let color = if notice.is_error {
                Color::Red
            } else {
                Color::DarkGray
            };
            return (notice.text.clone(), color);
        }
        if self.show_help {
            return (HELP.to_string(), Color::DarkGray);
        }

        let camera = match &self.session {
            Some(session) if session.is_running() => session.format().to_string(),
            Some(_) => "camera stalled".to_string(),
            None => "camera off".to_string(),
        };
        let mode = if self.worker.is_continuous() {
            " | continuous"
        } else {
            ""
        };
        let selected = self
            .editor
            .selected_roi()
            .map(|r| format!(" | sel {}", r))
            .unwrap_or_default();
        (
            format!(
                "[{}{}] {} ROI(s){} | 'h' help | 'q' quit",
                camera,
                mode,
                self.editor.len(),
                selected
            ),
            Color::DarkGray,
        )
    }

    /// Stop everything and return the config with the current ROI layout
    fn shutdown(mut self) -> Config {
        self.worker.stop_continuous();
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
        self.config.rois = self.editor.rois().to_vec();
        self.config
    }
}

const HELP: &str = "o camera | space decode | c continuous | a add | x del | tab next | \
arrows move | ctrl+arrows size | [ ] rotate | p save | f/F focus | b/B bright | q quit";

fn upscale_label(settings: &UpscaleSettings) -> String {
    if settings.factor > 1 {
        format!("{}x {:?}", settings.factor, settings.filter)
    } else {
        "off".to_string()
    }
}

/// Mapping between frame pixels and terminal cells
///
/// Each cell shows two vertically stacked pixels, so the display works in
/// half-cell rows.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Viewport {
    x_offset: u16,
    y_offset: u16,
    /// Size in cells
    width: u16,
    height: u16,
    /// Frame pixels per cell column / half-cell row
    x_scale: f64,
    y_scale: f64,
}

impl Viewport {
    /// Fit a frame into `area`, keeping its aspect ratio
    fn fit(frame_width: u32, frame_height: u32, area: Rect) -> Option<Self> {
        if frame_width == 0 || frame_height == 0 || area.width == 0 || area.height == 0 {
            return None;
        }

        let frame_aspect = frame_width as f64 / frame_height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height as f64) * 2.0;

        let (width, height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let h = term_height;
            ((h * frame_aspect) as u16, (h / 2.0) as u16)
        } else {
            // Terminal is taller - fit to width
            let w = term_width;
            (w as u16, (w / frame_aspect / 2.0) as u16)
        };
        if width == 0 || height == 0 {
            return None;
        }

        Some(Self {
            x_offset: area.x + area.width.saturating_sub(width) / 2,
            y_offset: area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
            x_scale: frame_width as f64 / width as f64,
            y_scale: frame_height as f64 / (height as f64 * 2.0),
        })
    }

    /// Cell for a point in display coordinates
    fn cell_at(&self, x: f32, display_y: f32) -> Option<(u16, u16)> {
        let cx = (x as f64 / self.x_scale).floor();
        let cy = (display_y as f64 / self.y_scale / 2.0).floor();
        if cx < 0.0 || cy < 0.0 || cx >= self.width as f64 || cy >= self.height as f64 {
            return None;
        }
        Some((self.x_offset + cx as u16, self.y_offset + cy as u16))
    }
}

/// Renders a frame with half-block characters and ROI outlines on top
struct FrameWidget<'a> {
    frame: Option<&'a Frame>,
    rois: &'a [Roi],
    selected: Option<usize>,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame else {
            // No frame yet - show placeholder
            let msg = "Waiting for camera... ('o' to open)";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        let Some(view) = Viewport::fit(frame.width, frame.height, area) else {
            return;
        };

        // Each terminal cell represents 2 vertical pixels:
        // - Upper half (▀) colored with fg
        // - Lower half colored with bg
        for ty in 0..view.height {
            for tx in 0..view.width {
                let src_x = (tx as f64 * view.x_scale) as u32;
                let top = (ty as f64 * 2.0 * view.y_scale) as u32;
                let bottom = ((ty as f64 * 2.0 + 1.0) * view.y_scale) as u32;

                if let Some(cell) = buf.cell_mut((view.x_offset + tx, view.y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(frame, src_x, top));
                    cell.set_bg(sample_pixel(frame, src_x, bottom));
                }
            }
        }

        for (index, roi) in self.rois.iter().enumerate() {
            let color = if Some(index) == self.selected {
                Color::LightGreen
            } else {
                Color::Yellow
            };
            draw_roi(buf, &view, roi, index, color);
        }
    }
}

/// Sample at display coordinates, honouring the frame's row order
fn sample_pixel(frame: &Frame, x: u32, display_row: u32) -> Color {
    let x = x.min(frame.width.saturating_sub(1));
    let row = frame.buffer_row(display_row.min(frame.height.saturating_sub(1)));
    match frame.pixel(x, row) {
        Some([r, g, b]) => Color::Rgb(r, g, b),
        None => Color::Black,
    }
}

fn draw_roi(buf: &mut Buffer, view: &Viewport, roi: &Roi, index: usize, color: Color) {
    let corners = roi.corners();

    for i in 0..4 {
        let (x0, y0) = corners[i];
        let (x1, y1) = corners[(i + 1) % 4];
        // Step at half-cell resolution so no cell along the edge is skipped
        let span_cells = ((x1 - x0).abs() as f64 / view.x_scale)
            .max((y1 - y0).abs() as f64 / view.y_scale)
            .ceil()
            .max(1.0) as usize;
        for s in 0..=span_cells {
            let t = s as f32 / span_cells as f32;
            let point = (x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
            if let Some(pos) = view.cell_at(point.0, point.1)
                && let Some(cell) = buf.cell_mut(pos)
            {
                cell.set_char('█');
                cell.set_fg(color);
            }
        }
    }

    // Label at the on-screen top-left of the outline
    let label_point = corners
        .iter()
        .copied()
        .min_by(|a, b| (a.1, a.0).partial_cmp(&(b.1, b.0)).unwrap_or(std::cmp::Ordering::Equal));
    if let Some((x, y)) = label_point
        && let Some((cx, cy)) = view.cell_at(x, y)
    {
        buf.set_string(
            cx,
            cy,
            index.to_string(),
            Style::default().fg(Color::Black).bg(color),
        );
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    color: Color,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(self.color);
            }
        }

        // Render text, cut on a char boundary
        let text: String = self.message.chars().take(area.width as usize).collect();

        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(self.color),
        );
    }
}
