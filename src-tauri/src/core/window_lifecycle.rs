use crate::core::app_config::AppConfig;
use crate::core::app_log::AppLog;
use crate::core::bounds;
use crate::core::bridge::BRIDGE_SCRIPT;
use crate::core::display_store::{validate_window_name, DisplayStore};
use crate::models::{DisplayBounds, WindowSize, WindowState};
use anyhow::Context;
use parking_lot::Mutex;
use std::sync::Arc;
use tauri::{
    AppHandle, PhysicalPosition, PhysicalSize, Position, Runtime, Size, WebviewUrl, WebviewWindow,
    WebviewWindowBuilder, WindowEvent,
};

/// Live outer geometry of a platform window, in physical pixels.
pub trait WindowGeometry {
    fn physical_position(&self) -> Option<(i32, i32)>;
    fn physical_size(&self) -> Option<(u32, u32)>;
    fn minimized(&self) -> bool;
    fn maximized(&self) -> bool;
}

impl<R: Runtime> WindowGeometry for WebviewWindow<R> {
    fn physical_position(&self) -> Option<(i32, i32)> {
        let pos = self.outer_position().ok()?;
        Some((pos.x, pos.y))
    }

    fn physical_size(&self) -> Option<(u32, u32)> {
        let size = self.outer_size().ok()?;
        Some((size.width, size.height))
    }

    fn minimized(&self) -> bool {
        self.is_minimized().unwrap_or(false)
    }

    fn maximized(&self) -> bool {
        self.is_maximized().unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    /// Default size in logical pixels; scaled by the primary display.
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    pub min_size: Option<WindowSize>,
    pub url: WebviewUrl,
    /// `None` keeps the default: devtools only outside production.
    pub devtools: Option<bool>,
}

impl WindowOptions {
    pub fn new(title: impl Into<String>, width: u32, height: u32, url: WebviewUrl) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            resizable: true,
            min_size: None,
            url,
            devtools: None,
        }
    }

    pub fn default_size(&self) -> WindowSize {
        WindowSize {
            width: self.width,
            height: self.height,
        }
    }
}

/// Geometry and webview flags resolved before the window exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub position: Option<(i32, i32)>,
    /// Outer size in physical pixels.
    pub size: WindowSize,
    pub devtools: bool,
}

pub fn plan(state: &WindowState, options: &WindowOptions, config: &AppConfig) -> WindowPlan {
    WindowPlan {
        position: state.position(),
        size: state.size(),
        devtools: options.devtools.unwrap_or(!config.is_production()),
    }
}

/// Inner size that yields `outer` once the frame (outer minus inner) is added back.
pub fn inner_for_outer(outer: WindowSize, frame: (u32, u32)) -> WindowSize {
    WindowSize {
        width: outer.width.saturating_sub(frame.0).max(1),
        height: outer.height.saturating_sub(frame.1).max(1),
    }
}

pub fn capture_current(window: &impl WindowGeometry) -> Option<WindowState> {
    let (x, y) = window.physical_position()?;
    let (width, height) = window.physical_size()?;
    Some(WindowState::at(x, y, width, height))
}

fn apply_plan<R: Runtime>(window: &WebviewWindow<R>, plan: &WindowPlan) -> tauri::Result<()> {
    let Some((x, y)) = plan.position else {
        return window.center();
    };

    let outer = window.outer_size()?;
    let inner = window.inner_size()?;
    let frame = (
        outer.width.saturating_sub(inner.width),
        outer.height.saturating_sub(inner.height),
    );
    let size = inner_for_outer(plan.size, frame);
    window.set_size(Size::Physical(PhysicalSize {
        width: size.width,
        height: size.height,
    }))?;
    window.set_position(Position::Physical(PhysicalPosition { x, y }))
}

/// Restores, validates, and persists window placement through a `DisplayStore`.
#[derive(Debug, Clone)]
pub struct WindowLifecycle {
    store: DisplayStore,
    log: AppLog,
    config: AppConfig,
}

impl WindowLifecycle {
    pub fn new(store: DisplayStore, log: AppLog, config: AppConfig) -> Self {
        Self { store, log, config }
    }

    #[cfg(test)]
    pub fn store(&self) -> &DisplayStore {
        &self.store
    }

    /// Unreadable records are logged and treated like a first run.
    pub fn restore(&self, window_name: &str, default_size: WindowSize) -> WindowState {
        match self.store.load(window_name) {
            Ok(Some(state)) => state,
            Ok(None) => WindowState::from(default_size),
            Err(e) => {
                self.log.warn(
                    "window_state",
                    "restore_failed",
                    Some(serde_json::json!({ "window": window_name, "error": e.to_string() })),
                );
                WindowState::from(default_size)
            }
        }
    }

    pub fn ensure_visible(
        &self,
        candidate: WindowState,
        default_size: WindowSize,
        displays: &[DisplayBounds],
    ) -> WindowState {
        let state = bounds::ensure_visible(candidate, default_size, displays);
        if state != candidate && candidate.position().is_some() {
            self.log.info("window_state", "reset_offscreen_window");
        }
        state
    }

    /// Minimized or maximized windows keep their last normal rectangle.
    pub fn on_close(&self, window_name: &str, window: &impl WindowGeometry, state: &mut WindowState) {
        if !window.minimized() && !window.maximized() {
            if let Some(current) = capture_current(window) {
                *state = current;
            }
        }

        if let Err(e) = self.store.save(window_name, state) {
            self.log.error(
                "window_state",
                "save_failed",
                Some(serde_json::json!({ "window": window_name, "error": e.to_string() })),
            );
        }
    }

    /// Builds the window hidden, moves it to the restored physical rectangle,
    /// then shows it.
    pub fn create<R: Runtime>(
        &self,
        app: &AppHandle<R>,
        window_name: &str,
        options: WindowOptions,
    ) -> anyhow::Result<WebviewWindow<R>> {
        validate_window_name(window_name).map_err(anyhow::Error::msg)?;

        let primary = app.primary_monitor().ok().flatten();
        let monitors = app.available_monitors().unwrap_or_default();
        let displays = bounds::ordered_displays(primary.as_ref(), &monitors);
        let scale_factor = primary.as_ref().map_or(1.0, |m| m.scale_factor());
        let default_size = bounds::physical_size(options.default_size(), scale_factor);

        let restored = self.restore(window_name, default_size);
        let state = self.ensure_visible(restored, default_size, &displays);
        let plan = plan(&state, &options, &self.config);

        let mut builder = WebviewWindowBuilder::new(app, window_name, options.url.clone())
            .title(options.title.clone())
            .inner_size(f64::from(options.width), f64::from(options.height))
            .resizable(options.resizable)
            .devtools(plan.devtools)
            .visible(false)
            .initialization_script(BRIDGE_SCRIPT);
        if let Some(min) = options.min_size {
            builder = builder.min_inner_size(f64::from(min.width), f64::from(min.height));
        }
        let window = builder
            .build()
            .with_context(|| format!("Failed to build window {}", window_name))?;

        if let Err(e) = apply_plan(&window, &plan) {
            self.log.warn(
                "window_state",
                "apply_failed",
                Some(serde_json::json!({ "window": window_name, "error": e.to_string() })),
            );
        }
        window.show().context("Failed to show window")?;

        let tracked = Arc::new(TrackedWindow {
            name: window_name.to_string(),
            window: window.clone(),
            state: Mutex::new(state),
            lifecycle: self.clone(),
        });
        window.on_window_event(move |event| {
            if let WindowEvent::CloseRequested { .. } = event {
                tracked.close();
            }
        });

        Ok(window)
    }
}

/// A created window bound to the state it was restored with.
pub struct TrackedWindow<R: Runtime> {
    name: String,
    window: WebviewWindow<R>,
    state: Mutex<WindowState>,
    lifecycle: WindowLifecycle,
}

impl<R: Runtime> TrackedWindow<R> {
    fn close(&self) {
        let mut state = self.state.lock();
        self.lifecycle.on_close(&self.name, &self.window, &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app_config::RunMode;
    use std::path::PathBuf;

    const DEFAULT: WindowSize = WindowSize {
        width: 1000,
        height: 600,
    };

    struct FakeWindow {
        position: Option<(i32, i32)>,
        size: Option<(u32, u32)>,
        minimized: bool,
        maximized: bool,
    }

    impl FakeWindow {
        fn normal(x: i32, y: i32, width: u32, height: u32) -> Self {
            Self {
                position: Some((x, y)),
                size: Some((width, height)),
                minimized: false,
                maximized: false,
            }
        }
    }

    impl WindowGeometry for FakeWindow {
        fn physical_position(&self) -> Option<(i32, i32)> {
            self.position
        }

        fn physical_size(&self) -> Option<(u32, u32)> {
            self.size
        }

        fn minimized(&self) -> bool {
            self.minimized
        }

        fn maximized(&self) -> bool {
            self.maximized
        }
    }

    fn lifecycle(dir: &tempfile::TempDir, mode: RunMode) -> WindowLifecycle {
        WindowLifecycle::new(
            DisplayStore::new(dir.path().join("store")),
            AppLog::new(dir.path().join("logs")),
            AppConfig {
                mode,
                dev_port: 8888,
            },
        )
    }

    fn log_contents(dir: &tempfile::TempDir) -> String {
        std::fs::read_to_string(dir.path().join("logs").join("app.log.jsonl")).unwrap_or_default()
    }

    #[test]
    fn first_run_restores_default_size_without_position() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lc = lifecycle(&dir, RunMode::Production);

        let state = lc.restore("main", DEFAULT);
        assert_eq!(state, WindowState::from(DEFAULT));
        assert_eq!(state.x, None);
        assert_eq!(state.y, None);
    }

    #[test]
    fn close_then_restore_round_trips_rectangle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lc = lifecycle(&dir, RunMode::Production);

        let mut state = lc.restore("main", DEFAULT);
        lc.on_close("main", &FakeWindow::normal(10, 20, 800, 600), &mut state);

        assert_eq!(state, WindowState::at(10, 20, 800, 600));
        assert_eq!(lc.restore("main", DEFAULT), WindowState::at(10, 20, 800, 600));
    }

    #[test]
    fn maximized_close_keeps_previous_rectangle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lc = lifecycle(&dir, RunMode::Production);
        let mut state = lc.restore("main", DEFAULT);
        lc.on_close("main", &FakeWindow::normal(10, 20, 800, 600), &mut state);

        let mut state = lc.restore("main", DEFAULT);
        let maximized = FakeWindow {
            maximized: true,
            ..FakeWindow::normal(0, 0, 1920, 1080)
        };
        lc.on_close("main", &maximized, &mut state);

        assert_eq!(lc.restore("main", DEFAULT), WindowState::at(10, 20, 800, 600));
    }

    #[test]
    fn minimized_close_still_persists_current_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lc = lifecycle(&dir, RunMode::Production);
        let mut state = WindowState::at(300, 200, 1000, 600);
        let minimized = FakeWindow {
            minimized: true,
            ..FakeWindow::normal(-32000, -32000, 160, 28)
        };

        lc.on_close("main", &minimized, &mut state);

        assert_eq!(
            lc.store().load("main").expect("load"),
            Some(WindowState::at(300, 200, 1000, 600))
        );
    }

    #[test]
    fn unreadable_geometry_leaves_state_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lc = lifecycle(&dir, RunMode::Production);
        let mut state = WindowState::at(5, 5, 640, 480);
        let broken = FakeWindow {
            position: None,
            ..FakeWindow::normal(0, 0, 1, 1)
        };

        lc.on_close("main", &broken, &mut state);
        assert_eq!(state, WindowState::at(5, 5, 640, 480));
    }

    #[test]
    fn windows_are_stored_independently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lc = lifecycle(&dir, RunMode::Production);
        let mut main = lc.restore("main", DEFAULT);
        let mut about = lc.restore("about", DEFAULT);

        lc.on_close("main", &FakeWindow::normal(10, 20, 800, 600), &mut main);
        lc.on_close("about", &FakeWindow::normal(50, 60, 400, 300), &mut about);

        assert_eq!(lc.restore("main", DEFAULT), WindowState::at(10, 20, 800, 600));
        assert_eq!(lc.restore("about", DEFAULT), WindowState::at(50, 60, 400, 300));
    }

    #[test]
    fn corrupt_record_falls_back_to_default_and_warns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lc = lifecycle(&dir, RunMode::Production);
        std::fs::create_dir_all(lc.store().dir()).expect("mkdir");
        std::fs::write(lc.store().path_for("main").expect("path"), b"[1, 2").expect("seed");

        assert_eq!(lc.restore("main", DEFAULT), WindowState::from(DEFAULT));
        assert!(log_contents(&dir).contains("restore_failed"));
    }

    #[test]
    fn failed_save_is_logged_not_raised() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A regular file where the store directory should be.
        let blocker = dir.path().join("store");
        std::fs::write(&blocker, b"").expect("seed");
        let lc = lifecycle(&dir, RunMode::Production);
        let mut state = WindowState::from(DEFAULT);

        lc.on_close("main", &FakeWindow::normal(1, 2, 300, 200), &mut state);

        assert_eq!(state, WindowState::at(1, 2, 300, 200));
        assert!(log_contents(&dir).contains("save_failed"));
    }

    #[test]
    fn restored_then_validated_offscreen_window_is_centered() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lc = lifecycle(&dir, RunMode::Production);
        lc.store()
            .save("main", &WindowState::at(4000, 100, 800, 600))
            .expect("seed");
        let displays = [DisplayBounds {
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
        }];

        let restored = lc.restore("main", DEFAULT);
        let state = lc.ensure_visible(restored, DEFAULT, &displays);

        assert_eq!(state, WindowState::at(460, 240, 1000, 600));
        assert!(log_contents(&dir).contains("reset_offscreen_window"));
    }

    #[test]
    fn plan_prefers_stored_geometry_and_mode_devtools() {
        let url = WebviewUrl::App(PathBuf::from("index.html"));
        let options = WindowOptions::new("Main", 1000, 600, url);
        let prod = AppConfig {
            mode: RunMode::Production,
            dev_port: 8888,
        };
        let dev = AppConfig {
            mode: RunMode::Development,
            dev_port: 8888,
        };
        let stored = WindowState::at(10, 20, 800, 600);

        let p = plan(&stored, &options, &prod);
        assert_eq!(p.position, Some((10, 20)));
        assert_eq!(
            p.size,
            WindowSize {
                width: 800,
                height: 600
            }
        );
        assert!(!p.devtools);
        assert!(plan(&stored, &options, &dev).devtools);

        let forced = WindowOptions {
            devtools: Some(true),
            ..options
        };
        assert!(plan(&WindowState::from(DEFAULT), &forced, &prod).devtools);
        assert_eq!(plan(&WindowState::from(DEFAULT), &forced, &prod).position, None);
    }

    #[test]
    fn outer_size_is_restored_through_the_frame() {
        let outer = WindowSize {
            width: 1616,
            height: 939,
        };
        assert_eq!(
            inner_for_outer(outer, (16, 39)),
            WindowSize {
                width: 1600,
                height: 900
            }
        );
        assert_eq!(inner_for_outer(outer, (0, 0)), outer);
        assert_eq!(
            inner_for_outer(WindowSize { width: 10, height: 10 }, (20, 40)),
            WindowSize { width: 1, height: 1 }
        );
    }

    #[test]
    fn physical_capture_survives_mixed_scale_round_trip() {
        // Window on a 200% display at the right of a 100% display.
        let dir = tempfile::tempdir().expect("tempdir");
        let lc = lifecycle(&dir, RunMode::Production);
        let mut state = lc.restore("main", DEFAULT);
        lc.on_close("main", &FakeWindow::normal(3000, 100, 2000, 1200), &mut state);

        let displays = [
            DisplayBounds {
                x: 0,
                y: 0,
                width: 2560,
                height: 1440,
            },
            DisplayBounds {
                x: 2560,
                y: 0,
                width: 3840,
                height: 2160,
            },
        ];
        let restored = lc.restore("main", DEFAULT);
        assert_eq!(
            lc.ensure_visible(restored, DEFAULT, &displays),
            WindowState::at(3000, 100, 2000, 1200)
        );
        assert!(!log_contents(&dir).contains("reset_offscreen_window"));
    }

    #[test]
    fn invalid_window_name_is_not_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lc = lifecycle(&dir, RunMode::Production);
        let mut state = WindowState::from(DEFAULT);

        lc.on_close("a.b", &FakeWindow::normal(1, 2, 300, 200), &mut state);

        assert!(log_contents(&dir).contains("save_failed"));
        assert_eq!(lc.restore("a_b", DEFAULT), WindowState::from(DEFAULT));
    }
}
