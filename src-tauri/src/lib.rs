mod commands;
mod core;
mod models;

use anyhow::Context;
use core::{AppConfig, AppLog, Bridge, DisplayStore, WindowLifecycle, WindowOptions};
use core::bridge::Subscription;
use parking_lot::Mutex;
use std::sync::Arc;
use tauri::{Manager, RunEvent};

const MAIN_WINDOW: &str = "main";
const MAIN_WINDOW_TITLE: &str = "UI Starter";
const MAIN_WINDOW_WIDTH: u32 = 1000;
const MAIN_WINDOW_HEIGHT: u32 = 600;

struct MessageHandler(Mutex<Option<Subscription>>);

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let config = AppConfig::from_process();
    let bridge = Bridge::new();

    tauri::Builder::default()
        .manage(Arc::clone(&bridge))
        .setup(move |app| {
            let app_handle = app.handle().clone();
            let log = AppLog::for_app(&app_handle, &config).map_err(anyhow::Error::msg)?;
            log.install_panic_hook();
            log.record(
                "info",
                "app",
                "startup",
                Some(serde_json::json!({
                    "production": config.is_production(),
                    "dev_port": config.dev_port,
                })),
            );

            let data_dir = app_handle
                .path()
                .app_data_dir()
                .context("Failed to resolve app data dir")?;
            let store = DisplayStore::new(config.data_dir(&data_dir));
            let lifecycle = WindowLifecycle::new(store, log.clone(), config);

            let message_handler = core::bridge::install_default_handlers(&bridge, log.clone())
                .map_err(anyhow::Error::msg)?;
            app.manage(MessageHandler(Mutex::new(Some(message_handler))));

            let url = config.content_url().map_err(anyhow::Error::msg)?;
            lifecycle
                .create(
                    &app_handle,
                    MAIN_WINDOW,
                    WindowOptions::new(MAIN_WINDOW_TITLE, MAIN_WINDOW_WIDTH, MAIN_WINDOW_HEIGHT, url),
                )
                .context("Failed to create main window")?;

            app.manage(lifecycle);
            app.manage(log);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![commands::bridge::bridge_send])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| {
            // Closing the last window exits the app; this only records it.
            if let RunEvent::Exit = event {
                if let Some(handler) = app_handle.try_state::<MessageHandler>() {
                    if let Some(sub) = handler.0.lock().take() {
                        sub.unsubscribe();
                    }
                }
                if let Some(log) = app_handle.try_state::<AppLog>() {
                    log.info("app", "exit");
                }
            }
        });
}
