use crate::core::bridge::Bridge;
use serde_json::Value;
use std::sync::Arc;
use tauri::{State, WebviewWindow};

// Synchronous on purpose: commands without `async` run on the main thread,
// which keeps messages from one webview in send order.
#[tauri::command]
pub fn bridge_send(
    window: WebviewWindow,
    bridge: State<'_, Arc<Bridge>>,
    channel: String,
    value: Value,
) -> Result<(), String> {
    bridge.dispatch(&channel, &value, &window)?;
    Ok(())
}
