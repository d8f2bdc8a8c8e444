pub mod app_config;
pub mod app_log;
pub mod bounds;
pub mod bridge;
pub mod display_store;
pub mod window_lifecycle;

pub use app_config::AppConfig;
pub use app_log::AppLog;
pub use bridge::Bridge;
pub use display_store::DisplayStore;
pub use window_lifecycle::{WindowLifecycle, WindowOptions};
