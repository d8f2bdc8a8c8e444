use crate::models::{DisplayBounds, WindowSize, WindowState};
use tauri::Monitor;

/// True when the whole rectangle sits inside `bounds`. A state without a
/// position is never contained.
pub fn within_bounds(state: &WindowState, bounds: &DisplayBounds) -> bool {
    let Some((x, y)) = state.position() else {
        return false;
    };
    let (x, y) = (i64::from(x), i64::from(y));
    let left = i64::from(bounds.x);
    let top = i64::from(bounds.y);

    x >= left
        && y >= top
        && x + i64::from(state.width) <= left + i64::from(bounds.width)
        && y + i64::from(state.height) <= top + i64::from(bounds.height)
}

/// `default_size` centered on `primary`.
pub fn centered_default(default_size: WindowSize, primary: &DisplayBounds) -> WindowState {
    let x = (i64::from(primary.width) - i64::from(default_size.width)) / 2;
    let y = (i64::from(primary.height) - i64::from(default_size.height)) / 2;
    WindowState::at(
        saturate_i32(x),
        saturate_i32(y),
        default_size.width,
        default_size.height,
    )
}

/// Keeps `candidate` if any display fully contains it, otherwise falls back to
/// the default size centered on the first display. With no displays at all the
/// position is dropped and the platform centers the window.
pub fn ensure_visible(
    candidate: WindowState,
    default_size: WindowSize,
    displays: &[DisplayBounds],
) -> WindowState {
    let Some(primary) = displays.first() else {
        return WindowState::from(default_size);
    };

    if displays.iter().any(|d| within_bounds(&candidate, d)) {
        return candidate;
    }

    centered_default(default_size, primary)
}

/// Physical bounds of a monitor, in the same space as `outer_position`.
pub fn display_bounds(monitor: &Monitor) -> DisplayBounds {
    let position = monitor.position();
    let size = monitor.size();
    DisplayBounds {
        x: position.x,
        y: position.y,
        width: size.width,
        height: size.height,
    }
}

/// Primary display first, then every other display once.
pub fn order_bounds(primary: Option<DisplayBounds>, all: &[DisplayBounds]) -> Vec<DisplayBounds> {
    let mut displays: Vec<DisplayBounds> = Vec::with_capacity(all.len() + 1);
    for bounds in primary.into_iter().chain(all.iter().copied()) {
        if !displays.contains(&bounds) {
            displays.push(bounds);
        }
    }
    displays
}

pub fn ordered_displays(primary: Option<&Monitor>, monitors: &[Monitor]) -> Vec<DisplayBounds> {
    let all: Vec<DisplayBounds> = monitors.iter().map(display_bounds).collect();
    order_bounds(primary.map(display_bounds), &all)
}

/// Logical window size to physical pixels on a display with `scale_factor`.
pub fn physical_size(size: WindowSize, scale_factor: f64) -> WindowSize {
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    };
    WindowSize {
        width: (f64::from(size.width) * scale).round() as u32,
        height: (f64::from(size.height) * scale).round() as u32,
    }
}

fn saturate_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
