use serde::{Deserialize, Serialize};

/// Last-known outer placement of a window, in physical pixels.
///
/// `x`/`y` are absent until the window has been captured once, in which case
/// the platform decides where to put it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    pub width: u32,
    pub height: u32,
}

impl WindowState {
    pub fn at(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            width,
            height,
        }
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        self.x.zip(self.y)
    }

    pub fn size(&self) -> WindowSize {
        WindowSize {
            width: self.width,
            height: self.height,
        }
    }
}

impl From<WindowSize> for WindowState {
    fn from(size: WindowSize) -> Self {
        Self {
            x: None,
            y: None,
            width: size.width,
            height: size.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

/// Bounds of one connected display, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}
