//! Stock cursors and per-window cursor state.

pub use cursor_icon::CursorIcon;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The stock cursors a window can switch between.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StockCursor {
    #[default]
    Arrow,
    Input,
    Hand,
    Cross,
    Move,
    Wait,
}

impl From<StockCursor> for CursorIcon {
    fn from(cursor: StockCursor) -> Self {
        match cursor {
            StockCursor::Arrow => CursorIcon::Default,
            StockCursor::Input => CursorIcon::Text,
            StockCursor::Hand => CursorIcon::Pointer,
            StockCursor::Cross => CursorIcon::Crosshair,
            StockCursor::Move => CursorIcon::Move,
            StockCursor::Wait => CursorIcon::Wait,
        }
    }
}

/// What the pointer should look like over the client area.
///
/// The image and visibility change independently. Neither takes effect until the pointer
/// re-enters the client area, which the backend reports as a set-cursor notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub icon: CursorIcon,
    /// Set once a non-arrow cursor was chosen.
    pub forced: bool,
    pub visible: bool,
}

impl Default for CursorState {
    fn default() -> Self {
        Self { icon: CursorIcon::Default, forced: false, visible: true }
    }
}

impl CursorState {
    pub fn set_stock(&mut self, cursor: StockCursor) {
        self.icon = cursor.into();
        self.forced = cursor != StockCursor::Arrow;
    }

    /// The icon to apply, or `None` when the cursor is hidden.
    pub fn effective(&self) -> Option<CursorIcon> {
        self.visible.then_some(self.icon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_is_independent_of_image() {
        let mut state = CursorState::default();
        state.set_stock(StockCursor::Hand);
        assert!(state.forced);
        state.visible = false;
        assert_eq!(state.effective(), None);
        state.visible = true;
        assert_eq!(state.effective(), Some(CursorIcon::Pointer));
        state.set_stock(StockCursor::Arrow);
        assert!(!state.forced);
        assert_eq!(state.effective(), Some(CursorIcon::Default));
    }
}
