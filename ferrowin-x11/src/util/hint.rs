use std::ffi::c_long;
use std::mem;

use x11_dl::xlib;

use crate::xdisplay::{XConnection, XError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOperation {
    Remove = 0, // _NET_WM_STATE_REMOVE
    Add = 1,    // _NET_WM_STATE_ADD
}

impl From<bool> for StateOperation {
    fn from(op: bool) -> Self {
        if op {
            StateOperation::Add
        } else {
            StateOperation::Remove
        }
    }
}

#[allow(dead_code)]
mod mwm {
    // Motif WM hints are obsolete, but still widely supported.
    // https://stackoverflow.com/a/1909708
    pub const MWM_HINTS_FUNCTIONS: u32 = 1 << 0;
    pub const MWM_HINTS_DECORATIONS: u32 = 1 << 1;

    pub const MWM_FUNC_ALL: u32 = 1 << 0;
    pub const MWM_FUNC_RESIZE: u32 = 1 << 1;
    pub const MWM_FUNC_MOVE: u32 = 1 << 2;
    pub const MWM_FUNC_MINIMIZE: u32 = 1 << 3;
    pub const MWM_FUNC_MAXIMIZE: u32 = 1 << 4;
    pub const MWM_FUNC_CLOSE: u32 = 1 << 5;

    pub const MWM_DECOR_ALL: u32 = 1 << 0;
    pub const MWM_DECOR_BORDER: u32 = 1 << 1;
    pub const MWM_DECOR_RESIZEH: u32 = 1 << 2;
    pub const MWM_DECOR_TITLE: u32 = 1 << 3;
}

/// The `_MOTIF_WM_HINTS` property of a window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MotifHints {
    flags: u32,
    functions: u32,
    decorations: u32,
    input_mode: u32,
    status: u32,
}

impl MotifHints {
    pub fn new() -> MotifHints {
        MotifHints::default()
    }

    /// Hints for a window decorated according to its style. Without `titlebar` the window
    /// keeps no decorations at all.
    pub fn decorated(titlebar: bool, resizable: bool, closable: bool) -> MotifHints {
        let mut hints = MotifHints::new();
        if titlebar {
            let mut decorations = mwm::MWM_DECOR_BORDER | mwm::MWM_DECOR_TITLE;
            if resizable {
                decorations |= mwm::MWM_DECOR_RESIZEH;
            }
            hints.set_decorations_mask(decorations);
        } else {
            hints.set_decorations(false);
        }
        hints.set_resizable(resizable);
        hints.set_closable(closable);
        hints
    }

    pub fn set_decorations(&mut self, decorations: bool) {
        self.set_decorations_mask(if decorations { mwm::MWM_DECOR_ALL } else { 0 });
    }

    fn set_decorations_mask(&mut self, mask: u32) {
        self.flags |= mwm::MWM_HINTS_DECORATIONS;
        self.decorations = mask;
    }

    pub fn set_resizable(&mut self, resizable: bool) {
        if resizable {
            self.add_func(mwm::MWM_FUNC_RESIZE);
            self.add_func(mwm::MWM_FUNC_MAXIMIZE);
        } else {
            self.remove_func(mwm::MWM_FUNC_RESIZE);
            self.remove_func(mwm::MWM_FUNC_MAXIMIZE);
        }
    }

    pub fn set_closable(&mut self, closable: bool) {
        if closable {
            self.add_func(mwm::MWM_FUNC_CLOSE);
        } else {
            self.remove_func(mwm::MWM_FUNC_CLOSE);
        }
    }

    fn add_func(&mut self, func: u32) {
        if self.flags & mwm::MWM_HINTS_FUNCTIONS != 0 {
            if self.functions & mwm::MWM_FUNC_ALL != 0 {
                self.functions &= !func;
            } else {
                self.functions |= func;
            }
        }
    }

    fn remove_func(&mut self, func: u32) {
        if self.flags & mwm::MWM_HINTS_FUNCTIONS == 0 {
            self.flags |= mwm::MWM_HINTS_FUNCTIONS;
            self.functions = mwm::MWM_FUNC_ALL;
        }

        if self.functions & mwm::MWM_FUNC_ALL != 0 {
            self.functions |= func;
        } else {
            self.functions &= !func;
        }
    }

    fn as_property(&self) -> [c_long; 5] {
        [
            self.flags as c_long,
            self.functions as c_long,
            self.decorations as c_long,
            self.input_mode as c_long,
            self.status as c_long,
        ]
    }
}

impl XConnection {
    pub fn set_motif_hints(&self, window: xlib::Window, hints: &MotifHints) -> Result<(), XError> {
        let property = self.atoms._MOTIF_WM_HINTS;
        let data = hints.as_property();
        unsafe {
            (self.xlib.XChangeProperty)(
                self.display,
                window,
                property,
                property,
                32,
                xlib::PropModeReplace,
                data.as_ptr().cast(),
                data.len() as i32,
            )
        };
        self.flush_requests()
    }

    /// Ask the window manager to add or remove a `_NET_WM_STATE` entry.
    pub fn set_net_wm_state(
        &self,
        window: xlib::Window,
        operation: StateOperation,
        property: xlib::Atom,
    ) -> Result<(), XError> {
        let mut event: xlib::XClientMessageEvent = unsafe { mem::zeroed() };
        event.type_ = xlib::ClientMessage;
        event.window = window;
        event.message_type = self.atoms._NET_WM_STATE;
        event.format = 32;
        event.data.set_long(0, operation as c_long);
        event.data.set_long(1, property as c_long);
        // Source indication: a normal application.
        event.data.set_long(3, 1);
        let mut event = xlib::XEvent { client_message: event };
        unsafe {
            (self.xlib.XSendEvent)(
                self.display,
                self.root,
                xlib::False,
                xlib::SubstructureRedirectMask | xlib::SubstructureNotifyMask,
                &mut event,
            )
        };
        self.flush_requests()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undecorated_window() {
        let hints = MotifHints::decorated(false, true, true);
        let [flags, _, decorations, ..] = hints.as_property();
        assert_eq!(flags as u32 & mwm::MWM_HINTS_DECORATIONS, mwm::MWM_HINTS_DECORATIONS);
        assert_eq!(decorations, 0);
    }

    #[test]
    fn fixed_size_window_loses_resize_functions() {
        let hints = MotifHints::decorated(true, false, true);
        let [flags, functions, decorations, ..] = hints.as_property();
        assert_eq!(flags as u32, mwm::MWM_HINTS_FUNCTIONS | mwm::MWM_HINTS_DECORATIONS);
        // With MWM_FUNC_ALL set the listed functions are the removed ones.
        assert_eq!(
            functions as u32,
            mwm::MWM_FUNC_ALL | mwm::MWM_FUNC_RESIZE | mwm::MWM_FUNC_MAXIMIZE
        );
        assert_eq!(decorations as u32, mwm::MWM_DECOR_BORDER | mwm::MWM_DECOR_TITLE);
    }

    #[test]
    fn default_style_keeps_every_function() {
        let hints = MotifHints::decorated(true, true, true);
        let [flags, functions, ..] = hints.as_property();
        assert_eq!(flags as u32, mwm::MWM_HINTS_DECORATIONS);
        assert_eq!(functions, 0);
        assert_eq!(StateOperation::from(true), StateOperation::Add);
    }
}
