use std::path::Path;

use cursor_icon::CursorIcon;
use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::backend::NativeWindow;
use ferrowin_core::error::{ConfigError, RequestError};
use ferrowin_core::os_error;
use ferrowin_core::window::{Rect, WindowAttributes, WindowStyle};
use objc2::rc::Retained;
use objc2::runtime::ProtocolObject;
use objc2::{define_class, msg_send, ClassType, MainThreadOnly};
use objc2_app_kit::{
    NSApplicationPresentationOptions, NSBackingStoreType, NSCursor, NSImage, NSImageView,
    NSResponder, NSView, NSWindow, NSWindowStyleMask,
};
use objc2_foundation::{NSObject, NSPoint, NSString};
use tracing::{debug, warn};

use crate::app::{AppKitBackend, WindowEntry};
use crate::cursor::cursor_from_icon;
use crate::ffi;
use crate::monitor;
use crate::window_delegate::WindowDelegate;

// NSWindowLevel
const NORMAL_LEVEL: isize = 0;
const FLOATING_LEVEL: isize = 3;
/// Just above the menu bar.
const FULLSCREEN_LEVEL: isize = 25;

define_class!(
    #[unsafe(super(NSWindow, NSResponder, NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "FerrowinWindow"]
    #[derive(Debug)]
    pub(crate) struct FerrowinWindow;

    // Borderless windows only take the keyboard when they say so.
    impl FerrowinWindow {
        #[unsafe(method(canBecomeMainWindow))]
        fn can_become_main_window(&self) -> bool {
            true
        }

        #[unsafe(method(canBecomeKeyWindow))]
        fn can_become_key_window(&self) -> bool {
            true
        }
    }
);

/// `+[NSCursor hide]` and `+[NSCursor unhide]` nest; calls must stay balanced.
pub(crate) fn set_cursor_hidden(hidden: bool) {
    let class = NSCursor::class();
    if hidden {
        let _: () = unsafe { msg_send![class, hide] };
    } else {
        let _: () = unsafe { msg_send![class, unhide] };
    }
}

pub(crate) fn style_mask(style: WindowStyle) -> NSWindowStyleMask {
    let mut mask = NSWindowStyleMask::Borderless;
    if style.contains(WindowStyle::TITLEBAR) {
        mask |= NSWindowStyleMask::Titled | NSWindowStyleMask::Miniaturizable;
    }
    if style.contains(WindowStyle::RESIZE) {
        mask |= NSWindowStyleMask::Resizable;
    }
    // The close button lives in the title bar.
    if style.contains(WindowStyle::CLOSE) {
        mask |= NSWindowStyleMask::Titled | NSWindowStyleMask::Closable;
    }
    mask
}

impl AppKitBackend {
    pub(crate) fn window(&self, handle: isize) -> Option<Retained<NSWindow>> {
        let window = self.windows.borrow().get(&handle).map(|entry| entry.window.clone());
        if window.is_none() {
            warn!(handle, "unknown window");
        }
        window
    }

    pub(crate) fn create_window(
        &self,
        attributes: &WindowAttributes,
        rect: Rect,
        bpp: u16,
    ) -> Result<NativeWindow<isize>, RequestError> {
        if attributes.caption.contains('\0') {
            return Err(ConfigError::InvalidCaption.into());
        }
        let style = attributes.style;
        let fullscreen = style.contains(WindowStyle::FULLSCREEN);
        let mask = if fullscreen { NSWindowStyleMask::Borderless } else { style_mask(style) };
        let content_rect = monitor::to_ns_rect(rect, monitor::primary_height(self.mtm));
        debug!(?rect, bpp, "initWithContentRect:styleMask:backing:defer:");

        let window: Retained<FerrowinWindow> = unsafe {
            msg_send![
                FerrowinWindow::alloc(self.mtm),
                initWithContentRect: content_rect,
                styleMask: mask,
                backing: NSBackingStoreType::Buffered,
                defer: false,
            ]
        };
        let window = Retained::into_super(window);
        unsafe { window.setReleasedWhenClosed(false) };
        window.setTitle(&NSString::from_str(&attributes.caption));
        window.setAcceptsMouseMovedEvents(true);
        if fullscreen {
            window.setLevel(FULLSCREEN_LEVEL);
        }

        let number = window.windowNumber();
        if number <= 0 {
            window.close();
            return Err(os_error!("the window server assigned no window number").into());
        }
        let delegate = WindowDelegate::new(&window, number, self.queue.clone());
        window.setDelegate(Some(ProtocolObject::from_ref(&*delegate)));

        // A splash screen shows its window once the image is in place.
        if !style.contains(WindowStyle::HIDDEN) && attributes.splash.is_none() {
            window.makeKeyAndOrderFront(None);
        }

        let primary_height = monitor::primary_height(self.mtm);
        let frame = window.frame();
        let content = window.contentRectForFrameRect(frame);
        let native = NativeWindow {
            handle: number,
            rect: monitor::from_ns_rect(frame, primary_height),
            client_size: monitor::from_ns_rect(content, primary_height).size,
        };
        self.windows.borrow_mut().insert(number, WindowEntry { window, delegate });
        Ok(native)
    }

    pub(crate) fn destroy_window(&self, handle: isize) {
        match self.windows.borrow_mut().remove(&handle) {
            Some(entry) => entry.close(),
            None => warn!(handle, "destroying an unknown window"),
        }
    }

    pub(crate) fn apply_cursor(&self, cursor: Option<CursorIcon>) {
        match cursor {
            Some(icon) => {
                cursor_from_icon(icon).set();
                if self.cursor_hidden.replace(false) {
                    set_cursor_hidden(false);
                }
            },
            None => {
                if !self.cursor_hidden.replace(true) {
                    set_cursor_hidden(true);
                }
            },
        }
    }

    pub(crate) fn set_visible(&self, handle: isize, visible: bool) {
        let Some(window) = self.window(handle) else { return };
        if visible {
            window.orderFront(None);
        } else {
            window.orderOut(None);
        }
    }

    pub(crate) fn focus(&self, handle: isize) {
        if let Some(window) = self.window(handle) {
            window.makeKeyAndOrderFront(None);
        }
    }

    /// `rect` is the outer frame.
    pub(crate) fn move_resize(&self, handle: isize, rect: Rect) {
        if let Some(window) = self.window(handle) {
            let frame = monitor::to_ns_rect(rect, monitor::primary_height(self.mtm));
            window.setFrame_display(frame, true);
        }
    }

    pub(crate) fn window_rect(&self, handle: isize) -> Rect {
        self.window(handle).map_or_else(Rect::default, |window| {
            monitor::from_ns_rect(window.frame(), monitor::primary_height(self.mtm))
        })
    }

    pub(crate) fn content_size(&self, handle: isize) -> PhysicalSize<u32> {
        self.window(handle).map_or_else(PhysicalSize::default, |window| {
            let content = window.contentRectForFrameRect(window.frame());
            let size = content.size;
            PhysicalSize::new(size.width.round() as u32, size.height.round() as u32)
        })
    }

    /// Move the pointer to a point of the content area.
    pub(crate) fn warp_cursor(&self, handle: isize, position: PhysicalPosition<i32>) {
        let Some(window) = self.window(handle) else { return };
        let content = window.contentRectForFrameRect(window.frame());
        let client = monitor::from_ns_rect(content, monitor::primary_height(self.mtm));
        let point = NSPoint::new(
            (client.left() + position.x) as f64,
            (client.top() + position.y) as f64,
        );
        unsafe {
            if ffi::CGWarpMouseCursorPosition(point) != ffi::kCGErrorSuccess {
                warn!(?point, "CGWarpMouseCursorPosition failed");
            }
            ffi::CGAssociateMouseAndMouseCursorPosition(1);
        }
    }

    pub(crate) fn frame(&self, handle: isize, style: WindowStyle, show: bool) {
        let Some(window) = self.window(handle) else { return };
        let mask = if show { style_mask(style) } else { NSWindowStyleMask::Borderless };
        window.setStyleMask(mask);
    }

    pub(crate) fn topmost(&self, handle: isize, topmost: bool) {
        if let Some(window) = self.window(handle) {
            window.setLevel(if topmost { FLOATING_LEVEL } else { NORMAL_LEVEL });
        }
    }

    pub(crate) fn fullscreen(
        &self,
        handle: isize,
        style: WindowStyle,
        fullscreen: bool,
        rect: Rect,
    ) {
        let Some(window) = self.window(handle) else { return };
        let options = if fullscreen {
            NSApplicationPresentationOptions::HideDock
                | NSApplicationPresentationOptions::HideMenuBar
        } else {
            NSApplicationPresentationOptions::Default
        };
        self.app.setPresentationOptions(options);
        if fullscreen {
            window.setStyleMask(NSWindowStyleMask::Borderless);
            window.setLevel(FULLSCREEN_LEVEL);
        } else {
            window.setStyleMask(style_mask(style));
            window.setLevel(NORMAL_LEVEL);
        }
        let frame = monitor::to_ns_rect(rect, monitor::primary_height(self.mtm));
        window.setFrame_display(frame, true);
    }

    fn image(&self, path: &Path) -> Result<Retained<NSImage>, RequestError> {
        let file = NSString::from_str(&path.to_string_lossy());
        let image = unsafe { NSImage::initWithContentsOfFile(NSImage::alloc(), &file) };
        image.ok_or_else(|| os_error!(format!("no image at {}", path.display())).into())
    }

    /// The application icon; AppKit windows have none of their own.
    pub(crate) fn set_icon(&self, path: &Path) -> Result<(), RequestError> {
        let image = self.image(path)?;
        unsafe { self.app.setApplicationIconImage(Some(&image)) };
        Ok(())
    }

    /// Show an image as the whole content of a frameless window centered above the others.
    pub(crate) fn splash(&self, handle: isize, path: &Path) -> Result<(), RequestError> {
        let image = self.image(path)?;
        let window = self.window(handle).ok_or_else(|| os_error!("unknown window"))?;
        let view = NSImageView::imageViewWithImage(&image, self.mtm);
        let view: &NSView = &view;
        window.setStyleMask(NSWindowStyleMask::Borderless);
        window.setContentView(Some(view));
        window.setContentSize(image.size());
        window.setLevel(FLOATING_LEVEL);
        window.center();
        window.makeKeyAndOrderFront(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_masks() {
        let all = NSWindowStyleMask::Titled
            | NSWindowStyleMask::Miniaturizable
            | NSWindowStyleMask::Resizable
            | NSWindowStyleMask::Closable;
        assert_eq!(style_mask(WindowStyle::default()), all);
        assert_eq!(style_mask(WindowStyle::empty()), NSWindowStyleMask::Borderless);
        assert_eq!(
            style_mask(WindowStyle::CLOSE),
            NSWindowStyleMask::Titled | NSWindowStyleMask::Closable
        );
        let undecorated = WindowStyle::FULLSCREEN | WindowStyle::HIDDEN;
        assert_eq!(style_mask(undecorated), NSWindowStyleMask::Borderless);
    }
}
