use dpi::{PhysicalPosition, PhysicalSize};
use ferrowin_core::codec::appkit::{
    AppKitEvent, KEY_DOWN, KEY_UP, LEFT_MOUSE_DOWN, LEFT_MOUSE_DRAGGED, LEFT_MOUSE_UP, MOUSE_MOVED,
    OTHER_MOUSE_DOWN, OTHER_MOUSE_DRAGGED, OTHER_MOUSE_UP, RIGHT_MOUSE_DOWN, RIGHT_MOUSE_DRAGGED,
    RIGHT_MOUSE_UP, SCROLL_WHEEL,
};
use objc2::MainThreadMarker;
use objc2_app_kit::NSEvent;
use objc2_foundation::NSString;

/// An event of the AppKit backend, either read from the application queue or queued by a
/// window delegate.
#[derive(Debug, Clone, PartialEq)]
pub struct MacEvent {
    /// Window number, `None` for application wide events.
    pub window: Option<isize>,
    pub kind: MacEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MacEventKind {
    Input(AppKitEvent),
    /// New content size, in points.
    Resized(PhysicalSize<u32>),
    /// New top-left corner of the frame.
    Moved(PhysicalPosition<i32>),
    /// The close button was pressed. The window stays open.
    CloseRequested,
    Closed,
    ScreensChanged,
    Other(u64),
}

impl MacEvent {
    pub(crate) fn new(window: Option<isize>, kind: MacEventKind) -> Self {
        Self { window, kind }
    }
}

fn first_char(string: Option<objc2::rc::Retained<NSString>>) -> u32 {
    string.and_then(|string| string.to_string().chars().next()).map_or(0, |c| c as u32)
}

/// Whether a key press with this character also produces text.
///
/// AppKit reports function keys as characters of the private use range `0xf700..=0xf8ff`.
pub(crate) fn is_text(character: u32) -> bool {
    character >= 0x20 && character != 0x7f && !(0xf700..=0xf8ff).contains(&character)
}

fn is_mouse_button(event_type: u64) -> bool {
    matches!(
        event_type,
        LEFT_MOUSE_DOWN
            | LEFT_MOUSE_UP
            | RIGHT_MOUSE_DOWN
            | RIGHT_MOUSE_UP
            | OTHER_MOUSE_DOWN
            | OTHER_MOUSE_UP
    )
}

fn is_mouse(event_type: u64) -> bool {
    is_mouse_button(event_type)
        || matches!(
            event_type,
            MOUSE_MOVED | LEFT_MOUSE_DRAGGED | RIGHT_MOUSE_DRAGGED | OTHER_MOUSE_DRAGGED
        )
}

/// Split an `NSEvent` into the records handed to the event handler.
///
/// Mouse fields are only read from mouse events, AppKit raises an exception otherwise.
pub(crate) fn records(event: &NSEvent, mtm: MainThreadMarker) -> Vec<MacEvent> {
    let event_type = event.r#type().0 as u64;
    let number = event.windowNumber();
    let window = (number > 0).then_some(number);

    let mut record = AppKitEvent {
        event_type,
        modifier_flags: event.modifierFlags().0 as u64,
        pressed_buttons: NSEvent::pressedMouseButtons() as u64,
        ..Default::default()
    };

    match event_type {
        KEY_DOWN | KEY_UP => {
            record.key_code = event.keyCode();
            record.character = first_char(event.characters());
            record.unmodified = first_char(event.charactersIgnoringModifiers());
            record.is_repeat = event.isARepeat();
            let mut records = vec![MacEvent::new(window, MacEventKind::Input(record))];
            if event_type == KEY_DOWN && is_text(record.character) {
                let text = AppKitEvent { text: true, ..record };
                records.push(MacEvent::new(window, MacEventKind::Input(text)));
            }
            records
        },
        _ if is_mouse(event_type) || event_type == SCROLL_WHEEL => {
            let location = event.locationInWindow();
            record.location = (location.x, location.y);
            record.content_height = event
                .window(mtm)
                .and_then(|window| window.contentView())
                .map_or(0.0, |view| view.frame().size.height);
            if event_type == SCROLL_WHEEL {
                record.scrolling_delta = (event.deltaX(), event.deltaY());
            } else {
                record.button_number = event.buttonNumber() as i64;
            }
            if is_mouse_button(event_type) {
                record.click_count = event.clickCount() as i64;
            }
            vec![MacEvent::new(window, MacEventKind::Input(record))]
        },
        other => vec![MacEvent::new(window, MacEventKind::Other(other))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_keys_produce_no_text() {
        assert!(is_text('a' as u32));
        assert!(is_text(' ' as u32));
        assert!(is_text('é' as u32));
        // Return, tab, backspace and delete.
        assert!(!is_text(0x0d));
        assert!(!is_text(0x09));
        assert!(!is_text(0x08));
        assert!(!is_text(0x7f));
        // NSUpArrowFunctionKey and NSF1FunctionKey.
        assert!(!is_text(0xf700));
        assert!(!is_text(0xf704));
    }

    #[test]
    fn mouse_event_types() {
        assert!(is_mouse_button(OTHER_MOUSE_UP));
        assert!(!is_mouse_button(MOUSE_MOVED));
        assert!(is_mouse(RIGHT_MOUSE_DRAGGED));
        assert!(!is_mouse(KEY_DOWN));
        assert!(!is_mouse(SCROLL_WHEEL));
    }
}
