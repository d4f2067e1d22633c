#![cfg(feature = "serde")]

use ferrowin::cursor::{CursorIcon, StockCursor};
use ferrowin::dpi::{PhysicalPosition, PhysicalSize};
use ferrowin::event::{EventKind, InputEvent, InputPayload, KeyData, Modifiers, MouseData};
use ferrowin::monitor::{Display, VideoMode};
use ferrowin::{CreationOptions, Rect, WindowEvent, WindowStyle};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[allow(dead_code)]
fn needs_serde<S: Serialize + Deserialize<'static>>() {}

#[test]
fn window_serde() {
    needs_serde::<CursorIcon>();
    needs_serde::<StockCursor>();
    needs_serde::<WindowStyle>();
    needs_serde::<Rect>();
    needs_serde::<CreationOptions>();
}

#[test]
fn events_serde() {
    needs_serde::<EventKind>();
    needs_serde::<Modifiers>();
    needs_serde::<InputEvent>();
    needs_serde::<InputPayload>();
}

#[test]
fn monitor_serde() {
    needs_serde::<Display>();
    needs_serde::<VideoMode>();
}

#[test]
fn dpi_serde() {
    needs_serde::<PhysicalPosition<i32>>();
    needs_serde::<PhysicalSize<u32>>();
}

#[test]
fn resize_payload_shape() {
    let resized = WindowEvent::Resized(PhysicalSize::new(800, 600));
    assert_eq!(serde_json::to_value(&resized).unwrap(), json!({ "width": 800, "height": 600 }));
}

#[test]
fn input_payload_shapes() {
    let key = KeyData { vk_code: 65, scan_code: 30, key_code: 65, char_code: 97 };
    let key = InputEvent::key(EventKind::KeyDown, Modifiers::CTRL, key, 1);
    assert_eq!(
        serde_json::to_value(key.to_payload()).unwrap(),
        json!({
            "type": "keydown",
            "modifiers": {
                "ctrl": true, "alt": false, "shift": false,
                "lbutton": false, "mbutton": false, "rbutton": false,
                "xbutton1": false, "xbutton2": false
            },
            "repeats": 1,
            "vk_code": 65,
            "scan_code": 30,
            "key_code": 65,
            "char": "a"
        })
    );

    let mouse = MouseData { x: 10, y: 20, dx: 0, dy: -120 };
    let wheel = InputEvent::mouse(EventKind::MouseWheel, Modifiers::empty(), 0, mouse, 0);
    let value = serde_json::to_value(wheel.to_payload()).unwrap();
    assert_eq!(value["type"], "mousewheel");
    assert_eq!(value["dy"], -120);
    assert!(value.get("vk_code").is_none());
}

#[test]
fn creation_options_from_host_object() {
    let options: CreationOptions =
        serde_json::from_value(json!({ "width": 800, "height": 600, "caption": "demo" })).unwrap();
    assert_eq!(options.width, Some(800));
    assert_eq!(options.left, None);
    assert_eq!(options.caption.as_deref(), Some("demo"));
}
