//! Base types for the ferrowin window core.
//!
//! This crate holds everything that is platform independent: the canonical [`InputEvent`]
//! and the codecs that build it from Win32, X11 and AppKit records, window attributes and
//! style flags, cursor and display value types, and the [`Backend`] trait each native
//! platform implements.
//!
//! [`InputEvent`]: event::InputEvent
//! [`Backend`]: backend::Backend

pub mod backend;
pub mod codec;
pub mod cursor;
pub mod error;
pub mod event;
pub mod monitor;
pub mod window;
