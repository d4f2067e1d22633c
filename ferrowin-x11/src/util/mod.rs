//! Thin wrappers over Xlib and RandR calls that check their results.

mod cursor;
mod hint;
mod input;
mod randr;

pub use self::hint::{MotifHints, StateOperation};
pub use self::randr::{combine_modes, Output};
