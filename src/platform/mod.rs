// Platform-specific code module

pub mod display;

pub use display::has_display;
