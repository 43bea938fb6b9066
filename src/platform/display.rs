// Platform-specific desktop session detection

/// Whether a graphical session is available to show notifications
#[cfg(target_os = "linux")]
pub fn has_display() -> bool {
    ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).is_some_and(|value| !value.is_empty()))
}

#[cfg(not(target_os = "linux"))]
pub fn has_display() -> bool {
    true
}
