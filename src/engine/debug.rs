// src/engine/debug.rs

use std::sync::atomic::{AtomicBool, Ordering};

pub struct DebugFlags {
    pub debug_text: AtomicBool,
    pub collision: AtomicBool,
}

impl DebugFlags {
    pub const fn new() -> Self {
        Self {
            debug_text: AtomicBool::new(false),
            collision: AtomicBool::new(false),
        }
    }

    pub fn set_debug_text(&self, enabled: bool) {
        self.debug_text.store(enabled, Ordering::Relaxed);
    }

    pub fn set_collision(&self, enabled: bool) {
        self.collision.store(enabled, Ordering::Relaxed);
    }

    pub fn is_debug_text_enabled(&self) -> bool {
        self.debug_text.load(Ordering::Relaxed)
    }

    pub fn is_collision_enabled(&self) -> bool {
        self.collision.load(Ordering::Relaxed)
    }
}

impl Default for DebugFlags {
    fn default() -> Self {
        Self::new()
    }
}

static DEBUG_FLAGS: DebugFlags = DebugFlags::new();

pub fn debug_flags() -> &'static DebugFlags {
    &DEBUG_FLAGS
}

/// Engine debug output. Goes through the `log` facade at debug level, and
/// only when debug text has been switched on.
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        if $crate::engine::debug::debug_flags().is_debug_text_enabled() {
            log::debug!("[{}:{}] {}", file!(), line!(), format!($($arg)*));
        }
    };
}

/// Toggle debug text
pub fn toggle_debug_text() {
    let current = DEBUG_FLAGS.is_debug_text_enabled();
    DEBUG_FLAGS.set_debug_text(!current);
    log::info!("Debug text: {}", if !current { "ON" } else { "OFF" });
}

/// Toggle collision debug
pub fn toggle_collision_debug() {
    let current = DEBUG_FLAGS.is_collision_enabled();
    DEBUG_FLAGS.set_collision(!current);
    log::info!("Collision debug: {}", if !current { "ON" } else { "OFF" });
}

/// Set debug text flag
pub fn set_debug_text(enabled: bool) {
    DEBUG_FLAGS.set_debug_text(enabled);
}

/// Set collision debug flag
pub fn set_collision_debug(enabled: bool) {
    DEBUG_FLAGS.set_collision(enabled);
}
