/*
 * Per-window state kept for every subclassed window. One `WindowHook` is created
 * on install, shared through the handle registry as an `Arc`, and read from the
 * hooked window procedure on whatever thread the OS delivers messages on.
 *
 * All mutable fields use interior mutability so the record can be shared without
 * ever holding the registry lock.
 */
use crate::non_client::default_hit_test;
use crate::types::{Rgb, SizeOverride, WindowHandle};

use std::fmt;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/*
 * Callbacks from the hooked window procedure back into the application that owns
 * the window. They are invoked on the window's message thread, never while the
 * registry lock is held.
 */
pub trait WindowHookHandler: Send + Sync {
    /// Returns a Win32 `HT*` code for a point in window coordinates, or `None` to
    /// fall back to the default (top resize border or client area).
    fn on_nc_hit_test(&self, x: i32, y: i32, is_on_resize_border: bool) -> Option<i32>;

    fn is_fullscreen(&self) -> bool {
        false
    }

    /// System colors or DWM colorization changed; the window should repaint its title bar.
    fn fire_state_changed(&self) {}
}

/*
 * Tracks whether the user is currently dragging the window. Background erasing is
 * skipped during a move to avoid artifacts when the window is dragged partly
 * offscreen and back.
 */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveTracker {
    moving_or_sizing: bool,
    moving: bool,
}

impl MoveTracker {
    pub fn enter_size_move(&mut self) {
        self.moving_or_sizing = true;
    }

    pub fn exit_size_move(&mut self) {
        self.moving_or_sizing = false;
        self.moving = false;
    }

    // WM_MOVE / WM_MOVING outside a modal size-move loop are programmatic moves.
    pub fn moved(&mut self) {
        if self.moving_or_sizing {
            self.moving = true;
        }
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn suppresses_erase(&self) -> bool {
        self.moving
    }
}

pub struct WindowHook {
    handle: WindowHandle,
    handler: Arc<dyn WindowHookHandler>,
    original_window_proc: AtomicIsize,
    size_override: Mutex<SizeOverride>,
    background: Mutex<Option<Rgb>>,
    // Raw value of the native brush painting `background`, 0 if none.
    native_background: AtomicIsize,
    move_tracker: Mutex<MoveTracker>,
}

impl WindowHook {
    pub(crate) fn new(handle: WindowHandle, handler: Arc<dyn WindowHookHandler>) -> Self {
        Self {
            handle,
            handler,
            original_window_proc: AtomicIsize::new(0),
            size_override: Mutex::new(SizeOverride::Unchanged),
            background: Mutex::new(None),
            native_background: AtomicIsize::new(0),
            move_tracker: Mutex::new(MoveTracker::default()),
        }
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    pub fn handler(&self) -> &Arc<dyn WindowHookHandler> {
        &self.handler
    }

    /// Raw pointer value of the window procedure that was replaced, or 0 if unknown.
    pub fn original_window_proc(&self) -> isize {
        self.original_window_proc.load(Ordering::Acquire)
    }

    pub(crate) fn set_original_window_proc(&self, proc_ptr: isize) {
        self.original_window_proc.store(proc_ptr, Ordering::Release);
    }

    pub fn size_override(&self) -> SizeOverride {
        *self
            .size_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_size_override(&self, value: SizeOverride) {
        *self
            .size_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// The wparam a `WM_SIZE` message should carry after the override is applied.
    pub fn effective_size_wparam(&self, wparam: usize) -> usize {
        self.size_override().wparam().unwrap_or(wparam)
    }

    pub fn background(&self) -> Option<Rgb> {
        *self.background.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_background(&self, color: Option<Rgb>) {
        *self.background.lock().unwrap_or_else(PoisonError::into_inner) = color;
    }

    pub fn native_background(&self) -> isize {
        self.native_background.load(Ordering::Acquire)
    }

    /// Stores a new native brush value and returns the previous one for the caller to free.
    pub fn swap_native_background(&self, brush: isize) -> isize {
        self.native_background.swap(brush, Ordering::AcqRel)
    }

    pub fn resolve_hit_test(&self, x: i32, y: i32, is_on_resize_border: bool) -> i32 {
        self.handler
            .on_nc_hit_test(x, y, is_on_resize_border)
            .unwrap_or_else(|| default_hit_test(is_on_resize_border))
    }

    pub fn with_move_tracker<R>(&self, f: impl FnOnce(&mut MoveTracker) -> R) -> R {
        let mut tracker = self
            .move_tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut tracker)
    }
}

impl fmt::Debug for WindowHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowHook")
            .field("handle", &self.handle)
            .field("original_window_proc", &self.original_window_proc())
            .field("size_override", &self.size_override())
            .field("background", &self.background())
            .field("native_background", &self.native_background())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::non_client::{HIT_TEST_CAPTION, HIT_TEST_CLIENT, HIT_TEST_TOP};

    struct ClientOnly;

    impl WindowHookHandler for ClientOnly {
        fn on_nc_hit_test(&self, _x: i32, _y: i32, _is_on_resize_border: bool) -> Option<i32> {
            Some(HIT_TEST_CLIENT)
        }
    }

    // Claims a 30px caption strip and leaves the rest to the default.
    struct CaptionStrip;

    impl WindowHookHandler for CaptionStrip {
        fn on_nc_hit_test(&self, _x: i32, y: i32, is_on_resize_border: bool) -> Option<i32> {
            (y < 30 && !is_on_resize_border).then_some(HIT_TEST_CAPTION)
        }
    }

    #[test]
    fn move_outside_size_move_loop_is_not_tracked() {
        let mut tracker = MoveTracker::default();
        tracker.moved();
        assert!(!tracker.is_moving());
    }

    #[test]
    fn erase_suppressed_only_while_dragging() {
        // Arrange
        let mut tracker = MoveTracker::default();

        // Act / Assert
        tracker.enter_size_move();
        assert!(!tracker.suppresses_erase(), "sizing alone must still erase");
        tracker.moved();
        assert!(tracker.suppresses_erase());
        tracker.exit_size_move();
        assert!(!tracker.suppresses_erase());
        assert_eq!(tracker, MoveTracker::default());
    }

    #[test]
    fn size_override_rewrites_wparam_until_cleared() {
        let hook = WindowHook::new(WindowHandle(0x99), Arc::new(ClientOnly));
        assert_eq!(hook.effective_size_wparam(0), 0);

        hook.set_size_override(SizeOverride::Maximized);
        assert_eq!(hook.effective_size_wparam(0), crate::types::SIZE_MAXIMIZED);

        hook.set_size_override(SizeOverride::Unchanged);
        assert_eq!(hook.effective_size_wparam(0), 0);
    }

    #[test]
    fn new_hook_has_no_original_proc_or_background() {
        let hook = WindowHook::new(WindowHandle(0x99), Arc::new(ClientOnly));
        assert_eq!(hook.original_window_proc(), 0);
        assert_eq!(hook.background(), None);
        assert_eq!(hook.native_background(), 0);
        assert_eq!(hook.resolve_hit_test(3, 4, false), HIT_TEST_CLIENT);
        assert!(!hook.handler().is_fullscreen());
    }

    #[test]
    fn unanswered_hit_test_falls_back_to_default() {
        let hook = WindowHook::new(WindowHandle(0x99), Arc::new(CaptionStrip));

        assert_eq!(hook.resolve_hit_test(50, 10, false), HIT_TEST_CAPTION);
        assert_eq!(hook.resolve_hit_test(50, 3, true), HIT_TEST_TOP);
        assert_eq!(hook.resolve_hit_test(50, 200, false), HIT_TEST_CLIENT);
    }

    #[test]
    fn swapping_native_background_hands_back_previous_brush() {
        let hook = WindowHook::new(WindowHandle(0x99), Arc::new(ClientOnly));

        assert_eq!(hook.swap_native_background(0x100), 0);
        assert_eq!(hook.swap_native_background(0x200), 0x100);
        assert_eq!(hook.native_background(), 0x200);
    }
}
