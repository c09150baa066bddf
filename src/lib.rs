/*
 * hwndmap: per-window state registry and window-procedure hooks for applications
 * that draw their own window decorations on top of native Win32 windows.
 *
 * The core is `HandleRegistry`, a sorted, mutex-guarded map from an opaque window
 * handle to the state record of that window. A subclassed window procedure only
 * receives the raw handle, and the registry is how it finds its way back to the
 * owning state. `HookInstaller` builds install/uninstall on top of it behind the
 * `WindowProcPatcher` seam; the Win32 implementation of that seam and the hooked
 * window procedure itself are compiled only on Windows, so everything else can be
 * built and tested on any platform.
 */
pub mod error;
pub mod handle_registry;
pub mod hook_installer;
pub mod non_client;
pub mod types;
#[cfg(target_os = "windows")]
pub mod win32_hook;
pub mod window_hook;

pub use error::{PlatformError, Result as PlatformResult};
pub use handle_registry::HandleRegistry;
pub use hook_installer::{HookInstaller, WindowProcPatcher};
pub use non_client::{SystemMenuState, default_hit_test};
pub use types::{FrameState, RegistryConfig, Rgb, SizeOverride, WindowHandle};
#[cfg(target_os = "windows")]
pub use win32_hook::{
    Win32WindowProcPatcher, install_window_hook, is_window_hooked, set_window_background,
    show_window, uninstall_window_hook, update_frame,
};
pub use window_hook::{MoveTracker, WindowHook, WindowHookHandler};
