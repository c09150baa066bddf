/*
 * Installs and removes window-procedure hooks on top of the handle registry.
 *
 * The OS side (replacing the window procedure, forcing a frame recalculation) is
 * behind `WindowProcPatcher`, so the ordering rules can be exercised without a
 * window system:
 *  - install registers the hook and records the current window procedure before
 *    patching, so the first message routed to the new procedure already finds its
 *    state and a procedure to chain to;
 *  - uninstall removes the hook before restoring the procedure and only then lets
 *    the state go;
 *  - a failed registration means the window keeps its default behavior.
 *
 * Registry calls return cloned `Arc`s, so the registry lock is never held while the
 * patcher or an application handler runs.
 */
use crate::error::{PlatformError, Result as PlatformResult};
use crate::handle_registry::HandleRegistry;
use crate::types::{FrameState, RegistryConfig, Rgb, SizeOverride, WindowHandle};
use crate::window_hook::{WindowHook, WindowHookHandler};

use std::sync::Arc;

pub trait WindowProcPatcher: Send + Sync {
    /// Reads the window procedure currently installed on `handle`.
    fn current_window_proc(&self, handle: WindowHandle) -> PlatformResult<isize>;

    /// Replaces the window procedure of `handle` and returns the previous one.
    fn replace_window_proc(&self, handle: WindowHandle) -> PlatformResult<isize>;

    fn restore_window_proc(&self, handle: WindowHandle, original: isize);

    /// Asks the OS to recompute the non-client frame, which shows or hides the native title bar.
    fn refresh_frame(&self, handle: WindowHandle);

    /// The background color of `hook` changed; rebuild any native paint resources.
    fn background_changed(&self, _hook: &WindowHook) {}

    /// `hook` is no longer reachable from the window procedure; free its native resources.
    fn release_resources(&self, _hook: &WindowHook) {}
}

#[derive(Debug)]
pub struct HookInstaller<P> {
    hooks: HandleRegistry<Arc<WindowHook>>,
    patcher: P,
}

impl<P: WindowProcPatcher> HookInstaller<P> {
    pub fn new(patcher: P) -> Self {
        Self::with_config(patcher, RegistryConfig::default())
    }

    pub fn with_config(patcher: P, config: RegistryConfig) -> Self {
        Self {
            hooks: HandleRegistry::with_config(config),
            patcher,
        }
    }

    pub fn patcher(&self) -> &P {
        &self.patcher
    }

    pub fn hook(&self, handle: WindowHandle) -> Option<Arc<WindowHook>> {
        self.hooks.get(handle)
    }

    pub fn is_installed(&self, handle: WindowHandle) -> bool {
        self.hooks.contains(handle)
    }

    pub fn installed_count(&self) -> usize {
        self.hooks.len()
    }

    /*
     * Subclasses `handle`. On any error nothing stays registered or patched and the
     * window keeps its native decorations.
     */
    pub fn install(
        &self,
        handle: WindowHandle,
        handler: Arc<dyn WindowHookHandler>,
    ) -> PlatformResult<WindowHandle> {
        if handle.is_null() {
            return Err(PlatformError::InvalidHandle(
                "cannot hook a null window handle".to_string(),
            ));
        }
        let hook = Arc::new(WindowHook::new(handle, handler));
        match self.hooks.put_if_absent(handle, Arc::clone(&hook)) {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("HookInstaller: window {handle:?} is already hooked.");
                return Err(PlatformError::AlreadyInstalled(handle));
            }
            Err(err) => {
                log::warn!(
                    "HookInstaller: not tracking window {handle:?}, keeping default frame: {err}"
                );
                return Err(err);
            }
        }

        let original = match self.patcher.current_window_proc(handle) {
            Ok(original) => original,
            Err(err) => {
                self.hooks.remove(handle);
                log::warn!("HookInstaller: cannot read window procedure of {handle:?}: {err}");
                return Err(err);
            }
        };
        hook.set_original_window_proc(original);

        match self.patcher.replace_window_proc(handle) {
            Ok(previous) => {
                if previous != original {
                    log::debug!(
                        "HookInstaller: window procedure of {handle:?} changed during install \
                         ({original:#x} -> {previous:#x})."
                    );
                    hook.set_original_window_proc(previous);
                }
                log::debug!(
                    "HookInstaller: installed hook for {handle:?} (original proc {previous:#x})."
                );
                Ok(handle)
            }
            Err(err) => {
                self.hooks.remove(handle);
                log::warn!("HookInstaller: failed to subclass window {handle:?}: {err}");
                Err(err)
            }
        }
    }

    /*
     * Detaches the hook from a live window and restores the native frame.
     * Returns false if `handle` was not hooked.
     */
    pub fn uninstall(&self, handle: WindowHandle) -> bool {
        let Some(hook) = self.hooks.remove(handle) else {
            log::trace!("HookInstaller: uninstall for unhooked window {handle:?} ignored.");
            return false;
        };

        self.patcher
            .restore_window_proc(handle, hook.original_window_proc());
        // Brings the native title bar back.
        self.patcher.refresh_frame(handle);
        self.patcher.release_resources(&hook);
        log::debug!("HookInstaller: uninstalled hook for {handle:?}.");
        true
    }

    /*
     * Destroy path, called from inside the hooked procedure. The original procedure
     * is restored and the entry removed; the returned hook lets the caller chain the
     * destroy message to the original procedure afterwards.
     */
    pub fn detach_destroyed(&self, handle: WindowHandle) -> Option<Arc<WindowHook>> {
        let hook = self.hooks.get(handle)?;
        self.patcher
            .restore_window_proc(handle, hook.original_window_proc());
        self.hooks.remove(handle);
        self.patcher.release_resources(&hook);
        log::debug!("HookInstaller: window {handle:?} destroyed, hook detached.");
        Some(hook)
    }

    /*
     * Recomputes the frame of a hooked window. While the OS processes the request,
     * WM_SIZE is rewritten to keep the iconified/maximized state reported by
     * `state`. Unhooked windows still get the frame refresh.
     */
    pub fn update_frame(&self, handle: WindowHandle, state: FrameState) {
        let hook = self.hooks.get(handle);
        if let Some(hook) = &hook {
            hook.set_size_override(state.size_override());
        }

        self.patcher.refresh_frame(handle);

        if let Some(hook) = &hook {
            hook.set_size_override(SizeOverride::Unchanged);
        }
    }

    pub fn set_window_background(&self, handle: WindowHandle, color: Rgb) -> bool {
        match self.hooks.get(handle) {
            Some(hook) => {
                hook.set_background(Some(color));
                self.patcher.background_changed(&hook);
                true
            }
            None => false,
        }
    }
}
