/*
 * Win32 binding for the hook installer. Windows that get a custom title bar are
 * subclassed by replacing their window procedure with `hooked_window_proc`, which
 * recovers the per-window `WindowHook` from the process-wide registry using only
 * the `HWND` it is called with.
 *
 * `hooked_window_proc` runs on the window's message thread, which may differ from
 * the thread that installed the hook. It never calls into Win32 while the registry
 * lock is held; lookups hand out a cloned `Arc<WindowHook>` instead.
 */
use crate::error::{PlatformError, Result as PlatformResult};
use crate::hook_installer::{HookInstaller, WindowProcPatcher};
use crate::non_client::{
    AutohideEdges, Bounds, HIT_TEST_CLIENT, SystemMenuState, forwards_button,
    forwards_mouse_move, needs_visible_border_inset, opens_system_menu,
};
use crate::types::{FrameState, Rgb, SIZE_MAXIMIZED, WindowHandle};
use crate::window_hook::{WindowHook, WindowHookHandler};

use std::ffi::c_void;
use std::sync::{Arc, OnceLock};

use windows::Wdk::System::SystemServices::RtlGetVersion;
use windows::Win32::{
    Foundation::{
        COLORREF, ERROR_SUCCESS, GetLastError, HWND, LPARAM, LRESULT, RECT, SetLastError,
        WIN32_ERROR, WPARAM,
    },
    Graphics::Dwm::{DWMWA_VISIBLE_FRAME_BORDER_THICKNESS, DwmGetWindowAttribute},
    Graphics::Gdi::{
        CreateSolidBrush, DeleteObject, FillRect, GetMonitorInfoW, HBRUSH, HDC,
        MONITOR_DEFAULTTONEAREST, MONITORINFO, MonitorFromWindow,
    },
    System::SystemInformation::OSVERSIONINFOW,
    UI::HiDpi::{GetDpiForWindow, GetSystemMetricsForDpi},
    UI::Shell::{
        ABE_BOTTOM, ABE_LEFT, ABE_RIGHT, ABE_TOP, ABM_GETAUTOHIDEBAREX, ABM_GETSTATE,
        ABS_AUTOHIDE, APPBARDATA, SHAppBarMessage,
    },
    UI::WindowsAndMessaging::{
        CallWindowProcW, DefWindowProcW, GWL_STYLE, GWLP_WNDPROC, GetClientRect, GetSystemMenu,
        GetWindowLongPtrW, GetWindowLongW, GetWindowRect, IsZoomed, MENUITEMINFOW,
        MFS_DISABLED, MFS_ENABLED, MIIM_STATE, NCCALCSIZE_PARAMS, PostMessageW, SC_CLOSE,
        SC_MAXIMIZE, SC_MINIMIZE, SC_MOVE, SC_RESTORE, SC_SIZE, SHOW_WINDOW_CMD,
        SM_CXPADDEDBORDER, SM_CYSIZEFRAME, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE,
        SWP_NOSIZE, SWP_NOZORDER, SendMessageW, SetMenuDefaultItem, SetMenuItemInfoW,
        SetWindowLongPtrW, SetWindowPos, ShowWindow, TPM_RETURNCMD, TrackPopupMenu,
        WM_DESTROY, WM_DPICHANGED, WM_ENTERSIZEMOVE, WM_ERASEBKGND, WM_EXITSIZEMOVE,
        WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE, WM_MOVE, WM_MOVING, WM_NCCALCSIZE,
        WM_NCHITTEST, WM_NCLBUTTONDOWN, WM_NCLBUTTONUP, WM_NCMOUSEMOVE, WM_NCRBUTTONUP,
        WM_SIZE, WM_SYSCOMMAND, WNDPROC, WS_MAXIMIZEBOX, WS_MINIMIZEBOX, WS_THICKFRAME,
    },
};

const WM_DWMCOLORIZATIONCOLORCHANGED: u32 = 0x0320;

static HOOKS: OnceLock<HookInstaller<Win32WindowProcPatcher>> = OnceLock::new();
static OS_BUILD: OnceLock<u32> = OnceLock::new();

fn hooks() -> &'static HookInstaller<Win32WindowProcPatcher> {
    HOOKS.get_or_init(|| HookInstaller::new(Win32WindowProcPatcher))
}

// RtlGetVersion reports the real build even without a compatibility manifest.
fn os_build() -> u32 {
    *OS_BUILD.get_or_init(|| {
        let mut info = OSVERSIONINFOW {
            dwOSVersionInfoSize: size_of::<OSVERSIONINFOW>() as u32,
            ..Default::default()
        };
        if unsafe { RtlGetVersion(&mut info) }.is_ok() {
            info.dwBuildNumber
        } else {
            log::warn!("Win32Hook: RtlGetVersion failed, assuming a pre-Windows 11 build.");
            0
        }
    })
}

#[derive(Debug, Default)]
pub struct Win32WindowProcPatcher;

impl WindowProcPatcher for Win32WindowProcPatcher {
    fn current_window_proc(&self, handle: WindowHandle) -> PlatformResult<isize> {
        unsafe {
            SetLastError(WIN32_ERROR(0));
            let current = GetWindowLongPtrW(handle.into(), GWLP_WNDPROC);
            if current == 0 {
                let error = GetLastError();
                if error != ERROR_SUCCESS {
                    return Err(PlatformError::InvalidHandle(format!(
                        "GetWindowLongPtrW(GWLP_WNDPROC) failed for {handle:?}: {error:?}"
                    )));
                }
            }
            Ok(current)
        }
    }

    fn replace_window_proc(&self, handle: WindowHandle) -> PlatformResult<isize> {
        let hwnd: HWND = handle.into();
        unsafe {
            // 0 is both "failure" and a legitimate previous value, so clear the error first.
            SetLastError(WIN32_ERROR(0));
            #[allow(clippy::fn_to_numeric_cast)]
            let previous = SetWindowLongPtrW(hwnd, GWLP_WNDPROC, hooked_window_proc as isize);
            if previous == 0 {
                let error = GetLastError();
                if error != ERROR_SUCCESS {
                    return Err(PlatformError::OperationFailed(format!(
                        "SetWindowLongPtrW(GWLP_WNDPROC) failed for {handle:?}: {error:?}"
                    )));
                }
            }
            Ok(previous)
        }
    }

    fn restore_window_proc(&self, handle: WindowHandle, original: isize) {
        if original == 0 {
            log::warn!("Win32Hook: no original window procedure recorded for {handle:?}.");
            return;
        }
        unsafe {
            SetWindowLongPtrW(handle.into(), GWLP_WNDPROC, original);
        }
    }

    // Sends WM_NCCALCSIZE, which hides or shows the native title bar.
    fn refresh_frame(&self, handle: WindowHandle) {
        let result = unsafe {
            SetWindowPos(
                handle.into(),
                None,
                0,
                0,
                0,
                0,
                SWP_FRAMECHANGED | SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER | SWP_NOACTIVATE,
            )
        };
        if let Err(err) = result {
            log::warn!("Win32Hook: SetWindowPos(SWP_FRAMECHANGED) failed for {handle:?}: {err}");
        }
    }

    // One brush per window, rebuilt only when the color changes.
    fn background_changed(&self, hook: &WindowHook) {
        let brush = match hook.background() {
            Some(color) => {
                let brush = unsafe { CreateSolidBrush(COLORREF(color.to_colorref_value())) };
                if brush.is_invalid() {
                    log::warn!(
                        "Win32Hook: CreateSolidBrush failed for {:?}, background not painted.",
                        hook.handle()
                    );
                }
                brush.0 as isize
            }
            None => 0,
        };
        delete_brush(hook.swap_native_background(brush));
    }

    fn release_resources(&self, hook: &WindowHook) {
        delete_brush(hook.swap_native_background(0));
    }
}

fn delete_brush(raw: isize) {
    if raw != 0 {
        let brush = HBRUSH(raw as *mut c_void);
        unsafe {
            let _ = DeleteObject(brush.into());
        }
    }
}

/*
 * Subclasses `hwnd` so its title bar can be drawn by the application. On error the
 * window is left untouched and keeps its native decorations.
 */
pub fn install_window_hook(
    hwnd: HWND,
    handler: Arc<dyn WindowHookHandler>,
) -> PlatformResult<WindowHandle> {
    let handle = hooks().install(hwnd.into(), handler)?;
    hooks().patcher().refresh_frame(handle);
    Ok(handle)
}

pub fn uninstall_window_hook(hwnd: HWND) -> bool {
    hooks().uninstall(hwnd.into())
}

pub fn update_frame(hwnd: HWND, state: FrameState) {
    hooks().update_frame(hwnd.into(), state);
}

pub fn set_window_background(hwnd: HWND, color: Rgb) -> bool {
    hooks().set_window_background(hwnd.into(), color)
}

pub fn is_window_hooked(hwnd: HWND) -> bool {
    hooks().is_installed(hwnd.into())
}

/// Shows, hides, minimizes or restores `hwnd`. Returns whether it was visible before.
pub fn show_window(hwnd: HWND, cmd: SHOW_WINDOW_CMD) -> bool {
    unsafe { ShowWindow(hwnd, cmd).as_bool() }
}

unsafe extern "system" fn hooked_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let Some(hook) = hooks().hook(hwnd.into()) else {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    };

    unsafe {
        match msg {
            WM_NCCALCSIZE => handle_nc_calc_size(&hook, hwnd, msg, wparam, lparam),
            WM_NCHITTEST => handle_nc_hit_test(&hook, hwnd, msg, wparam, lparam),
            WM_NCMOUSEMOVE => {
                if forwards_mouse_move(wparam.0 as i32) {
                    send_to_client_area(hwnd, WM_MOUSEMOVE, lparam);
                }
                call_original(&hook, hwnd, msg, wparam, lparam)
            }
            WM_NCLBUTTONDOWN | WM_NCLBUTTONUP => {
                if forwards_button(wparam.0 as i32) {
                    let client_msg = if msg == WM_NCLBUTTONDOWN {
                        WM_LBUTTONDOWN
                    } else {
                        WM_LBUTTONUP
                    };
                    send_to_client_area(hwnd, client_msg, lparam);
                    return LRESULT(0);
                }
                call_original(&hook, hwnd, msg, wparam, lparam)
            }
            WM_NCRBUTTONUP => {
                if opens_system_menu(wparam.0 as i32) {
                    open_system_menu(hwnd, x_from_lparam(lparam), y_from_lparam(lparam));
                }
                call_original(&hook, hwnd, msg, wparam, lparam)
            }
            WM_DWMCOLORIZATIONCOLORCHANGED => {
                hook.handler().fire_state_changed();
                call_original(&hook, hwnd, msg, wparam, lparam)
            }
            WM_SIZE => {
                let wparam = WPARAM(hook.effective_size_wparam(wparam.0));
                call_original(&hook, hwnd, msg, wparam, lparam)
            }
            WM_DPICHANGED => handle_dpi_changed(&hook, hwnd, msg, wparam, lparam),
            WM_ENTERSIZEMOVE => {
                hook.with_move_tracker(|tracker| tracker.enter_size_move());
                call_original(&hook, hwnd, msg, wparam, lparam)
            }
            WM_EXITSIZEMOVE => {
                hook.with_move_tracker(|tracker| tracker.exit_size_move());
                call_original(&hook, hwnd, msg, wparam, lparam)
            }
            WM_MOVE | WM_MOVING => {
                hook.with_move_tracker(|tracker| tracker.moved());
                call_original(&hook, hwnd, msg, wparam, lparam)
            }
            WM_ERASEBKGND => {
                if hook.with_move_tracker(|tracker| tracker.suppresses_erase()) {
                    log::trace!("Win32Hook: skipping WM_ERASEBKGND for {hwnd:?} while moving.");
                    return LRESULT(0);
                }
                erase_background(&hook, hwnd, wparam)
            }
            WM_DESTROY => {
                // Detach first so nothing routes to this hook once the original proc is back.
                match hooks().detach_destroyed(hwnd.into()) {
                    Some(hook) => call_original(&hook, hwnd, msg, wparam, lparam),
                    None => DefWindowProcW(hwnd, msg, wparam, lparam),
                }
            }
            _ => call_original(&hook, hwnd, msg, wparam, lparam),
        }
    }
}

unsafe fn call_original(
    hook: &WindowHook,
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let original = hook.original_window_proc();
    unsafe {
        if original == 0 {
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }
        let original_proc: WNDPROC = std::mem::transmute(original);
        CallWindowProcW(original_proc, hwnd, msg, wparam, lparam)
    }
}

/*
 * Keeps the left/right/bottom frame computed by the original procedure but
 * reclaims the top, which removes the native title bar. A maximized window is
 * oversized by the resize handle, so that height is added back unless the window
 * is fullscreen, and an auto-hide taskbar keeps a pixel to pop up from. On
 * Windows 11 the visible border is kept on top of a restored window.
 */
unsafe fn handle_nc_calc_size(
    hook: &WindowHook,
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe {
        if wparam.0 == 0 || lparam.0 == 0 {
            return call_original(hook, hwnd, msg, wparam, lparam);
        }

        let params = &mut *(lparam.0 as *mut NCCALCSIZE_PARAMS);
        let original_top = params.rgrc[0].top;

        let result = call_original(hook, hwnd, msg, wparam, lparam);
        if result.0 != 0 {
            return result;
        }

        let client = &mut params.rgrc[0];
        client.top = original_top;
        if IsZoomed(hwnd).as_bool() && !hook.handler().is_fullscreen() {
            client.top += resize_handle_height(hwnd);
            let trimmed = autohide_taskbar_edges(hwnd).inset(bounds_from_rect(client));
            apply_bounds(client, trimmed);
        } else if needs_visible_border_inset(os_build()) {
            let mut border_thickness: u32 = 0;
            if DwmGetWindowAttribute(
                hwnd,
                DWMWA_VISIBLE_FRAME_BORDER_THICKNESS,
                &mut border_thickness as *mut u32 as *mut c_void,
                size_of::<u32>() as u32,
            )
            .is_ok()
            {
                client.top += border_thickness as i32;
            }
        }
        result
    }
}

unsafe fn autohide_taskbar_edges(hwnd: HWND) -> AutohideEdges {
    unsafe {
        let mut state = APPBARDATA {
            cbSize: size_of::<APPBARDATA>() as u32,
            ..Default::default()
        };
        if (SHAppBarMessage(ABM_GETSTATE, &mut state) as u32 & ABS_AUTOHIDE) == 0 {
            return AutohideEdges::default();
        }

        // MONITOR_DEFAULTTONEAREST finds the right monitor when restoring from minimized.
        let monitor = MonitorFromWindow(hwnd, MONITOR_DEFAULTTONEAREST);
        let mut info = MONITORINFO {
            cbSize: size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if !GetMonitorInfoW(monitor, &mut info).as_bool() {
            log::debug!("Win32Hook: GetMonitorInfoW failed for {hwnd:?}, no taskbar inset.");
            return AutohideEdges::default();
        }

        AutohideEdges {
            top: has_autohide_taskbar(ABE_TOP, info.rcMonitor),
            bottom: has_autohide_taskbar(ABE_BOTTOM, info.rcMonitor),
            left: has_autohide_taskbar(ABE_LEFT, info.rcMonitor),
            right: has_autohide_taskbar(ABE_RIGHT, info.rcMonitor),
        }
    }
}

unsafe fn has_autohide_taskbar(edge: u32, monitor: RECT) -> bool {
    let mut data = APPBARDATA {
        cbSize: size_of::<APPBARDATA>() as u32,
        uEdge: edge,
        rc: monitor,
        ..Default::default()
    };
    // Returns the taskbar window, or null if the edge has none.
    unsafe { SHAppBarMessage(ABM_GETAUTOHIDEBAREX, &mut data) != 0 }
}

fn bounds_from_rect(rect: &RECT) -> Bounds {
    Bounds {
        left: rect.left,
        top: rect.top,
        right: rect.right,
        bottom: rect.bottom,
    }
}

fn apply_bounds(rect: &mut RECT, bounds: Bounds) {
    rect.left = bounds.left;
    rect.top = bounds.top;
    rect.right = bounds.right;
    rect.bottom = bounds.bottom;
}

/*
 * The original procedure already resolves the left, right and bottom edges. Only a
 * client-area result is handed to the application, with the window-relative point
 * and whether it lies on the top resize border.
 */
unsafe fn handle_nc_hit_test(
    hook: &WindowHook,
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe {
        let result = call_original(hook, hwnd, msg, wparam, lparam);
        if result.0 != HIT_TEST_CLIENT as isize {
            return result;
        }

        let Some((x, y)) = window_coordinates(hwnd, lparam) else {
            return result;
        };

        let is_on_resize_border = has_style(hwnd, WS_THICKFRAME.0) && y < resize_handle_height(hwnd);

        let hit = hook.resolve_hit_test(x, y, is_on_resize_border);
        log::trace!("Win32Hook: WM_NCHITTEST {hwnd:?} ({x}, {y}) -> {hit}");
        LRESULT(hit as isize)
    }
}

/*
 * A maximized window whose DPI changes gets no follow-up WM_SIZE, so one is
 * synthesized from the suggested rectangle to let the application relayout.
 */
unsafe fn handle_dpi_changed(
    hook: &WindowHook,
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe {
        let result = call_original(hook, hwnd, msg, wparam, lparam);
        if lparam.0 != 0 && IsZoomed(hwnd).as_bool() {
            let suggested = &*(lparam.0 as *const RECT);
            let size = make_lparam(
                suggested.right - suggested.left,
                suggested.bottom - suggested.top,
            );
            call_original(hook, hwnd, WM_SIZE, WPARAM(SIZE_MAXIMIZED), size);
        }
        result
    }
}

unsafe fn send_to_client_area(hwnd: HWND, msg: u32, lparam: LPARAM) {
    unsafe {
        if let Some((x, y)) = window_coordinates(hwnd, lparam) {
            SendMessageW(hwnd, msg, Some(WPARAM(0)), Some(make_lparam(x, y)));
        }
    }
}

// Opens the menu Windows shows for Alt+Space at a screen position.
unsafe fn open_system_menu(hwnd: HWND, x: i32, y: i32) {
    unsafe {
        let menu = GetSystemMenu(hwnd, false);
        if menu.is_invalid() {
            log::debug!("Win32Hook: {hwnd:?} has no system menu.");
            return;
        }

        let state = SystemMenuState::for_window(
            IsZoomed(hwnd).as_bool(),
            has_style(hwnd, WS_THICKFRAME.0),
            has_style(hwnd, WS_MINIMIZEBOX.0),
            has_style(hwnd, WS_MAXIMIZEBOX.0),
        );
        for (item, enabled) in [
            (SC_RESTORE, state.restore),
            (SC_MOVE, state.move_window),
            (SC_SIZE, state.size),
            (SC_MINIMIZE, state.minimize),
            (SC_MAXIMIZE, state.maximize),
            (SC_CLOSE, state.close),
        ] {
            let info = MENUITEMINFOW {
                cbSize: size_of::<MENUITEMINFOW>() as u32,
                fMask: MIIM_STATE,
                fState: if enabled { MFS_ENABLED } else { MFS_DISABLED },
                ..Default::default()
            };
            let _ = SetMenuItemInfoW(menu, item, false, &info);
        }
        let _ = SetMenuDefaultItem(menu, SC_CLOSE, 0);

        let command = TrackPopupMenu(menu, TPM_RETURNCMD, x, y, None, hwnd, None).0;
        if command != 0
            && let Err(err) = PostMessageW(
                Some(hwnd),
                WM_SYSCOMMAND,
                WPARAM(command as usize),
                LPARAM(0),
            )
        {
            log::warn!("Win32Hook: posting system command {command} failed: {err}");
        }
    }
}

unsafe fn erase_background(hook: &WindowHook, hwnd: HWND, wparam: WPARAM) -> LRESULT {
    let brush = hook.native_background();
    if brush == 0 {
        return LRESULT(0);
    }
    unsafe {
        let hdc = HDC(wparam.0 as *mut c_void);
        let mut rect = RECT::default();
        if GetClientRect(hwnd, &mut rect).is_err() {
            return LRESULT(0);
        }
        FillRect(hdc, &rect, HBRUSH(brush as *mut c_void));
    }
    LRESULT(1)
}

fn has_style(hwnd: HWND, style: u32) -> bool {
    (unsafe { GetWindowLongW(hwnd, GWL_STYLE) } as u32 & style) != 0
}

// There is no SM_CYPADDEDBORDER; the X metric applies to both axes.
fn resize_handle_height(hwnd: HWND) -> i32 {
    unsafe {
        let dpi = GetDpiForWindow(hwnd);
        GetSystemMetricsForDpi(SM_CXPADDEDBORDER, dpi) + GetSystemMetricsForDpi(SM_CYSIZEFRAME, dpi)
    }
}

// Screen coordinates in `lparam` relative to the window's top-left corner.
fn window_coordinates(hwnd: HWND, lparam: LPARAM) -> Option<(i32, i32)> {
    let mut window_rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut window_rect) }.ok()?;
    Some((
        x_from_lparam(lparam) - window_rect.left,
        y_from_lparam(lparam) - window_rect.top,
    ))
}

#[inline]
fn x_from_lparam(lparam: LPARAM) -> i32 {
    (lparam.0 & 0xFFFF) as i16 as i32
}

#[inline]
fn y_from_lparam(lparam: LPARAM) -> i32 {
    ((lparam.0 >> 16) & 0xFFFF) as i16 as i32
}

#[inline]
fn make_lparam(low: i32, high: i32) -> LPARAM {
    LPARAM((((high as u32 & 0xFFFF) << 16) | (low as u32 & 0xFFFF)) as i32 as isize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lparam_coordinates_are_signed() {
        // (-10, 20) packed as two 16-bit words.
        let lparam = LPARAM(((20_isize) << 16) | (0xFFF6_isize));
        assert_eq!(x_from_lparam(lparam), -10);
        assert_eq!(y_from_lparam(lparam), 20);
    }

    #[test]
    fn packed_lparam_unpacks_to_same_point() {
        let lparam = make_lparam(-8, 1440);
        assert_eq!(x_from_lparam(lparam), -8);
        assert_eq!(y_from_lparam(lparam), 1440);
    }

    #[test]
    fn rect_bounds_are_applied_field_by_field() {
        // Arrange
        let mut rect = RECT {
            left: 0,
            top: 8,
            right: 1920,
            bottom: 1040,
        };
        let edges = AutohideEdges {
            bottom: true,
            ..AutohideEdges::default()
        };

        // Act
        let trimmed = edges.inset(bounds_from_rect(&rect));
        apply_bounds(&mut rect, trimmed);

        // Assert
        assert_eq!(
            rect,
            RECT {
                left: 0,
                top: 8,
                right: 1920,
                bottom: 1039,
            }
        );
    }

    #[test]
    fn hwnd_round_trips_through_window_handle() {
        let hwnd = HWND(0x1234 as *mut c_void);
        let handle: WindowHandle = hwnd.into();
        assert_eq!(handle, WindowHandle(0x1234));
        assert_eq!(HWND::from(handle), hwnd);
    }
}
