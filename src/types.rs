/*
 * Platform-agnostic value types used across the crate. Nothing here touches
 * Win32 except the `HWND` conversions, which are compiled only on Windows.
 */

/// Default number of slots allocated on the registry's first insertion.
pub const DEFAULT_INITIAL_CAPACITY: usize = 20;
/// Extra slots added on top of the required size whenever the registry grows.
pub const DEFAULT_CAPACITY_INCREMENT: usize = 10;

/// `WM_SIZE` wparam values, mirrored here so the override logic stays portable.
pub const SIZE_MINIMIZED: usize = 1;
pub const SIZE_MAXIMIZED: usize = 2;

/*
 * Opaque native window identifier. Handles are compared by their integer value,
 * which is what keeps the registry's table ordered.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn raw(self) -> isize {
        self.0
    }
}

#[cfg(target_os = "windows")]
impl From<windows::Win32::Foundation::HWND> for WindowHandle {
    fn from(hwnd: windows::Win32::Foundation::HWND) -> Self {
        WindowHandle(hwnd.0 as isize)
    }
}

#[cfg(target_os = "windows")]
impl From<WindowHandle> for windows::Win32::Foundation::HWND {
    fn from(handle: WindowHandle) -> Self {
        windows::Win32::Foundation::HWND(handle.0 as *mut std::ffi::c_void)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub initial_capacity: usize,
    pub capacity_increment: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            capacity_increment: DEFAULT_CAPACITY_INCREMENT,
        }
    }
}

/*
 * Extended frame state bits as reported by the managed toolkit
 * (iconified, maximized horizontally and vertically).
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameState(pub i32);

impl FrameState {
    pub const NORMAL: FrameState = FrameState(0);
    pub const ICONIFIED: FrameState = FrameState(1);
    pub const MAXIMIZED_HORIZ: FrameState = FrameState(2);
    pub const MAXIMIZED_VERT: FrameState = FrameState(4);
    pub const MAXIMIZED_BOTH: FrameState = FrameState(2 | 4);

    pub fn contains(self, other: FrameState) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn size_override(self) -> SizeOverride {
        if (self.0 & Self::ICONIFIED.0) != 0 {
            SizeOverride::Minimized
        } else if self.contains(Self::MAXIMIZED_BOTH) {
            SizeOverride::Maximized
        } else {
            SizeOverride::Unchanged
        }
    }
}

/*
 * Recomputing the frame makes Windows send WM_SIZE(SIZE_RESTORED) even though the
 * size did not change. The toolkit would read that as "restored" and drop its
 * maximized/iconified state, so the hook rewrites the wparam while a frame update
 * is in flight.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeOverride {
    #[default]
    Unchanged,
    Minimized,
    Maximized,
}

impl SizeOverride {
    pub fn wparam(self) -> Option<usize> {
        match self {
            SizeOverride::Unchanged => None,
            SizeOverride::Minimized => Some(SIZE_MINIMIZED),
            SizeOverride::Maximized => Some(SIZE_MAXIMIZED),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    // Win32 COLORREF is laid out as 0x00BBGGRR.
    pub fn to_colorref_value(self) -> u32 {
        (self.r as u32) | ((self.g as u32) << 8) | ((self.b as u32) << 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iconified_wins_over_maximized() {
        let state = FrameState(FrameState::ICONIFIED.0 | FrameState::MAXIMIZED_BOTH.0);
        assert_eq!(state.size_override(), SizeOverride::Minimized);
        assert_eq!(state.size_override().wparam(), Some(SIZE_MINIMIZED));
    }

    #[test]
    fn maximized_requires_both_directions() {
        assert_eq!(
            FrameState::MAXIMIZED_BOTH.size_override(),
            SizeOverride::Maximized
        );
        assert_eq!(
            FrameState::MAXIMIZED_HORIZ.size_override(),
            SizeOverride::Unchanged
        );
        assert_eq!(FrameState::NORMAL.size_override().wparam(), None);
    }

    #[test]
    fn handles_order_by_integer_value() {
        assert!(WindowHandle(-5) < WindowHandle(0));
        assert!(WindowHandle(0x10) < WindowHandle(0x200));
        assert!(WindowHandle::NULL.is_null());
    }

    #[test]
    fn rgb_packs_as_bgr() {
        assert_eq!(Rgb::new(0x11, 0x22, 0x33).to_colorref_value(), 0x0033_2211);
    }
}
