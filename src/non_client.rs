/*
 * Decisions the hooked window procedure makes about the non-client area: which
 * hit-test results are forwarded to the client area, what the system menu offers,
 * and how the frame of a maximized window is trimmed around auto-hide taskbars.
 *
 * Everything here is plain data in, plain data out, so the Win32 binding only has
 * to gather inputs and apply the result.
 */

// Win32 `HT*` hit-test codes.
pub const HIT_TEST_CLIENT: i32 = 1;
pub const HIT_TEST_CAPTION: i32 = 2;
pub const HIT_TEST_SYSMENU: i32 = 3;
pub const HIT_TEST_MIN_BUTTON: i32 = 8;
pub const HIT_TEST_MAX_BUTTON: i32 = 9;
pub const HIT_TEST_TOP: i32 = 12;
pub const HIT_TEST_CLOSE: i32 = 20;

/// First Windows 11 build; from here on the visible frame border is added to the top inset.
pub const WINDOWS_11_FIRST_BUILD: u32 = 22000;

/*
 * Hit-test result used when the application handler has no answer for a point:
 * the top resize strip stays resizable, everything else is client area.
 */
pub fn default_hit_test(is_on_resize_border: bool) -> i32 {
    if is_on_resize_border {
        HIT_TEST_TOP
    } else {
        HIT_TEST_CLIENT
    }
}

fn is_caption_button(hit_test: i32) -> bool {
    matches!(
        hit_test,
        HIT_TEST_MIN_BUTTON | HIT_TEST_MAX_BUTTON | HIT_TEST_CLOSE
    )
}

/*
 * Non-client mouse moves over the caption and its buttons are mirrored to the
 * client area, where the application paints its own title bar. Windows 11 snap
 * layouts need the maximize button to be reported as such by hit testing, which
 * otherwise hides these moves from the client.
 */
pub fn forwards_mouse_move(hit_test: i32) -> bool {
    is_caption_button(hit_test) || matches!(hit_test, HIT_TEST_CAPTION | HIT_TEST_SYSMENU)
}

// Button presses are forwarded and swallowed only over the caption buttons.
pub fn forwards_button(hit_test: i32) -> bool {
    is_caption_button(hit_test)
}

pub fn opens_system_menu(hit_test: i32) -> bool {
    matches!(hit_test, HIT_TEST_CAPTION | HIT_TEST_SYSMENU)
}

pub fn needs_visible_border_inset(os_build: u32) -> bool {
    os_build >= WINDOWS_11_FIRST_BUILD
}

/// Which system menu items are enabled, matching the menu Windows shows for Alt+Space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemMenuState {
    pub restore: bool,
    pub move_window: bool,
    pub size: bool,
    pub minimize: bool,
    pub maximize: bool,
    pub close: bool,
}

impl SystemMenuState {
    pub fn for_window(
        is_maximized: bool,
        has_thick_frame: bool,
        has_minimize_box: bool,
        has_maximize_box: bool,
    ) -> Self {
        Self {
            restore: is_maximized,
            move_window: !is_maximized,
            size: has_thick_frame && !is_maximized,
            minimize: has_minimize_box,
            maximize: has_maximize_box && !is_maximized,
            close: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

// Monitor edges that host an auto-hide taskbar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutohideEdges {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl AutohideEdges {
    /*
     * A maximized window covering the whole monitor would keep an auto-hide taskbar
     * from ever popping up, so one pixel is given back on each edge that has one.
     */
    pub fn inset(self, mut client: Bounds) -> Bounds {
        if self.top {
            client.top += 1;
        }
        if self.bottom {
            client.bottom -= 1;
        }
        if self.left {
            client.left += 1;
        }
        if self.right {
            client.right -= 1;
        }
        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hit_test_keeps_top_border_resizable() {
        assert_eq!(default_hit_test(true), HIT_TEST_TOP);
        assert_eq!(default_hit_test(false), HIT_TEST_CLIENT);
    }

    #[test]
    fn caption_buttons_forward_moves_and_presses() {
        for hit in [HIT_TEST_MIN_BUTTON, HIT_TEST_MAX_BUTTON, HIT_TEST_CLOSE] {
            assert!(forwards_mouse_move(hit));
            assert!(forwards_button(hit));
            assert!(!opens_system_menu(hit));
        }
    }

    #[test]
    fn caption_forwards_moves_but_opens_menu_on_right_click() {
        for hit in [HIT_TEST_CAPTION, HIT_TEST_SYSMENU] {
            assert!(forwards_mouse_move(hit));
            assert!(!forwards_button(hit));
            assert!(opens_system_menu(hit));
        }
        assert!(!forwards_mouse_move(HIT_TEST_CLIENT));
        assert!(!opens_system_menu(HIT_TEST_TOP));
    }

    #[test]
    fn maximized_window_menu_offers_restore_only() {
        let state = SystemMenuState::for_window(true, true, true, true);
        assert_eq!(
            state,
            SystemMenuState {
                restore: true,
                move_window: false,
                size: false,
                minimize: true,
                maximize: false,
                close: true,
            }
        );
    }

    #[test]
    fn fixed_size_window_menu_disables_size_and_maximize() {
        let state = SystemMenuState::for_window(false, false, true, false);
        assert!(!state.restore);
        assert!(state.move_window);
        assert!(!state.size);
        assert!(!state.maximize);
        assert!(state.close);
    }

    #[test]
    fn autohide_inset_trims_only_taskbar_edges() {
        // Arrange
        let client = Bounds {
            left: 0,
            top: 0,
            right: 1920,
            bottom: 1080,
        };
        let edges = AutohideEdges {
            bottom: true,
            left: true,
            ..AutohideEdges::default()
        };

        // Act
        let trimmed = edges.inset(client);

        // Assert
        assert_eq!(
            trimmed,
            Bounds {
                left: 1,
                top: 0,
                right: 1920,
                bottom: 1079,
            }
        );
        assert_eq!(AutohideEdges::default().inset(client), client);
    }

    #[test]
    fn border_inset_starts_with_windows_11() {
        assert!(!needs_visible_border_inset(19045));
        assert!(needs_visible_border_inset(WINDOWS_11_FIRST_BUILD));
        assert!(needs_visible_border_inset(26100));
    }
}
