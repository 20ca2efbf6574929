//! Window layers.
//!
//! Every window is assigned to exactly one layer, which determines its coarse
//! stacking position. The fine-grained order within a layer is decided by the
//! user-requested stacking order.

use tracing::trace;

use crate::space::Space;
use crate::window::{Control, Window, WindowId};

/// Stacking layers, from bottom to top.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, Debug)]
pub enum Layer {
    /// Windows outside of window management.
    Unmanaged,
    Desktop,
    Below,
    Normal,
    Popup,
    Dock,
    Above,
    Notification,
    /// Active fullscreen windows.
    Active,
    /// Notifications important enough to cover fullscreen windows.
    CriticalNotification,
    /// Immediate feedback for user actions, like volume changes.
    OnScreenDisplay,
}

impl Layer {
    /// Number of layers.
    pub const COUNT: usize = 11;

    /// All layers, from bottom to top.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Unmanaged,
        Self::Desktop,
        Self::Below,
        Self::Normal,
        Self::Popup,
        Self::Dock,
        Self::Above,
        Self::Notification,
        Self::Active,
        Self::CriticalNotification,
        Self::OnScreenDisplay,
    ];

    /// Position of the layer, starting at zero for the bottom layer.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Layer of panels and applet popups.
///
/// Panels with `keep_below` only move to the normal layer, so they can still
/// be raised above windows covering them.
fn layer_for_dock(control: Option<&Control>) -> Layer {
    match control {
        Some(control) if control.keep_below => Layer::Normal,
        Some(control) if control.keep_above => Layer::Above,
        _ => Layer::Dock,
    }
}

impl Space {
    /// Layer a window belongs to based on its current state.
    ///
    /// While showing the desktop, desktop windows move to the above layer and
    /// panels to the notification layer; active fullscreen windows still cover
    /// both.
    pub fn classify(&self, window: &Window) -> Layer {
        self.layer_computations.set(self.layer_computations.get() + 1);

        if window.is_internal() || window.is_lock_screen() || window.is_unmanaged() {
            return Layer::Unmanaged;
        }
        if window.is_desktop() {
            return if self.showing_desktop { Layer::Above } else { Layer::Desktop };
        }
        if window.is_splash() {
            return Layer::Normal;
        }
        if window.is_popup() {
            return Layer::Popup;
        }
        if window.is_dock() || window.is_applet_popup() {
            if self.showing_desktop {
                return Layer::Notification;
            }
            return layer_for_dock(window.control());
        }
        if window.is_on_screen_display() {
            return Layer::OnScreenDisplay;
        }
        if window.is_notification() {
            return Layer::Notification;
        }
        if window.is_critical_notification() {
            return Layer::CriticalNotification;
        }
        if self.showing_desktop && self.belongs_to_desktop(window) {
            return Layer::Above;
        }
        if window.keep_below() {
            return Layer::Below;
        }
        if self.is_active_fullscreen(window) {
            return Layer::Active;
        }
        if window.keep_above() {
            return Layer::Above;
        }
        Layer::Normal
    }

    /// Check if a window is the fullscreen window related to the most recently
    /// activated window.
    ///
    /// This is the case if the activated window is the window itself, one of
    /// its transients, or if it lives on a different output.
    pub fn is_active_fullscreen(&self, window: &Window) -> bool {
        if !window.is_fullscreen() {
            return false;
        }

        let activated = match self.activation.most_recently_activated() {
            Some(activated) => activated,
            None => return false,
        };

        if activated == window.id() {
            return true;
        }

        match self.windows.get(&activated) {
            Some(activated) => {
                activated.central_output != window.central_output
                    || activated.transient.lead == Some(window.id())
            },
            None => false,
        }
    }

    /// Check if a window shares its window group with a desktop window.
    fn belongs_to_desktop(&self, window: &Window) -> bool {
        let group = match window.group() {
            Some(group) => group,
            None => return false,
        };

        self.windows.values().any(|other| other.group() == Some(group) && other.is_desktop())
    }

    /// Current layer of a window.
    ///
    /// Returns `None` if the window does not exist.
    pub fn get_layer(&self, window: WindowId) -> Option<Layer> {
        self.windows.get(&window).map(|window| self.window_layer(window))
    }

    /// Current layer of a window, using the cache when possible.
    pub(crate) fn window_layer(&self, window: &Window) -> Layer {
        // Annexed transients always follow their lead.
        if window.transient.annexed {
            if let Some(lead) = window.transient.lead.and_then(|lead| self.windows.get(&lead)) {
                return self.window_layer(lead);
            }
        }

        match window.layer.get() {
            Some(layer) => layer,
            None => {
                let layer = self.classify(window);
                window.layer.set(Some(layer));
                layer
            },
        }
    }

    /// Clear a window's cached layer.
    pub fn invalidate_layer(&self, window: WindowId) {
        if let Some(window) = self.windows.get(&window) {
            window.layer.set(None);
        }
    }

    /// Move a window and its transients to their new layer.
    ///
    /// This should be called whenever any state affecting the layer of a
    /// window has changed.
    pub fn update_layer(&mut self, window: WindowId) {
        let win = match self.windows.get(&window) {
            Some(win) => win,
            None => return,
        };

        if self.window_layer(win) == self.classify(win) {
            return;
        }

        trace!("Updating layer of {:?}", win.name());

        let children = win.transient.children.clone();

        // Stacking order is updated once the last child was invalidated.
        let mut space = self.block_updates();

        space.invalidate_layer(window);

        for child in children {
            // Annexed children follow their lead automatically.
            let annexed = space.windows.get(&child).map_or(true, |child| child.transient.annexed);
            if !annexed {
                space.update_layer(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::window::{GroupId, WindowAttributes, WindowKind};

    fn spawn(space: &mut Space, attributes: WindowAttributes) -> WindowId {
        let window = space.add_window(attributes);
        space.show_window(window);
        window
    }

    fn kind(kind: WindowKind) -> WindowAttributes {
        WindowAttributes { kind, ..WindowAttributes::new(kind.to_string()) }
    }

    #[test]
    fn layer_order() {
        assert!(Layer::ALL.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(Layer::Normal < Layer::Popup && Layer::Popup < Layer::Dock);
        assert_eq!(Layer::OnScreenDisplay.index(), Layer::COUNT - 1);
    }

    #[test]
    fn window_kinds() {
        let mut space = Space::new(Config::default());

        let cases = [
            (WindowKind::Normal, Layer::Normal),
            (WindowKind::Dialog, Layer::Normal),
            (WindowKind::Internal, Layer::Unmanaged),
            (WindowKind::LockScreen, Layer::Unmanaged),
            (WindowKind::Unmanaged, Layer::Unmanaged),
            (WindowKind::Desktop, Layer::Desktop),
            (WindowKind::Splash, Layer::Normal),
            (WindowKind::Popup, Layer::Popup),
            (WindowKind::Dock, Layer::Dock),
            (WindowKind::AppletPopup, Layer::Dock),
            (WindowKind::OnScreenDisplay, Layer::OnScreenDisplay),
            (WindowKind::Notification, Layer::Notification),
            (WindowKind::CriticalNotification, Layer::CriticalNotification),
        ];

        for (window_kind, layer) in cases {
            let window = spawn(&mut space, kind(window_kind));
            assert_eq!(space.get_layer(window), Some(layer), "{window_kind}");
        }
    }

    #[test]
    fn keep_below_dock() {
        let mut space = Space::new(Config::default());

        let attributes = WindowAttributes { keep_below: true, ..kind(WindowKind::Dock) };
        let dock = spawn(&mut space, attributes);
        assert_eq!(space.get_layer(dock), Some(Layer::Normal));

        let attributes = WindowAttributes { keep_above: true, ..kind(WindowKind::Dock) };
        let dock = spawn(&mut space, attributes);
        assert_eq!(space.get_layer(dock), Some(Layer::Above));
    }

    #[test]
    fn keep_flags() {
        let mut space = Space::new(Config::default());

        let window = spawn(&mut space, WindowAttributes::new("window"));
        assert_eq!(space.get_layer(window), Some(Layer::Normal));

        space.set_keep_above(window, true);
        assert_eq!(space.get_layer(window), Some(Layer::Above));

        space.set_keep_below(window, true);
        assert_eq!(space.get_layer(window), Some(Layer::Below));
        assert!(!space.window(window).unwrap().keep_above());

        space.set_keep_below(window, false);
        assert_eq!(space.get_layer(window), Some(Layer::Normal));
    }

    #[test]
    fn showing_desktop() {
        let mut space = Space::new(Config::default());

        let desktop = spawn(&mut space, WindowAttributes {
            group: Some(GroupId(7)),
            ..kind(WindowKind::Desktop)
        });
        let dock = spawn(&mut space, kind(WindowKind::Dock));
        let settings = spawn(&mut space, WindowAttributes {
            group: Some(GroupId(7)),
            keep_below: true,
            ..WindowAttributes::new("desktop settings")
        });
        let window = spawn(&mut space, WindowAttributes::new("window"));

        space.set_showing_desktop(true);
        assert_eq!(space.get_layer(desktop), Some(Layer::Above));
        assert_eq!(space.get_layer(dock), Some(Layer::Notification));
        assert_eq!(space.get_layer(settings), Some(Layer::Above));
        assert_eq!(space.get_layer(window), Some(Layer::Normal));

        space.set_showing_desktop(false);
        assert_eq!(space.get_layer(desktop), Some(Layer::Desktop));
        assert_eq!(space.get_layer(dock), Some(Layer::Dock));
        assert_eq!(space.get_layer(settings), Some(Layer::Below));
    }

    #[test]
    fn active_fullscreen() {
        let mut space = Space::new(Config::default());

        let video = spawn(&mut space, WindowAttributes {
            fullscreen: true,
            keep_above: true,
            ..WindowAttributes::new("video")
        });
        let editor = spawn(&mut space, WindowAttributes::new("editor"));

        // Fullscreen without activation is treated like any other window.
        assert_eq!(space.get_layer(video), Some(Layer::Above));

        space.activate(video);
        assert_eq!(space.get_layer(video), Some(Layer::Active));

        space.activate(editor);
        assert_eq!(space.get_layer(video), Some(Layer::Above));

        // Pending activation requests take precedence.
        space.request_focus(video);
        assert_eq!(space.get_layer(video), Some(Layer::Active));
    }

    #[test]
    fn fullscreen_lead_of_active_dialog() {
        let mut space = Space::new(Config::default());

        let video = spawn(&mut space, WindowAttributes {
            fullscreen: true,
            ..WindowAttributes::new("video")
        });
        let dialog = spawn(&mut space, WindowAttributes::new("dialog"));
        space.set_transient_lead(dialog, Some(video), false);

        space.activate(dialog);
        assert_eq!(space.get_layer(video), Some(Layer::Active));
        assert_eq!(space.get_layer(dialog), Some(Layer::Normal));
    }

    #[test]
    fn annexed_delegation() {
        let mut space = Space::new(Config::default());

        let lead = spawn(&mut space, WindowAttributes::new("lead"));
        let child = spawn(&mut space, WindowAttributes {
            keep_below: true,
            ..WindowAttributes::new("child")
        });
        space.set_transient_lead(child, Some(lead), true);
        assert_eq!(space.get_layer(child), Some(Layer::Normal));

        space.set_keep_above(lead, true);
        assert_eq!(space.get_layer(child), Some(Layer::Above));
        assert_eq!(space.get_layer(child), space.get_layer(lead));

        // Annexed transients are stacked with their lead.
        assert!(!space.pre_stack().contains(&child));
        assert!(space.window(child).unwrap().cached_layer().is_none());
    }

    #[test]
    fn cached_layer() {
        let mut space = Space::new(Config::default());
        let window = spawn(&mut space, WindowAttributes::new("window"));

        let _ = space.get_layer(window);
        let computations = space.layer_computations();

        assert_eq!(space.get_layer(window), Some(Layer::Normal));
        assert_eq!(space.get_layer(window), Some(Layer::Normal));
        assert_eq!(space.layer_computations(), computations);

        space.invalidate_layer(window);
        assert_eq!(space.get_layer(window), Some(Layer::Normal));
        assert_eq!(space.layer_computations(), computations + 1);
    }

    #[test]
    fn update_layer_cascades() {
        let mut space = Space::new(Config::default());

        let video = spawn(&mut space, WindowAttributes {
            fullscreen: true,
            ..WindowAttributes::new("video")
        });
        let dialog = spawn(&mut space, WindowAttributes::new("dialog"));
        space.set_transient_lead(dialog, Some(video), false);
        space.activate(video);

        assert_eq!(space.get_layer(video), Some(Layer::Active));
        assert_eq!(space.get_layer(dialog), Some(Layer::Normal));

        let rebuilds = space.stacking().rebuilds();

        space.control_mut(video).unwrap().keep_below = true;
        space.update_layer(video);

        assert_eq!(space.stacking().rebuilds(), rebuilds + 1);
        assert_eq!(space.get_layer(video), Some(Layer::Below));
        assert_eq!(space.get_layer(dialog), Some(Layer::Normal));

        // Unchanged layers do not trigger a rebuild.
        space.update_layer(video);
        space.update_layer(dialog);
        assert_eq!(space.stacking().rebuilds(), rebuilds + 1);
    }

    #[test]
    fn missing_window() {
        let mut space = Space::new(Config::default());
        let window = spawn(&mut space, WindowAttributes::new("window"));
        space.remove_window(window);

        assert_eq!(space.get_layer(window), None);
        space.update_layer(window);
        space.invalidate_layer(window);
    }
}
