//! Managed window state.

use std::cell::Cell;

use calloop::RegistrationToken;
use smithay::utils::{Logical, Rectangle};
pub use strata_script::WindowKind;

use crate::layer::Layer;
use crate::output::OutputId;

/// Stable window handle.
///
/// Handles are never reused, so a handle of a destroyed window simply fails to
/// resolve.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, Debug)]
pub struct WindowId(u64);

impl WindowId {
    pub(crate) const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Application owning a window.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Default, Debug)]
pub struct ClientId(pub u32);

/// Window group, usually one per application instance.
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub struct GroupId(pub u32);

/// Virtual desktop placement.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Desktop {
    All,
    Number(u32),
}

impl Desktop {
    /// Check if this placement includes the specified desktop.
    pub fn contains(self, desktop: u32) -> bool {
        match self {
            Self::All => true,
            Self::Number(number) => number == desktop,
        }
    }
}

impl From<Option<u32>> for Desktop {
    fn from(desktop: Option<u32>) -> Self {
        desktop.map_or(Self::All, Self::Number)
    }
}

/// Window management state.
///
/// Only present for windows under full window management control.
#[derive(Debug, Default)]
pub struct Control {
    pub keep_above: bool,
    pub keep_below: bool,
    pub fullscreen: bool,

    /// Pending auto-raise timer.
    pub(crate) auto_raise_timer: Option<RegistrationToken>,
}

/// Transient relationships.
#[derive(Clone, Default, Debug)]
pub struct Transient {
    /// Window this one is a transient for.
    pub lead: Option<WindowId>,

    /// Windows which are transient for this one.
    pub children: Vec<WindowId>,

    /// Annexed transients share their lead's layer and stacking position.
    pub annexed: bool,
}

/// Initial window attributes.
#[derive(Clone, Debug)]
pub struct WindowAttributes {
    pub name: String,
    pub kind: WindowKind,
    pub client: ClientId,
    pub group: Option<GroupId>,
    pub desktop: Desktop,
    pub geometry: Rectangle<i32, Logical>,
    pub accepts_focus: bool,
    pub keep_above: bool,
    pub keep_below: bool,
    pub fullscreen: bool,
}

impl WindowAttributes {
    /// Normal window attributes on the first desktop.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desktop: Desktop::Number(1),
            accepts_focus: true,
            kind: Default::default(),
            client: Default::default(),
            geometry: Default::default(),
            keep_above: Default::default(),
            keep_below: Default::default(),
            fullscreen: Default::default(),
            group: Default::default(),
        }
    }
}

/// Window as seen by the stacking engine.
#[derive(Debug)]
pub struct Window {
    pub(crate) control: Option<Control>,
    pub(crate) transient: Transient,
    pub(crate) central_output: Option<OutputId>,
    pub(crate) geometry: Rectangle<i32, Logical>,
    pub(crate) desktop: Desktop,
    pub(crate) shown: bool,

    /// Cached layer, `None` if it needs to be recomputed.
    pub(crate) layer: Cell<Option<Layer>>,

    id: WindowId,
    name: String,
    kind: WindowKind,
    client: ClientId,
    group: Option<GroupId>,
    accepts_focus: bool,
}

impl Window {
    pub(crate) fn new(
        id: WindowId,
        attributes: WindowAttributes,
        central_output: Option<OutputId>,
    ) -> Self {
        let control = (attributes.kind != WindowKind::Unmanaged).then(|| Control {
            keep_below: attributes.keep_below && !attributes.keep_above,
            keep_above: attributes.keep_above,
            fullscreen: attributes.fullscreen,
            auto_raise_timer: None,
        });

        Self {
            control,
            central_output,
            id,
            accepts_focus: attributes.accepts_focus,
            geometry: attributes.geometry,
            desktop: attributes.desktop,
            client: attributes.client,
            group: attributes.group,
            kind: attributes.kind,
            name: attributes.name,
            transient: Default::default(),
            shown: Default::default(),
            layer: Default::default(),
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn desktop(&self) -> Desktop {
        self.desktop
    }

    pub fn geometry(&self) -> Rectangle<i32, Logical> {
        self.geometry
    }

    pub fn control(&self) -> Option<&Control> {
        self.control.as_ref()
    }

    pub fn transient(&self) -> &Transient {
        &self.transient
    }

    pub fn central_output(&self) -> Option<OutputId> {
        self.central_output
    }

    /// Cached layer, without recomputing it.
    pub fn cached_layer(&self) -> Option<Layer> {
        self.layer.get()
    }

    /// Check if the window is mapped.
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Check if this window's layer and position are inherited from its lead.
    pub fn is_annexed(&self) -> bool {
        self.transient.annexed && self.transient.lead.is_some()
    }

    pub fn is_on_desktop(&self, desktop: u32) -> bool {
        self.desktop.contains(desktop)
    }

    pub fn keep_above(&self) -> bool {
        self.control.as_ref().map_or(false, |control| control.keep_above)
    }

    pub fn keep_below(&self) -> bool {
        self.control.as_ref().map_or(false, |control| control.keep_below)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.control.as_ref().map_or(false, |control| control.fullscreen)
    }

    pub fn is_desktop(&self) -> bool {
        self.kind == WindowKind::Desktop
    }

    pub fn is_dock(&self) -> bool {
        self.kind == WindowKind::Dock
    }

    pub fn is_splash(&self) -> bool {
        self.kind == WindowKind::Splash
    }

    pub fn is_popup(&self) -> bool {
        self.kind == WindowKind::Popup
    }

    pub fn is_notification(&self) -> bool {
        self.kind == WindowKind::Notification
    }

    pub fn is_critical_notification(&self) -> bool {
        self.kind == WindowKind::CriticalNotification
    }

    pub fn is_on_screen_display(&self) -> bool {
        self.kind == WindowKind::OnScreenDisplay
    }

    pub fn is_applet_popup(&self) -> bool {
        self.kind == WindowKind::AppletPopup
    }

    pub fn is_unmanaged(&self) -> bool {
        self.kind == WindowKind::Unmanaged
    }

    pub fn is_internal(&self) -> bool {
        self.kind == WindowKind::Internal
    }

    pub fn is_lock_screen(&self) -> bool {
        self.kind == WindowKind::LockScreen
    }

    /// Windows which never become the topmost "normal" window.
    pub fn is_special(&self) -> bool {
        matches!(
            self.kind,
            WindowKind::Desktop
                | WindowKind::Dock
                | WindowKind::Splash
                | WindowKind::Toolbar
                | WindowKind::Notification
                | WindowKind::CriticalNotification
                | WindowKind::OnScreenDisplay
        )
    }

    /// Check if the window takes part in focus cycling.
    pub fn wants_tab_focus(&self) -> bool {
        matches!(self.kind, WindowKind::Normal | WindowKind::Dialog) && self.accepts_focus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_keep_flags() {
        let attributes = WindowAttributes {
            keep_above: true,
            keep_below: true,
            ..WindowAttributes::new("both")
        };
        let window = Window::new(WindowId::new(0), attributes, None);
        assert!(window.keep_above());
        assert!(!window.keep_below());

        let attributes =
            WindowAttributes { kind: WindowKind::Unmanaged, ..WindowAttributes::new("menu") };
        let window = Window::new(WindowId::new(1), attributes, None);
        assert!(window.control().is_none());
        assert!(!window.keep_above());
    }

    #[test]
    fn tab_focus() {
        let window = |kind, accepts_focus| {
            let attributes = WindowAttributes { kind, accepts_focus, ..WindowAttributes::new("") };
            Window::new(WindowId::new(0), attributes, None)
        };

        assert!(window(WindowKind::Normal, true).wants_tab_focus());
        assert!(window(WindowKind::Dialog, true).wants_tab_focus());
        assert!(!window(WindowKind::Normal, false).wants_tab_focus());
        assert!(!window(WindowKind::Utility, true).wants_tab_focus());

        assert!(window(WindowKind::Dock, true).is_special());
        assert!(!window(WindowKind::Popup, true).is_special());
    }

    #[test]
    fn desktop_placement() {
        assert!(Desktop::All.contains(4));
        assert!(Desktop::Number(2).contains(2));
        assert!(!Desktop::Number(2).contains(1));
        assert_eq!(Desktop::from(None), Desktop::All);
        assert_eq!(Desktop::from(Some(3)), Desktop::Number(3));
    }
}
