//! Window management domain state.

use std::cell::Cell;
use std::fmt::{self, Debug, Formatter};
use std::mem;

use calloop::timer::{TimeoutAction, Timer};
use calloop::LoopHandle;
use indexmap::IndexMap;
use smithay::utils::{Logical, Rectangle};
use tracing::{debug, warn};

use crate::config::Config;
use crate::focus::{Activation, FocusChain};
use crate::output::{OutputId, Outputs};
use crate::stacking::{StackingOrder, UpdateBlocker};
use crate::window::{Control, Desktop, Window, WindowAttributes, WindowId};

/// Container for all windows and their stacking state.
pub struct Space {
    /// All known windows, in creation order.
    pub(crate) windows: IndexMap<WindowId, Window>,
    pub(crate) stacking: StackingOrder,
    pub(crate) activation: Activation,
    pub(crate) focus_chain: FocusChain,
    pub(crate) showing_desktop: bool,
    pub(crate) current_desktop: u32,
    pub(crate) config: Config,

    /// Number of layer classifications performed.
    pub(crate) layer_computations: Cell<u64>,

    event_loop: Option<LoopHandle<'static, Space>>,
    outputs: Outputs,
    next_window_id: u64,
}

impl Debug for Space {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Space")
            .field("windows", &self.windows)
            .field("stacking", &self.stacking)
            .field("activation", &self.activation)
            .field("focus_chain", &self.focus_chain)
            .field("showing_desktop", &self.showing_desktop)
            .field("current_desktop", &self.current_desktop)
            .field("config", &self.config)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

impl Space {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            current_desktop: 1,
            layer_computations: Default::default(),
            showing_desktop: Default::default(),
            next_window_id: Default::default(),
            focus_chain: Default::default(),
            activation: Default::default(),
            event_loop: Default::default(),
            stacking: Default::default(),
            windows: Default::default(),
            outputs: Default::default(),
        }
    }

    /// Attach an event loop for auto-raise timers.
    pub fn set_event_loop(&mut self, event_loop: LoopHandle<'static, Space>) {
        self.event_loop = Some(event_loop);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    pub fn window(&self, window: WindowId) -> Option<&Window> {
        self.windows.get(&window)
    }

    /// All windows in creation order.
    pub fn windows(&self) -> impl Iterator<Item = &Window> {
        self.windows.values()
    }

    /// Find a window by its name.
    pub fn find_window(&self, name: &str) -> Option<WindowId> {
        self.windows.values().find(|window| window.name() == name).map(Window::id)
    }

    /// Window management state of a window.
    ///
    /// Call [`Space::update_layer`] after changing anything.
    pub fn control_mut(&mut self, window: WindowId) -> Option<&mut Control> {
        self.windows.get_mut(&window)?.control.as_mut()
    }

    pub fn stacking(&self) -> &StackingOrder {
        &self.stacking
    }

    pub fn stacking_mut(&mut self) -> &mut StackingOrder {
        &mut self.stacking
    }

    /// Constrained stacking order, bottom to top.
    pub fn stack(&self) -> &[WindowId] {
        self.stacking.stack()
    }

    /// Requested stacking order, bottom to top.
    pub fn pre_stack(&self) -> &[WindowId] {
        self.stacking.pre_stack()
    }

    pub fn most_recently_raised(&self) -> Option<WindowId> {
        self.stacking.most_recently_raised
    }

    pub fn focus_chain(&self) -> &FocusChain {
        &self.focus_chain
    }

    pub fn active_window(&self) -> Option<WindowId> {
        self.activation.active()
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    pub fn showing_desktop(&self) -> bool {
        self.showing_desktop
    }

    pub fn current_desktop(&self) -> u32 {
        self.current_desktop
    }

    /// Number of layer classifications performed so far.
    pub fn layer_computations(&self) -> u64 {
        self.layer_computations.get()
    }

    /// Defer stacking order updates until the returned blocker is dropped.
    pub fn block_updates(&mut self) -> UpdateBlocker<'_> {
        UpdateBlocker::new(self)
    }

    /// Rebuild the constrained stacking order.
    ///
    /// This is deferred while updates are blocked.
    pub fn update_order(&mut self) {
        if self.stacking.is_blocked() {
            return;
        }

        let stack = self.sort_windows_by_layer(&self.stacking.pre_stack);
        self.stacking.set_stack(stack);
    }

    /// Add a new window.
    ///
    /// The window is not part of the stacking order until it is shown.
    pub fn add_window(&mut self, attributes: WindowAttributes) -> WindowId {
        let id = WindowId::new(self.next_window_id);
        self.next_window_id += 1;

        debug!("Adding window {:?} ({})", attributes.name, attributes.kind);

        let central_output = self.outputs.central_output(attributes.geometry);
        self.windows.insert(id, Window::new(id, attributes, central_output));

        id
    }

    /// Map a window, placing it on top of the stacking order.
    pub fn show_window(&mut self, window: WindowId) {
        let win = match self.windows.get_mut(&window) {
            Some(win) => win,
            None => return,
        };
        win.shown = true;

        if win.is_annexed() || self.stacking.pre_stack.contains(&window) {
            return;
        }

        let mut space = self.block_updates();
        space.stacking.pre_stack.push(window);
    }

    /// Unmap a window, retaining its stacking position.
    pub fn hide_window(&mut self, window: WindowId) {
        self.cancel_auto_raise(window);

        if let Some(window) = self.windows.get_mut(&window) {
            window.shown = false;
        }
    }

    /// Destroy a window, dropping all references to it.
    pub fn remove_window(&mut self, window: WindowId) {
        if !self.windows.contains_key(&window) {
            return;
        }

        self.cancel_auto_raise(window);

        let mut space = self.block_updates();

        let removed = match space.windows.shift_remove(&window) {
            Some(removed) => removed,
            None => return,
        };

        debug!("Removing window {:?}", removed.name());

        // Detach from the lead.
        if let Some(lead) = removed.transient.lead.and_then(|lead| space.windows.get_mut(&lead)) {
            lead.transient.children.retain(|&child| child != window);
        }

        // Orphaned annexed transients take over the lead's stacking position.
        let mut index = space.stacking.pre_stack.iter().position(|&id| id == window);
        for child in &removed.transient.children {
            let child_window = match space.windows.get_mut(child) {
                Some(child_window) => child_window,
                None => continue,
            };

            child_window.transient.lead = None;
            child_window.layer.set(None);

            let annexed = mem::take(&mut child_window.transient.annexed);
            if annexed && child_window.shown {
                match &mut index {
                    Some(index) => {
                        *index += 1;
                        space.stacking.pre_stack.insert(*index, *child);
                    },
                    None => space.stacking.pre_stack.push(*child),
                }
            }
        }

        space.stacking.remove(window);
        space.focus_chain.remove(window);

        // Fullscreen layers depend on the activation history.
        let was_active = space.activation.most_recently_activated() == Some(window);
        space.activation.remove(window);
        if was_active {
            space.update_fullscreen_layers();
        }
    }

    /// Update the transient lead of a window.
    ///
    /// Annexed transients are removed from the stacking order, since they are
    /// always stacked with their lead.
    pub fn set_transient_lead(&mut self, window: WindowId, lead: Option<WindowId>, annexed: bool) {
        if !self.windows.contains_key(&window) {
            return;
        }

        if let Some(lead) = lead {
            if !self.windows.contains_key(&lead) {
                warn!("Ignoring transient lead {lead:?}: window does not exist");
                return;
            }

            if lead == window || self.leads(lead).contains(&window) {
                warn!("Ignoring transient lead {lead:?}: would create a cycle");
                return;
            }
        }

        let mut space = self.block_updates();

        let old_lead = space.windows.get(&window).and_then(|window| window.transient.lead);
        if let Some(old_lead) = old_lead.and_then(|old_lead| space.windows.get_mut(&old_lead)) {
            old_lead.transient.children.retain(|&child| child != window);
            old_lead.layer.set(None);
        }

        if let Some(lead) = lead.and_then(|lead| space.windows.get_mut(&lead)) {
            if !lead.transient.children.contains(&window) {
                lead.transient.children.push(window);
            }
            lead.layer.set(None);
        }

        let shown = match space.windows.get_mut(&window) {
            Some(win) => {
                win.transient.lead = lead;
                win.transient.annexed = annexed && lead.is_some();
                win.layer.set(None);
                win.shown
            },
            None => return,
        };

        if annexed && lead.is_some() {
            space.stacking.pre_stack.retain(|&id| id != window);
        } else if shown && !space.stacking.pre_stack.contains(&window) {
            space.stacking.pre_stack.push(window);
        }
    }

    /// Set the keep above state; this clears keep below.
    pub fn set_keep_above(&mut self, window: WindowId, enabled: bool) {
        if let Some(control) = self.control_mut(window) {
            control.keep_above = enabled;
            control.keep_below &= !enabled;
            self.update_layer(window);
        }
    }

    /// Set the keep below state; this clears keep above.
    pub fn set_keep_below(&mut self, window: WindowId, enabled: bool) {
        if let Some(control) = self.control_mut(window) {
            control.keep_below = enabled;
            control.keep_above &= !enabled;
            self.update_layer(window);
        }
    }

    pub fn set_fullscreen(&mut self, window: WindowId, enabled: bool) {
        if let Some(control) = self.control_mut(window) {
            control.fullscreen = enabled;
            self.update_layer(window);
        }
    }

    /// Make a window the active window.
    pub fn activate(&mut self, window: WindowId) {
        if !self.windows.contains_key(&window) {
            return;
        }

        let mut space = self.block_updates();

        space.activation.set_active(Some(window));
        space.focus_chain.update(window);
        space.update_fullscreen_layers();
    }

    /// Clear the active window.
    pub fn deactivate(&mut self) {
        let mut space = self.block_updates();
        space.activation.set_active(None);
        space.update_fullscreen_layers();
    }

    /// Track a window activation which is not yet confirmed.
    pub fn request_focus(&mut self, window: WindowId) {
        if !self.windows.contains_key(&window) {
            return;
        }

        let mut space = self.block_updates();
        space.activation.request(window);
        space.update_fullscreen_layers();
    }

    /// Re-evaluate the layers of all fullscreen windows.
    fn update_fullscreen_layers(&mut self) {
        let fullscreen: Vec<_> = self
            .windows
            .values()
            .filter(|window| window.is_fullscreen())
            .map(Window::id)
            .collect();

        let mut space = self.block_updates();
        for window in fullscreen {
            space.update_layer(window);
        }
    }

    /// Toggle the "show desktop" mode.
    pub fn set_showing_desktop(&mut self, showing_desktop: bool) {
        if self.showing_desktop == showing_desktop {
            return;
        }

        self.showing_desktop = showing_desktop;

        let windows: Vec<_> = self.windows.keys().copied().collect();
        let mut space = self.block_updates();
        for window in windows {
            space.update_layer(window);
        }
    }

    pub fn set_current_desktop(&mut self, desktop: u32) {
        self.current_desktop = desktop;
    }

    pub fn set_desktop(&mut self, window: WindowId, desktop: Desktop) {
        if let Some(window) = self.windows.get_mut(&window) {
            window.desktop = desktop;
        }
    }

    /// Check if a window is visible on the current desktop.
    pub fn is_on_current_desktop(&self, window: &Window) -> bool {
        window.is_on_desktop(self.current_desktop)
    }

    /// Update a window's geometry and its central output.
    pub fn set_geometry(&mut self, window: WindowId, geometry: Rectangle<i32, Logical>) {
        let central_output = self.outputs.central_output(geometry);

        let win = match self.windows.get_mut(&window) {
            Some(win) => win,
            None => return,
        };
        win.geometry = geometry;

        if mem::replace(&mut win.central_output, central_output) != central_output {
            self.output_changed(&[window]);
        }
    }

    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        geometry: Rectangle<i32, Logical>,
    ) -> OutputId {
        let output = self.outputs.add(name, geometry);
        self.update_central_outputs();
        output
    }

    pub fn remove_output(&mut self, output: OutputId) {
        if self.outputs.remove(output).is_some() {
            self.update_central_outputs();
        }
    }

    /// Recompute the central output of all windows.
    fn update_central_outputs(&mut self) {
        let mut changed = Vec::new();
        for window in self.windows.values_mut() {
            let central_output = self.outputs.central_output(window.geometry);
            if mem::replace(&mut window.central_output, central_output) != central_output {
                changed.push(window.id());
            }
        }

        if !changed.is_empty() {
            self.output_changed(&changed);
        }
    }

    /// Update layers after windows moved to a different output.
    fn output_changed(&mut self, windows: &[WindowId]) {
        let mut space = self.block_updates();
        for &window in windows {
            space.update_layer(window);
        }
        space.update_fullscreen_layers();
    }

    /// Arm the auto-raise timer of a window.
    ///
    /// Does nothing unless auto-raise is enabled and an event loop is attached.
    pub fn start_auto_raise(&mut self, window: WindowId) {
        if !self.config.auto_raise {
            return;
        }

        let event_loop = match &self.event_loop {
            Some(event_loop) => event_loop.clone(),
            None => return,
        };

        self.cancel_auto_raise(window);

        let control = match self.windows.get_mut(&window).and_then(|win| win.control.as_mut()) {
            Some(control) => control,
            None => return,
        };

        let timer = Timer::from_duration(self.config.auto_raise_delay());
        let token = event_loop.insert_source(timer, move |_, _, space| {
            // Source is dropped after this callback, so just forget the token.
            if let Some(control) = space.control_mut(window) {
                control.auto_raise_timer = None;
            }

            space.auto_raise(window);

            TimeoutAction::Drop
        });

        match token {
            Ok(token) => control.auto_raise_timer = Some(token),
            Err(err) => warn!("Failed to schedule auto-raise: {}", err.error),
        }
    }

    /// Cancel a pending auto-raise timer.
    pub fn cancel_auto_raise(&mut self, window: WindowId) {
        let token = self
            .windows
            .get_mut(&window)
            .and_then(|window| window.control.as_mut())
            .and_then(|control| control.auto_raise_timer.take());

        if let (Some(token), Some(event_loop)) = (token, &self.event_loop) {
            event_loop.remove(token);
        }
    }

    /// Check if any auto-raise timer is pending.
    pub fn auto_raise_pending(&self) -> bool {
        self.windows.values().any(|window| {
            window.control.as_ref().map_or(false, |control| control.auto_raise_timer.is_some())
        })
    }
}
