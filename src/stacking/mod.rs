//! Stacking order operators.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::layer::Layer;
use crate::output::OutputId;
use crate::space::Space;
use crate::window::{Desktop, Window, WindowId};

pub mod order;

pub use order::{StackingListener, StackingOrder, UpdateBlocker};

impl Space {
    /// Move a window and its transient family to the bottom of its layer.
    pub fn lower_window(&mut self, window: WindowId) {
        let win = match self.windows.get(&window) {
            Some(win) => win,
            None => return,
        };

        if win.control.is_none() {
            warn!("Ignoring lower of unmanaged window {:?}", win.name());
            return;
        }

        let family = if win.transient.lead.is_some() && win.group().is_some() {
            self.restacked_by_stacking_order(&self.transient_family(window))
        } else {
            Vec::new()
        };

        let mut space = self.block_updates();

        space.lower_single(window);

        // Lower the rest of the family in reverse stacking order.
        for &member in family.iter().rev().filter(|&&member| member != window) {
            let lowerable = space
                .windows
                .get(&member)
                .map_or(false, |member| member.control.is_some() && !member.is_annexed());
            if lowerable {
                space.lower_single(member);
            }
        }
    }

    fn lower_single(&mut self, window: WindowId) {
        self.cancel_auto_raise(window);

        self.stacking.move_to_bottom(window);

        if self.stacking.most_recently_raised == Some(window) {
            self.stacking.most_recently_raised = None;
        }
    }

    /// Move a window to the top of its layer, raising all its leads with it.
    pub fn raise_window(&mut self, window: WindowId) {
        let win = match self.windows.get(&window) {
            Some(win) => win,
            None => return,
        };

        if win.control.is_none() {
            warn!("Ignoring raise of unmanaged window {:?}", win.name());
            return;
        }

        let leads = self.restacked_by_stacking_order(&self.leads(window));

        let mut space = self.block_updates();

        for lead in leads {
            // Leads can be outside of window management.
            let managed = space.windows.get(&lead).map_or(false, |lead| lead.control.is_some());
            if managed {
                space.raise_single(lead);
            }
        }

        space.raise_single(window);
    }

    fn raise_single(&mut self, window: WindowId) {
        self.cancel_auto_raise(window);

        // Windows which are not shown yet are raised once they are.
        if !self.stacking.move_to_top(window) {
            return;
        }

        if self.windows.get(&window).map_or(false, |window| !window.is_special()) {
            self.stacking.most_recently_raised = Some(window);
        }
    }

    /// Lower the window if it is the topmost window, otherwise raise it.
    pub fn raise_or_lower_window(&mut self, window: WindowId) {
        let win = match self.windows.get(&window) {
            Some(win) => win,
            None => return,
        };

        let recently_raised = self.stacking.most_recently_raised.filter(|&raised| {
            self.stacking.stack.contains(&raised)
                && self.windows.get(&raised).map_or(false, Window::is_shown)
                && self.is_on_current_desktop(win)
        });

        let topmost = match recently_raised {
            Some(raised) => Some(raised),
            None => {
                let desktop = match win.desktop() {
                    Desktop::All => self.current_desktop,
                    Desktop::Number(desktop) => desktop,
                };
                let output = if self.config.separate_screen_focus {
                    win.central_output
                } else {
                    None
                };
                self.top_client_on_desktop(desktop, output, false, true)
            },
        };

        if topmost == Some(window) {
            self.lower_window(window);
        } else {
            self.raise_window(window);
        }
    }

    /// Place a window directly below another one.
    ///
    /// Unless `force` is set, the window is placed below all windows of the
    /// same layer belonging to `under`'s client.
    ///
    /// # Panics
    ///
    /// Panics if `under` is not part of the stacking order.
    pub fn restack(&mut self, window: WindowId, under: WindowId, force: bool) {
        assert!(
            self.stacking.pre_stack.contains(&under),
            "restacking below {under:?}, which is not in the stacking order"
        );

        let win = match self.windows.get(&window) {
            Some(win) => win,
            None => return,
        };

        if window == under || win.is_annexed() {
            debug!("Ignoring restack of {:?}", win.name());
            return;
        }

        let mut anchor = under;
        if !force && !self.belong_to_same_client(under, window) {
            let layer = self.window_layer(win);

            // Stack below the topmost window of the same client and layer.
            let same_client = self.stacking.pre_stack.iter().rev().find(|&&other| {
                self.windows.get(&other).map_or(false, |other| {
                    other.control.is_some()
                        && self.window_layer(other) == layer
                        && self.belong_to_same_client(under, other.id())
                })
            });

            if let Some(&other) = same_client {
                anchor = other;
            }
        }

        self.stacking.pre_stack.retain(|&id| id != window);
        let index = self
            .stacking
            .pre_stack
            .iter()
            .position(|&id| id == anchor)
            .expect("restack anchor in pre-stack");
        self.stacking.pre_stack.insert(index, window);

        self.focus_chain.move_after(window, anchor);

        self.update_order();
    }

    /// Place a window below the active window, or raise it if that is not
    /// possible.
    pub fn restack_client_under_active(&mut self, window: WindowId) {
        let win = match self.windows.get(&window) {
            Some(win) => win,
            None => return,
        };

        let active = self.activation.active().filter(|&active| {
            active != window
                && self.stacking.pre_stack.contains(&active)
                && self.get_layer(active) == Some(self.window_layer(win))
        });

        match active {
            Some(active) => self.restack(window, active, false),
            None => self.raise_window(window),
        }
    }

    /// Raise a window after its auto-raise timer expired.
    pub fn auto_raise(&mut self, window: WindowId) {
        self.raise_window(window);
        self.cancel_auto_raise(window);
    }

    /// Topmost shown window on a desktop.
    ///
    /// With `only_normal`, special windows and windows which are not part of
    /// focus cycling are skipped.
    pub fn top_client_on_desktop(
        &self,
        desktop: u32,
        output: Option<OutputId>,
        unconstrained: bool,
        only_normal: bool,
    ) -> Option<WindowId> {
        let list = if unconstrained { &self.stacking.pre_stack } else { &self.stacking.stack };

        list.iter()
            .rev()
            .filter_map(|window| self.windows.get(window))
            .filter(|window| window.is_on_desktop(desktop) && window.is_shown())
            .filter(|window| output.map_or(true, |output| window.central_output == Some(output)))
            .find(|window| !only_normal || (window.wants_tab_focus() && !window.is_special()))
            .map(Window::id)
    }

    /// Group windows by their layer.
    ///
    /// The relative order within each layer is preserved. Windows stacked above
    /// an active fullscreen window of the same group and output are moved to
    /// the active layer too.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn sort_windows_by_layer(&self, windows: &[WindowId]) -> Vec<WindowId> {
        let mut layers: [Vec<WindowId>; Layer::COUNT] = std::array::from_fn(|_| Vec::new());
        let mut lead_layers: HashMap<(Option<OutputId>, WindowId), Layer> = HashMap::new();

        for window in windows.iter().filter_map(|window| self.windows.get(window)) {
            let mut layer = self.window_layer(window);
            let key = (window.central_output, self.top_lead(window.id()));

            let lead_layer = lead_layers.entry(key).or_insert(layer);
            if *lead_layer == Layer::Active && layer > Layer::Below {
                layer = Layer::Active;
            }
            *lead_layer = layer;

            layers[layer.index()].push(window.id());
        }

        layers.into_iter().flatten().collect()
    }

    /// Reorder windows based on the current stacking order.
    ///
    /// Windows which are not part of the stacking order are kept at the
    /// bottom, in their original order.
    pub fn restacked_by_stacking_order(&self, windows: &[WindowId]) -> Vec<WindowId> {
        if windows.len() < 2 {
            return windows.to_vec();
        }

        let (mut stacked, mut unstacked): (Vec<_>, Vec<_>) =
            windows.iter().copied().partition(|window| self.stacking.stack.contains(window));

        stacked.sort_by_key(|window| self.stacking.stack.iter().position(|id| id == window));
        stacked.dedup();

        unstacked.append(&mut stacked);
        unstacked
    }

    /// All transient leads of a window, starting with its direct lead.
    pub fn leads(&self, window: WindowId) -> Vec<WindowId> {
        let mut leads = Vec::new();

        let mut lead = self.windows.get(&window).and_then(|window| window.transient.lead);
        while let Some(id) = lead {
            // Stale leads are treated like no lead.
            let win = match self.windows.get(&id) {
                Some(win) => win,
                None => break,
            };

            if leads.contains(&id) || id == window {
                break;
            }
            leads.push(id);

            lead = win.transient.lead;
        }

        leads
    }

    /// Root of a window's transient tree.
    pub fn top_lead(&self, window: WindowId) -> WindowId {
        self.leads(window).last().copied().unwrap_or(window)
    }

    /// All windows sharing a transient tree with this window.
    ///
    /// The root lead comes first, followed by its descendants in depth-first
    /// order.
    pub fn transient_family(&self, window: WindowId) -> Vec<WindowId> {
        let mut family = Vec::new();
        if !self.windows.contains_key(&window) {
            return family;
        }

        let mut pending = vec![self.top_lead(window)];
        while let Some(id) = pending.pop() {
            if family.contains(&id) {
                continue;
            }
            family.push(id);

            if let Some(win) = self.windows.get(&id) {
                pending.extend(win.transient.children.iter().rev().copied());
            }
        }

        family
    }

    /// Check if two windows are owned by the same application.
    pub fn belong_to_same_client(&self, first: WindowId, second: WindowId) -> bool {
        match (self.windows.get(&first), self.windows.get(&second)) {
            (Some(first), Some(second)) => first.client() == second.client(),
            _ => false,
        }
    }
}
