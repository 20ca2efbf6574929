//! Keyboard focus bookkeeping.

use crate::window::WindowId;

/// Most recently used window order, most recent first.
#[derive(Debug, Default)]
pub struct FocusChain {
    chain: Vec<WindowId>,
}

impl FocusChain {
    /// Windows in most recently used order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &WindowId> {
        self.chain.iter()
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.chain.contains(&window)
    }

    /// Mark a window as most recently used.
    pub fn update(&mut self, window: WindowId) {
        self.remove(window);
        self.chain.insert(0, window);
    }

    /// Place a window directly behind another one.
    ///
    /// Does nothing if `reference` is not part of the chain.
    pub fn move_after(&mut self, window: WindowId, reference: WindowId) {
        if window == reference || !self.contains(reference) {
            return;
        }

        self.remove(window);

        if let Some(index) = self.chain.iter().position(|&id| id == reference) {
            self.chain.insert(index + 1, window);
        }
    }

    pub fn remove(&mut self, window: WindowId) {
        self.chain.retain(|&id| id != window);
    }
}

/// Window activation history.
#[derive(Debug, Default)]
pub struct Activation {
    active: Option<WindowId>,

    /// Windows which requested activation that was not yet confirmed.
    should_get_focus: Vec<WindowId>,
}

impl Activation {
    /// Currently active window.
    pub fn active(&self) -> Option<WindowId> {
        self.active
    }

    /// Update the active window, returning the previous one.
    ///
    /// This confirms all pending activation requests up to the new window.
    pub fn set_active(&mut self, window: Option<WindowId>) -> Option<WindowId> {
        if let Some(index) = window.and_then(|id| self.should_get_focus.iter().position(|&w| w == id))
        {
            self.should_get_focus.drain(..=index);
        }

        std::mem::replace(&mut self.active, window)
    }

    /// Track an activation request.
    pub fn request(&mut self, window: WindowId) {
        self.should_get_focus.retain(|&id| id != window);
        self.should_get_focus.push(window);
    }

    /// Window which was activated last.
    ///
    /// Pending activation requests take precedence over the active window, to
    /// avoid flickering while the activation is still in flight.
    pub fn most_recently_activated(&self) -> Option<WindowId> {
        self.should_get_focus.last().copied().or(self.active)
    }

    /// Forget a destroyed window.
    pub fn remove(&mut self, window: WindowId) {
        self.should_get_focus.retain(|&id| id != window);
        if self.active == Some(window) {
            self.active = None;
        }
    }
}
