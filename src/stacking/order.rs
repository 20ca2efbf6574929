//! Stacking order storage and update batching.

use std::fmt::{self, Debug, Formatter};
use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::space::Space;
use crate::window::WindowId;

/// Callback notified after every stacking order rebuild.
pub type StackingListener = Box<dyn FnMut(&[WindowId])>;

/// Requested and constrained window stacking order.
///
/// Both sequences are ordered from bottom to top.
#[derive(Default)]
pub struct StackingOrder {
    /// Order requested through raising, lowering, and restacking.
    pub(crate) pre_stack: Vec<WindowId>,

    /// Order of `pre_stack`, grouped by layer.
    pub(crate) stack: Vec<WindowId>,

    /// Last window raised by the user.
    pub(crate) most_recently_raised: Option<WindowId>,

    listeners: Vec<StackingListener>,
    block_count: usize,
    rebuilds: u64,
}

impl Debug for StackingOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackingOrder")
            .field("pre_stack", &self.pre_stack)
            .field("stack", &self.stack)
            .field("most_recently_raised", &self.most_recently_raised)
            .field("block_count", &self.block_count)
            .field("rebuilds", &self.rebuilds)
            .finish_non_exhaustive()
    }
}

impl StackingOrder {
    /// Requested order, bottom to top.
    pub fn pre_stack(&self) -> &[WindowId] {
        &self.pre_stack
    }

    /// Constrained order used for painting and input, bottom to top.
    pub fn stack(&self) -> &[WindowId] {
        &self.stack
    }

    pub fn most_recently_raised(&self) -> Option<WindowId> {
        self.most_recently_raised
    }

    /// Number of stacking order rebuilds so far.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Check if updates are currently deferred.
    pub fn is_blocked(&self) -> bool {
        self.block_count > 0
    }

    /// Register a callback for stacking order changes.
    pub fn subscribe(&mut self, listener: impl FnMut(&[WindowId]) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Move a window to the top of the requested order.
    ///
    /// Returns `false` if the window is not part of the stacking order.
    pub(crate) fn move_to_top(&mut self, window: WindowId) -> bool {
        match self.pre_stack.iter().position(|&id| id == window) {
            Some(index) => {
                self.pre_stack.remove(index);
                self.pre_stack.push(window);
                true
            },
            None => false,
        }
    }

    /// Move a window to the bottom of the requested order, adding it if
    /// necessary.
    pub(crate) fn move_to_bottom(&mut self, window: WindowId) {
        self.pre_stack.retain(|&id| id != window);
        self.pre_stack.insert(0, window);
    }

    /// Remove a window from all sequences.
    pub(crate) fn remove(&mut self, window: WindowId) {
        self.pre_stack.retain(|&id| id != window);
        self.stack.retain(|&id| id != window);

        if self.most_recently_raised == Some(window) {
            self.most_recently_raised = None;
        }
    }

    /// Replace the constrained order and notify all listeners.
    pub(crate) fn set_stack(&mut self, stack: Vec<WindowId>) {
        self.stack = stack;
        self.rebuilds += 1;

        debug!("Stacking order rebuilt: {:?}", self.stack);

        for listener in &mut self.listeners {
            listener(&self.stack);
        }
    }

    fn block(&mut self) {
        self.block_count += 1;
    }

    /// Release one block, returning `true` if no blocks are left.
    fn unblock(&mut self) -> bool {
        debug_assert!(self.block_count > 0, "unbalanced stacking order unblock");
        self.block_count = self.block_count.saturating_sub(1);
        self.block_count == 0
    }
}

/// Scope deferring stacking order rebuilds.
///
/// The stacking order is rebuilt exactly once after the last blocker is
/// dropped. The blocker provides access to the [`Space`] for the duration of
/// the scope.
pub struct UpdateBlocker<'a> {
    space: &'a mut Space,
}

impl<'a> UpdateBlocker<'a> {
    pub(crate) fn new(space: &'a mut Space) -> Self {
        space.stacking.block();
        Self { space }
    }
}

impl Drop for UpdateBlocker<'_> {
    fn drop(&mut self) {
        if self.space.stacking.unblock() {
            self.space.update_order();
        }
    }
}

impl Deref for UpdateBlocker<'_> {
    type Target = Space;

    fn deref(&self) -> &Space {
        self.space
    }
}

impl DerefMut for UpdateBlocker<'_> {
    fn deref_mut(&mut self) -> &mut Space {
        self.space
    }
}

impl Debug for UpdateBlocker<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateBlocker").field("stacking", &self.space.stacking).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::config::Config;
    use crate::window::WindowAttributes;

    #[test]
    fn nested_blockers_coalesce() {
        let mut space = Space::new(Config::default());

        let notifications = Rc::new(Cell::new(0));
        let counter = notifications.clone();
        space.stacking_mut().subscribe(move |_| counter.set(counter.get() + 1));

        let a = space.add_window(WindowAttributes::new("a"));
        let b = space.add_window(WindowAttributes::new("b"));

        {
            let mut outer = space.block_updates();
            outer.show_window(a);

            {
                let mut inner = outer.block_updates();
                inner.show_window(b);
                inner.raise_window(a);
            }

            // Nothing is rebuilt while the outer scope is alive.
            assert!(outer.stack().is_empty());
            assert_eq!(notifications.get(), 0);
        }

        assert_eq!(notifications.get(), 1);
        assert_eq!(space.stacking().rebuilds(), 1);
        assert_eq!(space.stack(), [b, a]);
        assert!(!space.stacking().is_blocked());
    }

    #[test]
    fn pre_stack_moves() {
        let [a, b, c] = [WindowId::new(0), WindowId::new(1), WindowId::new(2)];

        let mut order = StackingOrder { pre_stack: vec![a, b], ..Default::default() };
        assert!(order.move_to_top(a));
        assert_eq!(order.pre_stack(), [b, a]);

        assert!(!order.move_to_top(c));
        order.move_to_bottom(c);
        assert_eq!(order.pre_stack(), [c, b, a]);

        order.move_to_bottom(a);
        assert_eq!(order.pre_stack(), [a, c, b]);

        order.most_recently_raised = Some(c);
        order.remove(c);
        assert_eq!(order.pre_stack(), [a, b]);
        assert_eq!(order.most_recently_raised(), None);
    }
}
