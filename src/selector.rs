//! Hierarchical weighted task selection.
//!
//! [`WeightedTaskSelector`] walks a task tree the way a virtual user moves
//! through a site: drawing a nested group makes that group the active context,
//! and the user stays inside it until the group draws its `Exit` pseudo-task.

use rand::Rng;
use std::fmt;
use std::sync::Arc;

use crate::errors::ConfigError;
use crate::task::{TaskGroup, TaskNode};

/// Selects the next leaf action for one virtual user.
///
/// The tree is shared and immutable; the stack of active groups is per
/// selector, so every virtual user clones its own selector.
///
/// # Example
/// ```
/// use shop_loadtest::selector::WeightedTaskSelector;
/// use shop_loadtest::task::TaskGroup;
/// use rand::SeedableRng;
/// use std::sync::Arc;
///
/// let root = TaskGroup::builder("web").leaf("index", 1).build().unwrap();
/// let mut selector = WeightedTaskSelector::new(Arc::new(root)).unwrap();
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
///
/// assert_eq!(selector.next_task(&mut rng), "index");
/// ```
#[derive(Debug)]
pub struct WeightedTaskSelector<A> {
    root: Arc<TaskGroup<A>>,
    stack: Vec<Arc<TaskGroup<A>>>,
}

impl<A> Clone for WeightedTaskSelector<A> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
            stack: self.stack.clone(),
        }
    }
}

impl<A: Clone + fmt::Display> WeightedTaskSelector<A> {
    /// Create a selector positioned at the root group.
    ///
    /// The root has no parent to return to, so an `Exit` child at the root is
    /// a configuration error.
    pub fn new(root: Arc<TaskGroup<A>>) -> Result<Self, ConfigError> {
        if root.has_exit() {
            return Err(ConfigError::ExitAtRoot {
                group: root.name().to_string(),
            });
        }

        Ok(Self {
            stack: vec![Arc::clone(&root)],
            root,
        })
    }

    /// Draw until a leaf action is reached and return it.
    ///
    /// Drawing a group pushes it and continues inside it; drawing `Exit` pops
    /// back to the parent and continues there. Every group holds at least one
    /// non-exit child, so a leaf is reached with probability 1.
    pub fn next_task<R: Rng + ?Sized>(&mut self, rng: &mut R) -> A {
        loop {
            let active = Arc::clone(self.active());
            match active.select(rng) {
                TaskNode::Leaf(action) => return action.clone(),
                TaskNode::Group(group) => {
                    tracing::trace!(from = %active.name(), to = %group.name(), "Entering task group");
                    self.stack.push(Arc::clone(group));
                }
                TaskNode::Exit => {
                    if self.stack.len() > 1 {
                        self.stack.pop();
                        tracing::trace!(from = %active.name(), "Leaving task group");
                    }
                }
            }
        }
    }

    fn active(&self) -> &Arc<TaskGroup<A>> {
        self.stack.last().unwrap_or(&self.root)
    }

    /// Name of the group the next draw starts from.
    pub fn active_group(&self) -> &str {
        self.active().name()
    }

    /// Number of active groups, 1 when positioned at the root.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Return to the root group.
    pub fn reset(&mut self) {
        self.stack.truncate(1);
    }

    pub fn root(&self) -> &TaskGroup<A> {
        &self.root
    }
}
