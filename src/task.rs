//! Weighted task trees.
//!
//! A task tree is built from [`TaskGroup`]s. Each group holds weighted
//! children, where a child is a leaf action, a nested group, or the `Exit`
//! pseudo-task that returns control from a nested group to its parent.
//!
//! # Example
//! ```
//! use shop_loadtest::task::TaskGroup;
//!
//! let item_page = TaskGroup::builder("item_page")
//!     .leaf("item", 10)
//!     .leaf("order", 5)
//!     .exit(5)
//!     .build()
//!     .unwrap();
//!
//! let web = TaskGroup::builder("web")
//!     .leaf("index", 20)
//!     .group(item_page, 10)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(web.total_weight(), 30);
//! ```
use rand::Rng;
use std::fmt;
use std::sync::Arc;

use crate::errors::ConfigError;

/// A node in the task tree.
#[derive(Debug)]
pub enum TaskNode<A> {
    /// A concrete action.
    Leaf(A),

    /// A nested weighted group; once selected it stays active until it draws `Exit`.
    Group(Arc<TaskGroup<A>>),

    /// Pops the active nested group back to its parent.
    Exit,
}

impl<A: fmt::Display> TaskNode<A> {
    /// Human readable label used in errors and diagnostics.
    pub fn label(&self) -> String {
        match self {
            TaskNode::Leaf(action) => action.to_string(),
            TaskNode::Group(group) => group.name().to_string(),
            TaskNode::Exit => "exit".to_string(),
        }
    }
}

/// A named, validated, weighted collection of task nodes.
#[derive(Debug)]
pub struct TaskGroup<A> {
    name: String,
    children: Vec<(TaskNode<A>, u32)>,
    /// Running sum of weights; child `i` owns the draw range
    /// `[cumulative[i - 1], cumulative[i])`.
    cumulative: Vec<u64>,
    total_weight: u64,
}

impl<A> TaskGroup<A> {
    /// Start building a group.
    pub fn builder(name: impl Into<String>) -> TaskGroupBuilder<A> {
        TaskGroupBuilder {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> impl Iterator<Item = (&TaskNode<A>, u32)> {
        self.children.iter().map(|(node, weight)| (node, *weight))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// True if one of the direct children is the `Exit` pseudo-task.
    pub fn has_exit(&self) -> bool {
        self.children
            .iter()
            .any(|(node, _)| matches!(node, TaskNode::Exit))
    }

    /// Draw one child proportionally to its weight.
    ///
    /// Uses a uniform draw over `[0, total_weight)` and a binary search over the
    /// cumulative weight ranges.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> &TaskNode<A> {
        let draw = rng.gen_range(0..self.total_weight);
        let index = self.cumulative.partition_point(|&upper| upper <= draw);
        &self.children[index].0
    }
}

impl<A: fmt::Display> TaskGroup<A> {
    /// Selection probability of each direct child.
    pub fn probabilities(&self) -> Vec<(String, f64)> {
        self.children
            .iter()
            .map(|(node, weight)| (node.label(), *weight as f64 / self.total_weight as f64))
            .collect()
    }
}

/// Builder for [`TaskGroup`]. Validation happens in [`TaskGroupBuilder::build`].
pub struct TaskGroupBuilder<A> {
    name: String,
    children: Vec<(TaskNode<A>, u32)>,
}

impl<A: fmt::Display> TaskGroupBuilder<A> {
    /// Add a leaf action.
    pub fn leaf(mut self, action: A, weight: u32) -> Self {
        self.children.push((TaskNode::Leaf(action), weight));
        self
    }

    /// Add a nested group.
    pub fn group(self, group: TaskGroup<A>, weight: u32) -> Self {
        self.shared_group(Arc::new(group), weight)
    }

    /// Add a nested group that is already shared elsewhere.
    pub fn shared_group(mut self, group: Arc<TaskGroup<A>>, weight: u32) -> Self {
        self.children.push((TaskNode::Group(group), weight));
        self
    }

    /// Add the exit pseudo-task.
    pub fn exit(mut self, weight: u32) -> Self {
        self.children.push((TaskNode::Exit, weight));
        self
    }

    /// Validate weights and produce the group.
    ///
    /// Fails if the group is empty, if any weight is zero, or if every child
    /// is `Exit` (a group must always be able to reach a leaf).
    pub fn build(self) -> Result<TaskGroup<A>, ConfigError> {
        if self.children.is_empty() {
            return Err(ConfigError::EmptyGroup { group: self.name });
        }

        if let Some((node, _)) = self.children.iter().find(|(_, weight)| *weight == 0) {
            return Err(ConfigError::ZeroWeight {
                group: self.name.clone(),
                task: node.label(),
            });
        }

        if self
            .children
            .iter()
            .all(|(node, _)| matches!(node, TaskNode::Exit))
        {
            return Err(ConfigError::NoRunnableTask { group: self.name });
        }

        let mut cumulative = Vec::with_capacity(self.children.len());
        let mut sum = 0u64;
        for (_, weight) in &self.children {
            sum += u64::from(*weight);
            cumulative.push(sum);
        }

        Ok(TaskGroup {
            name: self.name,
            children: self.children,
            cumulative,
            total_weight: sum,
        })
    }
}
