//! User profiles and their task trees.
//!
//! A profile is one kind of simulated user. Each profile owns a fixed task
//! tree; weights can be tuned per task from the config file with keys of the
//! form `"<group>.<task>"`, e.g. `"cart_page.checkout": 10`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::actions::Action;
use crate::errors::ConfigError;
use crate::task::{TaskGroup, TaskNode};

/// Kind of simulated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserProfile {
    /// Browses the storefront pages.
    Web,
    /// Calls the REST API directly.
    Api,
    /// Sends requests that the target must reject.
    ErrorHandling,
}

impl UserProfile {
    pub const ALL: [UserProfile; 3] = [UserProfile::Web, UserProfile::Api, UserProfile::ErrorHandling];

    pub fn name(&self) -> &'static str {
        match self {
            UserProfile::Web => "web",
            UserProfile::Api => "api",
            UserProfile::ErrorHandling => "errorhandling",
        }
    }

    /// Build this profile's task tree, applying any weight overrides.
    pub fn task_tree(
        &self,
        overrides: &WeightOverrides,
    ) -> Result<Arc<TaskGroup<Action>>, ConfigError> {
        let tree = match self {
            UserProfile::Web => web_tree(overrides)?,
            UserProfile::Api => api_tree(overrides)?,
            UserProfile::ErrorHandling => error_handling_tree(overrides)?,
        };
        Ok(Arc::new(tree))
    }
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for UserProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "web" => Ok(UserProfile::Web),
            "api" => Ok(UserProfile::Api),
            "errorhandling" | "error_handling" | "error-handling" => Ok(UserProfile::ErrorHandling),
            _ => Err(ConfigError::UnknownProfile(s.to_string())),
        }
    }
}

/// Per-task weight overrides keyed by `"<group>.<task>"`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightOverrides {
    weights: HashMap<String, u32>,
}

impl WeightOverrides {
    pub fn new(weights: HashMap<String, u32>) -> Self {
        Self { weights }
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Weight for `task` in `group`, or `default` when not overridden.
    pub fn weight(&self, group: &str, task: &str, default: u32) -> u32 {
        self.weights
            .get(&format!("{}.{}", group, task))
            .copied()
            .unwrap_or(default)
    }

    fn keys(&self) -> impl Iterator<Item = &String> {
        self.weights.keys()
    }
}

/// Build the task trees of every profile.
///
/// Fails if an override names no task in any tree, or if an override makes a
/// group invalid (zero weight).
pub fn task_trees(
    overrides: &WeightOverrides,
) -> Result<HashMap<UserProfile, Arc<TaskGroup<Action>>>, ConfigError> {
    let mut trees = HashMap::new();
    let mut known = HashSet::new();

    for profile in UserProfile::ALL {
        let tree = profile.task_tree(overrides)?;
        collect_task_keys(&tree, &mut known);
        trees.insert(profile, tree);
    }

    let mut unknown: Vec<&String> = overrides.keys().filter(|k| !known.contains(*k)).collect();
    unknown.sort();
    if let Some(key) = unknown.first() {
        return Err(ConfigError::UnknownWeightOverride((*key).clone()));
    }

    Ok(trees)
}

/// Every `"<group>.<task>"` key reachable from `group`.
pub fn collect_task_keys(group: &TaskGroup<Action>, out: &mut HashSet<String>) {
    for (node, _) in group.children() {
        out.insert(format!("{}.{}", group.name(), node.label()));
        if let TaskNode::Group(child) = node {
            collect_task_keys(child, out);
        }
    }
}

fn web_tree(o: &WeightOverrides) -> Result<TaskGroup<Action>, ConfigError> {
    let item_page = TaskGroup::builder("item_page")
        .leaf(Action::ViewItem, o.weight("item_page", "item", 10))
        .leaf(Action::AddToCart, o.weight("item_page", "order", 5))
        .exit(o.weight("item_page", "exit", 5))
        .build()?;

    let catalogue_page = TaskGroup::builder("catalogue_page")
        .leaf(Action::Catalogue, o.weight("catalogue_page", "catalogue", 20))
        .leaf(Action::FilterByTags, o.weight("catalogue_page", "filter", 10))
        .group(item_page, o.weight("catalogue_page", "item_page", 10))
        .exit(o.weight("catalogue_page", "exit", 5))
        .build()?;

    let cart_page = TaskGroup::builder("cart_page")
        .leaf(Action::CreateCard, o.weight("cart_page", "create_card", 1))
        .leaf(Action::CreateAddress, o.weight("cart_page", "create_address", 1))
        .leaf(Action::ViewBasket, o.weight("cart_page", "cart", 10))
        .leaf(Action::RemoveCartItem, o.weight("cart_page", "delete_item", 5))
        .leaf(Action::Checkout, o.weight("cart_page", "checkout", 5))
        .exit(o.weight("cart_page", "exit", 5))
        .build()?;

    TaskGroup::builder("web")
        .leaf(Action::Index, o.weight("web", "index", 20))
        .leaf(Action::Login, o.weight("web", "login", 15))
        .group(catalogue_page, o.weight("web", "catalogue_page", 10))
        .group(cart_page, o.weight("web", "cart_page", 5))
        .build()
}

// Every API group and leaf weighs 1. The groups have no exit child, so a
// user stays in the first group it enters. Overrides only reweigh existing
// children and cannot add an exit.
fn api_tree(o: &WeightOverrides) -> Result<TaskGroup<Action>, ConfigError> {
    fn group(
        o: &WeightOverrides,
        name: &str,
        actions: &[Action],
    ) -> Result<TaskGroup<Action>, ConfigError> {
        actions
            .iter()
            .fold(TaskGroup::builder(name), |builder, action| {
                builder.leaf(*action, o.weight(name, action.name(), 1))
            })
            .build()
    }

    let cart = group(
        o,
        "cart",
        &[
            Action::GetCart,
            Action::DeleteCart,
            Action::DeleteCartItem,
            Action::PostCart,
        ],
    )?;
    let catalogue = group(
        o,
        "catalogue",
        &[
            Action::GetCatalogueImage,
            Action::GetCatalogue,
            Action::GetTags,
        ],
    )?;
    let orders = group(o, "orders", &[Action::GetOrders, Action::PostOrders])?;
    let users = group(
        o,
        "users",
        &[
            Action::GetCustomer,
            Action::GetCard,
            Action::GetCustomers,
            Action::GetAddresses,
            Action::GetCards,
            Action::PostCustomer,
            Action::PostAddress,
            Action::PostCard,
            Action::DeleteCustomer,
            Action::DeleteAddress,
            Action::DeleteCard,
            Action::PostRegister,
            Action::PostLogin,
        ],
    )?;

    TaskGroup::builder("api")
        .group(cart, o.weight("api", "cart", 1))
        .group(catalogue, o.weight("api", "catalogue", 1))
        .group(orders, o.weight("api", "orders", 1))
        .group(users, o.weight("api", "users", 1))
        .build()
}

fn error_handling_tree(o: &WeightOverrides) -> Result<TaskGroup<Action>, ConfigError> {
    TaskGroup::builder("errorhandling")
        .leaf(Action::LoginFail, o.weight("errorhandling", "login_fail", 1))
        .leaf(Action::CheckoutFail, o.weight("errorhandling", "checkout_fail", 1))
        .build()
}

/// Assign a profile to each of `users` virtual users, proportionally to the weights.
///
/// Weights are reduced by their gcd and expanded into a pattern that is
/// repeated, e.g. `web=2,api=1` yields web, web, api, web, web, api, ...
pub fn allocate_profiles(
    weights: &[(UserProfile, u32)],
    users: usize,
) -> Result<Vec<UserProfile>, ConfigError> {
    if weights.is_empty() {
        return Err(ConfigError::EmptyGroup {
            group: "users.profiles".to_string(),
        });
    }
    if let Some((profile, _)) = weights.iter().find(|(_, w)| *w == 0) {
        return Err(ConfigError::ZeroWeight {
            group: "users.profiles".to_string(),
            task: profile.to_string(),
        });
    }

    let divisor = weights.iter().fold(0, |acc, (_, w)| gcd(acc, *w));
    let pattern: Vec<UserProfile> = weights
        .iter()
        .flat_map(|(profile, w)| std::iter::repeat(*profile).take((*w / divisor) as usize))
        .collect();

    Ok(pattern.into_iter().cycle().take(users).collect())
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}
