//! Turns known hook definitions, overrides and the allow-list into a [`HookSet`].

use crate::error::BootstrapError;
use crate::graph::topological_order;
use crate::hook::Hook;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A caller-supplied change to the known hooks.
#[derive(Debug, Clone)]
pub enum HookOverride {
    /// Adds a hook, or replaces the one with the same id.
    Define(Arc<dyn Hook>),
    Disable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisableReason {
    /// Switched off by an override or `hooks.<id> = false`.
    Explicit,
    /// Left out of a `load_hooks` allow-list.
    NotAllowListed,
}

impl fmt::Display for DisableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Explicit => "disabled explicitly",
            Self::NotAllowListed => "not in load_hooks",
        })
    }
}

/// Where a hook ended up after resolution.
#[derive(Debug, Clone)]
pub enum HookState {
    Enabled(Arc<dyn Hook>),
    /// Excluded from initialization. The definition, if one existed, is kept for diagnostics.
    Disabled { definition: Option<Arc<dyn Hook>>, reason: DisableReason },
}

impl HookState {
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled(_))
    }

    #[must_use]
    pub const fn definition(&self) -> Option<&Arc<dyn Hook>> {
        match self {
            Self::Enabled(hook) | Self::Disabled { definition: Some(hook), .. } => Some(hook),
            Self::Disabled { definition: None, .. } => None,
        }
    }
}

/// Resolved hooks of one load, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct HookSet {
    states: BTreeMap<String, HookState>,
}

impl HookSet {
    /// The set produced when hook loading is switched off.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&HookState> {
        self.states.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HookState)> {
        self.states.iter().map(|(id, state)| (id.as_str(), state))
    }

    /// Enabled hooks in id order.
    pub fn active(&self) -> impl Iterator<Item = (&str, &Arc<dyn Hook>)> {
        self.states.iter().filter_map(|(id, state)| match state {
            HookState::Enabled(hook) => Some((id.as_str(), hook)),
            HookState::Disabled { .. } => None,
        })
    }

    #[must_use]
    pub fn active_ids(&self) -> Vec<String> {
        self.active().map(|(id, _)| id.to_owned()).collect()
    }

    pub fn disabled(&self) -> impl Iterator<Item = (&str, DisableReason)> {
        self.states.iter().filter_map(|(id, state)| match state {
            HookState::Disabled { reason, .. } => Some((id.as_str(), *reason)),
            HookState::Enabled(_) => None,
        })
    }

    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.states.get(id).is_some_and(HookState::is_enabled)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Checks every active hook's declared dependencies and orders the active hooks.
    ///
    /// # Errors
    /// * [`BootstrapError::Config`] when a dependency is unknown or not active.
    /// * [`BootstrapError::Graph`] when the declarations form a cycle.
    pub fn dependency_order(&self) -> Result<Vec<String>, BootstrapError> {
        let nodes: Vec<(&str, &[&str])> =
            self.active().map(|(id, hook)| (id, hook.depends_on())).collect();

        for &(id, deps) in &nodes {
            for &dep in deps {
                match self.states.get(dep) {
                    Some(HookState::Enabled(_)) => {},
                    Some(HookState::Disabled { reason, .. }) => {
                        return Err(BootstrapError::config(format!(
                            "hook `{id}` depends on `{dep}`, which is {reason}"
                        )));
                    },
                    None => {
                        return Err(BootstrapError::config(format!(
                            "hook `{id}` depends on unknown hook `{dep}`"
                        )));
                    },
                }
            }
        }

        let order = topological_order(&nodes)?;
        Ok(order.into_iter().map(str::to_owned).collect())
    }
}

/// Merges `defaults` with `overrides` and applies the allow-list.
///
/// Overrides replace defaults by id; later entries win. When `allow_list` is
/// present, every enabled hook it does not name is disabled with
/// [`DisableReason::NotAllowListed`]. A `null` allow-list counts as absent.
///
/// # Errors
/// Returns [`BootstrapError::Config`] naming the value when `allow_list` is
/// not an array of strings.
pub fn resolve<D, O>(
    defaults: D,
    overrides: O,
    allow_list: Option<&Value>,
) -> Result<HookSet, BootstrapError>
where
    D: IntoIterator<Item = Arc<dyn Hook>>,
    O: IntoIterator<Item = (String, HookOverride)>,
{
    let allow_list = parse_allow_list(allow_list)?;

    let mut states: BTreeMap<String, HookState> = defaults
        .into_iter()
        .map(|hook| (hook.id().to_owned(), HookState::Enabled(hook)))
        .collect();

    for (id, change) in overrides {
        let state = match change {
            HookOverride::Define(hook) => {
                if hook.id() != id {
                    warn!(hook = %id, defined = hook.id(), "Hook registered under a foreign id");
                }
                HookState::Enabled(hook)
            },
            HookOverride::Disable => HookState::Disabled {
                definition: states.get(&id).and_then(HookState::definition).cloned(),
                reason: DisableReason::Explicit,
            },
        };
        states.insert(id, state);
    }

    if let Some(allowed) = allow_list {
        for unknown in allowed.iter().filter(|id| !states.contains_key(id.as_str())) {
            warn!(hook = %unknown, "load_hooks names a hook that is not defined");
        }

        for (id, state) in &mut states {
            if let HookState::Enabled(hook) = state
                && !allowed.contains(id)
            {
                *state = HookState::Disabled {
                    definition: Some(Arc::clone(hook)),
                    reason: DisableReason::NotAllowListed,
                };
            }
        }
    }

    let set = HookSet { states };
    debug!(active = ?set.active_ids(), disabled = set.len() - set.active().count(), "Hooks resolved");
    Ok(set)
}

fn parse_allow_list(value: Option<&Value>) -> Result<Option<Vec<String>>, BootstrapError> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(None);
    };

    let invalid =
        || BootstrapError::config(format!("load_hooks must be an array of hook ids, got {value}"));

    let Value::Array(items) = value else {
        return Err(invalid());
    };

    items
        .iter()
        .map(|item| item.as_str().map(str::to_owned).ok_or_else(invalid))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}
