//! Named pairwise collision rules with runtime suspension.
//!
//! A rule binds two collider groups to a callback. The host world supplies
//! the colliders each frame; [`resolve_collisions`] finds intersecting pairs
//! for every active rule and calls back once per pair per frame.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Side, Vec2, penetration};

/// Whether a rule blocks movement or only detects overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionMode {
    /// Detection only, nothing is pushed apart (collectibles, goals, damage).
    Overlap,
    /// The A-side collider is separated from B before the callback runs.
    Physical,
}

/// A collider as seen by the registry for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collider<Id> {
    pub id: Id,
    pub bounds: Rect,
}

/// One intersecting pair reported to a rule's callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact<Id> {
    pub rule: &'static str,
    pub a: Id,
    pub b: Id,
    /// Side of `a` that touched `b`.
    pub side: Side,
    rule_index: usize,
}

/// Resolution callback invoked with the owning world.
pub type OnCollide<W> = fn(&mut W, &Contact<<W as CollisionWorld>::Id>);

/// Host world the registry evaluates against.
pub trait CollisionWorld: Sized {
    type Group: Copy + Eq + fmt::Debug;
    type Id: Copy + Eq + Hash + fmt::Debug;

    fn registry(&self) -> &CollisionRegistry<Self>;

    fn registry_mut(&mut self) -> &mut CollisionRegistry<Self>;

    /// Currently enabled colliders of `group`, in a deterministic order.
    fn colliders(&self, group: Self::Group) -> Vec<Collider<Self::Id>>;

    /// Current bounds of `id`, or `None` once it no longer collides.
    fn collider(&self, id: Self::Id) -> Option<Rect>;

    /// Push `id` by `mtv` after a physical contact on its `side`.
    fn separate(&mut self, id: Self::Id, mtv: Vec2, side: Side);
}

struct CollisionRule<W: CollisionWorld> {
    name: &'static str,
    group_a: W::Group,
    group_b: W::Group,
    mode: CollisionMode,
    on_collide: OnCollide<W>,
    active: bool,
    detached: HashSet<W::Id>,
}

impl<W: CollisionWorld> CollisionRule<W> {
    fn admits(&self, a: W::Id, b: W::Id) -> bool {
        self.active && !self.detached.contains(&a) && !self.detached.contains(&b)
    }
}

/// Set of named collision rules owned by one level.
pub struct CollisionRegistry<W: CollisionWorld> {
    rules: Vec<CollisionRule<W>>,
}

impl<W: CollisionWorld> CollisionRegistry<W> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a rule. Rules start active and are evaluated in registration
    /// order. Several rules may share a name; name-based calls affect all of them.
    pub fn register_rule(
        &mut self,
        name: &'static str,
        group_a: W::Group,
        group_b: W::Group,
        mode: CollisionMode,
        on_collide: OnCollide<W>,
    ) {
        tracing::debug!(rule = name, ?group_a, ?group_b, ?mode, "collision rule registered");
        self.rules.push(CollisionRule {
            name,
            group_a,
            group_b,
            mode,
            on_collide,
            active: true,
            detached: HashSet::new(),
        });
    }

    /// Suspend or resume every rule called `name`. Redundant calls are no-ops.
    pub fn set_active(&mut self, name: &str, active: bool) {
        let mut found = false;
        for rule in self.rules.iter_mut().filter(|r| r.name == name) {
            found = true;
            if rule.active != active {
                rule.active = active;
                tracing::debug!(rule = name, active, "collision rule toggled");
            }
        }
        if !found {
            tracing::warn!(rule = name, "set_active on unknown collision rule");
        }
    }

    /// Whether any rule called `name` is active.
    pub fn is_active(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name == name && r.active)
    }

    /// Remove one collider from the rules called `name` without touching the
    /// rest of its group.
    pub fn detach(&mut self, name: &str, id: W::Id) {
        for rule in self.rules.iter_mut().filter(|r| r.name == name) {
            rule.detached.insert(id);
        }
    }

    pub fn is_detached(&self, name: &str, id: W::Id) -> bool {
        self.rules
            .iter()
            .any(|r| r.name == name && r.detached.contains(&id))
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Destroy every rule (level teardown).
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Collect every intersecting pair of every active rule, without calling back.
    pub fn evaluate(&self, world: &W) -> Vec<Contact<W::Id>> {
        let mut contacts = Vec::new();
        for (rule_index, rule) in self.rules.iter().enumerate() {
            if !rule.active {
                continue;
            }
            let side_a = world.colliders(rule.group_a);
            let side_b = world.colliders(rule.group_b);
            for a in &side_a {
                for b in &side_b {
                    if a.id == b.id || !rule.admits(a.id, b.id) {
                        continue;
                    }
                    if let Some((_, side)) = penetration(&a.bounds, &b.bounds) {
                        contacts.push(Contact {
                            rule: rule.name,
                            a: a.id,
                            b: b.id,
                            side,
                            rule_index,
                        });
                    }
                }
            }
        }
        contacts
    }
}

impl<W: CollisionWorld> Default for CollisionRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: CollisionWorld> fmt::Debug for CollisionRegistry<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| (r.name, r.active)))
            .finish()
    }
}

/// Evaluate the world's registry and dispatch every contact.
///
/// Each contact is re-checked right before its callback: the rule must still
/// be active, neither side detached, both colliders still enabled and still
/// overlapping. Callbacks can therefore switch rules off or remove colliders
/// and later contacts of the same frame observe it. Returns the number of
/// callbacks that ran.
pub fn resolve_collisions<W: CollisionWorld>(world: &mut W) -> usize {
    let contacts = world.registry().evaluate(&*world);
    let mut dispatched = 0;

    for contact in contacts {
        let (mode, on_collide) = match world.registry().rules.get(contact.rule_index) {
            Some(rule) if rule.admits(contact.a, contact.b) => (rule.mode, rule.on_collide),
            _ => continue,
        };

        let (Some(a_bounds), Some(b_bounds)) =
            (world.collider(contact.a), world.collider(contact.b))
        else {
            continue;
        };
        let Some((mtv, side)) = penetration(&a_bounds, &b_bounds) else {
            continue;
        };

        let contact = Contact { side, ..contact };
        if mode == CollisionMode::Physical {
            world.separate(contact.a, mtv, side);
        }
        on_collide(world, &contact);
        dispatched += 1;
    }

    dispatched
}
