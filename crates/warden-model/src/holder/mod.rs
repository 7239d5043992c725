//! Permission holders.
//!
//! A [`PermissionHolder`] is either a user or a group. Both carry the same
//! pair of node maps and share every mutation and resolution operation; the
//! [`Subject`] variant holds what only one kind needs. Callers branch on
//! capability with [`PermissionHolder::as_group`] and
//! [`PermissionHolder::as_user`].
//!
//! Holders never own references to other holders. Inheritance is resolved
//! through a [`GroupLookup`](crate::lookup::GroupLookup) passed into each
//! query, so the group graph can contain cycles without leaking.

mod comparator;
mod inheritance;
mod mutation;
mod primary_group;

pub use inheritance::DedupeStrategy;

use crate::events::{dispatch_isolated, notify_isolated, NodeMutation, StateListener};
use crate::group::GroupState;
use crate::identifier::{HolderIdentifier, HolderType};
use crate::nodemap::{Mutation, NodeMap, NodeMapSnapshot, NodeMapType};
use crate::services::HolderServices;
use crate::user::UserState;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;
use warden_core::{sort_highest_first, Node, QueryOptions};

/// What distinguishes a user from a group.
#[derive(Debug)]
pub enum Subject {
    /// A user.
    User(UserState),
    /// A group.
    Group(GroupState),
}

/// A user or group and the nodes it carries.
pub struct PermissionHolder {
    identifier: HolderIdentifier,
    subject: Subject,
    enduring: NodeMap,
    transient: NodeMap,
    io_lock: Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn StateListener>>>,
    services: HolderServices,
}

/// One event to emit after a committed edit.
pub(crate) enum Change<'a> {
    Added(&'a Node),
    Removed(&'a Node),
    Cleared,
}

impl PermissionHolder {
    /// A group named `name`. The name is stored lowercase.
    pub fn group(name: &str, services: HolderServices) -> Self {
        let state = GroupState::new(name);
        let identifier = HolderIdentifier::new(HolderType::Group, state.name());
        Self::with_subject(identifier, Subject::Group(state), services)
    }

    /// A user identified by `uuid`, optionally with a known username.
    pub fn user(uuid: Uuid, name: Option<&str>, services: HolderServices) -> Self {
        let state = UserState::new(uuid);
        state.set_name(name, false);
        let identifier = HolderIdentifier::new(HolderType::User, uuid.hyphenated().to_string());
        Self::with_subject(identifier, Subject::User(state), services)
    }

    fn with_subject(identifier: HolderIdentifier, subject: Subject, services: HolderServices) -> Self {
        Self {
            identifier,
            subject,
            enduring: NodeMap::new(NodeMapType::Enduring),
            transient: NodeMap::new(NodeMapType::Transient),
            io_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
            services,
        }
    }

    /// Type and object name.
    pub fn identifier(&self) -> &HolderIdentifier {
        &self.identifier
    }

    /// Group name or user uuid.
    pub fn object_name(&self) -> &str {
        self.identifier.object_name()
    }

    /// User or group.
    pub fn holder_type(&self) -> HolderType {
        self.identifier.holder_type()
    }

    /// The variant specific state.
    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// Whether this is a group.
    pub fn is_group(&self) -> bool {
        matches!(self.subject, Subject::Group(_))
    }

    /// Whether this is a user.
    pub fn is_user(&self) -> bool {
        matches!(self.subject, Subject::User(_))
    }

    /// Group state, for groups.
    pub fn as_group(&self) -> Option<&GroupState> {
        match &self.subject {
            Subject::Group(group) => Some(group),
            Subject::User(_) => None,
        }
    }

    /// User state, for users.
    pub fn as_user(&self) -> Option<&UserState> {
        match &self.subject {
            Subject::User(user) => Some(user),
            Subject::Group(_) => None,
        }
    }

    /// Config, dispatcher and clock shared with every holder.
    pub fn services(&self) -> &HolderServices {
        &self.services
    }

    /// Lock serializing storage I/O for this holder.
    ///
    /// Independent from the node map locks; holding it does not block reads
    /// or in-memory edits.
    pub fn io_lock(&self) -> &Mutex<()> {
        &self.io_lock
    }

    /// Register a listener called after every cache invalidation.
    pub fn add_state_listener(&self, listener: Arc<dyn StateListener>) {
        self.listeners.write().push(listener);
    }

    /// Weight of a group. Users have none.
    pub fn weight(&self) -> Option<i32> {
        let group = self.as_group()?;
        group.weight(|| self.enduring.immutable(), self.services.config())
    }

    /// Display name of a group. Users have none.
    pub fn display_name(&self) -> Option<String> {
        let group = self.as_group()?;
        group.display_name(|| self.enduring.immutable(), self.services.config())
    }

    /// Display name or name for groups, username or uuid for users.
    pub fn friendly_name(&self) -> String {
        match &self.subject {
            Subject::Group(group) => self
                .display_name()
                .unwrap_or_else(|| group.name().to_string()),
            Subject::User(user) => user
                .name()
                .unwrap_or_else(|| self.object_name().to_string()),
        }
    }

    /// One of the two node maps.
    pub fn node_map(&self, map_type: NodeMapType) -> &NodeMap {
        match map_type {
            NodeMapType::Enduring => &self.enduring,
            NodeMapType::Transient => &self.transient,
        }
    }

    /// Replace the enduring nodes with freshly loaded ones.
    ///
    /// Used by storage when (re)loading the holder; no mutation events are
    /// emitted.
    pub fn set_enduring_nodes(&self, nodes: impl IntoIterator<Item = Node>) {
        self.enduring.set_content(nodes);
        self.invalidate();
    }

    /// Replace the transient nodes. Emits no events.
    pub fn set_transient_nodes(&self, nodes: impl IntoIterator<Item = Node>) {
        self.transient.set_content(nodes);
        self.invalidate();
    }

    /// Current snapshot of the enduring nodes.
    pub fn enduring_nodes(&self) -> Arc<NodeMapSnapshot> {
        self.enduring.immutable()
    }

    /// Current snapshot of the transient nodes.
    pub fn transient_nodes(&self) -> Arc<NodeMapSnapshot> {
        self.transient.immutable()
    }

    /// Transient nodes followed by enduring nodes.
    pub fn own_nodes(&self) -> Vec<Node> {
        let transient = self.transient.immutable();
        let enduring = self.enduring.immutable();
        let mut nodes = Vec::with_capacity(transient.len() + enduring.len());
        nodes.extend_from_slice(transient.nodes());
        nodes.extend_from_slice(enduring.nodes());
        nodes
    }

    /// [`PermissionHolder::own_nodes`] whose scope applies to `query`.
    pub fn own_nodes_in(&self, query: &QueryOptions) -> Vec<Node> {
        let mut nodes = Vec::new();
        self.transient.copy_to(&mut nodes, query);
        self.enduring.copy_to(&mut nodes, query);
        nodes
    }

    /// Own nodes of both maps, highest priority first.
    pub fn own_nodes_sorted(&self) -> Vec<Node> {
        let mut nodes = self.own_nodes();
        sort_highest_first(&mut nodes);
        nodes
    }

    /// Names of the groups this holder has a `true` inheritance node for, in
    /// any scope.
    pub fn group_references(&self) -> BTreeSet<String> {
        let transient = self.transient.immutable();
        let enduring = self.enduring.immutable();
        transient
            .inheritance()
            .chain(enduring.inheritance())
            .filter_map(Node::group_name)
            .map(str::to_string)
            .collect()
    }

    /// Drop derived caches and tell listeners.
    pub(crate) fn invalidate(&self) {
        if let Some(group) = self.as_group() {
            group.invalidate();
        }
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            notify_isolated(&self.identifier, listener.as_ref());
        }
    }

    /// Invalidate, then emit `changes` for a committed edit of `map_type`.
    pub(crate) fn committed<R>(
        &self,
        map_type: NodeMapType,
        mutation: &Mutation<R>,
        changes: &[Change<'_>],
    ) {
        self.invalidate();

        let change = NodeMutation {
            target: &self.identifier,
            map_type,
            before: mutation.before.nodes(),
            after: mutation.after.nodes(),
        };
        let events = self.services.events();
        for c in changes {
            match c {
                Change::Added(node) => dispatch_isolated(&self.identifier, "node_added", || {
                    events.node_added(&change, node)
                }),
                Change::Removed(node) => {
                    dispatch_isolated(&self.identifier, "node_removed", || {
                        events.node_removed(&change, node)
                    });
                }
                Change::Cleared => dispatch_isolated(&self.identifier, "nodes_cleared", || {
                    events.nodes_cleared(&change)
                }),
            }
        }
    }
}

impl fmt::Debug for PermissionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionHolder")
            .field("identifier", &self.identifier)
            .field("subject", &self.subject)
            .field("enduring", &self.enduring)
            .field("transient", &self.transient)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for PermissionHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)
    }
}
