use crate::{
    member::{Member, MemberEditCommand},
    value::Value,
};
use std::collections::{BTreeMap, HashMap};

///
/// MemberCache
///
/// Cached children lists and member properties, keyed by unique name.
/// Mutated only by the serializing executor.
///

#[derive(Clone, Debug, Default)]
pub struct MemberCache {
    children: HashMap<String, Vec<Member>>,
    properties: HashMap<String, BTreeMap<String, Value>>,
}

impl MemberCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached children of `parent`, if the list is loaded.
    #[must_use]
    pub fn children(&self, parent: &Member) -> Option<&[Member]> {
        self.children.get(parent.unique_name()).map(Vec::as_slice)
    }

    #[must_use]
    pub fn property(&self, member: &Member, name: &str) -> Option<&Value> {
        self.properties.get(member.unique_name())?.get(name)
    }

    /// Number of cached children lists.
    #[must_use]
    pub fn cached_lists(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn cache_children(&mut self, parent: &Member, children: Vec<Member>) {
        self.children
            .insert(parent.unique_name().to_string(), children);
    }

    /// Apply a validated edit. Returns the number of children lists it
    /// invalidated.
    pub(crate) fn apply(&mut self, command: &MemberEditCommand) -> usize {
        match command {
            MemberEditCommand::Add { member } => self.invalidate_parent(member),
            MemberEditCommand::Delete { members } => members
                .iter()
                .map(|member| {
                    self.properties.remove(member.unique_name());
                    let subtree = self.forget_subtree(member);
                    subtree + self.invalidate_parent(member)
                })
                .sum(),
            MemberEditCommand::Move {
                member,
                parent,
                moved,
            } => {
                let mut invalidated = self.invalidate_parent(member);
                invalidated += usize::from(self.children.remove(parent.unique_name()).is_some());
                invalidated += self.forget_subtree(member);
                if let Some(props) = self.properties.remove(member.unique_name()) {
                    self.properties
                        .insert(moved.unique_name().to_string(), props);
                }
                invalidated
            }
            MemberEditCommand::SetProperty {
                members,
                property,
                value,
            } => {
                for member in members {
                    self.properties
                        .entry(member.unique_name().to_string())
                        .or_default()
                        .insert(property.clone(), value.clone());
                }
                0
            }
            MemberEditCommand::Compound { commands } => {
                commands.iter().map(|c| self.apply(c)).sum()
            }
        }
    }

    fn invalidate_parent(&mut self, member: &Member) -> usize {
        member
            .parent()
            .and_then(|p| self.children.remove(p.unique_name()))
            .map_or(0, |_| 1)
    }

    // Drop the member's own list and every list below it, plus the
    // properties of its descendants.
    fn forget_subtree(&mut self, member: &Member) -> usize {
        let name = member.unique_name();
        let prefix = format!("{name}.");
        let before = self.children.len();
        self.children
            .retain(|key, _| key != name && !key.starts_with(&prefix));
        self.properties.retain(|key, _| !key.starts_with(&prefix));

        before - self.children.len()
    }
}
