//! Dimension members, the member cache, and member edit commands.

mod cache;
mod command;
mod model;

#[cfg(test)]
mod tests;

use thiserror::Error as ThisError;

pub use cache::MemberCache;
pub use command::MemberEditCommand;
pub use model::Member;

///
/// MemberEditError
///
/// Rejections raised while building a member edit command.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum MemberEditError {
    #[error("cannot {command} members of parent-child hierarchy '{hierarchy}'")]
    ParentChildHierarchy {
        command: &'static str,
        hierarchy: String,
    },

    #[error("{command} command requires at least one member")]
    NoMembers { command: &'static str },

    #[error("set-property members must share one level, got {levels}")]
    MixedLevels { levels: String },

    #[error("level '{level}' declares no property '{property}'")]
    UnknownProperty { level: String, property: String },

    #[error("{parent} cannot be the parent of {member}")]
    InvalidParent { member: String, parent: String },

    #[error("compound command requires at least one command")]
    EmptyCompound,
}

impl MemberEditError {
    /// The edit is well-formed but the hierarchy cannot be edited.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::ParentChildHierarchy { .. })
    }
}
