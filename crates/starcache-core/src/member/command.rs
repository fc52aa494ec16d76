use crate::{
    error::InternalError,
    member::{Member, MemberEditError},
    region::{CellRegion, FlushPlan},
    schema::Schema,
    value::Value,
};
use std::collections::BTreeSet;

///
/// MemberEditCommand
///
/// A validated edit of the member cache. Construction checks every
/// precondition; executing a command cannot fail validation.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemberEditCommand {
    Add {
        member: Member,
    },
    Delete {
        members: Vec<Member>,
    },
    Move {
        member: Member,
        parent: Member,

        /// `member` as it reads under `parent`.
        moved: Member,
    },
    SetProperty {
        members: Vec<Member>,
        property: String,
        value: Value,
    },
    Compound {
        commands: Vec<MemberEditCommand>,
    },
}

impl MemberEditCommand {
    pub fn add(schema: &Schema, member: Member) -> Result<Self, InternalError> {
        ensure_editable(schema, "add", &member)?;

        Ok(Self::Add { member })
    }

    pub fn delete(schema: &Schema, members: &[Member]) -> Result<Self, InternalError> {
        if members.is_empty() {
            return Err(MemberEditError::NoMembers { command: "delete" }.into());
        }
        for member in members {
            ensure_editable(schema, "delete", member)?;
        }

        Ok(Self::Delete {
            members: members.to_vec(),
        })
    }

    /// Move `member` under `parent`, which must sit one level above it
    /// in the same hierarchy and must not be one of its descendants.
    pub fn move_to(schema: &Schema, member: Member, parent: Member) -> Result<Self, InternalError> {
        ensure_editable(schema, "move", &member)?;

        let invalid = || MemberEditError::InvalidParent {
            member: member.unique_name().to_string(),
            parent: parent.unique_name().to_string(),
        };
        if parent.hierarchy() != member.hierarchy()
            || parent == member
            || member.is_ancestor_of(&parent)
        {
            return Err(invalid().into());
        }
        let depth = schema.resolve_level(member.level())?.depth;
        let parent_depth = schema.resolve_level(parent.level())?.depth;
        if parent_depth + 1 != depth {
            return Err(invalid().into());
        }
        let moved = member.with_parent(schema, &parent)?;

        Ok(Self::Move {
            member,
            parent,
            moved,
        })
    }

    /// Set `property` on every member; all must share one level that
    /// declares the property.
    pub fn set_property(
        schema: &Schema,
        members: &[Member],
        property: &str,
        value: impl Into<Value>,
    ) -> Result<Self, InternalError> {
        let Some(first) = members.first() else {
            return Err(MemberEditError::NoMembers {
                command: "set-property",
            }
            .into());
        };

        let levels: BTreeSet<_> = members.iter().map(Member::level).collect();
        if levels.len() > 1 {
            let names = levels
                .iter()
                .map(|id| {
                    schema
                        .level(*id)
                        .map_or_else(|| id.to_string(), |l| l.name.clone())
                })
                .collect::<Vec<_>>()
                .join(", ");
            return Err(MemberEditError::MixedLevels {
                levels: format!("[{names}]"),
            }
            .into());
        }

        let level = schema.resolve_level(first.level())?;
        if !level.has_property(property) {
            return Err(MemberEditError::UnknownProperty {
                level: level.name.clone(),
                property: property.to_string(),
            }
            .into());
        }

        Ok(Self::SetProperty {
            members: members.to_vec(),
            property: property.to_string(),
            value: value.into(),
        })
    }

    /// Several commands executed together as one executor command.
    pub fn compound(commands: Vec<Self>) -> Result<Self, InternalError> {
        if commands.is_empty() {
            return Err(MemberEditError::EmptyCompound.into());
        }

        Ok(Self::Compound { commands })
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Delete { .. } => "delete",
            Self::Move { .. } => "move",
            Self::SetProperty { .. } => "set-property",
            Self::Compound { .. } => "compound",
        }
    }

    /// Cell regions whose cached aggregates the edit invalidates.
    /// Property edits touch no cells.
    pub fn flush_regions(&self, schema: &Schema) -> Result<Vec<CellRegion>, InternalError> {
        let mut regions = Vec::new();
        match self {
            Self::Add { member } => regions.push(member_region(schema, member)?),
            Self::Delete { members } => {
                for member in members {
                    regions.push(member_region(schema, member)?);
                }
            }
            Self::Move { member, moved, .. } => {
                regions.push(member_region(schema, member)?);
                regions.push(member_region(schema, moved)?);
            }
            Self::SetProperty { .. } => {}
            Self::Compound { commands } => {
                for command in commands {
                    regions.extend(command.flush_regions(schema)?);
                }
            }
        }

        Ok(regions)
    }

    /// One plan flushing every region of [`Self::flush_regions`].
    pub fn flush_plan(&self, schema: &Schema) -> Result<FlushPlan, InternalError> {
        let mut plan = FlushPlan::default();
        for region in self.flush_regions(schema)? {
            plan.merge(FlushPlan::new(schema, &region)?);
        }

        Ok(plan)
    }
}

fn ensure_editable(
    schema: &Schema,
    command: &'static str,
    member: &Member,
) -> Result<(), InternalError> {
    let hierarchy = schema.resolve_hierarchy(member.hierarchy())?;
    if hierarchy.parent_child {
        return Err(MemberEditError::ParentChildHierarchy {
            command,
            hierarchy: hierarchy.name.clone(),
        }
        .into());
    }

    Ok(())
}

// All measures crossed with the member and its descendants, unioned with
// its ancestors without descendants.
fn member_region(schema: &Schema, member: &Member) -> Result<CellRegion, InternalError> {
    let mut parts = vec![CellRegion::member(
        schema,
        std::slice::from_ref(member),
        true,
    )?];

    let ancestors: Vec<Member> = member.ancestors().cloned().collect();
    if !ancestors.is_empty() {
        parts.push(CellRegion::member(schema, &ancestors, false)?);
    }

    let members = CellRegion::union(schema, parts)?;

    Ok(CellRegion::crossjoin(
        schema,
        vec![CellRegion::all_measures(schema), members],
    )?)
}
