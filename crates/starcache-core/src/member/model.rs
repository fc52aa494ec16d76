use crate::{
    error::InternalError,
    schema::{ColumnId, DimensionId, HierarchyId, LevelId, Schema},
    value::Value,
};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

///
/// Member
///
/// A dimension member: one key at one level, linked to its parent.
/// Cheap to clone; equality and hashing follow the unique name.
///

#[derive(Clone)]
pub struct Member(Arc<MemberNode>);

struct MemberNode {
    unique_name: String,
    name: String,
    level: LevelId,
    hierarchy: HierarchyId,
    dimension: DimensionId,
    key: Value,
    parent: Option<Member>,
}

impl Member {
    /// Member at the top level of `level`'s hierarchy.
    pub fn root(
        schema: &Schema,
        level: LevelId,
        name: &str,
        key: impl Into<Value>,
    ) -> Result<Self, InternalError> {
        let lvl = schema.resolve_level(level)?;
        if lvl.depth != 0 {
            return Err(InternalError::schema_invalid(format!(
                "level '{}' is not the top level of its hierarchy",
                lvl.name
            )));
        }
        let hierarchy = schema.resolve_hierarchy(lvl.hierarchy)?;

        Ok(Self(Arc::new(MemberNode {
            unique_name: format!("[{}].[{name}]", hierarchy.name),
            name: name.to_string(),
            level,
            hierarchy: hierarchy.id,
            dimension: hierarchy.dimension,
            key: key.into(),
            parent: None,
        })))
    }

    /// Child of `parent` at the next level down (the same level for a
    /// parent-child hierarchy).
    pub fn child(
        schema: &Schema,
        parent: &Self,
        name: &str,
        key: impl Into<Value>,
    ) -> Result<Self, InternalError> {
        let level = child_level(schema, parent)?;

        Ok(Self(Arc::new(MemberNode {
            unique_name: format!("{}.[{name}]", parent.unique_name()),
            name: name.to_string(),
            level,
            hierarchy: parent.hierarchy(),
            dimension: parent.dimension(),
            key: key.into(),
            parent: Some(parent.clone()),
        })))
    }

    /// This member re-parented under `parent`.
    pub(crate) fn with_parent(&self, schema: &Schema, parent: &Self) -> Result<Self, InternalError> {
        Self::child(schema, parent, self.name(), self.key().clone())
    }

    #[must_use]
    pub fn unique_name(&self) -> &str {
        &self.0.unique_name
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[must_use]
    pub fn level(&self) -> LevelId {
        self.0.level
    }

    #[must_use]
    pub fn hierarchy(&self) -> HierarchyId {
        self.0.hierarchy
    }

    #[must_use]
    pub fn dimension(&self) -> DimensionId {
        self.0.dimension
    }

    #[must_use]
    pub fn key(&self) -> &Value {
        &self.0.key
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.0.parent.as_ref()
    }

    /// Parent, grandparent, and so on up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(self.parent(), |m| m.parent())
    }

    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.ancestors().any(|a| a == self)
    }

    /// Key column values pinned by this member and its ancestors.
    /// Levels without a key column (`(All)`) contribute nothing.
    pub fn column_values(&self, schema: &Schema) -> Result<BTreeMap<ColumnId, Value>, InternalError> {
        let mut values = BTreeMap::new();
        for member in std::iter::once(self).chain(self.ancestors()) {
            if let Some(column) = schema.resolve_level(member.level())?.column {
                values.entry(column).or_insert_with(|| member.key().clone());
            }
        }

        Ok(values)
    }

    /// Key column values from the root down to this member.
    pub fn column_path(&self, schema: &Schema) -> Result<Vec<(ColumnId, Value)>, InternalError> {
        let mut lineage: Vec<&Self> = std::iter::once(self).chain(self.ancestors()).collect();
        lineage.reverse();

        let mut path = Vec::with_capacity(lineage.len());
        for member in lineage {
            if let Some(column) = schema.resolve_level(member.level())?.column {
                path.push((column, member.key().clone()));
            }
        }

        Ok(path)
    }
}

fn child_level(schema: &Schema, parent: &Member) -> Result<LevelId, InternalError> {
    let hierarchy = schema.resolve_hierarchy(parent.hierarchy())?;
    if hierarchy.parent_child {
        return Ok(parent.level());
    }
    let depth = schema.resolve_level(parent.level())?.depth;

    hierarchy.levels.get(depth + 1).copied().ok_or_else(|| {
        InternalError::schema_invalid(format!(
            "{} is at the bottom level and cannot have children",
            parent.unique_name()
        ))
    })
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.0.level == other.0.level && self.0.unique_name == other.0.unique_name
    }
}

impl Eq for Member {}

impl Hash for Member {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.level.hash(state);
        self.0.unique_name.hash(state);
    }
}

impl Ord for Member {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .unique_name
            .cmp(&other.0.unique_name)
            .then(self.0.level.cmp(&other.0.level))
    }
}

impl PartialOrd for Member {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member({})", self.unique_name())
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.unique_name())
    }
}
