use crate::{
    engine::Engine,
    error::InternalError,
    executor::{CacheCommand, ExecutionContext, Handle, promise},
    member::{Member, MemberEditCommand},
    region::{CellRegion, FlushPlan, FlushReport},
    schema::{LevelId, MeasureId},
    value::Value,
};
use std::ops::Bound;

///
/// CacheControl
///
/// Region construction, flushing, and member edits for one execution
/// context. Mutations are queued on the cache executor and resolve
/// through a [`Handle`].
///

pub struct CacheControl<'a> {
    engine: &'a Engine,
    context: ExecutionContext,
}

impl<'a> CacheControl<'a> {
    pub(super) const fn new(engine: &'a Engine, context: ExecutionContext) -> Self {
        Self { engine, context }
    }

    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }

    // ------------------------------------------------------------------
    // Regions
    // ------------------------------------------------------------------

    pub fn create_member_region(
        &self,
        members: &[Member],
        descendants: bool,
    ) -> Result<CellRegion, InternalError> {
        Ok(CellRegion::member(self.engine.schema(), members, descendants)?)
    }

    pub fn create_range_region(
        &self,
        level: LevelId,
        lower: Bound<Member>,
        upper: Bound<Member>,
    ) -> Result<CellRegion, InternalError> {
        Ok(CellRegion::range(self.engine.schema(), level, lower, upper)?)
    }

    pub fn create_measures_region(
        &self,
        measures: &[MeasureId],
    ) -> Result<CellRegion, InternalError> {
        Ok(CellRegion::measures(measures)?)
    }

    #[must_use]
    pub fn create_all_measures_region(&self) -> CellRegion {
        CellRegion::all_measures(self.engine.schema())
    }

    pub fn create_union_region(
        &self,
        regions: Vec<CellRegion>,
    ) -> Result<CellRegion, InternalError> {
        Ok(CellRegion::union(self.engine.schema(), regions)?)
    }

    pub fn create_crossjoin_region(
        &self,
        regions: Vec<CellRegion>,
    ) -> Result<CellRegion, InternalError> {
        Ok(CellRegion::crossjoin(self.engine.schema(), regions)?)
    }

    #[must_use]
    pub fn normalize(&self, region: &CellRegion) -> CellRegion {
        region.normalize()
    }

    // ------------------------------------------------------------------
    // Flushing
    // ------------------------------------------------------------------

    /// Discard or narrow every cached segment that intersects `region`.
    /// The region must include the measures dimension.
    pub fn flush(&self, region: &CellRegion) -> Result<Handle<FlushReport>, InternalError> {
        let plan = FlushPlan::new(self.engine.schema(), region)?;
        tracing::debug!(region = %region, "flush requested");

        let (reply, handle) = promise();
        self.submit(CacheCommand::Flush { plan, reply })?;

        Ok(handle)
    }

    /// Discard every cached segment. Resolves to the number discarded.
    pub fn flush_all(&self) -> Result<Handle<usize>, InternalError> {
        let (reply, handle) = promise();
        self.submit(CacheCommand::FlushAll { reply })?;

        Ok(handle)
    }

    /// Describe every cached segment `region` would touch, in cache
    /// order. Without a measures component every measure is inspected.
    pub fn print_cache_state(&self, region: &CellRegion) -> Result<String, InternalError> {
        let schema = self.engine.schema();
        let plan = FlushPlan::inspect(schema, region)?;
        let snapshot = self.engine.segments().snapshot();

        Ok(snapshot
            .iter()
            .filter(|segment| plan.touches(segment.header()))
            .map(|segment| segment.header().describe(schema))
            .collect())
    }

    // ------------------------------------------------------------------
    // Member edits
    // ------------------------------------------------------------------

    pub fn create_add_command(&self, member: Member) -> Result<MemberEditCommand, InternalError> {
        MemberEditCommand::add(self.engine.schema(), member)
    }

    pub fn create_delete_command(
        &self,
        members: &[Member],
    ) -> Result<MemberEditCommand, InternalError> {
        MemberEditCommand::delete(self.engine.schema(), members)
    }

    pub fn create_move_command(
        &self,
        member: Member,
        parent: Member,
    ) -> Result<MemberEditCommand, InternalError> {
        MemberEditCommand::move_to(self.engine.schema(), member, parent)
    }

    pub fn create_set_property_command(
        &self,
        members: &[Member],
        property: &str,
        value: impl Into<Value>,
    ) -> Result<MemberEditCommand, InternalError> {
        MemberEditCommand::set_property(self.engine.schema(), members, property, value)
    }

    pub fn create_compound_command(
        &self,
        commands: Vec<MemberEditCommand>,
    ) -> Result<MemberEditCommand, InternalError> {
        MemberEditCommand::compound(commands)
    }

    /// Apply `command` to the member cache and flush the cells it
    /// invalidates, as one executor command.
    pub fn execute(&self, command: MemberEditCommand) -> Result<Handle<FlushReport>, InternalError> {
        let plan = command.flush_plan(self.engine.schema())?;
        tracing::debug!(kind = command.kind(), "member edit requested");

        let (reply, handle) = promise();
        self.submit(CacheCommand::EditMembers {
            command,
            plan,
            reply,
        })?;

        Ok(handle)
    }

    /// Cache the children list of `parent`.
    pub fn cache_children(
        &self,
        parent: Member,
        children: Vec<Member>,
    ) -> Result<Handle<()>, InternalError> {
        let (reply, handle) = promise();
        self.submit(CacheCommand::InstallChildren {
            parent,
            children,
            reply,
        })?;

        Ok(handle)
    }

    #[must_use]
    pub fn cached_children(&self, parent: &Member) -> Option<Vec<Member>> {
        self.engine.cached_children(parent)
    }

    #[must_use]
    pub fn member_property(&self, member: &Member, property: &str) -> Option<Value> {
        self.engine
            .state
            .members
            .read()
            .property(member, property)
            .cloned()
    }

    fn submit(&self, command: CacheCommand) -> Result<(), InternalError> {
        self.engine.executor.submit(self.context.clone(), command)
    }
}
