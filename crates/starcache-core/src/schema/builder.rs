use crate::{
    bitkey::BitKey,
    error::InternalError,
    schema::{
        Aggregator, Column, ColumnId, Dimension, DimensionId, Hierarchy, HierarchyId, Level,
        LevelId, MAX_COLUMNS, Measure, MeasureId, Schema, Star, StarId, Table, TableJoin,
    },
};

///
/// SchemaBuilder
///
/// Checked construction of a [`Schema`]. The measures dimension is created
/// up front so that it owns ordinal 0.
///

#[derive(Debug)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        let mut schema = Schema::default();
        schema.dimensions.push(Dimension {
            id: DimensionId::MEASURES,
            name: "Measures".to_string(),
            hierarchies: Vec::new(),
        });

        Self { schema }
    }

    fn next_id(len: usize, what: &str) -> Result<u16, InternalError> {
        u16::try_from(len)
            .map_err(|_| InternalError::schema_invalid(format!("too many {what} in schema")))
    }

    pub fn add_star(&mut self, fact_table: &str) -> Result<StarId, InternalError> {
        if self.schema.stars.iter().any(|s| s.fact_table == fact_table) {
            return Err(InternalError::schema_invalid(format!(
                "fact table '{fact_table}' already has a star"
            )));
        }

        let id = StarId(Self::next_id(self.schema.stars.len(), "stars")?);
        self.schema.stars.push(Star {
            id,
            fact_table: fact_table.to_string(),
            tables: vec![Table {
                name: fact_table.to_string(),
                join: None,
            }],
            columns: BitKey::new(),
        });

        Ok(id)
    }

    /// Join a dimension table to a star's fact table.
    pub fn join_table(
        &mut self,
        star: StarId,
        table: &str,
        foreign_key: &str,
        primary_key: &str,
    ) -> Result<(), InternalError> {
        let star = self.star_mut(star)?;
        if star.table(table).is_some() {
            return Err(InternalError::schema_invalid(format!(
                "table '{table}' is already part of star '{}'",
                star.fact_table
            )));
        }

        star.tables.push(Table {
            name: table.to_string(),
            join: Some(TableJoin {
                foreign_key: foreign_key.to_string(),
                primary_key: primary_key.to_string(),
            }),
        });

        Ok(())
    }

    pub fn add_column(
        &mut self,
        star: StarId,
        table: &str,
        name: &str,
        cardinality: Option<u64>,
    ) -> Result<ColumnId, InternalError> {
        if self.schema.columns.len() >= MAX_COLUMNS {
            return Err(InternalError::schema_invalid(format!(
                "schema exceeds {MAX_COLUMNS} columns"
            )));
        }
        if self.schema.column_by_name(table, name).is_some() {
            return Err(InternalError::schema_invalid(format!(
                "column '{table}.{name}' is already defined"
            )));
        }

        let id = ColumnId(Self::next_id(self.schema.columns.len(), "columns")?);
        let star_ref = self.star_mut(star)?;
        if star_ref.table(table).is_none() {
            return Err(InternalError::schema_invalid(format!(
                "table '{table}' is not joined to star '{}'",
                star_ref.fact_table
            )));
        }
        star_ref.columns.set(id);

        self.schema.columns.push(Column {
            id,
            star,
            table: table.to_string(),
            name: name.to_string(),
            cardinality,
        });

        Ok(id)
    }

    pub fn add_measure(
        &mut self,
        name: &str,
        aggregator: Aggregator,
        column: ColumnId,
    ) -> Result<MeasureId, InternalError> {
        let star = self
            .schema
            .column(column)
            .map(|c| c.star)
            .ok_or_else(|| InternalError::schema_invalid(format!("unknown column {column}")))?;
        if self.schema.measure_by_name(name).is_some() {
            return Err(InternalError::schema_invalid(format!(
                "measure '{name}' is already defined"
            )));
        }

        let id = MeasureId(Self::next_id(self.schema.measures.len(), "measures")?);
        self.schema.measures.push(Measure {
            id,
            star,
            name: name.to_string(),
            aggregator,
            column,
        });

        Ok(id)
    }

    pub fn add_dimension(&mut self, name: &str) -> Result<DimensionId, InternalError> {
        if self.schema.dimension_by_name(name).is_some() {
            return Err(InternalError::schema_invalid(format!(
                "dimension '{name}' is already defined"
            )));
        }

        let id = DimensionId(Self::next_id(self.schema.dimensions.len(), "dimensions")?);
        self.schema.dimensions.push(Dimension {
            id,
            name: name.to_string(),
            hierarchies: Vec::new(),
        });

        Ok(id)
    }

    pub fn add_hierarchy(
        &mut self,
        dimension: DimensionId,
        name: &str,
        parent_child: bool,
    ) -> Result<HierarchyId, InternalError> {
        if dimension == DimensionId::MEASURES {
            return Err(InternalError::schema_invalid(
                "the measures dimension has no hierarchies",
            ));
        }

        let id = HierarchyId(Self::next_id(self.schema.hierarchies.len(), "hierarchies")?);
        let dim = self
            .schema
            .dimensions
            .get_mut(dimension.index())
            .ok_or_else(|| InternalError::schema_invalid(format!("unknown {dimension}")))?;
        dim.hierarchies.push(id);

        self.schema.hierarchies.push(Hierarchy {
            id,
            dimension,
            name: name.to_string(),
            parent_child,
            levels: Vec::new(),
        });

        Ok(id)
    }

    /// Append a level below the hierarchy's current deepest level.
    pub fn add_level(
        &mut self,
        hierarchy: HierarchyId,
        name: &str,
        column: Option<ColumnId>,
        properties: &[&str],
    ) -> Result<LevelId, InternalError> {
        if let Some(column) = column
            && self.schema.column(column).is_none()
        {
            return Err(InternalError::schema_invalid(format!(
                "unknown column {column}"
            )));
        }

        let id = LevelId(Self::next_id(self.schema.levels.len(), "levels")?);
        let hier = self
            .schema
            .hierarchies
            .get_mut(hierarchy.index())
            .ok_or_else(|| InternalError::schema_invalid(format!("unknown {hierarchy}")))?;
        if column.is_none() && !hier.levels.is_empty() {
            return Err(InternalError::schema_invalid(format!(
                "level '{name}' needs a key column; only the top level may be (All)"
            )));
        }
        let depth = hier.levels.len();
        hier.levels.push(id);

        self.schema.levels.push(Level {
            id,
            hierarchy,
            name: name.to_string(),
            depth,
            column,
            properties: properties.iter().map(ToString::to_string).collect(),
        });

        Ok(id)
    }

    #[must_use]
    pub fn build(self) -> Schema {
        self.schema
    }

    fn star_mut(&mut self, star: StarId) -> Result<&mut Star, InternalError> {
        self.schema
            .stars
            .get_mut(star.index())
            .ok_or_else(|| InternalError::schema_invalid(format!("unknown {star}")))
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
