use crate::{
    batch::{Batch, CompositeBatch},
    error::InternalError,
    predicate::AggregationKey,
    request::CellRequest,
    schema::Schema,
};
use std::{collections::HashMap, sync::Arc};

///
/// BatchGrouper
///
/// Collects cell requests into batches keyed by aggregation key, then
/// folds coarser batches into the finer batches that can answer them.
///

#[derive(Debug)]
pub struct BatchGrouper {
    schema: Arc<Schema>,
    batches: Vec<Batch>,
    index: HashMap<AggregationKey, usize>,
}

impl BatchGrouper {
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            batches: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn record(&mut self, request: &CellRequest) -> Result<(), InternalError> {
        let measure = self.schema.resolve_measure(request.measure())?;
        if measure.star != request.star() {
            return Err(InternalError::batch_invariant(format!(
                "request for {} is keyed on {}",
                measure.id,
                request.star()
            )));
        }

        let slot = match self.index.get(request.key()) {
            Some(slot) => *slot,
            None => {
                self.batches
                    .push(Batch::new(Arc::clone(&self.schema), request.key().clone()));
                let slot = self.batches.len() - 1;
                self.index.insert(request.key().clone(), slot);
                slot
            }
        };
        self.batches[slot].add(request);

        Ok(())
    }

    #[must_use]
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Partition the batches into composites.
    ///
    /// Batches are visited from the widest grain down (stable for equal
    /// widths). Each batch not yet claimed becomes a detail and claims every
    /// later unclaimed batch it can answer.
    #[must_use]
    pub fn into_composites(self) -> Vec<CompositeBatch> {
        let mut order: Vec<usize> = (0..self.batches.len()).collect();
        order.sort_by_key(|i| std::cmp::Reverse(self.batches[*i].bitkey().cardinality()));

        let mut claimed = vec![false; self.batches.len()];
        let mut plan: Vec<(usize, Vec<usize>)> = Vec::new();
        for (pos, &detail) in order.iter().enumerate() {
            if claimed[detail] {
                continue;
            }
            claimed[detail] = true;

            let mut summaries = Vec::new();
            for &candidate in &order[pos + 1..] {
                if !claimed[candidate] && self.batches[detail].can_batch(&self.batches[candidate]) {
                    claimed[candidate] = true;
                    summaries.push(candidate);
                }
            }
            plan.push((detail, summaries));
        }

        let mut slots: Vec<Option<Batch>> = self.batches.into_iter().map(Some).collect();
        let mut composites = Vec::with_capacity(plan.len());
        for (detail, summaries) in plan {
            let Some(detail) = slots[detail].take() else {
                continue;
            };
            let summaries = summaries.into_iter().filter_map(|i| slots[i].take()).collect();
            composites.push(CompositeBatch::new(detail, summaries));
        }

        composites
    }
}
