use crate::{
    region::{CellRegion, CrossjoinRegion, UnionRegion},
    schema::DimensionId,
};

pub(super) fn normalize(region: &CellRegion) -> CellRegion {
    if region.is_leaf() {
        return region.clone();
    }

    let children: Vec<CellRegion> = disjuncts(region)
        .into_iter()
        .map(|mut leaves| {
            leaves.sort_by_key(leaf_dimension);
            let mut dimensionality: Vec<DimensionId> = leaves.iter().map(leaf_dimension).collect();
            dimensionality.dedup();

            CellRegion::Crossjoin(CrossjoinRegion {
                dimensionality,
                children: leaves,
            })
        })
        .collect();

    CellRegion::Union(UnionRegion {
        dimensionality: region.dimensionality(),
        children,
    })
}

// Each disjunct is the list of leaves crossjoined together, in input order.
// Crossjoin distributes over union: for A x (B u C) the A-B disjunct
// precedes the A-C one.
fn disjuncts(region: &CellRegion) -> Vec<Vec<CellRegion>> {
    match region {
        CellRegion::Member(_) | CellRegion::Range(_) | CellRegion::Measures(_) => {
            vec![vec![region.clone()]]
        }
        CellRegion::Union(r) => r.children.iter().flat_map(disjuncts).collect(),
        CellRegion::Crossjoin(r) => {
            let mut product: Vec<Vec<CellRegion>> = vec![Vec::new()];
            for child in &r.children {
                let alternatives = disjuncts(child);
                product = product
                    .iter()
                    .flat_map(|prefix| {
                        alternatives.iter().map(move |alt| {
                            let mut leaves = prefix.clone();
                            leaves.extend(alt.iter().cloned());
                            leaves
                        })
                    })
                    .collect();
            }
            product
        }
    }
}

fn leaf_dimension(leaf: &CellRegion) -> DimensionId {
    leaf.dimensionality()
        .first()
        .copied()
        .unwrap_or(DimensionId::MEASURES)
}
