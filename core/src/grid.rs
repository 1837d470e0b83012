use crate::config::EngineConfig;
use crate::ensemble::Ensemble;
use crate::patch::GridShape;

/// Per-cell ensembles for one frame geometry.
///
/// Ensembles are instantiated on first use; each cell's weights depend only on the
/// engine seed and the cell index, so the order cells are touched in does not matter.
#[derive(Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    shape: GridShape,
    cells: Vec<Option<Ensemble>>,
}

impl Grid {
    pub fn new(width: usize, height: usize, edge: usize) -> Self {
        let shape = GridShape::for_frame(width, height, edge);
        tracing::info!(
            width,
            height,
            cols = shape.cols,
            rows = shape.rows,
            cells = shape.len(),
            "building patch grid"
        );
        Self {
            width,
            height,
            shape,
            cells: (0..shape.len()).map(|_| None).collect(),
        }
    }

    pub fn matches(&self, width: usize, height: usize) -> bool {
        self.width == width && self.height == height
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, index: usize) -> Option<&Ensemble> {
        self.cells.get(index).and_then(Option::as_ref)
    }

    /// Cells that have been evaluated at least once.
    pub fn materialized(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn diverged_steps(&self) -> u64 {
        self.cells
            .iter()
            .flatten()
            .map(Ensemble::diverged_steps)
            .sum()
    }

    /// Exclusive handles to the ensembles at `indices`, in the given order. Duplicate and
    /// out-of-range indices are skipped.
    pub fn select_mut(
        &mut self,
        indices: &[usize],
        config: &EngineConfig,
    ) -> Vec<(usize, &mut Ensemble)> {
        let width = self.shape.edge * self.shape.edge;
        let mut slots: Vec<Option<&mut Option<Ensemble>>> =
            self.cells.iter_mut().map(Some).collect();
        indices
            .iter()
            .filter_map(|&index| {
                let cell = slots.get_mut(index)?.take()?;
                let ensemble = cell.get_or_insert_with(|| {
                    Ensemble::new(
                        config.actions(),
                        width,
                        config.markov_order,
                        config.seed,
                        index as u64,
                        config.into(),
                    )
                });
                Some((index, ensemble))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_distinct_and_lazy() {
        let config = EngineConfig::default();
        let mut grid = Grid::new(32, 24, 8);
        assert_eq!(grid.len(), 12);
        assert_eq!(grid.materialized(), 0);
        let picked: Vec<usize> = grid
            .select_mut(&[5, 2, 5, 40, 11], &config)
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        assert_eq!(picked, vec![5, 2, 11]);
        assert_eq!(grid.materialized(), 3);
        assert!(grid.cell(2).is_some());
        assert!(grid.cell(3).is_none());
        assert!(grid.matches(32, 24));
        assert!(!grid.matches(32, 32));
    }
}
