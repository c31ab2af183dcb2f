//! Dense storage for simulated trajectories.
//!
//! A [`PathSet`] is laid out path-major: for path `p`, step `t` and asset `a`
//! the level sits at `(p * (n_steps + 1) + t) * n_assets + a`. Single-asset runs
//! use `n_assets == 1`, so each path is a contiguous `&[f64]` of `n_steps + 1`
//! levels.

use crate::error::{SimResult, SimulationError};

/// Simulated levels indexed by (path, step, asset).
#[derive(Debug, Clone, PartialEq)]
pub struct PathSet {
    n_paths: usize,
    n_steps: usize,
    n_assets: usize,
    antithetic: bool,
    data: Vec<f64>,
}

impl PathSet {
    /// Allocate a path set with every path starting at `initial` (one level per asset).
    pub(crate) fn with_initial(n_paths: usize, n_steps: usize, initial: &[f64]) -> Self {
        let n_assets = initial.len();
        let stride = (n_steps + 1) * n_assets;
        let mut data = vec![0.0; n_paths * stride];
        for path in data.chunks_exact_mut(stride) {
            path[..n_assets].copy_from_slice(initial);
        }
        Self {
            n_paths,
            n_steps,
            n_assets,
            antithetic: false,
            data,
        }
    }

    pub(crate) fn mark_antithetic(mut self) -> Self {
        self.antithetic = true;
        self
    }

    pub(crate) fn path_mut(&mut self, path: usize) -> &mut [f64] {
        let stride = self.stride();
        &mut self.data[path * stride..(path + 1) * stride]
    }

    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn n_assets(&self) -> usize {
        self.n_assets
    }

    /// True when paths `2k` and `2k + 1` are mirrored antithetic pairs.
    pub fn is_antithetic(&self) -> bool {
        self.antithetic
    }

    fn stride(&self) -> usize {
        (self.n_steps + 1) * self.n_assets
    }

    /// Level of `asset` on `path` at `step`.
    pub fn level(&self, path: usize, step: usize, asset: usize) -> f64 {
        self.data[(path * (self.n_steps + 1) + step) * self.n_assets + asset]
    }

    /// Borrow one path as a view over its (step, asset) table.
    pub fn path(&self, path: usize) -> PathView<'_> {
        let stride = self.stride();
        PathView {
            levels: &self.data[path * stride..(path + 1) * stride],
            n_assets: self.n_assets,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = PathView<'_>> + '_ {
        let n_assets = self.n_assets;
        self.data
            .chunks_exact(self.stride())
            .map(move |levels| PathView { levels, n_assets })
    }

    /// Terminal levels of a single-asset path set.
    pub fn terminal_values(&self) -> SimResult<Vec<f64>> {
        if self.n_assets != 1 {
            return Err(SimulationError::shape(
                "single-asset path set",
                format!("{} assets", self.n_assets),
            ));
        }
        Ok(self.iter().map(|p| p.terminal(0)).collect())
    }
}

/// Read-only view of one simulated path.
#[derive(Debug, Clone, Copy)]
pub struct PathView<'a> {
    levels: &'a [f64],
    n_assets: usize,
}

impl<'a> PathView<'a> {
    /// Wrap a single-asset series of levels (step 0 first).
    pub fn single(levels: &'a [f64]) -> Self {
        Self {
            levels,
            n_assets: 1,
        }
    }

    pub fn n_assets(&self) -> usize {
        self.n_assets
    }

    pub fn n_steps(&self) -> usize {
        self.levels.len() / self.n_assets - 1
    }

    /// Levels of a single-asset path, or `None` for a basket.
    pub fn as_single(&self) -> Option<&'a [f64]> {
        (self.n_assets == 1).then_some(self.levels)
    }

    /// Levels of all assets at `step`.
    pub fn at_step(&self, step: usize) -> &'a [f64] {
        &self.levels[step * self.n_assets..(step + 1) * self.n_assets]
    }

    pub fn terminal(&self, asset: usize) -> f64 {
        self.levels[self.levels.len() - self.n_assets + asset]
    }

    pub fn steps(&self) -> impl Iterator<Item = &'a [f64]> + 'a {
        self.levels.chunks_exact(self.n_assets)
    }
}
