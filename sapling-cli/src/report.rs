//! Plain-text summary of a generation.

use std::fmt;

use glam::Vec3;
use sapling_core::{error::Notice, phases::Generation};

#[derive(Debug, PartialEq)]
pub struct Summary {
    pub seed: u64,
    pub tree_scale: f32,
    /// Retained stems per level, trunk first.
    pub stems_per_level: Vec<usize>,
    pub dropped: usize,
    pub leaves: usize,
    pub bones: usize,
    pub pruning_exhausted: usize,
    pub degenerate: usize,
    pub bounds: Option<(Vec3, Vec3)>,
}

impl Summary {
    pub fn new(generation: &Generation, seed: u64) -> Self {
        let mut stems_per_level = Vec::new();
        let mut dropped = 0;
        for stem in &generation.stems.stems {
            if !stem.retained {
                dropped += 1;
                continue;
            }
            if stems_per_level.len() <= stem.level {
                stems_per_level.resize(stem.level + 1, 0);
            }
            stems_per_level[stem.level] += 1;
        }

        let bounds = generation
            .stems
            .retained()
            .flat_map(|(_, s)| s.points.iter().map(|p| p.pos))
            .chain(generation.leaves.iter().flat_map(|l| l.quad()))
            .fold(None, |acc: Option<(Vec3, Vec3)>, p| match acc {
                Some((lo, hi)) => Some((lo.min(p), hi.max(p))),
                None => Some((p, p)),
            });

        let count = |f: fn(&Notice) -> bool| generation.notices.iter().filter(|n| f(n)).count();
        Self {
            seed,
            tree_scale: generation.tree_scale,
            stems_per_level,
            dropped,
            leaves: generation.leaves.len(),
            bones: generation.bones(),
            pruning_exhausted: count(|n| matches!(n, Notice::PruningExhausted { .. })),
            degenerate: count(|n| matches!(n, Notice::DegenerateStem { .. })),
            bounds,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "seed        {}", self.seed)?;
        writeln!(f, "tree scale  {:.3}", self.tree_scale)?;
        for (level, n) in self.stems_per_level.iter().enumerate() {
            writeln!(f, "level {level}     {n} stems")?;
        }
        if self.dropped > 0 {
            writeln!(f, "pruned away {}", self.dropped)?;
        }
        writeln!(f, "leaves      {}", self.leaves)?;
        writeln!(f, "bones       {}", self.bones)?;
        if let Some((lo, hi)) = self.bounds {
            let size = hi - lo;
            writeln!(
                f,
                "extent      {:.2} x {:.2} x {:.2}",
                size.x, size.y, size.z
            )?;
        }
        if self.pruning_exhausted + self.degenerate > 0 {
            writeln!(
                f,
                "notices     {} pruning exhausted, {} degenerate",
                self.pruning_exhausted, self.degenerate
            )?;
        }
        Ok(())
    }
}
