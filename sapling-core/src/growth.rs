//! Recursive stem construction.
//!
//! The trunk is built first; every branch grows all of its split
//! continuations before any of its children, depth first. That order fixes
//! the order of RNG draws and therefore the output for a given seed.
//!
//! Per stem:
//! 1. Walk `curveRes` segments, bending the frame by the level's curvature
//!    and, above the trunk, toward vertical by `attractUp`.
//! 2. At each interior segment boundary draw the number of splits; on a
//!    split the stem ends and same-level continuations carry on. One branch
//!    splits off at most `curveRes - 1` extra stems in total.
//! 3. Once every slice of the branch exists, spawn the next level's
//!    children over each slice. With pruning enabled each child is grown
//!    with its whole subtree, checked against the envelope and regrown
//!    shorter until the subtree fits.

use glam::{Quat, Vec3};
use tracing::{debug, trace};

use crate::{
    config::{Level, ParameterSet},
    envelope::{PruneVolume, Shape},
    error::Notice,
    rng::{RngState, TreeRng},
    tree::{Stem, StemPoint, StemTree},
    types::StemId,
};

/// Upper bound on shortened candidates tried per pruned stem.
pub const MAX_PRUNE_ATTEMPTS: usize = 8;

/// Lengths and radii at or below this are treated as collapsed.
const DEGENERATE: f32 = 1e-6;

/// Output of [`grow_tree`].
#[derive(Debug)]
pub struct Grown {
    pub tree: StemTree,
    pub notices: Vec<Notice>,
    /// The tree scale after `scaleV` variation.
    pub tree_scale: f32,
}

/// Initial conditions of one branch slice.
#[derive(Clone, Debug)]
struct StemSeed {
    level: usize,
    pos: Vec3,
    frame: Quat,
    /// Length of the whole branch.
    length: f32,
    /// Branch radius at `t = 0`, already divided down by any splits.
    radius: f32,
    /// First segment this slice covers.
    segment: u32,
    split_index: usize,
    offset: f32,
    curvature: f32,
}

impl StemSeed {
    fn shortened(&self, fraction: f32, ratio_power: f32) -> Self {
        Self {
            length: self.length * fraction,
            radius: self.radius * fraction.powf(ratio_power),
            ..self.clone()
        }
    }
}

/// Builds the full stem tree for `params`, drawing from `rng`.
///
/// `params` must already be validated.
pub fn grow_tree(params: &ParameterSet, rng: &mut TreeRng) -> Grown {
    let tree_scale = rng.spread(params.scale, params.scale_v).max(0.0);
    let trunk = params.level(0);
    let length = (rng.spread(trunk.length, trunk.length_v) * tree_scale).max(0.0);
    let radius = (params.ratio * tree_scale * rng.spread(params.scale0, params.scale_v0)).max(0.0);
    debug!(tree_scale, length, radius, "trunk");

    let prune = params
        .prune
        .then(|| PruneVolume::from_params(params, tree_scale));

    let mut growth = Growth {
        params,
        rng,
        tree: StemTree::new(),
        notices: Vec::new(),
        prune,
        nested_pruning: true,
    };

    let base = StemSeed {
        level: 0,
        pos: Vec3::ZERO,
        frame: Quat::from_rotation_x(params.start_curv.to_radians()),
        length,
        radius,
        segment: 0,
        split_index: 0,
        offset: 0.0,
        curvature: 0.0,
    };

    let clones = params.base_splits as usize;
    if clones >= 2 {
        let radius = base.radius / (clones as f32).sqrt();
        for k in 0..clones {
            let azimuth = 360.0 * k as f32 / clones as f32;
            let angle = growth
                .rng
                .spread(trunk.split_angle, trunk.split_angle_v)
                .max(0.0);
            let seed = StemSeed {
                frame: diverge(base.frame, azimuth, angle),
                radius,
                split_index: k,
                ..base.clone()
            };
            growth.grow(seed, None);
        }
    } else {
        growth.grow(base, None);
    }

    debug!(stems = growth.tree.len(), notices = growth.notices.len(), "grown");
    Grown {
        tree: growth.tree,
        notices: growth.notices,
        tree_scale,
    }
}

struct Growth<'a> {
    params: &'a ParameterSet,
    rng: &'a mut TreeRng,
    tree: StemTree,
    notices: Vec<Notice>,
    prune: Option<PruneVolume>,
    /// Cleared while a pruning candidate is built; the candidate subtree
    /// is tested as a whole.
    nested_pruning: bool,
}

/// Slices of one logical branch and its remaining split allowance.
struct Branch {
    slices: Vec<(StemId, StemSeed)>,
    splits_left: usize,
}

/// Rotates `frame` by `azimuth` around its own axis, then tilts it by
/// `angle` away from that axis. Both in degrees.
fn diverge(frame: Quat, azimuth: f32, angle: f32) -> Quat {
    frame * Quat::from_rotation_z(azimuth.to_radians()) * Quat::from_rotation_x(angle.to_radians())
}

/// Position `t` of a branch measured from the crown top: `0` at the tip,
/// `1` at the first possible child.
fn crown_ratio(t: f32, base: f32) -> f32 {
    ((1.0 - t) / (1.0 - base).max(f32::EPSILON)).clamp(0.0, 1.0)
}

impl Growth<'_> {
    /// Grows one branch, then the children of each of its slices.
    ///
    /// The returned stem is pushed but not linked under `parent`; the caller
    /// attaches it once accepted.
    fn grow(&mut self, seed: StemSeed, parent: Option<StemId>) -> StemId {
        let mut branch = Branch {
            slices: Vec::new(),
            splits_left: self.params.level(seed.level).curve_res.saturating_sub(1) as usize,
        };
        let id = self.grow_branch(seed, parent, &mut branch);
        for (slice, seed) in branch.slices {
            if seed.level < self.params.levels && seed.length > DEGENERATE {
                self.spawn_children(slice, &seed);
            }
        }
        id
    }

    /// Grows the same-level slices of one branch: the stem itself and,
    /// recursively, the continuations of every split. Each slice is
    /// appended to `branch.slices` in construction order.
    ///
    /// Split draws are always consumed; the number of splits taken is
    /// capped by what is left of the branch's allowance.
    fn grow_branch(&mut self, seed: StemSeed, parent: Option<StemId>, branch: &mut Branch) -> StemId {
        let lvl = self.params.level(seed.level);
        let res = lvl.curve_res;
        let seg_len = seed.length / res as f32;
        let radius_at = |t: f32| (seed.radius * (1.0 - lvl.taper * t)).max(0.0);

        let mut frame = seed.frame;
        let mut pos = seed.pos;
        let mut curvature = seed.curvature;
        let t0 = seed.segment as f32 / res as f32;
        let mut points = vec![StemPoint {
            pos,
            radius: radius_at(t0),
            frame,
        }];

        let mut split = None;
        for seg in seed.segment..res {
            if seg > seed.segment {
                let n = self.split_count(lvl.seg_splits).min(branch.splits_left);
                if n > 0 {
                    branch.splits_left -= n;
                    split = Some((seg, n));
                    break;
                }
            }
            let bend = self.bend(&lvl, seg, res);
            frame *= Quat::from_rotation_x(bend.to_radians());
            curvature += bend;
            if seed.level > 0 {
                frame = self.attract_up(frame, res);
            }
            pos += frame * Vec3::Z * seg_len;
            points.push(StemPoint {
                pos,
                radius: radius_at((seg + 1) as f32 / res as f32),
                frame,
            });
        }

        let end = split.map_or(res, |(seg, _)| seg);
        let id = self.tree.push(Stem {
            level: seed.level,
            points,
            parent,
            children: Vec::new(),
            split_index: seed.split_index,
            curvature,
            retained: true,
            length: seed.length,
            offset: seed.offset,
            span: (t0, end as f32 / res as f32),
        });
        if seed.length <= DEGENERATE || seed.radius <= DEGENERATE {
            trace!(id, length = seed.length, radius = seed.radius, "degenerate stem");
            self.notices.push(Notice::DegenerateStem {
                stem: id,
                length: seed.length,
                radius: seed.radius,
            });
        }
        branch.slices.push((id, seed.clone()));

        if let Some((seg, n)) = split {
            let count = n + 1;
            trace!(id, seg, count, "split");
            let radius = seed.radius / (count as f32).sqrt();
            for k in 0..count {
                let azimuth = 360.0 * k as f32 / count as f32;
                let angle = self
                    .rng
                    .spread(lvl.split_angle, lvl.split_angle_v)
                    .max(0.0);
                let continuation = StemSeed {
                    pos,
                    frame: diverge(frame, azimuth, angle),
                    radius,
                    segment: seg,
                    split_index: k,
                    curvature,
                    ..seed.clone()
                };
                let child = self.grow_branch(continuation, Some(id), branch);
                self.tree.attach(id, child);
            }
        }
        id
    }

    /// Number of extra stems at a segment boundary: the integer part of
    /// `seg_splits` plus one more with probability equal to its fraction.
    fn split_count(&mut self, seg_splits: f32) -> usize {
        let whole = seg_splits.floor();
        let extra = self.rng.random() < seg_splits - whole;
        whole as usize + extra as usize
    }

    /// Bend angle for segment `seg`, in degrees.
    fn bend(&mut self, lvl: &Level, seg: u32, res: u32) -> f32 {
        let base = if lvl.curve_back != 0.0 && 2 * seg >= res {
            lvl.curve_back
        } else {
            lvl.curve
        };
        (base + lvl.curve_v * self.rng.uniform(-1.0, 1.0)) / res as f32
    }

    /// Turns `frame` toward vertical by `attractUp * declination / res`,
    /// never past straight up or straight down.
    fn attract_up(&self, frame: Quat, res: u32) -> Quat {
        let attract = self.params.attract_up;
        if attract == 0.0 {
            return frame;
        }
        let dir = frame * Vec3::Z;
        let axis = dir.cross(Vec3::Z);
        if axis.length_squared() <= f32::EPSILON {
            return frame;
        }
        let declination = dir.angle_between(Vec3::Z);
        let turn = (attract * declination / res as f32)
            .clamp(-(std::f32::consts::PI - declination), declination);
        Quat::from_axis_angle(axis.normalize(), turn) * frame
    }

    /// Spawns the next level's children that fall on slice `id`.
    ///
    /// Children are spread evenly over the branch above its base offset;
    /// each slice takes those inside its own span.
    fn spawn_children(&mut self, id: StemId, seed: &StemSeed) {
        let params = self.params;
        let child_level = seed.level + 1;
        let lvl = params.level(child_level);
        let count = lvl.branches;
        let span = self.tree.stems[id].span;
        if count == 0 {
            return;
        }
        let base = if seed.level == 0 { params.base_size } else { 0.0 };
        let parent_length = seed.length;
        let parent_radius = seed.radius;

        let mut rotation = 0.0f32;
        for j in 0..count {
            let t = base + (1.0 - base) * (j as f32 + 0.5) / count as f32;
            if t < span.0 || t >= span.1 {
                continue;
            }
            let local = (t - span.0) / (span.1 - span.0).max(f32::EPSILON);
            let Some(attach) = self.tree.stems[id].sample(local) else {
                continue;
            };

            let offset = t * parent_length;
            let ratio = crown_ratio(t, base);
            let max_length = self.rng.spread(lvl.length, lvl.length_v).max(0.0);
            let length = if seed.level == 0 {
                parent_length * max_length * params.shape.ratio(ratio)
            } else {
                max_length * (parent_length - 0.6 * offset)
            }
            .max(0.0);

            let down = if lvl.down_angle_v >= 0.0 {
                self.rng.spread(lvl.down_angle, lvl.down_angle_v)
            } else {
                let variation = lvl.down_angle_v * (1.0 - 2.0 * Shape::Conical.ratio(ratio));
                self.rng.spread(lvl.down_angle, variation)
            };

            let azimuth = if lvl.rotate >= 0.0 {
                rotation += self.rng.spread(lvl.rotate, lvl.rotate_v);
                rotation
            } else {
                let side = if j % 2 == 0 { 1.0 } else { -1.0 };
                side * self.rng.spread(lvl.rotate.abs(), lvl.rotate_v)
            };

            let radius = (parent_radius * (length / parent_length).powf(params.ratio_power))
                .min(attach.radius)
                .max(0.0);

            let child = StemSeed {
                level: child_level,
                pos: attach.pos,
                frame: diverge(attach.frame, azimuth, down),
                length,
                radius,
                segment: 0,
                split_index: 0,
                offset,
                curvature: 0.0,
            };
            let child_id = self.grow_pruned(child, id);
            self.tree.attach(id, child_id);
        }
    }

    /// Grows `seed` as a child of `parent`, shortening it until the branch
    /// and everything growing from it fit the pruning envelope.
    ///
    /// Each candidate is the full subtree, replayed from the same RNG
    /// state with pruning of its descendants switched off, so the accepted
    /// subtree is exactly the one that was tested.
    ///
    /// A branch that starts inside the envelope but cannot grow any length
    /// without leaving it is pruned away under full pruning. Otherwise, when
    /// no candidate fits, the unpruned branch is kept, its children are
    /// pruned on their own and the exhaustion is recorded.
    fn grow_pruned(&mut self, seed: StemSeed, parent: StemId) -> StemId {
        let ratio = self.params.prune_ratio;
        let Some(volume) = self
            .prune
            .filter(|_| self.nested_pruning && ratio > 0.0)
        else {
            return self.grow(seed, Some(parent));
        };

        let state = self.rng.save();
        let mark = (self.tree.len(), self.notices.len());
        let candidate_fits = |growth: &mut Self, seed: StemSeed| {
            growth.rewind(mark, &state);
            let id = growth.grow_candidate(seed, parent);
            growth.subtree_fits(id, &volume)
        };

        if candidate_fits(self, seed.clone()) {
            self.rewind(mark, &state);
            return self.grow_candidate(seed, parent);
        }

        let power = self.params.ratio_power;
        let fraction = |fit: f32| 1.0 - ratio * (1.0 - fit);

        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        let mut best = None;
        for _ in 0..MAX_PRUNE_ATTEMPTS {
            let fit = 0.5 * (lo + hi);
            if candidate_fits(self, seed.shortened(fraction(fit), power)) {
                lo = fit;
                best = Some(fit);
            } else {
                hi = fit;
            }
        }

        self.rewind(mark, &state);
        match best {
            Some(fit) => {
                trace!(level = seed.level, fit, "pruned");
                self.grow_candidate(seed.shortened(fraction(fit), power), parent)
            }
            None if ratio >= 1.0 && volume.contains(seed.pos) => {
                trace!(level = seed.level, "pruned away");
                self.pruned_away(seed, parent)
            }
            None => {
                let id = self.grow(seed, Some(parent));
                debug!(id, attempts = MAX_PRUNE_ATTEMPTS, "pruning exhausted");
                self.notices.push(Notice::PruningExhausted {
                    stem: id,
                    attempts: MAX_PRUNE_ATTEMPTS,
                });
                id
            }
        }
    }

    /// Grows `seed` and its whole subtree without pruning any descendant.
    fn grow_candidate(&mut self, seed: StemSeed, parent: StemId) -> StemId {
        let nested = std::mem::replace(&mut self.nested_pruning, false);
        let id = self.grow(seed, Some(parent));
        self.nested_pruning = nested;
        id
    }

    fn subtree_fits(&self, id: StemId, volume: &PruneVolume) -> bool {
        self.tree
            .descendants(id)
            .into_iter()
            .flat_map(|s| self.tree.stems[s].points.iter())
            .all(|p| volume.contains(p.pos))
    }

    fn rewind(&mut self, mark: (usize, usize), state: &RngState) {
        self.tree.truncate(mark.0);
        self.notices.truncate(mark.1);
        self.rng.restore(state);
    }

    fn pruned_away(&mut self, seed: StemSeed, parent: StemId) -> StemId {
        self.tree.push(Stem {
            level: seed.level,
            points: vec![StemPoint {
                pos: seed.pos,
                radius: 0.0,
                frame: seed.frame,
            }],
            parent: Some(parent),
            children: Vec::new(),
            split_index: seed.split_index,
            curvature: seed.curvature,
            retained: false,
            length: 0.0,
            offset: seed.offset,
            span: (0.0, 0.0),
        })
    }
}
