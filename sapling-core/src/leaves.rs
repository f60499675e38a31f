//! Leaf cards on the terminal stems.

use glam::{Quat, Vec3};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{config::ParameterSet, rng::TreeRng, tree::StemTree, types::StemId};

/// Azimuth step between consecutive leaves on a stem, in degrees.
pub const GOLDEN_ANGLE: f32 = 137.507_76;

/// Mean and variation of the angle between a leaf and its stem, in degrees.
const LEAF_DOWN: f32 = 45.0;
const LEAF_DOWN_V: f32 = 10.0;

/// Random azimuth added on top of the golden angle, in degrees.
const LEAF_JITTER: f32 = 15.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Leaf {
    pub pos: Vec3,
    /// `frame * Vec3::Z` runs from the leaf base to its tip; the card lies
    /// in the local XZ plane.
    pub frame: Quat,
    pub scale: Vec3,
    pub stem: StemId,
}

impl Leaf {
    /// World-space corners of the leaf card, counter-clockwise from the
    /// base.
    pub fn quad(&self) -> [Vec3; 4] {
        [
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 1.0),
            Vec3::new(-0.5, 0.0, 1.0),
        ]
        .map(|corner| self.pos + self.frame * (corner * self.scale))
    }

    pub fn direction(&self) -> Vec3 {
        self.frame * Vec3::Z
    }
}

/// Places leaves along every retained terminal stem.
///
/// Each stem has `leaves` evenly spaced slots; a slot is kept with
/// probability `leafDist` evaluated at its position. Every slot consumes
/// its keep draw whether or not it is kept. Nothing is drawn when leaves
/// are hidden.
#[instrument(skip_all, fields(leaves = params.leaves))]
pub fn place_leaves(tree: &StemTree, params: &ParameterSet, rng: &mut TreeRng) -> Vec<Leaf> {
    if !params.show_leaves || params.leaves == 0 {
        return Vec::new();
    }
    let scale = Vec3::new(
        params.leaf_scale * params.leaf_scale_x,
        params.leaf_scale,
        params.leaf_scale,
    );
    let slots = params.leaves;

    let mut out = Vec::new();
    let terminal = tree
        .retained()
        .filter(|(_, s)| s.level == params.levels && s.length > 0.0 && s.arc_length() > 0.0);
    for (id, stem) in terminal {
        for j in 0..slots {
            let u = (j as f32 + 0.5) / slots as f32;
            if rng.random() >= params.leaf_dist.ratio(u) {
                continue;
            }
            let Some(at) = stem.sample(u) else {
                continue;
            };
            let azimuth = j as f32 * GOLDEN_ANGLE + rng.spread(0.0, LEAF_JITTER);
            let down = rng.spread(LEAF_DOWN, LEAF_DOWN_V);
            let frame = at.frame
                * Quat::from_rotation_z(azimuth.to_radians())
                * Quat::from_rotation_x(down.to_radians());
            out.push(Leaf {
                pos: at.pos,
                frame: droop(frame, params.bend),
                scale,
                stem: id,
            });
        }
    }
    debug!(placed = out.len(), "leaves");
    out
}

/// Blends `frame` by `bend` toward the same card turned to hang straight
/// down.
fn droop(frame: Quat, bend: f32) -> Quat {
    if bend <= 0.0 {
        return frame;
    }
    let hanging = Quat::from_rotation_arc(frame * Vec3::Z, Vec3::NEG_Z) * frame;
    frame.slerp(hanging, bend.min(1.0)).normalize()
}
