//! Skeleton rig and procedural wind sway.
//!
//! Every retained stem gets one bone rooted at its base. Bones link to the
//! bone of their parent stem, so the rig has the same shape as the stem
//! tree. When animation is enabled each bone also carries a [`Sway`]
//! whose amplitude shrinks as the stem gets thicker relative to its length.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

use glam::{EulerRot, Quat, Vec2, Vec3};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    config::ParameterSet,
    tree::StemTree,
    types::{BoneId, StemId},
};

/// Primary sway frequency of the trunk, in Hz.
const BASE_FREQUENCY: f32 = 0.5;

/// Radii at or below this give a bone no sway.
const MIN_RADIUS: f32 = 1e-6;

/// A sinusoid in radians over seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Wave {
    pub amplitude: f32,
    pub frequency: f32,
    pub phase: f32,
}

impl Wave {
    pub fn at(&self, seconds: f32) -> f32 {
        self.amplitude * (TAU * self.frequency * seconds + self.phase).sin()
    }

    fn quadrature(&self, seconds: f32) -> f32 {
        self.amplitude * (TAU * self.frequency * seconds + self.phase + FRAC_PI_2).sin()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sway {
    pub primary: Wave,
    pub gust: Wave,
}

impl Sway {
    /// Rotation offsets about the bone's local X and Y axes at `frame`.
    ///
    /// X follows the primary wave plus gusts. Y trails by a quarter period
    /// at half the primary amplitude, so tips trace an ellipse.
    pub fn offset(&self, frame: f32, frame_rate: f32) -> Vec2 {
        let t = frame / frame_rate;
        let gust = self.gust.at(t);
        Vec2::new(self.primary.at(t) + gust, 0.5 * self.primary.quadrature(t) + gust)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bone {
    pub stem: StemId,
    pub parent: Option<BoneId>,
    pub level: usize,
    pub head: Vec3,
    /// `orientation * Vec3::Z` points from head to tail.
    pub orientation: Quat,
    pub length: f32,
    pub sway: Option<Sway>,
}

impl Bone {
    pub fn tail(&self) -> Vec3 {
        self.head + self.orientation * Vec3::Z * self.length
    }

    /// Orientation at `frame`, with the sway applied in the bone's local
    /// frame. Unanimated bones return their rest orientation.
    pub fn pose(&self, frame: f32, frame_rate: f32) -> Quat {
        match self.sway {
            Some(sway) => {
                let off = sway.offset(frame, frame_rate);
                self.orientation * Quat::from_euler(EulerRot::XYZ, off.x, off.y, 0.0)
            }
            None => self.orientation,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Armature {
    pub bones: Vec<Bone>,
    pub frame_rate: f32,
}

impl Armature {
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter_map(|(id, b)| b.parent.is_none().then_some(id))
    }

    pub fn bone_for_stem(&self, stem: StemId) -> Option<BoneId> {
        self.bones.iter().position(|b| b.stem == stem)
    }
}

/// Builds one bone per retained stem.
///
/// A bone's parent is the bone of the nearest retained ancestor stem;
/// trunk stems become roots. Sway is attached only with `armAnim`.
#[instrument(skip_all, fields(stems = tree.len(), animated = params.arm_anim))]
pub fn build_armature(tree: &StemTree, params: &ParameterSet) -> Armature {
    let mut bone_of: Vec<Option<BoneId>> = vec![None; tree.len()];
    let mut bones = Vec::new();

    for (id, stem) in tree.retained() {
        let Some(base) = stem.base() else {
            continue;
        };
        let mut parent = None;
        let mut up = stem.parent;
        while let Some(p) = up {
            if let Some(bone) = bone_of[p] {
                parent = Some(bone);
                break;
            }
            up = tree.get(p).and_then(|s| s.parent);
        }

        let length = stem.arc_length();
        let sway = params
            .arm_anim
            .then(|| sway_for(params, stem.level, length, base.radius));

        bone_of[id] = Some(bones.len());
        bones.push(Bone {
            stem: id,
            parent,
            level: stem.level,
            head: base.pos,
            orientation: base.frame,
            length,
            sway,
        });
    }

    debug!(bones = bones.len(), "armature");
    Armature {
        bones,
        frame_rate: params.frame_rate,
    }
}

/// Wind response of a stem of `length` and base `radius` at `level`.
///
/// With the stiffness proxy `a0 = 4 * length / radius`, the primary
/// amplitude is `windSpeed / 50 * a0` degrees and the gust amplitude
/// `windGust / 50 * a0` plus half the primary, both spread over the
/// stem's `curveRes` segments.
fn sway_for(params: &ParameterSet, level: usize, length: f32, radius: f32) -> Sway {
    let a0 = if radius > MIN_RADIUS { 4.0 * length / radius } else { 0.0 };
    let a1 = params.wind_speed / 50.0 * a0;
    let a2 = params.wind_gust / 50.0 * a0 + a1 / 2.0;
    let segments = params.level(level).curve_res as f32;

    let frequency = BASE_FREQUENCY * (1.0 + level as f32);
    let phase = level as f32 * FRAC_PI_4;
    Sway {
        primary: Wave {
            amplitude: a1.to_radians() / segments,
            frequency,
            phase,
        },
        gust: Wave {
            amplitude: a2.to_radians() / segments,
            frequency: 0.25 * frequency,
            phase,
        },
    }
}
