//! Silhouette functions shared by branch length, pruning and leaf density.
//!
//! Every function here is pure: a shape selector plus a normalized position
//! in `[0, 1]` maps to a multiplier of the tree's overall scale.

use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{config::ParameterSet, error::ParamError};

/// Tree silhouette selector, stored as its index `0..=7` in presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Shape {
    Conical,
    Spherical,
    Hemispherical,
    Cylindrical,
    TaperedCylindrical,
    Flame,
    InverseConical,
    TendFlame,
}

impl Shape {
    pub const ALL: [Shape; 8] = [
        Shape::Conical,
        Shape::Spherical,
        Shape::Hemispherical,
        Shape::Cylindrical,
        Shape::TaperedCylindrical,
        Shape::Flame,
        Shape::InverseConical,
        Shape::TendFlame,
    ];

    /// Evaluates the shape at `ratio`, clamped to `[0, 1]`.
    pub fn ratio(self, ratio: f32) -> f32 {
        let r = ratio.clamp(0.0, 1.0);
        match self {
            Shape::Conical => 0.2 + 0.8 * r,
            Shape::Spherical => 0.2 + 0.8 * (PI * r).sin(),
            Shape::Hemispherical => 0.2 + 0.8 * (0.5 * PI * r).sin(),
            Shape::Cylindrical => 1.0,
            Shape::TaperedCylindrical => 0.5 + 0.5 * r,
            Shape::Flame => {
                if r <= 0.7 {
                    r / 0.7
                } else {
                    (1.0 - r) / 0.3
                }
            }
            Shape::InverseConical => 1.0 - 0.8 * r,
            Shape::TendFlame => {
                if r <= 0.7 {
                    0.5 + 0.5 * r / 0.7
                } else {
                    0.5 + 0.5 * (1.0 - r) / 0.3
                }
            }
        }
    }
}

impl TryFrom<u8> for Shape {
    type Error = ParamError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Shape::ALL.get(value as usize).copied().ok_or_else(|| {
            ParamError::invalid("shape", format!("selector {value} is outside 0..=7"))
        })
    }
}

impl From<Shape> for u8 {
    fn from(shape: Shape) -> u8 {
        shape as u8
    }
}

/// The pruning envelope profile.
///
/// Rises from the crown top with `power_high`, peaks at `1 - width_peak`,
/// and falls toward the crown base with `power_low`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Envelope {
    pub width_peak: f32,
    pub power_high: f32,
    pub power_low: f32,
}

impl Envelope {
    pub fn ratio(&self, ratio: f32) -> f32 {
        let knee = 1.0 - self.width_peak;
        if ratio > 0.0 && ratio < knee {
            (ratio / knee).powf(self.power_high)
        } else if ratio >= knee && ratio < 1.0 {
            ((1.0 - ratio) / self.width_peak).powf(self.power_low)
        } else {
            0.0
        }
    }
}

/// Which profile [`envelope_radius`] evaluates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EnvelopeShape {
    Shape(Shape),
    Prune,
}

impl From<Shape> for EnvelopeShape {
    fn from(shape: Shape) -> Self {
        EnvelopeShape::Shape(shape)
    }
}

/// Maximum radial extent at `normalized_height`, as a multiplier of the
/// tree scale.
///
/// ### Parameters
/// - `shape` - One of the eight silhouettes, or the pruning profile.
/// - `normalized_height` - Position in `[0, 1]`; values outside are clamped.
/// - `envelope` - Peak and powers, only read for [`EnvelopeShape::Prune`].
///
/// ### Returns
/// A non-negative multiplier.
pub fn envelope_radius(shape: EnvelopeShape, normalized_height: f32, envelope: &Envelope) -> f32 {
    let h = normalized_height.clamp(0.0, 1.0);
    let r = match shape {
        EnvelopeShape::Shape(shape) => shape.ratio(h),
        EnvelopeShape::Prune => envelope.ratio(h),
    };
    r.max(0.0)
}

/// The volume branches must stay inside when pruning is enabled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PruneVolume {
    pub tree_scale: f32,
    pub base_size: f32,
    pub width: f32,
    pub envelope: Envelope,
}

impl PruneVolume {
    /// The volume described by the `prune*` fields for a tree of
    /// `tree_scale`.
    pub fn from_params(params: &ParameterSet, tree_scale: f32) -> Self {
        Self {
            tree_scale,
            base_size: params.base_size,
            width: params.prune_width,
            envelope: Envelope {
                width_peak: params.prune_width_peak,
                power_high: params.prune_power_high,
                power_low: params.prune_power_low,
            },
        }
    }

    /// Returns `true` if `point` lies strictly inside the envelope.
    ///
    /// Heights are measured from the crown top: `0` at `tree_scale`, `1` at
    /// the crown base (`base_size * tree_scale`). Anything above the top or
    /// below the crown base is outside.
    pub fn contains(&self, point: Vec3) -> bool {
        let crown = self.tree_scale * (1.0 - self.base_size);
        if self.tree_scale <= 0.0 || crown <= 0.0 {
            return false;
        }
        let ratio = (self.tree_scale - point.z) / crown;
        let reach = point.truncate().length() / self.tree_scale;
        reach < self.width * self.envelope.ratio(ratio)
    }
}
