//! Bezier control cages for every retained stem.
//!
//! Each centerline sample becomes one control point carrying the bevel
//! radius at that sample. Handles are derived from the neighbouring
//! samples, so a stem's curve passes through every point it was grown
//! through.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{config::ParameterSet, error::ParamError, tree::StemTree, types::StemId};

/// How control handles are derived, stored as `0` (auto) or `1` (vector).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum HandleType {
    /// Smooth tangent through each point.
    Auto,
    /// Handles aimed straight at the neighbouring points.
    Vector,
}

impl TryFrom<u8> for HandleType {
    type Error = ParamError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HandleType::Auto),
            1 => Ok(HandleType::Vector),
            _ => Err(ParamError::invalid(
                "handleType",
                format!("selector {value} is outside 0..=1"),
            )),
        }
    }
}

impl From<HandleType> for u8 {
    fn from(handle: HandleType) -> u8 {
        handle as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ControlPoint {
    pub co: Vec3,
    pub handle_left: Vec3,
    pub handle_right: Vec3,
    /// Bevel radius, never negative.
    pub radius: f32,
}

/// The curve of one stem.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Spline {
    pub stem: StemId,
    pub level: usize,
    pub points: Vec<ControlPoint>,
}

impl Spline {
    /// Length of the control polygon through `co`.
    pub fn length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| w[0].co.distance(w[1].co))
            .sum()
    }

    /// Evaluates the curve at `res_u` steps per segment.
    ///
    /// Returns `segments * res_u + 1` points, starting and ending on the
    /// first and last control points. A `res_u` of zero is treated as one.
    pub fn polyline(&self, res_u: u32) -> Vec<Vec3> {
        let steps = res_u.max(1);
        let Some(first) = self.points.first() else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity((self.points.len() - 1) * steps as usize + 1);
        out.push(first.co);
        for w in self.points.windows(2) {
            for k in 1..=steps {
                let s = k as f32 / steps as f32;
                out.push(bezier(w[0].co, w[0].handle_right, w[1].handle_left, w[1].co, s));
            }
        }
        out
    }
}

fn bezier(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, s: f32) -> Vec3 {
    let r = 1.0 - s;
    p0 * (r * r * r) + p1 * (3.0 * r * r * s) + p2 * (3.0 * r * s * s) + p3 * (s * s * s)
}

/// Curve object settings, copied onto the output untouched.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CurveSettings {
    pub handle_type: HandleType,
    pub bevel: bool,
    pub bevel_res: u32,
    pub res_u: u32,
}

impl CurveSettings {
    pub fn from_params(params: &ParameterSet) -> Self {
        Self {
            handle_type: params.handle_type,
            bevel: params.bevel,
            bevel_res: params.bevel_res,
            res_u: params.res_u,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TreeCurves {
    pub settings: CurveSettings,
    pub splines: Vec<Spline>,
}

/// Builds one spline per retained stem, in stem order.
#[instrument(skip_all, fields(stems = tree.len()))]
pub fn tessellate(tree: &StemTree, settings: &CurveSettings) -> TreeCurves {
    let splines: Vec<Spline> = tree
        .retained()
        .map(|(id, stem)| {
            let positions: Vec<Vec3> = stem.points.iter().map(|p| p.pos).collect();
            let points = stem
                .points
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let (handle_left, handle_right) = handles(&positions, i, settings.handle_type);
                    ControlPoint {
                        co: p.pos,
                        handle_left,
                        handle_right,
                        radius: p.radius.max(0.0),
                    }
                })
                .collect();
            Spline {
                stem: id,
                level: stem.level,
                points,
            }
        })
        .collect();
    debug!(splines = splines.len(), "tessellated");
    TreeCurves {
        settings: *settings,
        splines,
    }
}

/// Left and right handle of point `i` of `pos`.
///
/// Endpoints mirror the handle toward their single neighbour.
fn handles(pos: &[Vec3], i: usize, handle_type: HandleType) -> (Vec3, Vec3) {
    let co = pos[i];
    let prev = i.checked_sub(1).map(|j| pos[j]);
    let next = pos.get(i + 1).copied();

    let (to_prev, to_next) = match (prev, next) {
        (Some(p), Some(n)) => (p - co, n - co),
        (Some(p), None) => (p - co, co - p),
        (None, Some(n)) => (co - n, n - co),
        (None, None) => return (co, co),
    };

    if handle_type == HandleType::Auto {
        let tangent = (to_next.normalize_or_zero() - to_prev.normalize_or_zero()).normalize_or_zero();
        if tangent != Vec3::ZERO {
            return (
                co - tangent * to_prev.length() / 3.0,
                co + tangent * to_next.length() / 3.0,
            );
        }
    }
    (co + to_prev / 3.0, co + to_next / 3.0)
}
