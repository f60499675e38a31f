use glam::{Quat, Vec3};
use serde::Serialize;

use crate::types::StemId;

/// One centerline sample of a stem.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StemPoint {
    pub pos: Vec3,
    pub radius: f32,
    /// Local frame; `frame * Vec3::Z` is the growth direction.
    pub frame: Quat,
}

impl StemPoint {
    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.frame * Vec3::Z
    }
}

/// A continuous run of a branch between a base or split point and its end.
///
/// A stem that splits ends at the split point; its continuations are stems
/// of the same level parented to it. `length`, `offset` and `span` describe
/// the whole unsplit branch, so all slices of one branch share them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stem {
    pub level: usize,
    pub points: Vec<StemPoint>,
    pub parent: Option<StemId>,
    pub children: Vec<StemId>,
    pub split_index: usize,
    /// Sum of the bend angles applied so far along the branch, in degrees.
    pub curvature: f32,
    pub retained: bool,
    pub length: f32,
    /// Distance along the parent branch at which this branch emerges.
    pub offset: f32,
    /// Fraction of the branch length covered by this slice.
    pub span: (f32, f32),
}

impl Stem {
    pub fn base(&self) -> Option<&StemPoint> {
        self.points.first()
    }

    pub fn tip(&self) -> Option<&StemPoint> {
        self.points.last()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn arc_length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| w[0].pos.distance(w[1].pos))
            .sum()
    }

    /// Interpolated sample at `t`, a fraction of this slice (`0` = base,
    /// `1` = tip).
    ///
    /// Position and radius are interpolated linearly within the segment;
    /// the frame is the segment's own direction.
    pub fn sample(&self, t: f32) -> Option<StemPoint> {
        let first = *self.points.first()?;
        let segments = self.points.len() - 1;
        if segments == 0 {
            return Some(first);
        }
        let x = t.clamp(0.0, 1.0) * segments as f32;
        let i = (x.floor() as usize).min(segments - 1);
        let f = x - i as f32;
        let a = self.points[i];
        let b = self.points[i + 1];
        Some(StemPoint {
            pos: a.pos.lerp(b.pos, f),
            radius: a.radius + (b.radius - a.radius) * f,
            frame: b.frame,
        })
    }
}

/// Arena owning every stem of one generated tree.
///
/// Children are listed by id on their parent; the parent link is an
/// optional id used for lookup only.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StemTree {
    pub stems: Vec<Stem>,
}

impl StemTree {
    pub fn new() -> Self {
        Self { stems: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    pub fn get(&self, id: StemId) -> Option<&Stem> {
        self.stems.get(id)
    }

    /// Appends `stem` without linking it into its parent's child list.
    pub fn push(&mut self, stem: Stem) -> StemId {
        let id = self.stems.len();
        self.stems.push(stem);
        id
    }

    /// Links an already pushed stem under `parent`.
    pub fn attach(&mut self, parent: StemId, child: StemId) {
        self.stems[child].parent = Some(parent);
        self.stems[parent].children.push(child);
    }

    #[cfg(test)]
    pub(crate) fn add_child(&mut self, parent: StemId, stem: Stem) -> StemId {
        let id = self.push(stem);
        self.attach(parent, id);
        id
    }

    /// Drops every stem with id `>= len`.
    ///
    /// Only valid when no stem below `len` links to a dropped one, which
    /// holds for a subtree that was pushed but not yet attached.
    pub fn truncate(&mut self, len: usize) {
        self.stems.truncate(len);
    }

    pub fn roots(&self) -> impl Iterator<Item = StemId> + '_ {
        self.stems
            .iter()
            .enumerate()
            .filter_map(|(id, s)| s.is_root().then_some(id))
    }

    pub fn retained(&self) -> impl Iterator<Item = (StemId, &Stem)> {
        self.stems.iter().enumerate().filter(|(_, s)| s.retained)
    }

    pub fn at_level(&self, level: usize) -> impl Iterator<Item = (StemId, &Stem)> {
        self.stems
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.level == level)
    }

    /// Ids of `id` and everything below it, depth first.
    pub fn descendants(&self, id: StemId) -> Vec<StemId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(stem) = self.stems.get(next) {
                stack.extend(stem.children.iter().rev());
            }
        }
        out
    }
}
