//! The generation pipeline.
//!
//! A run goes through four phases, each consuming the previous one's output:
//! 1. [`growth_phase`] builds the stem tree, drawing from the RNG.
//! 2. [`tessellation_phase`] turns retained stems into Bezier splines.
//! 3. [`leaf_phase`] places leaves on terminal stems, drawing from the RNG.
//! 4. [`rig_phase`] builds the armature when `useArm` is set.
//!
//! Only growth and leaf placement consume random numbers, and always in that
//! order, so [`generate`] is a pure function of its parameters and seed.

use serde::Serialize;
use tracing::{debug, info_span, instrument};

use crate::{
    armature::{Armature, build_armature},
    config::ParameterSet,
    curve::{CurveSettings, TreeCurves, tessellate},
    error::{Notice, ParamError},
    growth::{Grown, grow_tree},
    leaves::{Leaf, place_leaves},
    rng::TreeRng,
    tree::StemTree,
};

/// Everything produced by one [`generate`] call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Generation {
    pub tree_scale: f32,
    pub stems: StemTree,
    pub curves: TreeCurves,
    pub leaves: Vec<Leaf>,
    pub armature: Option<Armature>,
    pub notices: Vec<Notice>,
}

impl Generation {
    /// Number of bones, zero without an armature.
    pub fn bones(&self) -> usize {
        self.armature.as_ref().map_or(0, Armature::len)
    }
}

/// Generates a complete tree from `params` and `seed`.
///
/// `params.seed` is not consulted; the explicit `seed` wins, so callers can
/// reroll a preset without editing it.
///
/// ### Errors
/// Returns [`ParamError::InvalidParameter`] if `params` fails validation.
/// Nothing fails once growth has started; recoverable conditions are
/// reported in [`Generation::notices`].
#[instrument(skip(params), fields(levels = params.levels))]
pub fn generate(params: &ParameterSet, seed: u64) -> Result<Generation, ParamError> {
    params.validate()?;
    let mut rng = TreeRng::new(seed);

    let grown = growth_phase(params, &mut rng);
    let curves = tessellation_phase(&grown.tree, params);
    let leaves = leaf_phase(&grown.tree, params, &mut rng);
    let armature = rig_phase(&grown.tree, params);

    debug!(
        stems = grown.tree.len(),
        leaves = leaves.len(),
        notices = grown.notices.len(),
        "generated"
    );
    Ok(Generation {
        tree_scale: grown.tree_scale,
        stems: grown.tree,
        curves,
        leaves,
        armature,
        notices: grown.notices,
    })
}

pub fn growth_phase(params: &ParameterSet, rng: &mut TreeRng) -> Grown {
    let _span = info_span!("growth").entered();
    grow_tree(params, rng)
}

pub fn tessellation_phase(tree: &StemTree, params: &ParameterSet) -> TreeCurves {
    tessellate(tree, &CurveSettings::from_params(params))
}

pub fn leaf_phase(tree: &StemTree, params: &ParameterSet, rng: &mut TreeRng) -> Vec<Leaf> {
    place_leaves(tree, params, rng)
}

/// Builds the armature, or `None` when `useArm` is off.
pub fn rig_phase(tree: &StemTree, params: &ParameterSet) -> Option<Armature> {
    params.use_arm.then(|| build_armature(tree, params))
}
