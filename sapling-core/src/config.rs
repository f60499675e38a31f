//! The parameter set driving one generation run.
//!
//! Field names serialize to the camelCase keys used by preset files
//! (`curveRes`, `baseSplits`, `pruneWidthPeak`, ...). Missing keys fall back
//! to [`ParameterSet::default`], so partial presets are accepted.

use serde::{Deserialize, Serialize};

use crate::{curve::HandleType, envelope::Shape, error::ParamError};

pub const MAX_LEVELS: usize = 6;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParameterSet {
    pub seed: u64,
    pub levels: usize,

    // Geometry
    pub scale: f32,
    pub scale_v: f32,
    pub scale0: f32,
    pub scale_v0: f32,
    pub ratio: f32,
    pub ratio_power: f32,
    pub shape: Shape,
    pub bevel: bool,
    pub bevel_res: u32,
    pub res_u: u32,
    pub handle_type: HandleType,

    // Splitting
    pub base_size: f32,
    pub base_splits: u32,
    pub branches: Vec<u32>,
    pub seg_splits: Vec<f32>,
    pub split_angle: Vec<f32>,
    pub split_angle_v: Vec<f32>,
    pub down_angle: Vec<f32>,
    pub down_angle_v: Vec<f32>,
    pub rotate: Vec<f32>,
    pub rotate_v: Vec<f32>,

    // Growth
    pub start_curv: f32,
    pub attract_up: f32,
    pub length: Vec<f32>,
    pub length_v: Vec<f32>,
    pub curve: Vec<f32>,
    pub curve_v: Vec<f32>,
    pub curve_back: Vec<f32>,
    pub taper: Vec<f32>,
    pub curve_res: Vec<u32>,

    // Pruning
    pub prune: bool,
    pub prune_ratio: f32,
    pub prune_width: f32,
    pub prune_width_peak: f32,
    pub prune_power_high: f32,
    pub prune_power_low: f32,

    // Leaves
    pub show_leaves: bool,
    pub leaves: u32,
    pub leaf_dist: Shape,
    pub leaf_scale: f32,
    pub leaf_scale_x: f32,
    pub bend: f32,

    // Armature
    pub use_arm: bool,
    pub arm_anim: bool,
    pub wind_speed: f32,
    pub wind_gust: f32,
    pub frame_rate: f32,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            seed: 0,
            levels: 3,
            scale: 13.0,
            scale_v: 3.0,
            scale0: 1.0,
            scale_v0: 0.2,
            ratio: 0.015,
            ratio_power: 1.2,
            shape: Shape::TendFlame,
            bevel: false,
            bevel_res: 0,
            res_u: 4,
            handle_type: HandleType::Vector,
            base_size: 0.4,
            base_splits: 0,
            branches: vec![50, 30, 10, 10],
            seg_splits: vec![0.0; 4],
            split_angle: vec![0.0; 4],
            split_angle_v: vec![0.0; 4],
            down_angle: vec![90.0, 60.0, 45.0, 45.0],
            down_angle_v: vec![0.0, -50.0, 10.0, 10.0],
            rotate: vec![140.0, 140.0, 140.0, 77.0],
            rotate_v: vec![0.0; 4],
            start_curv: 0.0,
            attract_up: 0.0,
            length: vec![1.0, 0.3, 0.6, 0.45],
            length_v: vec![0.0; 4],
            curve: vec![0.0, -40.0, -40.0, 0.0],
            curve_v: vec![20.0, 50.0, 75.0, 0.0],
            curve_back: vec![0.0; 4],
            taper: vec![1.0; 4],
            curve_res: vec![3, 5, 3, 1],
            prune: false,
            prune_ratio: 1.0,
            prune_width: 0.4,
            prune_width_peak: 0.6,
            prune_power_high: 0.5,
            prune_power_low: 0.001,
            show_leaves: false,
            leaves: 25,
            leaf_dist: Shape::TaperedCylindrical,
            leaf_scale: 0.17,
            leaf_scale_x: 1.0,
            bend: 0.0,
            use_arm: true,
            arm_anim: false,
            wind_speed: 2.0,
            wind_gust: 0.0,
            frame_rate: 1.0,
        }
    }
}

/// The per-level values of a [`ParameterSet`] for one recursion level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Level {
    pub length: f32,
    pub length_v: f32,
    pub curve: f32,
    pub curve_v: f32,
    pub curve_back: f32,
    pub down_angle: f32,
    pub down_angle_v: f32,
    pub rotate: f32,
    pub rotate_v: f32,
    pub branches: u32,
    pub seg_splits: f32,
    pub split_angle: f32,
    pub split_angle_v: f32,
    pub taper: f32,
    pub curve_res: u32,
}

impl ParameterSet {
    /// Parses a JSON preset. The result still needs [`ParameterSet::validate`].
    ///
    /// Out-of-range selectors are reported as invalid parameters naming
    /// their key; any other malformed input is a [`ParamError::Preset`].
    pub fn from_json(text: &str) -> Result<Self, ParamError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        check_selectors(&value)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, ParamError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Caps the tree at two levels and hides leaves, for quick previews of
    /// imported presets.
    pub fn limited_import(mut self) -> Self {
        self.levels = self.levels.min(2);
        self.show_leaves = false;
        self
    }

    /// Snapshot of the per-level vectors at `level`.
    ///
    /// ### Panics
    /// Panics if `level` is past the end of a per-level vector; call
    /// [`ParameterSet::validate`] first.
    pub fn level(&self, level: usize) -> Level {
        Level {
            length: self.length[level],
            length_v: self.length_v[level],
            curve: self.curve[level],
            curve_v: self.curve_v[level],
            curve_back: self.curve_back[level],
            down_angle: self.down_angle[level],
            down_angle_v: self.down_angle_v[level],
            rotate: self.rotate[level],
            rotate_v: self.rotate_v[level],
            branches: self.branches[level],
            seg_splits: self.seg_splits[level],
            split_angle: self.split_angle[level],
            split_angle_v: self.split_angle_v[level],
            taper: self.taper[level],
            curve_res: self.curve_res[level],
        }
    }

    /// Checks every field against its domain.
    ///
    /// Runs once before generation; the first violation is reported with the
    /// preset key of the offending field.
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(1..=MAX_LEVELS).contains(&self.levels) {
            return Err(ParamError::invalid(
                "levels",
                format!("{} is outside 1..={MAX_LEVELS}", self.levels),
            ));
        }

        let needed = self.levels + 1;
        let lengths = [
            ("length", self.length.len()),
            ("lengthV", self.length_v.len()),
            ("curve", self.curve.len()),
            ("curveV", self.curve_v.len()),
            ("curveBack", self.curve_back.len()),
            ("downAngle", self.down_angle.len()),
            ("downAngleV", self.down_angle_v.len()),
            ("rotate", self.rotate.len()),
            ("rotateV", self.rotate_v.len()),
            ("branches", self.branches.len()),
            ("segSplits", self.seg_splits.len()),
            ("splitAngle", self.split_angle.len()),
            ("splitAngleV", self.split_angle_v.len()),
            ("taper", self.taper.len()),
            ("curveRes", self.curve_res.len()),
        ];
        for (field, len) in lengths {
            if len < needed {
                return Err(ParamError::invalid(
                    field,
                    format!("has {len} entries, {needed} required for {} levels", self.levels),
                ));
            }
        }

        let per_level = [
            ("length", &self.length),
            ("lengthV", &self.length_v),
            ("curve", &self.curve),
            ("curveV", &self.curve_v),
            ("curveBack", &self.curve_back),
            ("downAngle", &self.down_angle),
            ("downAngleV", &self.down_angle_v),
            ("rotate", &self.rotate),
            ("rotateV", &self.rotate_v),
            ("segSplits", &self.seg_splits),
            ("splitAngle", &self.split_angle),
            ("splitAngleV", &self.split_angle_v),
            ("taper", &self.taper),
        ];
        for (field, values) in per_level {
            for v in &values[..needed] {
                finite(field, *v)?;
            }
        }
        for level in 0..needed {
            at_least("length", self.length[level], 0.0)?;
            at_least("lengthV", self.length_v[level], 0.0)?;
            at_least("segSplits", self.seg_splits[level], 0.0)?;
            within("taper", self.taper[level], 0.0, 1.0)?;
            if self.curve_res[level] == 0 {
                return Err(ParamError::invalid("curveRes", "must be at least 1"));
            }
        }

        at_least("scale", self.scale, 0.0)?;
        finite("scaleV", self.scale_v)?;
        at_least("scale0", self.scale0, 0.0)?;
        finite("scaleV0", self.scale_v0)?;
        at_least("ratio", self.ratio, 0.0)?;
        at_least("ratioPower", self.ratio_power, 0.0)?;
        within("baseSize", self.base_size, 0.0, 1.0)?;
        within("startCurv", self.start_curv, 0.0, 360.0)?;
        finite("attractUp", self.attract_up)?;
        within("pruneRatio", self.prune_ratio, 0.0, 1.0)?;
        at_least("pruneWidth", self.prune_width, 0.0)?;
        within("pruneWidthPeak", self.prune_width_peak, 0.0, 1.0)?;
        finite("prunePowerHigh", self.prune_power_high)?;
        finite("prunePowerLow", self.prune_power_low)?;
        at_least("leafScale", self.leaf_scale, 0.0)?;
        at_least("leafScaleX", self.leaf_scale_x, 0.0)?;
        within("bend", self.bend, 0.0, 1.0)?;
        finite("windSpeed", self.wind_speed)?;
        finite("windGust", self.wind_gust)?;
        finite("frameRate", self.frame_rate)?;
        if self.frame_rate <= 0.0 {
            return Err(ParamError::invalid("frameRate", "must be positive"));
        }
        if self.res_u == 0 {
            return Err(ParamError::invalid("resU", "must be at least 1"));
        }
        Ok(())
    }
}

/// Integer selectors and their largest valid value.
const SELECTORS: [(&str, u64); 3] = [("shape", 7), ("leafDist", 7), ("handleType", 1)];

fn check_selectors(value: &serde_json::Value) -> Result<(), ParamError> {
    for (field, max) in SELECTORS {
        match value.get(field).and_then(serde_json::Value::as_u64) {
            Some(v) if v > max => {
                return Err(ParamError::invalid(
                    field,
                    format!("selector {v} is outside 0..={max}"),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

fn finite(field: &'static str, value: f32) -> Result<(), ParamError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParamError::invalid(field, format!("{value} is not finite")))
    }
}

fn at_least(field: &'static str, value: f32, min: f32) -> Result<(), ParamError> {
    finite(field, value)?;
    if value < min {
        return Err(ParamError::invalid(field, format!("{value} is below {min}")));
    }
    Ok(())
}

fn within(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), ParamError> {
    finite(field, value)?;
    if value < min || value > max {
        return Err(ParamError::invalid(
            field,
            format!("{value} is outside {min}..={max}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_are_valid() {
        ParameterSet::default().validate().unwrap();
    }

    #[rstest]
    #[case(0)]
    #[case(7)]
    fn levels_outside_range_are_rejected(#[case] levels: usize) {
        let params = ParameterSet {
            levels,
            ..ParameterSet::default()
        };
        let err = params.validate().unwrap_err();
        assert_eq!(err.field(), Some("levels"));
    }

    #[test]
    fn short_per_level_vector_names_the_field() {
        let params = ParameterSet {
            curve_res: vec![3, 5, 3],
            ..ParameterSet::default()
        };
        let err = params.validate().unwrap_err();
        assert_eq!(err.field(), Some("curveRes"));
    }

    #[test]
    fn entries_past_levels_are_ignored() {
        let mut params = ParameterSet {
            levels: 1,
            ..ParameterSet::default()
        };
        params.length[3] = -5.0;
        params.taper[2] = 9.0;
        params.curve_res[3] = 0;
        params.validate().unwrap();
    }

    #[rstest]
    #[case::negative_length(|p: &mut ParameterSet| p.length[1] = -0.1, "length")]
    #[case::taper_above_one(|p: &mut ParameterSet| p.taper[0] = 1.5, "taper")]
    #[case::zero_curve_res(|p: &mut ParameterSet| p.curve_res[2] = 0, "curveRes")]
    #[case::negative_scale(|p: &mut ParameterSet| p.scale = -1.0, "scale")]
    #[case::base_size(|p: &mut ParameterSet| p.base_size = 1.2, "baseSize")]
    #[case::prune_ratio(|p: &mut ParameterSet| p.prune_ratio = -0.5, "pruneRatio")]
    #[case::bend(|p: &mut ParameterSet| p.bend = 2.0, "bend")]
    #[case::frame_rate(|p: &mut ParameterSet| p.frame_rate = 0.0, "frameRate")]
    #[case::res_u(|p: &mut ParameterSet| p.res_u = 0, "resU")]
    #[case::nan_curve(|p: &mut ParameterSet| p.curve[0] = f32::NAN, "curve")]
    fn out_of_domain_fields_are_rejected(
        #[case] mutate: fn(&mut ParameterSet),
        #[case] field: &str,
    ) {
        let mut params = ParameterSet::default();
        mutate(&mut params);
        let err = params.validate().unwrap_err();
        assert_eq!(err.field(), Some(field));
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let mut params = ParameterSet::default();
        params.seed = 1234;
        params.base_splits = 2;
        params.prune = true;
        params.shape = Shape::Flame;
        params.handle_type = HandleType::Auto;
        params.curve_v[2] = 12.5;

        let text = params.to_json().unwrap();
        let back = ParameterSet::from_json(&text).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn preset_keys_use_camel_case_names() {
        let text = ParameterSet::default().to_json().unwrap();
        for key in [
            "\"curveRes\"",
            "\"baseSplits\"",
            "\"scaleV0\"",
            "\"leafScaleX\"",
            "\"pruneWidthPeak\"",
            "\"resU\"",
            "\"handleType\"",
            "\"useArm\"",
        ] {
            assert!(text.contains(key), "missing {key}");
        }
    }

    #[test]
    fn partial_preset_fills_from_defaults() {
        let params = ParameterSet::from_json(r#"{ "levels": 2, "shape": 0 }"#).unwrap();
        assert_eq!(params.levels, 2);
        assert_eq!(params.shape, Shape::Conical);
        assert_eq!(params.scale, ParameterSet::default().scale);
    }

    #[rstest]
    #[case(r#"{ "handleType": 4 }"#, "handleType")]
    #[case(r#"{ "shape": 8 }"#, "shape")]
    #[case(r#"{ "levels": 2, "leafDist": 300 }"#, "leafDist")]
    fn selectors_outside_enumeration_name_their_field(#[case] text: &str, #[case] field: &str) {
        let err = ParameterSet::from_json(text).unwrap_err();
        assert!(matches!(err, ParamError::InvalidParameter { .. }));
        assert_eq!(err.field(), Some(field));
    }

    #[test]
    fn malformed_presets_are_preset_errors() {
        for text in ["{ levels", r#"{ "shape": -1 }"#, r#"{ "scale": "tall" }"#] {
            let err = ParameterSet::from_json(text).unwrap_err();
            assert!(matches!(err, ParamError::Preset(_)), "{text}");
            assert_eq!(err.field(), None);
        }
    }

    #[test]
    fn limited_import_caps_levels_and_hides_leaves() {
        let params = ParameterSet {
            levels: 4,
            show_leaves: true,
            length: vec![1.0; 5],
            ..ParameterSet::default()
        }
        .limited_import();
        assert_eq!(params.levels, 2);
        assert!(!params.show_leaves);
    }
}
