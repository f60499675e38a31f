//! Parameter errors and the non-fatal notices recorded during generation.

use serde::Serialize;
use thiserror::Error;

use crate::types::StemId;

/// Errors raised before generation begins.
///
/// Everything here aborts the call; nothing in this enum is produced once
/// stem construction has started.
#[derive(Error, Debug)]
pub enum ParamError {
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("malformed preset: {0}")]
    Preset(#[from] serde_json::Error),
}

impl ParamError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ParamError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field, if this error concerns a single field.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ParamError::InvalidParameter { field, .. } => Some(field),
            ParamError::Preset(_) => None,
        }
    }
}

/// Conditions the generator clamped or worked around instead of failing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Notice {
    /// No shortened candidate fit inside the pruning envelope; the stem was
    /// kept at its unpruned length.
    PruningExhausted { stem: StemId, attempts: usize },

    /// The stem collapsed to zero length or zero radius and was kept as a
    /// terminal node.
    DegenerateStem {
        stem: StemId,
        length: f32,
        radius: f32,
    },
}

impl Notice {
    pub fn stem(&self) -> StemId {
        match self {
            Notice::PruningExhausted { stem, .. } | Notice::DegenerateStem { stem, .. } => *stem,
        }
    }
}
