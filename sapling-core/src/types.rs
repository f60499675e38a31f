/// Identifier for a stem in a [`crate::tree::StemTree`].
///
/// This is an index into `StemTree::stems`, and is only meaningful within
/// the lifetime of a given `StemTree` instance.
pub type StemId = usize;

/// Identifier for a bone in a [`crate::armature::Armature`].
///
/// Index into `Armature::bones`.
pub type BoneId = usize;
