/// Checksum engine for generated sources
///
/// Computes, persists and compares the fingerprint maps that decide whether a
/// generator has to run again.
pub mod compare;
pub mod fingerprint;
pub mod store;

pub use compare::{diff, equal, ChecksumDiff};
pub use fingerprint::{
    ChecksumComputer, FingerprintMap, InputProperty, PropertyValue, Resolvable, MISSING_FILE,
    PROPERTY_PREFIX,
};
pub use store::ChecksumStore;
