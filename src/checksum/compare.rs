use super::fingerprint::FingerprintMap;

/// Entries that differ between a current and a previous fingerprint map.
///
/// Pairs present with the same value in both maps are dropped from both halves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumDiff {
    pub only_in_current: FingerprintMap,
    pub only_in_previous: FingerprintMap,
}

impl ChecksumDiff {
    pub fn is_empty(&self) -> bool {
        self.only_in_current.is_empty() && self.only_in_previous.is_empty()
    }
}

pub fn equal(a: &FingerprintMap, b: &FingerprintMap) -> bool {
    a == b
}

pub fn diff(current: &FingerprintMap, previous: &FingerprintMap) -> ChecksumDiff {
    let only_in_current = current
        .iter()
        .filter(|(key, value)| previous.get(key) != Some(*value))
        .collect();
    let only_in_previous = previous
        .iter()
        .filter(|(key, value)| current.get(key) != Some(*value))
        .collect();

    ChecksumDiff {
        only_in_current,
        only_in_previous,
    }
}
