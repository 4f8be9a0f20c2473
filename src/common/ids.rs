//! Deterministic fingerprints tying persisted artefacts together.

/// FNV-1a state, 32 bits. Not collision resistant; only used to notice that
/// two files were not written together.
#[derive(Copy, Clone, Debug)]
pub struct SimpleHash(u32);

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Unit separator fed between parts so `["ab","c"]` and `["a","bc"]` differ.
const SEPARATOR: u8 = 0x1f;

impl SimpleHash {
    pub fn new() -> Self {
        Self(FNV_OFFSET)
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.0 = bytes
            .iter()
            .fold(self.0, |h, b| (h ^ u32::from(*b)).wrapping_mul(FNV_PRIME));
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn hex(&self) -> String {
        format!("{:08x}", self.0)
    }
}

impl Default for SimpleHash {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprint an ordered sequence of byte strings.
pub fn fingerprint_parts<B: AsRef<[u8]>>(parts: &[B]) -> String {
    let mut hasher = SimpleHash::new();
    for part in parts {
        hasher.update(part.as_ref());
        hasher.update(&[SEPARATOR]);
    }
    hasher.hex()
}

/// Fingerprint an ordered list of column names. Order matters: the same names
/// in a different order describe a different feature vector.
pub fn fingerprint_columns<S: AsRef<str>>(columns: &[S]) -> String {
    let parts: Vec<&[u8]> = columns.iter().map(|c| c.as_ref().as_bytes()).collect();
    fingerprint_parts(&parts)
}
