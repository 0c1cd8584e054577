use xxhash_rust::xxh3::Xxh3;

/// Stable 64-bit content hash (xxh3) with length-prefixed string fields.
pub(crate) struct StableHash(Xxh3);

impl StableHash {
    pub(crate) fn new() -> Self {
        Self(Xxh3::new())
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.0.update(&v.to_le_bytes());
    }

    pub(crate) fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.0.update(s.as_bytes());
    }

    pub(crate) fn finish(&self) -> u64 {
        self.0.digest()
    }

    pub(crate) fn finish_hex(&self) -> String {
        format!("{:016x}", self.finish())
    }
}

pub(crate) fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Ratio that is `0.0` for an empty denominator.
pub(crate) fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
