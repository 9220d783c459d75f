use core::hash::Hash;
use std::hash::Hasher;

#[cfg(feature = "std-hash")]
pub mod default {
    pub use std::collections::hash_map::DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::new()
    }
}

#[cfg(not(feature = "std-hash"))]
pub mod default {
    pub use ahash::AHasher as DefaultHasher;

    #[inline]
    pub fn new() -> DefaultHasher {
        DefaultHasher::default()
    }
}

/// Content fingerprint of a value, stable for the lifetime of the process.
pub type Fingerprint = u64;

/// Hash a single value with whichever default hasher is active.
#[inline]
pub fn hash_one<T: Hash + ?Sized>(v: &T) -> Fingerprint {
    let mut h = default::new();
    v.hash(&mut h);
    h.finish()
}

/// Fingerprint rendered as fixed-width hex, used inside cache keys.
pub fn fingerprint_hex<T: Hash + ?Sized>(v: &T) -> String {
    format!("{:016x}", hash_one(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_share_a_fingerprint() {
        assert_eq!(hash_one("increment"), hash_one("increment"));
        assert_ne!(hash_one("increment"), hash_one("decrement"));
    }

    #[test]
    fn hex_fingerprint_is_fixed_width() {
        assert_eq!(fingerprint_hex(&0u8).len(), 16);
        assert_eq!(fingerprint_hex("a"), fingerprint_hex("a"));
    }
}
