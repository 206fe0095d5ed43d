//! Opaque unique identifiers for tree nodes.

use rand::Rng;

use super::rule::normalize_identity;

/// Length of the random uid suffix.
pub const UID_SUFFIX_LEN: usize = 6;

const UID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a uid from a node name: `{normalized_name}_{6 random [a-z0-9]}`.
///
/// The result is a valid XLSForm question name as long as `name` is one.
pub fn generate_uid<R: Rng + ?Sized>(name: &str, rng: &mut R) -> String {
    let suffix: String = (0..UID_SUFFIX_LEN)
        .map(|_| UID_CHARS[rng.gen_range(0..UID_CHARS.len())] as char)
        .collect();
    format!("{}_{suffix}", normalize_identity(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn uid_has_prefix_and_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        let uid = generate_uid("Ed.Lev3", &mut rng);
        let (prefix, suffix) = uid.rsplit_once('_').unwrap();
        assert_eq!(prefix, "ed_lev3");
        assert_eq!(suffix.len(), UID_SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| UID_CHARS.contains(&b)));
    }

    #[test]
    fn uid_is_deterministic_for_a_seed() {
        let a = generate_uid("age", &mut StdRng::seed_from_u64(1));
        let b = generate_uid("age", &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
