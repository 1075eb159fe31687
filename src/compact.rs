//! The Compact Serialization: period-delimited base64url segments.
//!
//! Splitting and joining live here; the meaning and validation of each
//! segment belong to the JWS and JWE types.

/// Split a compact serialization into its segments.
///
/// Empty segments are preserved: a JWE using direct key agreement has an
/// empty second part, and a detached-content JWS has an empty payload part.
pub fn deserialize(compact: &str) -> Vec<&str> {
    compact.split('.').collect()
}

/// Join segments with periods.
pub fn serialize(parts: &[&str]) -> String {
    parts.join(".")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn split_preserves_empty_parts() {
        let parts = deserialize("eyJhbGciOiJkaXIifQ...abc.def.ghi");
        assert_eq!(parts.len(), 6);
        assert_eq!(parts[1], "");
        assert_eq!(parts[2], "");
    }

    #[test]
    fn join_is_inverse_of_split() {
        let compact = "aaa.bbb.ccc";
        let parts = deserialize(compact);
        assert_eq!(serialize(&parts), compact);

        let with_empty = "aaa..ccc.ddd.eee";
        assert_eq!(serialize(&deserialize(with_empty)), with_empty);
    }

    #[test]
    fn single_segment() {
        assert_eq!(deserialize("abc"), vec!["abc"]);
    }
}
