//! Reversible tenant-name encoding of Cell ownership values.
//!
//! A Cell document's owner field stores the owning unit URL with the tenant
//! name as its fragment: `<unit-url>#<tenant>`. Decoding takes the text
//! after the final `#`, lowercased (database names are lowercase, and the
//! decoded owner is compared against them). A value with no fragment decodes
//! to itself, lowercased.

/// Encode an owner value for a tenant.
pub fn encode_owner(unit_url: &str, tenant: &str) -> String {
    format!("{unit_url}#{tenant}")
}

/// Decode the tenant name out of an owner value.
pub fn decode_owner(owner: &str) -> String {
    owner
        .rsplit_once('#')
        .map_or(owner, |(_, tenant)| tenant)
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let encoded = encode_owner("https://unit.example", "acme");
        assert_eq!(encoded, "https://unit.example#acme");
        assert_eq!(decode_owner(&encoded), "acme");
    }

    #[test]
    fn test_decode_lowercases() {
        assert_eq!(decode_owner("https://unit.example#Acme"), "acme");
    }

    #[test]
    fn test_decode_takes_final_fragment() {
        assert_eq!(decode_owner("https://unit.example/a#b#acme"), "acme");
    }

    #[test]
    fn test_fragment_free_value_decodes_whole() {
        assert_eq!(decode_owner("Acme"), "acme");
    }
}
