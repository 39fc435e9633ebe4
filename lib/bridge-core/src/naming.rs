//! Derived names for provisioned chains

/// Prefix prepended to the source uid. Kubernetes names must start with an
/// alphanumeric character and uids may start with a digit.
pub const DERIVED_NAME_PREFIX: &str = "a";

/// Name shared by every object in the chain provisioned for a source object.
///
/// The mapping is pure: the same uid always yields the same name. The uid is
/// used verbatim, without sanitizing.
pub fn derived_name(uid: &str) -> String {
    format!("{DERIVED_NAME_PREFIX}{uid}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixes_uid() {
        assert_eq!(derived_name("1234"), "a1234");
        assert_eq!(
            derived_name("5f0b7c2e-9d1a-4a51-8e39-0c6d0f1f2b7a"),
            "a5f0b7c2e-9d1a-4a51-8e39-0c6d0f1f2b7a"
        );
    }

    #[test]
    fn test_edge_case_uids() {
        assert_eq!(derived_name(""), "a");
        assert_eq!(derived_name("x/y z!"), "ax/y z!");
        assert_eq!(derived_name("ü"), "aü");
    }

    #[test]
    fn test_is_deterministic() {
        assert_eq!(derived_name("abc"), derived_name("abc"));
    }
}
