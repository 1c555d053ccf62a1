//! Property tests for the case converters.

use emissary_core::cases::{
    camel_case, constant_case, header_case, kebab_case, pascal_case, snake_case,
};
use proptest::prelude::*;

/// Identifier-shaped names: words of two or more letters, optionally ending in
/// digits, separated by underscores.
fn identifier() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{2,6}[0-9]{0,2}", 1..5).prop_map(|words| words.join("_"))
}

/// The same names written in camelCase.
fn camel_identifier() -> impl Strategy<Value = String> {
    identifier().prop_map(|s| camel_case(&s))
}

proptest! {
    #[test]
    fn snake_case_is_idempotent(s in identifier()) {
        let once = snake_case(&s);
        prop_assert_eq!(snake_case(&once), once);
    }

    #[test]
    fn camel_case_is_idempotent(s in identifier()) {
        let once = camel_case(&s);
        prop_assert_eq!(camel_case(&once), once);
    }

    #[test]
    fn pascal_case_is_idempotent(s in identifier()) {
        let once = pascal_case(&s);
        prop_assert_eq!(pascal_case(&once), once);
    }

    #[test]
    fn constant_case_is_idempotent(s in identifier()) {
        let once = constant_case(&s);
        prop_assert_eq!(constant_case(&once), once);
    }

    #[test]
    fn kebab_case_is_idempotent(s in identifier()) {
        let once = kebab_case(&s);
        prop_assert_eq!(kebab_case(&once), once);
    }

    #[test]
    fn header_case_is_idempotent(s in identifier()) {
        let once = header_case(&s);
        prop_assert_eq!(header_case(&once), once);
    }

    #[test]
    fn snake_and_camel_round_trip(s in camel_identifier()) {
        prop_assert_eq!(camel_case(&snake_case(&s)), s);
    }
}
