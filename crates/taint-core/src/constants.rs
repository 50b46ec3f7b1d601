//! Tunables shared by the oracle, tracer and deep tracer.

/// Superglobals considered user-controllable. `$_SERVER` is deliberately
/// excluded: in practice almost every value read from it (script path,
/// server software string, computed headers) triggers a flood of
/// false-positive findings, so it is left out of the universe on purpose.
pub const CONTROLLABLE_SUPERGLOBALS: &[&str] = &[
    "$_GET",
    "$_POST",
    "$_REQUEST",
    "$_COOKIE",
    "$_FILES",
    "$HTTP_POST_FILES",
    "$HTTP_COOKIE_VARS",
    "$HTTP_REQUEST_VARS",
    "$HTTP_POST_VARS",
    "$HTTP_RAW_POST_DATA",
    "$HTTP_GET_VARS",
];

/// Recursion ceiling for the deep tracer. Exceeding this aborts the current
/// branch with `UNCONTROLLED` rather than risk unbounded include cycles.
pub const MAX_ANALYSIS_DEPTH: usize = 20;

/// Marker returned by the constant resolver when an include-path constant
/// cannot be traced to a `define()`.
pub const NOT_FOUND: &str = "not_found";

pub fn is_controllable(name: &str) -> bool {
    CONTROLLABLE_SUPERGLOBALS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_superglobal_is_excluded() {
        assert!(!is_controllable("$_SERVER"));
    }

    #[test]
    fn get_and_post_are_controllable() {
        assert!(is_controllable("$_GET"));
        assert!(is_controllable("$_POST"));
    }

    #[test]
    fn arbitrary_variable_is_not_controllable() {
        assert!(!is_controllable("$foo"));
    }
}
