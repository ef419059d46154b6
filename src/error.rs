//! Lowering cannot fail on a program that made it through name and type
//! analysis. Everything here reports a broken earlier stage or a misuse of
//! the lowering entry points, and aborts the whole pass.

use thiserror::Error;

use crate::frontend::intern::InternedSymbol;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("function declaration `{0}` at a local scope")]
    FunctionAtLocalScope(InternedSymbol),
    #[error("formal declaration `{0}` at a global scope")]
    FormalAtGlobalScope(InternedSymbol),
    #[error("identifier `{0}` has no storage bound in this context")]
    UnboundIdentifier(InternedSymbol),
    #[error("call to void function `{0}` used as a value")]
    VoidValue(InternedSymbol),
    #[error("`{0}` is called but does not have a function type")]
    NotAFunction(InternedSymbol),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal consistency violation: {violation}{}", origin_suffix(.origin))]
pub struct LoweringError {
    pub violation: Violation,
    /// Where in the lowering code the violation was detected. Only recorded
    /// with the `error-backtrace` feature.
    pub origin: Option<String>,
}

fn origin_suffix(origin: &Option<String>) -> String {
    match origin {
        Some(origin) => format!("\n  detected in {origin}"),
        None => String::new(),
    }
}

/// Expands to the name of the enclosing function
macro_rules! function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        type_name_of(f)
            .rsplit("::")
            .find(|&part| part != "f" && part != "{{closure}}")
            .unwrap_or("<unknown>")
    }};
}

/// Builds a [`LoweringError`] for the given [`Violation`], tagging it with
/// the detection site when `error-backtrace` is enabled
macro_rules! violation {
    ($violation:expr $(,)?) => {{
        #[cfg(feature = "error-backtrace")]
        let origin = Some(format!(
            "{}::{} (at {}:{}:{})",
            module_path!(),
            $crate::error::function!(),
            file!(),
            line!(),
            column!()
        ));

        #[cfg(not(feature = "error-backtrace"))]
        let origin = None;

        $crate::error::LoweringError {
            violation: $violation,
            origin,
        }
    }};
}

pub(crate) use {function, violation};

#[cfg(test)]
mod tests {
    use super::*;

    fn detect_unbound() -> LoweringError {
        violation!(Violation::UnboundIdentifier(InternedSymbol::new("ghost")))
    }

    #[test]
    fn message_names_the_violation() {
        let error = detect_unbound();

        assert_eq!(
            error.violation,
            Violation::UnboundIdentifier(InternedSymbol::new("ghost"))
        );
        assert!(
            error
                .to_string()
                .starts_with("internal consistency violation: identifier `ghost`")
        );
    }

    #[cfg(feature = "error-backtrace")]
    #[test]
    fn backtrace_records_detecting_function() {
        let error = detect_unbound();
        let origin = error.origin.unwrap_or_default();

        assert!(origin.contains("detect_unbound"), "{origin}");
        assert!(origin.contains("error.rs"), "{origin}");
    }
}
