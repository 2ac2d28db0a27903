use crate::{parser, util::fmt::listing};

pub enum Assertion {
    IrOk(&'static str),
    IrError(&'static str),
    ExpectedErrors(&'static [&'static str]),
}

/// Compiles `src`, returning the program listing and the rendered
/// diagnostics.
#[track_caller]
pub fn run_pipeline(src: &str) -> (String, Vec<String>) {
    let (output, errors) = match parser::compile(src) {
        Ok(output) => (output, vec![]),
        Err((output, errors)) => (output, errors),
    };
    let listing = listing::print_program_string(&output.pool, &output.program);
    let errors = errors.iter().map(ToString::to_string).collect();
    (listing, errors)
}

/// Strips indentation, so that labels and instructions line up in test
/// sources.
fn normalize(listing: &str) -> String {
    listing
        .trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

#[track_caller]
pub fn run_assertion(
    assertion: Assertion,
    formatted_actual_listing: &str,
    formatted_actual_errors: &[String],
) {
    match assertion {
        Assertion::IrOk(expected_listing) => {
            let expected_errors: &[&str] = &[];
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
            ::pretty_assertions::assert_eq!(
                normalize(formatted_actual_listing),
                normalize(expected_listing)
            );
        }
        Assertion::IrError(expected_listing) => {
            assert!(
                !formatted_actual_errors.is_empty(),
                "expected the compilation to fail"
            );
            ::pretty_assertions::assert_eq!(
                normalize(formatted_actual_listing),
                normalize(expected_listing)
            );
        }
        Assertion::ExpectedErrors(expected_errors) => {
            ::pretty_assertions::assert_eq!(formatted_actual_errors, expected_errors);
        }
    }
}

macro_rules! ir_tests {
    (
        $(
            fn $test_name:ident() {
                let src = $source:expr;
                $($assertions_tt:tt)*
            }
        )*
    ) => {
        $(
            #[test]
            fn $test_name() {
                let (formatted_actual_listing, formatted_actual_errors) =
                    crate::util::test_utils::run_pipeline($source);
                let ctx = (&formatted_actual_listing, &formatted_actual_errors);
                ir_tests!(@@expand_assertions, ctx, [$($assertions_tt)*]);
            }
        )*
    };

    (@@expand_assertions, $ctx:expr, []) => {};
    (@@expand_assertions, $ctx:expr, [
        let $assertion:ident = $assertion_expected:expr;
        $($rest_assertions_tt:tt)*
    ]) => {
        crate::util::test_utils::run_assertion(
            ir_tests!(@@assertion, $assertion, $assertion_expected),
            $ctx.0,
            $ctx.1,
        );
        ir_tests!(@@expand_assertions, $ctx, [$($rest_assertions_tt)*]);
    };

    (@@assertion, ir_ok, $expected:expr) => {
        crate::util::test_utils::Assertion::IrOk(::indoc::indoc! { $expected })
    };
    (@@assertion, ir_error, $expected:expr) => {
        crate::util::test_utils::Assertion::IrError(::indoc::indoc! { $expected })
    };
    (@@assertion, expected_errors, $expected:expr) => {
        crate::util::test_utils::Assertion::ExpectedErrors($expected)
    };
}
pub(crate) use ir_tests;
