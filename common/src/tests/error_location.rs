use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: Every error in the workspace carries an ErrorLocation. If capture
/// breaks, bind failures and settings errors lose the one clue that says where they came from.
///
/// **BUG THIS CATCHES**: Would catch if `Location::caller()` propagation or the field mapping
/// in `ErrorLocation::from()` breaks.
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN: Current caller location
    // WHEN: Creating ErrorLocation from caller
    let location = ErrorLocation::from(Location::caller());
    let expected_line = line!() - 1;

    // THEN: Should capture file, line, and column
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert_eq!(location.line, expected_line, "Should capture correct line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies that ErrorLocation Display formatting produces the `[file:line:column]` format.
///
/// **WHY THIS MATTERS**: Error messages end up in the host log file. A broken format makes
/// startup failures unreadable.
///
/// **BUG THIS CATCHES**: Would catch if the Display implementation drops the brackets or any
/// of the three components.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: An ErrorLocation
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Formatting as string
    let formatted = format!("{}", location);

    // THEN: Should produce "[file:line:column]" format
    assert!(formatted.starts_with('['), "Should start with '['");
    assert!(formatted.ends_with(']'), "Should end with ']'");
    assert!(
        formatted.contains("error_location.rs"),
        "Should include filename"
    );
    assert!(
        formatted.contains(&format!(":{}:{}]", location.line, location.column)),
        "Should include line and column"
    );
}

/// **VALUE**: Verifies that `#[track_caller]` propagation gives each call site its own line.
///
/// **WHY THIS MATTERS**: The `From` conversions into error enums are `#[track_caller]`. If
/// propagation breaks, every error reports the conversion site instead of the failure site.
///
/// **BUG THIS CATCHES**: Would catch if `#[track_caller]` stops propagating through helpers.
#[test]
fn given_multiple_call_sites_when_capturing_location_then_each_has_unique_line() {
    // GIVEN: A helper function that captures location
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    // WHEN: Capturing location from different call sites
    let loc1 = capture_location();
    let loc2 = capture_location();

    // THEN: Should have same file but different line numbers
    assert_eq!(loc1.file, loc2.file, "Should have same file");
    assert_eq!(loc1.line + 1, loc2.line, "Lines should be sequential");
}

/// **VALUE**: Verifies that `ErrorLocation::caller()` reports the caller, not itself.
///
/// **WHY THIS MATTERS**: `caller()` is the shorthand used inside `#[track_caller]` helpers.
///
/// **BUG THIS CATCHES**: Would catch `#[track_caller]` missing on `caller()`, which would pin
/// every location to `error_location.rs` in the library.
#[test]
fn given_caller_shorthand_when_called_then_points_at_call_site() {
    let location = ErrorLocation::caller();
    let expected_line = line!() - 1;

    assert!(location.file.contains("tests"), "got {}", location.file);
    assert_eq!(location.line, expected_line);
}
