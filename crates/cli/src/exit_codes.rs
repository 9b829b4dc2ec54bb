//! CLI Exit Code Registry
//!
//! Single source of truth for all `jaws` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | General error (unspecified)                         |
//! | 2    | CLI usage error (bad args)                          |
//! | 3    | Manifest could not be parsed or failed validation   |
//! | 4    | I/O error reading inputs or writing outputs         |
//! | 5    | Template has no rows                                |
//! | 6    | Template join column not selected                   |
//! | 7    | Sector join keys missing from the template          |

use jaws_merge::MergeError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Manifest parse or validation failure.
pub const EXIT_INVALID_MANIFEST: u8 = 3;

/// Input file unreadable, unsupported, or output not writable.
pub const EXIT_IO: u8 = 4;

/// Merge refused: template data is missing.
pub const EXIT_MISSING_TEMPLATE: u8 = 5;

/// Merge refused: template join column not selected.
pub const EXIT_MISSING_JOIN_COLUMN: u8 = 6;

/// Merge refused: unmatched join keys.
pub const EXIT_UNMATCHED: u8 = 7;

/// Map an engine error to its exit code.
pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::MissingTemplateData => EXIT_MISSING_TEMPLATE,
        MergeError::MissingJoinColumn => EXIT_MISSING_JOIN_COLUMN,
        MergeError::UnmatchedKeys(_) => EXIT_UNMATCHED,
        MergeError::ConfigParse(_) | MergeError::ConfigValidation(_) => EXIT_INVALID_MANIFEST,
        MergeError::NoMergedData
        | MergeError::ColumnNotEditable(_)
        | MergeError::UnknownKey(_) => EXIT_ERROR,
    }
}
