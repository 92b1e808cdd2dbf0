pub mod mysql_directory;
pub mod mysql_permits;

pub use mysql_directory::MySqlAcademicDirectory;
pub use mysql_permits::MySqlLeavePermitRepository;

use std::str::FromStr;

use crate::error::PermitError;

/// Logs a storage failure with its context and wraps it.
pub(crate) fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> PermitError {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        PermitError::Database(e)
    }
}

/// `?, ?, ?` for an `IN (...)` list of `n` values.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Parses an enum stored as text, reporting the column on failure.
pub(crate) fn parse_column<T: FromStr>(column: &str, raw: &str) -> Result<T, PermitError> {
    raw.parse()
        .map_err(|_| PermitError::Internal(format!("unexpected {column} value {raw:?}")))
}
