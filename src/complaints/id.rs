//! Public complaint identifiers: `BC-<year>-<NNNNNN>`.
use anyhow::{Context as _, Result};
use sqlx::SqliteConnection;

/// Draw the next sequence number for `year`.
///
/// Must run inside the transaction that inserts the complaint, so a rolled
/// back insert also rolls back the counter.
pub(super) async fn next(year: i32, conn: &mut SqliteConnection) -> Result<String> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO complaint_sequence (year, value) VALUES (?, 1)
            ON CONFLICT (year) DO UPDATE SET value = value + 1
            RETURNING value
        "#,
    )
    .bind(year)
    .fetch_one(&mut *conn)
    .await
    .context("failed to advance complaint sequence")?;

    Ok(format(year, value))
}

pub(super) fn format(year: i32, value: i64) -> String {
    format!("BC-{year}-{value:06}")
}
