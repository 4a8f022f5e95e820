use rusqlite::Connection;
use sea_query::{Expr, Iden, Query, SimpleExpr, SqliteQueryBuilder};
use sea_query_rusqlite::{RusqliteBinder, RusqliteValues};
use tracing::trace;

use crate::api::response_errors::{StoreError, StoreResult};

/// Column assignments for a partial update.
///
/// Assignments render in the order they were added and their values bind in
/// that same order. The row id binds last, after every assigned value, to match
/// the trailing `WHERE id = ?`.
#[derive(Debug)]
pub struct UpdateBuilder<I> {
    assignments: Vec<(I, SimpleExpr)>,
}

impl<I> Default for UpdateBuilder<I> {
    fn default() -> Self {
        Self { assignments: Vec::new() }
    }
}

impl<I: Iden + 'static> UpdateBuilder<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<V: Into<SimpleExpr>>(&mut self, column: I, value: V) -> &mut Self {
        self.assignments.push((column, value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Assigned column names in statement order
    pub fn columns(&self) -> Vec<String> {
        self.assignments
            .iter()
            .map(|(column, _)| {
                let mut name = String::new();
                column.unquoted(&mut name);
                name
            })
            .collect()
    }

    /// Renders `UPDATE table SET .. WHERE id_column = ?`. Nothing to assign is
    /// an error rather than a silent no-op
    pub fn build(
        self,
        table: I,
        id_column: I,
        id: i64,
    ) -> Result<(String, RusqliteValues), StoreError> {
        if self.is_empty() {
            return Err(StoreError::EmptyUpdate);
        }

        Ok(Query::update()
            .table(table)
            .values(self.assignments)
            .and_where(Expr::col(id_column).eq(id))
            .build_rusqlite(SqliteQueryBuilder))
    }

    /// Builds and runs the update, returning the number of changed rows
    pub fn execute(self, conn: &Connection, table: I, id_column: I, id: i64) -> StoreResult<usize> {
        let (sql, values) = self.build(table, id_column, id)?;
        trace!(sql, "partial update");

        let mut stmt = conn.prepare_cached(&sql)?;
        Ok(stmt.execute(&*values.as_params())?)
    }
}

/// True when `table` has a row whose `id_column` equals `id`
pub fn row_exists<I: Iden + 'static>(
    conn: &Connection,
    table: I,
    id_column: I,
    id: i64,
) -> rusqlite::Result<bool> {
    let (sql, values) = Query::select()
        .expr(Expr::val(1))
        .from(table)
        .and_where(Expr::col(id_column).eq(id))
        .limit(1)
        .build_rusqlite(SqliteQueryBuilder);

    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.exists(&*values.as_params())
}

/// Number of rows in `table` whose `column` equals `value`
pub fn count_rows<I: Iden + 'static>(
    conn: &Connection,
    table: I,
    column: I,
    value: i64,
) -> rusqlite::Result<i64> {
    let (sql, values) = Query::select()
        .expr(Expr::cust("COUNT(*)"))
        .from(table)
        .and_where(Expr::col(column).eq(value))
        .build_rusqlite(SqliteQueryBuilder);

    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.query_row(&*values.as_params(), |row| row.get(0))
}
