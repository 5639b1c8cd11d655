//! Terminal operations: render the accumulated statement and run it.

use super::{QueryBuilder, render};
use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::row::{FromRow, IntoRow, row_to_map};
use crate::stream::FromRowStream;
use crate::value::SqlValue;
use bytes::Bytes;
use futures_util::{SinkExt, pin_mut};
use std::collections::HashMap;

fn as_params(values: &[SqlValue]) -> Vec<&(dyn tokio_postgres::types::ToSql + Sync)> {
    values
        .iter()
        .map(|v| v as &(dyn tokio_postgres::types::ToSql + Sync))
        .collect()
}

impl QueryBuilder {
    fn ensure_table(&self) -> DbResult<()> {
        if self.table.is_empty() {
            return Err(DbError::NoTable);
        }
        Ok(())
    }

    // ==================== Reads ====================

    /// Execute the accumulated SELECT and collect rows as column → value maps.
    pub async fn get(
        &self,
        conn: &impl GenericClient,
    ) -> DbResult<Vec<HashMap<String, SqlValue>>> {
        self.ensure_table()?;
        let (sql, values) = self.build();
        let rows = conn.query(&sql, &as_params(&values)).await?;
        rows.iter().map(row_to_map).collect()
    }

    /// Execute and map all rows to `T`.
    pub async fn fetch_all<T: FromRow>(&self, conn: &impl GenericClient) -> DbResult<Vec<T>> {
        self.ensure_table()?;
        let (sql, values) = self.build();
        let rows = conn.query(&sql, &as_params(&values)).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute and map the first row to `T`, if any.
    pub async fn fetch_opt<T: FromRow>(&self, conn: &impl GenericClient) -> DbResult<Option<T>> {
        self.ensure_table()?;
        let (sql, values) = self.build();
        let row = conn.query_opt(&sql, &as_params(&values)).await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Execute and map the first row to `T`; an empty result set is
    /// [`DbError::NotFound`] carrying the rendered SQL.
    pub async fn fetch_one<T: FromRow>(&self, conn: &impl GenericClient) -> DbResult<T> {
        self.ensure_table()?;
        let (sql, values) = self.build();
        let row = conn.query_one(&sql, &as_params(&values)).await?;
        T::from_row(&row)
    }

    /// Fetch the first matching row with `LIMIT 1`.
    pub async fn first<T: FromRow>(&self, conn: &impl GenericClient) -> DbResult<T> {
        self.clone().limit(1).fetch_one(conn).await
    }

    /// Fetch a single row by its `id` column.
    pub async fn find<T: FromRow>(
        &self,
        id: impl Into<SqlValue>,
        conn: &impl GenericClient,
    ) -> DbResult<T> {
        self.clone().where_("id", "=", id).first(conn).await
    }

    /// Fetch the value of `column` from the first matching row.
    pub async fn value(&self, column: &str, conn: &impl GenericClient) -> DbResult<SqlValue> {
        self.ensure_table()?;
        let (sql, values) = self.clone().select(&[column]).limit(1).build();
        let row = conn.query_one(&sql, &as_params(&values)).await?;
        SqlValue::from_column(&row, 0)
    }

    /// Collect the values of one column across all matching rows.
    pub async fn pluck(&self, column: &str, conn: &impl GenericClient) -> DbResult<Vec<SqlValue>> {
        let rows = self.get(conn).await?;
        Ok(rows
            .into_iter()
            .map(|mut row| row.remove(column).unwrap_or(SqlValue::Null))
            .collect())
    }

    /// Collect `(key_column, value_column)` pairs across all matching rows.
    pub async fn pluck_map(
        &self,
        key_column: &str,
        value_column: &str,
        conn: &impl GenericClient,
    ) -> DbResult<Vec<(SqlValue, SqlValue)>> {
        let rows = self.get(conn).await?;
        Ok(rows
            .into_iter()
            .map(|mut row| {
                (
                    row.remove(key_column).unwrap_or(SqlValue::Null),
                    row.remove(value_column).unwrap_or(SqlValue::Null),
                )
            })
            .collect())
    }

    /// Execute and return the rows as a decoded stream.
    pub async fn stream<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> DbResult<FromRowStream<T>> {
        self.ensure_table()?;
        let (sql, values) = self.build();
        let rows = conn.query_stream(&sql, &as_params(&values)).await?;
        Ok(FromRowStream::new(rows))
    }

    /// Invoke `f` once per decoded row; return `false` from the callback to
    /// stop early.
    pub async fn each<T, F>(&self, conn: &impl GenericClient, mut f: F) -> DbResult<()>
    where
        T: FromRow,
        F: FnMut(T) -> bool,
    {
        let mut rows = self.stream::<T>(conn).await?;
        loop {
            match rows.next_row().await {
                Ok(item) => {
                    if !f(item) {
                        return Ok(());
                    }
                }
                Err(DbError::NoMoreRows) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Fetch matching rows in OFFSET/LIMIT windows of `size`, handing each
    /// fully-decoded chunk to `f`. Return `false` from the callback to stop
    /// before the next window.
    pub async fn chunk<T, F>(
        &self,
        size: i64,
        conn: &impl GenericClient,
        mut f: F,
    ) -> DbResult<()>
    where
        T: FromRow,
        F: FnMut(Vec<T>) -> bool,
    {
        self.ensure_table()?;
        if size <= 0 {
            return Err(DbError::InvalidChunkSize(size));
        }

        let total = self.count(conn).await?;
        if total <= size {
            let rows = self.fetch_all(conn).await?;
            f(rows);
            return Ok(());
        }

        let windows = (total + size - 1) / size;
        for window in 0..windows {
            let page = self.clone().offset(window * size).limit(size);
            let rows = page.fetch_all::<T>(conn).await?;
            if !f(rows) {
                break;
            }
        }
        Ok(())
    }

    // ==================== Aggregates ====================

    pub(crate) fn aggregate_sql(&self, expr: &str) -> (String, Vec<SqlValue>) {
        let mut qb = self.clone();
        qb.columns = vec![expr.to_string()];
        qb.order_by.clear();
        qb.order_by_raw = None;
        qb.limit = 0;
        qb.offset = 0;
        render::build_single_select(&qb, 0)
    }

    /// Count matching rows.
    pub async fn count(&self, conn: &impl GenericClient) -> DbResult<i64> {
        self.ensure_table()?;
        let (sql, values) = self.aggregate_sql("COUNT(*)");
        let row = conn.query_one(&sql, &as_params(&values)).await?;
        row.try_get(0).map_err(DbError::from)
    }

    async fn aggregate_f64(&self, expr: String, conn: &impl GenericClient) -> DbResult<f64> {
        self.ensure_table()?;
        let (sql, values) = self.aggregate_sql(&expr);
        let row = conn.query_one(&sql, &as_params(&values)).await?;
        row.try_get(0).map_err(DbError::from)
    }

    /// Average of `column` across matching rows.
    pub async fn avg(&self, column: &str, conn: &impl GenericClient) -> DbResult<f64> {
        // NUMERIC results will not decode into f64, so cast in SQL.
        self.aggregate_f64(format!("AVG({column})::double precision"), conn)
            .await
    }

    /// Minimum of `column` across matching rows.
    pub async fn min(&self, column: &str, conn: &impl GenericClient) -> DbResult<f64> {
        self.aggregate_f64(format!("MIN({column})::double precision"), conn)
            .await
    }

    /// Maximum of `column` across matching rows.
    pub async fn max(&self, column: &str, conn: &impl GenericClient) -> DbResult<f64> {
        self.aggregate_f64(format!("MAX({column})::double precision"), conn)
            .await
    }

    /// Sum of `column` across matching rows.
    pub async fn sum(&self, column: &str, conn: &impl GenericClient) -> DbResult<f64> {
        self.aggregate_f64(format!("SUM({column})::double precision"), conn)
            .await
    }

    /// Whether any row matches the accumulated clauses.
    pub async fn exists(&self, conn: &impl GenericClient) -> DbResult<bool> {
        self.ensure_table()?;
        let (clauses, values) = render::build_clauses(self, 0);
        let sql = format!("SELECT EXISTS(SELECT 1 FROM \"{}\"{clauses})", self.table);
        let row = conn.query_one(&sql, &as_params(&values)).await?;
        row.try_get(0).map_err(DbError::from)
    }

    /// Inverse of [`exists`](Self::exists).
    pub async fn doesnt_exist(&self, conn: &impl GenericClient) -> DbResult<bool> {
        Ok(!self.exists(conn).await?)
    }

    // ==================== Mutations ====================

    fn insert_parts(&self, data: &impl IntoRow) -> DbResult<(String, String, Vec<SqlValue>)> {
        let columns = data.columns();
        let values = data.values();
        if columns.is_empty() {
            return Err(DbError::validation("insert data has no columns"));
        }
        let bindings: Vec<String> = (1..=values.len()).map(|i| format!("${i}")).collect();
        Ok((columns.join(", "), bindings.join(", "), values))
    }

    pub(crate) fn insert_sql(&self, data: &impl IntoRow) -> DbResult<(String, Vec<SqlValue>)> {
        let (columns, bindings, values) = self.insert_parts(data)?;
        let sql = format!(
            "INSERT INTO \"{}\" ({columns}) VALUES({bindings})",
            self.table
        );
        Ok((sql, values))
    }

    /// Insert one row.
    pub async fn insert(&self, data: &impl IntoRow, conn: &impl GenericClient) -> DbResult<()> {
        self.ensure_table()?;
        let (sql, values) = self.insert_sql(data)?;
        conn.execute(&sql, &as_params(&values)).await?;
        Ok(())
    }

    /// Insert one row and return its generated `id`.
    pub async fn insert_get_id(
        &self,
        data: &impl IntoRow,
        conn: &impl GenericClient,
    ) -> DbResult<i64> {
        self.ensure_table()?;
        let (columns, bindings, values) = self.insert_parts(data)?;
        let sql = format!(
            "INSERT INTO \"{}\" ({columns}) VALUES({bindings}) RETURNING id",
            self.table
        );
        let row = conn.query_one(&sql, &as_params(&values)).await?;
        row.try_get(0).map_err(DbError::from)
    }

    /// Insert many rows through the COPY bulk-load path.
    ///
    /// The column list comes from the first element; every element must
    /// produce the same columns. The batch commits atomically on `finish`;
    /// any error aborts the whole COPY with nothing applied.
    pub async fn insert_batch<T: IntoRow>(
        &self,
        rows: &[T],
        conn: &impl GenericClient,
    ) -> DbResult<u64> {
        self.ensure_table()?;
        let Some(head) = rows.first() else {
            return Ok(0);
        };

        let columns = head.columns();
        let sql = format!(
            "COPY \"{}\" ({}) FROM STDIN",
            self.table,
            columns.join(", ")
        );
        let sink = conn.copy_in(&sql).await?;
        pin_mut!(sink);

        for row in rows {
            let values = row.values();
            if values.len() != columns.len() {
                return Err(DbError::validation(
                    "batch insert rows must share one column set",
                ));
            }
            let mut line = String::new();
            for (k, value) in values.iter().enumerate() {
                if k > 0 {
                    line.push('\t');
                }
                value.encode_copy_field(&mut line)?;
            }
            line.push('\n');
            sink.send(Bytes::from(line)).await?;
        }

        let inserted = sink.finish().await?;
        Ok(inserted)
    }

    pub(crate) fn update_sql(&self, data: &impl IntoRow) -> DbResult<(String, Vec<SqlValue>)> {
        let columns = data.columns();
        let mut values = data.values();
        if columns.is_empty() {
            return Err(DbError::validation("update data has no columns"));
        }

        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(k, column)| format!("{column} = ${}", k + 1))
            .collect();
        let mut sql = format!(
            "UPDATE \"{}\" SET {}",
            self.table,
            assignments.join(", ")
        );

        if let Some(from) = &self.from {
            sql.push_str(&format!(" FROM {from}"));
        }

        // SET placeholders occupy 1..=N; WHERE numbering continues at N+1.
        let (where_sql, where_values) = render::compose_where(self, columns.len() + 1);
        sql.push_str(&where_sql);
        values.extend(where_values);

        Ok((sql, values))
    }

    /// Update matching rows with the struct's columns; returns the affected
    /// row count. SET placeholders are numbered first, WHERE placeholders
    /// continue after them.
    pub async fn update(&self, data: &impl IntoRow, conn: &impl GenericClient) -> DbResult<u64> {
        self.ensure_table()?;
        let (sql, values) = self.update_sql(data)?;
        conn.execute(&sql, &as_params(&values)).await
    }

    /// Delete matching rows; returns the affected row count.
    pub async fn delete(&self, conn: &impl GenericClient) -> DbResult<u64> {
        self.ensure_table()?;
        let (where_sql, values) = render::compose_where(self, 1);
        let sql = format!("DELETE FROM \"{}\"{where_sql}", self.table);
        conn.execute(&sql, &as_params(&values)).await
    }

    /// Insert, or update the existing row on a `conflict_column` collision.
    pub async fn replace(
        &self,
        data: &impl IntoRow,
        conflict_column: &str,
        conn: &impl GenericClient,
    ) -> DbResult<u64> {
        self.ensure_table()?;
        let (columns, bindings, values) = self.insert_parts(data)?;
        let assignments: Vec<String> = data
            .columns()
            .iter()
            .map(|column| format!("{column} = excluded.{column}"))
            .collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({columns}) VALUES({bindings}) ON CONFLICT({conflict_column}) DO UPDATE SET {}",
            self.table,
            assignments.join(", ")
        );
        conn.execute(&sql, &as_params(&values)).await
    }

    /// Increase `column` by `amount` on matching rows.
    pub async fn increment(
        &self,
        column: &str,
        amount: u64,
        conn: &impl GenericClient,
    ) -> DbResult<u64> {
        self.incr_decr(column, '+', amount, conn).await
    }

    /// Decrease `column` by `amount` on matching rows.
    pub async fn decrement(
        &self,
        column: &str,
        amount: u64,
        conn: &impl GenericClient,
    ) -> DbResult<u64> {
        self.incr_decr(column, '-', amount, conn).await
    }

    async fn incr_decr(
        &self,
        column: &str,
        sign: char,
        amount: u64,
        conn: &impl GenericClient,
    ) -> DbResult<u64> {
        self.ensure_table()?;
        let (where_sql, values) = render::compose_where(self, 1);
        let sql = format!(
            "UPDATE \"{}\" SET {column} = {column} {sign} {amount}{where_sql}",
            self.table
        );
        conn.execute(&sql, &as_params(&values)).await
    }
}
