use std::collections::VecDeque;
use std::ffi::c_int;

use fastlite_core::{ColumnType, Error, Result};

use super::Value;
use crate::connection::Connection;
use crate::native::StatementHandle;
use crate::query::QueryReader;
use crate::retry::RetryPolicy;
use crate::status::{self, Status};

/// The statement currently being read.
struct Current {
    index: usize,
    /// Outcome of the step taken during execution, consumed by the first
    /// [`DataReader::read`].
    pending: Option<bool>,
    has_rows: bool,
    done: bool,
}

/// Forward-only reader over the row-producing statements of one execution.
///
/// Dropping the reader resets every statement it still holds so the owning
/// command can execute again.
pub struct DataReader<'r> {
    statements: &'r [StatementHandle],
    connection: &'r Connection,
    queue: VecDeque<(usize, bool)>,
    current: Option<Current>,
    records_affected: i64,
    policy: RetryPolicy,
}

impl<'r> DataReader<'r> {
    pub(crate) fn new(
        statements: &'r [StatementHandle],
        connection: &'r Connection,
        queue: VecDeque<(usize, bool)>,
        changes: Option<i64>,
        policy: RetryPolicy,
    ) -> Self {
        let mut reader = Self {
            statements,
            connection,
            queue,
            current: None,
            records_affected: changes.unwrap_or(-1),
            policy,
        };
        reader.advance();
        reader
    }

    /// Move to the next row of the current result. Returns false when there
    /// are no more rows.
    pub fn read(&mut self) -> Result<bool> {
        let Some(current) = self.current.as_mut() else {
            return Ok(false);
        };
        if let Some(has_row) = current.pending.take() {
            current.done = !has_row;
            return Ok(has_row);
        }
        if current.done {
            return Ok(false);
        }

        let statement = &self.statements[current.index];
        let code = self.policy.run(|| statement.step());
        match status::classify(code, Some(self.connection.handle())) {
            Ok(Status::Row) => Ok(true),
            Ok(_) => {
                current.done = true;
                Ok(false)
            }
            Err(e) => {
                current.done = true;
                Err(e)
            }
        }
    }

    /// Move to the next result. Returns false when there are none left.
    pub fn next_result(&mut self) -> bool {
        if let Some(current) = self.current.take() {
            self.statements[current.index].reset();
        }
        self.advance()
    }

    /// Whether the current result produced at least one row.
    pub fn has_rows(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.has_rows)
    }

    /// Rows changed by data-changing statements, or -1 when there were none.
    pub fn records_affected(&self) -> i64 {
        self.records_affected
    }

    /// Number of columns in the current result.
    pub fn field_count(&self) -> usize {
        self.current
            .as_ref()
            .map_or(0, |c| usize::try_from(self.statements[c.index].column_count()).unwrap_or(0))
    }

    pub fn column_name(&self, index: usize) -> Result<String> {
        let reader = self.row_reader(index)?;
        let column = column_index(index)?;
        reader
            .column_name(column)
            .map(str::to_owned)
            .ok_or_else(|| Error::invalid_operation(format!("column {index} has no name")))
    }

    pub fn column_type(&self, index: usize) -> Result<ColumnType> {
        let reader = self.row_reader(index)?;
        Ok(reader.column_type(column_index(index)?).unwrap_or(ColumnType::Null))
    }

    pub fn is_null(&self, index: usize) -> Result<bool> {
        Ok(self.column_type(index)? == ColumnType::Null)
    }

    /// Copy of the column value in its storage class.
    pub fn get_value(&self, index: usize) -> Result<Value> {
        let reader = self.row_reader(index)?;
        Ok(Value::read(&reader, column_index(index)?))
    }

    pub fn get_i64(&self, index: usize) -> Result<i64> {
        let reader = self.row_reader(index)?;
        Ok(reader.column_int64(column_index(index)?))
    }

    pub fn get_f64(&self, index: usize) -> Result<f64> {
        let reader = self.row_reader(index)?;
        Ok(reader.column_double(column_index(index)?))
    }

    pub fn get_string(&self, index: usize) -> Result<String> {
        let reader = self.row_reader(index)?;
        let bytes = reader.column_text(column_index(index)?);
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn get_blob(&self, index: usize) -> Result<Vec<u8>> {
        let reader = self.row_reader(index)?;
        Ok(reader.column_blob(column_index(index)?).to_vec())
    }

    fn advance(&mut self) -> bool {
        match self.queue.pop_front() {
            Some((index, has_row)) => {
                self.current = Some(Current {
                    index,
                    pending: Some(has_row),
                    has_rows: has_row,
                    done: false,
                });
                true
            }
            None => false,
        }
    }

    /// A column view, checking that `index` is in range for the current result.
    fn row_reader(&self, index: usize) -> Result<QueryReader<'_>> {
        let Some(current) = self.current.as_ref() else {
            return Err(Error::invalid_operation("no result is available"));
        };
        if index >= self.field_count() {
            return Err(Error::invalid_operation(format!(
                "column index {index} is out of range"
            )));
        }
        Ok(QueryReader::new(
            &self.statements[current.index],
            self.connection.handle(),
        ))
    }
}

impl Drop for DataReader<'_> {
    fn drop(&mut self) {
        if let Some(current) = self.current.take() {
            self.statements[current.index].reset();
        }
        for (index, _) in self.queue.drain(..) {
            self.statements[index].reset();
        }
    }
}

fn column_index(index: usize) -> Result<c_int> {
    c_int::try_from(index).map_err(|_| Error::invalid_operation("column index is too large"))
}
