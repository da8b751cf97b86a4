/* Copyright 2025 The ModelarDB Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Implementation of [`RawQueryResult`] which contains the rows returned by the store for a query.

use arrow::compute;
use arrow::record_batch::RecordBatch;

use crate::error::Result;

/// The rows returned by the store for a query in the order the store returned them.
#[derive(Clone, Debug, PartialEq)]
pub struct RawQueryResult {
    pub data: RecordBatch,
}

impl RawQueryResult {
    pub fn new(data: RecordBatch) -> Self {
        Self { data }
    }

    pub fn num_rows(&self) -> usize {
        self.data.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.num_rows() == 0
    }

    /// Append the rows in `other` after the rows in `self`. If the schemas of the results do not
    /// match, [`ModelarDbTypesError`](crate::error::ModelarDbTypesError) is returned.
    pub fn append(&mut self, other: RawQueryResult) -> Result<()> {
        self.data = compute::concat_batches(&self.data.schema(), [&self.data, &other.data])?;
        Ok(())
    }

    /// Remove up to `rows` rows from the front of the result and return how many were removed.
    pub fn trim_front(&mut self, rows: usize) -> usize {
        let to_trim = rows.min(self.data.num_rows());
        self.data = self.data.slice(to_trim, self.data.num_rows() - to_trim);
        to_trim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use arrow::array::{AsArray, Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Int64Type, Schema};

    // Tests for RawQueryResult.
    #[test]
    fn test_append_preserves_order() {
        let mut result = raw_query_result(&[3, 2]);
        result.append(raw_query_result(&[1])).unwrap();

        let values = result.data.column(0).as_primitive::<Int64Type>();
        assert_eq!(values.values().to_vec(), vec![3, 2, 1]);
    }

    #[test]
    fn test_append_with_different_schema() {
        let schema = Arc::new(Schema::new(vec![Field::new("name", DataType::Utf8, false)]));
        let other = RawQueryResult::new(
            RecordBatch::try_new(schema, vec![Arc::new(StringArray::from(vec!["a"]))]).unwrap(),
        );

        let mut result = raw_query_result(&[1]);
        assert!(result.append(other).is_err());
    }

    #[test]
    fn test_trim_front() {
        let mut result = raw_query_result(&[3, 2, 1]);

        assert_eq!(result.trim_front(2), 2);

        let values = result.data.column(0).as_primitive::<Int64Type>();
        assert_eq!(values.values().to_vec(), vec![1]);
    }

    #[test]
    fn test_trim_front_more_than_available() {
        let mut result = raw_query_result(&[3, 2, 1]);

        assert_eq!(result.trim_front(5), 3);
        assert!(result.is_empty());
    }

    fn raw_query_result(values: &[i64]) -> RawQueryResult {
        let schema = Arc::new(Schema::new(vec![Field::new("value", DataType::Int64, false)]));
        let values = Int64Array::from(values.to_vec());
        RawQueryResult::new(RecordBatch::try_new(schema, vec![Arc::new(values)]).unwrap())
    }
}
