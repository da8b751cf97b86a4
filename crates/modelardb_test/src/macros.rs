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

//! Implementation of macros for down-casting the Apache Arrow arrays in the results the tests read.

/// Down-cast `expr`, an [`Array`](arrow::array::Array) or [`ArrayRef`](arrow::array::ArrayRef),
/// to the concrete array type `type`:
///
/// ```
/// # use std::sync::Arc;
/// #
/// # use arrow::array::{ArrayRef, StringArray};
/// #
/// # let array_ref: ArrayRef = Arc::new(StringArray::from(vec!["event_0"]));
/// let event_ids = modelardb_test::cast!(array_ref, StringArray);
/// assert_eq!(event_ids.value(0), "event_0");
/// ```
///
/// # Panics
///
/// Panics if `expr` is not a `type`.
#[macro_export]
macro_rules! cast {
    ($expr:expr, $type:ident) => {
        $expr.as_any().downcast_ref::<$type>().unwrap()
    };
}

/// Down-cast the column at `index` in `batch`, a [`RecordBatch`](arrow::record_batch::RecordBatch)
/// such as the data of a query result, to the concrete array type `type`:
///
/// ```
/// # use arrow::array::StringArray;
/// #
/// # let record_batch = modelardb_test::events_record_batch(&[modelardb_test::T0]);
/// let event_ids = modelardb_test::array!(record_batch, 0, StringArray);
/// assert_eq!(event_ids.value(0), "event_0");
/// ```
///
/// # Panics
///
/// Panics if `index` is not in `batch` or if the column is not a `type`.
#[macro_export]
macro_rules! array {
    ($batch:expr, $index:expr, $type:ident) => {
        $crate::cast!($batch.column($index), $type)
    };
}
