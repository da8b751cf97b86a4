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

//! Implementation of constants and functions used throughout the tests of the planner: an events
//! table that the queries are executed against and requests for it.

pub mod macros;

use std::sync::{Arc, LazyLock};

use arrow::array::{StringArray, UInt8Array, UInt64Array};
use arrow::datatypes::{ArrowPrimitiveType, DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use modelardb_types::functions;
use modelardb_types::query::{Condition, ConditionOperator, Literal, OrderBy, Query};
use modelardb_types::request::{FROM_DATE, Request, RequestSettings, TIMESERIES_EXTENSION, TO_DATE};
use modelardb_types::types::{ArrowTimestamp, Timestamp, TimestampArray};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Name of the events table registered by [`session_context_with_events()`].
pub const EVENTS_TABLE_NAME: &str = "events_local";

/// 2025-01-01T00:00:00Z as microseconds since the Unix epoch.
pub const T0: Timestamp = 1_735_689_600 * SECOND_IN_MICROSECONDS;

pub const SECOND_IN_MICROSECONDS: Timestamp = 1_000_000;

pub const HOUR_IN_MICROSECONDS: Timestamp = 3600 * SECOND_IN_MICROSECONDS;

/// Schema of the events table. `event_id` and `payload` are unique per event while `project_id`
/// cycles through 1, 2, and 3.
pub static EVENTS_SCHEMA: LazyLock<SchemaRef> = LazyLock::new(|| {
    Arc::new(Schema::new(vec![
        Field::new("event_id", DataType::Utf8, false),
        Field::new("project_id", DataType::UInt64, false),
        Field::new("timestamp", ArrowTimestamp::DATA_TYPE, false),
        Field::new("message", DataType::Utf8, false),
        Field::new("payload", DataType::Utf8, false),
        Field::new("deleted", DataType::UInt8, false),
    ]))
});

/// Return a [`RecordBatch`] with [`EVENTS_SCHEMA`] containing an event for each timestamp in
/// `timestamps`. The event at index `i` has the id `event_i`.
pub fn events_record_batch(timestamps: &[Timestamp]) -> RecordBatch {
    let length = timestamps.len();

    let event_ids = StringArray::from_iter_values((0..length).map(|index| format!("event_{index}")));
    let project_ids = UInt64Array::from_iter_values((0..length).map(|index| index as u64 % 3 + 1));
    let messages =
        StringArray::from_iter_values((0..length).map(|index| format!("message_{index}")));
    let payloads =
        StringArray::from_iter_values((0..length).map(|index| format!("payload_{index}")));

    RecordBatch::try_new(
        EVENTS_SCHEMA.clone(),
        vec![
            Arc::new(event_ids),
            Arc::new(project_ids),
            Arc::new(TimestampArray::from(timestamps.to_vec())),
            Arc::new(messages),
            Arc::new(payloads),
            Arc::new(UInt8Array::from(vec![0_u8; length])),
        ],
    )
    .unwrap()
}

/// Return a [`SessionContext`] with `record_batch` registered as [`EVENTS_TABLE_NAME`].
pub fn session_context_with_events(record_batch: RecordBatch) -> SessionContext {
    let mem_table = MemTable::try_new(record_batch.schema(), vec![vec![record_batch]]).unwrap();

    let session_context = SessionContext::new();
    session_context
        .register_table(EVENTS_TABLE_NAME, Arc::new(mem_table))
        .unwrap();

    session_context
}

/// Return a request for `columns` in the events table without conditions.
pub fn events_request(columns: &[&str]) -> Request {
    let mut query = Query::new(columns);
    query.set_data_source(EVENTS_TABLE_NAME);

    Request::new(query, RequestSettings::default())
}

/// Return a request for the most recent events in `[from_date, to_date)` with the time range in
/// both the conditions and the time range extension.
pub fn recent_events_request(
    columns: &[&str],
    from_date: Timestamp,
    to_date: Timestamp,
    limit: usize,
    offset: usize,
) -> Request {
    let query = Query::new(columns)
        .with_conditions(vec![
            Condition::comparison(
                "timestamp",
                ConditionOperator::GtEq,
                functions::timestamp_to_scalar(from_date),
            ),
            Condition::comparison(
                "timestamp",
                ConditionOperator::Lt,
                functions::timestamp_to_scalar(to_date),
            ),
        ])
        .with_order_by(vec![OrderBy::descending("timestamp")])
        .with_limit(limit)
        .with_offset(offset);

    Request::new(query, RequestSettings::default())
        .with_extension(
            TIMESERIES_EXTENSION,
            FROM_DATE,
            Literal::Scalar(functions::timestamp_to_scalar(from_date)),
        )
        .with_extension(
            TIMESERIES_EXTENSION,
            TO_DATE,
            Literal::Scalar(functions::timestamp_to_scalar(to_date)),
        )
}

/// Write the output of `tracing` to the output captured by the test harness. Only the first call
/// installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
