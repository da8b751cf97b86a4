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

//! Implementation of [`TimeSplitQueryStrategy`] which executes queries that return the most recent
//! rows in a large time range by querying increasingly larger time ranges backwards from the end
//! of the time range until enough rows have been collected. This avoids sorting all rows in the
//! time range when the requested rows are among the most recent.

use std::sync::Arc;

use async_trait::async_trait;
use modelardb_types::functions;
use modelardb_types::query::{ConditionOperator, Literal, Query, SortDirection};
use modelardb_types::request::Request;
use modelardb_types::result::RawQueryResult;
use modelardb_types::types::{MICROSECONDS_PER_SECOND, Timestamp};
use tracing::debug;

use crate::configuration::{self, ConfigurationProvider, DATE_ALIGN_SECONDS, SPLIT_STEP};
use crate::error::{ModelarDbPlannerError, Result};
use crate::runner::QueryRunner;
use crate::split::{self, SplitStrategy};

/// Queries with an offset of this size or larger are not split as most of the rows in the time
/// range have to be read anyway.
const MAX_OFFSET: usize = 1000;

/// Factor the time range is multiplied with when a query returns no rows.
const STEP_GROWTH: i64 = 10;

/// Default size in seconds of the first time range queried.
const DEFAULT_SPLIT_STEP: i64 = 3600;

/// Default number of seconds the time range of a query is aligned to.
const DEFAULT_DATE_ALIGN_SECONDS: i64 = 1;

/// Splits queries ordered by `timestamp_column` in descending order into queries for consecutive
/// time ranges, starting from the end of the time range of the query.
pub struct TimeSplitQueryStrategy {
    timestamp_column: String,
    configuration: Arc<dyn ConfigurationProvider>,
}

impl TimeSplitQueryStrategy {
    pub fn new(timestamp_column: &str, configuration: Arc<dyn ConfigurationProvider>) -> Self {
        Self {
            timestamp_column: timestamp_column.to_owned(),
            configuration,
        }
    }

    /// Return [`true`] if `query` has a condition with `operator` on the timestamp column.
    fn has_time_bound(&self, query: &Query, operator: ConditionOperator) -> bool {
        matches!(
            query.find_condition(&self.timestamp_column, operator),
            Some(Literal::Scalar(_))
        )
    }

    /// Return the value of the condition with `operator` on the timestamp column. If the
    /// condition does not exist or its value is not a timestamp, [`ModelarDbPlannerError`] is
    /// returned.
    fn time_bound(&self, query: &Query, operator: ConditionOperator) -> Result<Timestamp> {
        match query.find_condition(&self.timestamp_column, operator) {
            Some(Literal::Scalar(value)) => Ok(functions::timestamp_from_scalar(value)?),
            _ => Err(ModelarDbPlannerError::InvalidArgument(format!(
                "The query has no {} {operator} condition.",
                self.timestamp_column
            ))),
        }
    }

    /// Return a copy of `request` restricted to `[split_start, split_end)` that returns up to
    /// `limit` rows from the start of the time range.
    fn split_request(
        &self,
        request: &Request,
        split_start: Timestamp,
        split_end: Timestamp,
        limit: usize,
    ) -> Request {
        let mut split_request = request.clone();

        split_request.query.replace_condition(
            &self.timestamp_column,
            ConditionOperator::GtEq,
            Literal::Scalar(functions::timestamp_to_scalar(split_start)),
        );
        split_request.query.replace_condition(
            &self.timestamp_column,
            ConditionOperator::Lt,
            Literal::Scalar(functions::timestamp_to_scalar(split_end)),
        );
        split_request.mirror_time_range(split_start, split_end);

        // The offset is applied to the merged result as it is unknown which time range the first
        // rows after the offset are in.
        split_request.query.set_offset(0);
        split_request.query.set_limit(limit);

        split_request
    }
}

#[async_trait]
impl SplitStrategy for TimeSplitQueryStrategy {
    fn name(&self) -> &str {
        "TimeSplitQueryStrategy"
    }

    fn can_execute(&self, request: &Request) -> bool {
        let query = &request.query;

        split::is_query_splittable(query, &*self.configuration)
            && query.is_ordered_by(&self.timestamp_column, SortDirection::Descending)
            && self.has_time_bound(query, ConditionOperator::GtEq)
            && self.has_time_bound(query, ConditionOperator::Lt)
            && query.offset() < MAX_OFFSET
    }

    async fn run_split(
        &self,
        request: &Request,
        runner: &dyn QueryRunner,
    ) -> Result<Option<RawQueryResult>> {
        let query = &request.query;
        let Some(limit) = query.limit() else {
            return Ok(None);
        };

        let date_align_seconds = configuration::get_positive_config(
            &*self.configuration,
            DATE_ALIGN_SECONDS,
            DEFAULT_DATE_ALIGN_SECONDS,
        )?;
        let split_step =
            configuration::get_positive_config(&*self.configuration, SPLIT_STEP, DEFAULT_SPLIT_STEP)?;

        // The bounds of the query are used as is so the split returns the same rows as the query.
        let from_date = self.time_bound(query, ConditionOperator::GtEq)?;
        let to_date = self.time_bound(query, ConditionOperator::Lt)?;

        if from_date >= to_date {
            debug!("Time range [{from_date}, {to_date}) is empty so the query is not split.");
            return Ok(None);
        }

        let mut remaining_offset = query.offset();
        let mut window = split_step.saturating_mul(MICROSECONDS_PER_SECOND);
        let mut split_end = to_date;
        let mut split_start = next_split_start(split_end, window, from_date, date_align_seconds);

        let mut overall_result: Option<RawQueryResult> = None;
        let mut total_rows = 0;

        while split_start < split_end && total_rows < limit {
            let mut split_request = self.split_request(
                request,
                split_start,
                split_end,
                (limit - total_rows).saturating_add(remaining_offset),
            );

            let result = runner.run(&mut split_request).await?;
            let split_rows = result.num_rows();

            debug!("Time range [{split_start}, {split_end}) returned {split_rows} rows.");

            let mut merged_result = match overall_result.take() {
                Some(mut merged_result) => {
                    merged_result.append(result)?;
                    merged_result
                }
                None => result,
            };

            if remaining_offset > 0 {
                remaining_offset -= merged_result.trim_front(remaining_offset);
            }

            total_rows = merged_result.num_rows();
            overall_result = Some(merged_result);

            if total_rows < limit {
                window = next_window(window, split_rows, limit - total_rows);
                split_end = split_start;
                split_start =
                    next_split_start(split_end, window, from_date, date_align_seconds);
            }
        }

        Ok(overall_result)
    }
}

/// Return the size of the next time range based on the number of rows returned for the previous
/// time range of size `window` and the number of rows that are still missing.
fn next_window(window: i64, split_rows: usize, missing_rows: usize) -> i64 {
    if split_rows == 0 {
        window.saturating_mul(STEP_GROWTH)
    } else {
        // Assumes the rows are evenly distributed in the time range.
        let factor = i64::try_from(missing_rows.div_ceil(split_rows)).unwrap_or(i64::MAX);
        window.saturating_mul(factor)
    }
}

/// Return the start of the time range ending at `split_end` of size `window`, aligned down to a
/// multiple of `date_align_seconds`. The start is never before `from_date`, also if it cannot be
/// represented.
fn next_split_start(
    split_end: Timestamp,
    window: i64,
    from_date: Timestamp,
    date_align_seconds: i64,
) -> Timestamp {
    split_end
        .checked_sub(window)
        .and_then(|split_start| functions::align_timestamp(split_start, date_align_seconds).ok())
        .map_or(from_date, |split_start| split_start.max(from_date))
}
