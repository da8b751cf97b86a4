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

//! Split strategies that decompose a query into multiple cheaper queries whose results are merged
//! into the result of the original query, and [`SplitExecutionStrategy`] which tries a list of
//! split strategies in order before falling back to executing the query directly.

pub mod column;
pub mod time;

use std::sync::Arc;

use async_trait::async_trait;
use modelardb_types::query::Query;
use modelardb_types::request::Request;
use modelardb_types::result::RawQueryResult;
use tracing::debug;

use crate::configuration::{ConfigurationProvider, USE_SPLIT};
use crate::error::Result;
use crate::plan::QueryPlanExecutionStrategy;
use crate::runner::QueryRunner;

/// An algorithm that executes a request using multiple queries. Split strategies only read the
/// request they are given and pass clones of it to the [`QueryRunner`].
#[async_trait]
pub trait SplitStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Return [`true`] if the strategy can be used to execute `request`. Must not have side
    /// effects.
    fn can_execute(&self, request: &Request) -> bool;

    /// Execute `request` using multiple queries. Returns [`None`] if it turns out the strategy is
    /// not applicable after all, e.g., if the time range of `request` is empty once aligned.
    async fn run_split(
        &self,
        request: &Request,
        runner: &dyn QueryRunner,
    ) -> Result<Option<RawQueryResult>>;

    /// Execute `request` with the strategy if [`SplitStrategy::can_execute()`] returns [`true`],
    /// otherwise return [`None`] without executing any queries.
    async fn execute(
        &self,
        request: &Request,
        runner: &dyn QueryRunner,
    ) -> Result<Option<RawQueryResult>> {
        if self.can_execute(request) {
            self.run_split(request, runner).await
        } else {
            Ok(None)
        }
    }
}

/// Return [`true`] if splitting is enabled and `query` can be split at all. A query can only be
/// split if it has a positive limit and is not grouped, as the results of partial aggregates
/// cannot be concatenated.
pub fn is_query_splittable(query: &Query, configuration: &dyn ConfigurationProvider) -> bool {
    configuration.get_config(USE_SPLIT, 0) > 0
        && query.limit().is_some_and(|limit| limit > 0)
        && query.group_by().is_empty()
}

/// Tries each split strategy in order and returns the result of the first one that is applicable.
/// If none of them are, the request is executed by the default strategy.
pub struct SplitExecutionStrategy {
    split_strategies: Vec<Arc<dyn SplitStrategy>>,
    default_strategy: Arc<dyn QueryPlanExecutionStrategy>,
}

impl SplitExecutionStrategy {
    pub fn new(
        split_strategies: Vec<Arc<dyn SplitStrategy>>,
        default_strategy: Arc<dyn QueryPlanExecutionStrategy>,
    ) -> Self {
        Self {
            split_strategies,
            default_strategy,
        }
    }
}

#[async_trait]
impl QueryPlanExecutionStrategy for SplitExecutionStrategy {
    async fn execute(
        &self,
        request: Request,
        runner: &dyn QueryRunner,
    ) -> Result<RawQueryResult> {
        for split_strategy in &self.split_strategies {
            if let Some(result) = split_strategy.execute(&request, runner).await? {
                debug!(
                    "Executed query using {} and returned {} rows.",
                    split_strategy.name(),
                    result.num_rows()
                );

                return Ok(result);
            }
        }

        self.default_strategy.execute(request, runner).await
    }
}
