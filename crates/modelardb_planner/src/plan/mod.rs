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

//! Storage query plans that pair the processors that must be applied to a query with the strategy
//! used to execute it. A plan is built for each request by a [`StorageQueryPlanBuilder`] and is
//! not reused, as the processors and strategies may depend on configuration read per request.

pub mod single_storage;

use std::sync::Arc;

use async_trait::async_trait;
use modelardb_types::request::Request;
use modelardb_types::result::RawQueryResult;
use tracing::debug;

use crate::error::Result;
use crate::runner::QueryRunner;
use crate::storage::processors::QueryProcessor;

/// Executes a request that the processors of a [`StorageQueryPlan`] have been applied to. The
/// request is owned by the strategy, so the caller's request can never be modified by it.
#[async_trait]
pub trait QueryPlanExecutionStrategy: Send + Sync {
    async fn execute(
        &self,
        request: Request,
        runner: &dyn QueryRunner,
    ) -> Result<RawQueryResult>;
}

/// The output of a [`StorageQueryPlanBuilder`].
pub struct StorageQueryPlan {
    /// Processors applied to the query in order before it is executed.
    query_processors: Vec<Arc<dyn QueryProcessor>>,
    execution_strategy: Arc<dyn QueryPlanExecutionStrategy>,
}

impl StorageQueryPlan {
    pub fn new(
        query_processors: Vec<Arc<dyn QueryProcessor>>,
        execution_strategy: Arc<dyn QueryPlanExecutionStrategy>,
    ) -> Self {
        Self {
            query_processors,
            execution_strategy,
        }
    }

    pub fn query_processors(&self) -> &[Arc<dyn QueryProcessor>] {
        &self.query_processors
    }

    pub fn execution_strategy(&self) -> &Arc<dyn QueryPlanExecutionStrategy> {
        &self.execution_strategy
    }

    /// Apply the processors to the query in `request` and execute it using the execution
    /// strategy. If a processor or the strategy fails, [`ModelarDbPlannerError`] is returned.
    ///
    /// [`ModelarDbPlannerError`]: crate::error::ModelarDbPlannerError
    pub async fn execute(
        &self,
        mut request: Request,
        runner: &dyn QueryRunner,
    ) -> Result<RawQueryResult> {
        for query_processor in &self.query_processors {
            debug!("Applying {}.", query_processor.name());
            query_processor.process_query(&mut request.query, &request.settings)?;
        }

        self.execution_strategy.execute(request, runner).await
    }
}

/// Maps a request to a [`StorageQueryPlan`].
pub trait StorageQueryPlanBuilder: Send + Sync {
    /// Set the data source of the query in `request` and return the plan it must be executed with.
    fn build_plan(&self, request: &mut Request) -> Result<StorageQueryPlan>;
}
