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

//! Plan builders for datasets that are read from a single storage, either a fixed storage or a
//! storage chosen per query by a [`QueryStorageSelector`].

use std::sync::Arc;

use async_trait::async_trait;
use modelardb_types::request::Request;
use modelardb_types::result::RawQueryResult;
use tracing::debug;

use crate::error::Result;
use crate::plan::{QueryPlanExecutionStrategy, StorageQueryPlan, StorageQueryPlanBuilder};
use crate::runner::QueryRunner;
use crate::split::{SplitExecutionStrategy, SplitStrategy};
use crate::storage::processors::QueryProcessor;
use crate::storage::selectors::QueryStorageSelector;
use crate::storage::{ReadableStorage, StorageRegistry};

/// Executes a request with a single call to the [`QueryRunner`].
pub struct SimpleQueryPlanExecutionStrategy;

#[async_trait]
impl QueryPlanExecutionStrategy for SimpleQueryPlanExecutionStrategy {
    async fn execute(
        &self,
        mut request: Request,
        runner: &dyn QueryRunner,
    ) -> Result<RawQueryResult> {
        runner.run(&mut request).await
    }
}

/// Return the strategy that executes requests directly if `split_strategies` is empty, otherwise
/// a [`SplitExecutionStrategy`] that tries `split_strategies` first.
fn execution_strategy(
    split_strategies: &[Arc<dyn SplitStrategy>],
) -> Arc<dyn QueryPlanExecutionStrategy> {
    if split_strategies.is_empty() {
        Arc::new(SimpleQueryPlanExecutionStrategy)
    } else {
        Arc::new(SplitExecutionStrategy::new(
            split_strategies.to_vec(),
            Arc::new(SimpleQueryPlanExecutionStrategy),
        ))
    }
}

/// Builds plans that read from `storage`.
pub struct SingleStorageQueryPlanBuilder {
    storage: Arc<dyn ReadableStorage>,
    /// Processors of the dataset applied after the processors of the storage.
    post_processors: Vec<Arc<dyn QueryProcessor>>,
    split_strategies: Vec<Arc<dyn SplitStrategy>>,
}

impl SingleStorageQueryPlanBuilder {
    pub fn new(
        storage: Arc<dyn ReadableStorage>,
        post_processors: Vec<Arc<dyn QueryProcessor>>,
    ) -> Self {
        Self {
            storage,
            post_processors,
            split_strategies: vec![],
        }
    }

    /// Return the builder with split strategies that are tried in order when executing a plan.
    pub fn with_split_strategies(mut self, split_strategies: Vec<Arc<dyn SplitStrategy>>) -> Self {
        self.split_strategies = split_strategies;
        self
    }
}

impl StorageQueryPlanBuilder for SingleStorageQueryPlanBuilder {
    fn build_plan(&self, request: &mut Request) -> Result<StorageQueryPlan> {
        let read_schema = self.storage.read_schema();
        request.query.set_data_source(read_schema.data_source());

        // The processors of the storage are applied first so they are also applied when the
        // storage is used in other contexts than this dataset.
        let mut query_processors = self.storage.query_processors();
        query_processors.extend(self.post_processors.iter().cloned());

        debug!(
            "Built plan for storage '{}' with {} processors and {} split strategies.",
            self.storage.storage_key(),
            query_processors.len(),
            self.split_strategies.len()
        );

        Ok(StorageQueryPlan::new(
            query_processors,
            execution_strategy(&self.split_strategies),
        ))
    }
}

/// Builds plans that read from the storage in `storage_registry` chosen by `storage_selector`.
pub struct SelectedStorageQueryPlanBuilder {
    storage_selector: Box<dyn QueryStorageSelector>,
    storage_registry: StorageRegistry,
    post_processors: Vec<Arc<dyn QueryProcessor>>,
    split_strategies: Vec<Arc<dyn SplitStrategy>>,
}

impl SelectedStorageQueryPlanBuilder {
    pub fn new(
        storage_selector: Box<dyn QueryStorageSelector>,
        storage_registry: StorageRegistry,
        post_processors: Vec<Arc<dyn QueryProcessor>>,
    ) -> Self {
        Self {
            storage_selector,
            storage_registry,
            post_processors,
            split_strategies: vec![],
        }
    }

    /// Return the builder with split strategies that are tried in order when executing a plan.
    pub fn with_split_strategies(mut self, split_strategies: Vec<Arc<dyn SplitStrategy>>) -> Self {
        self.split_strategies = split_strategies;
        self
    }
}

impl StorageQueryPlanBuilder for SelectedStorageQueryPlanBuilder {
    fn build_plan(&self, request: &mut Request) -> Result<StorageQueryPlan> {
        let storage_key = self
            .storage_selector
            .select_storage(&request.query, &request.settings);
        let storage = self.storage_registry.get_storage(&storage_key)?;

        SingleStorageQueryPlanBuilder::new(storage, self.post_processors.clone())
            .with_split_strategies(self.split_strategies.clone())
            .build_plan(request)
    }
}
