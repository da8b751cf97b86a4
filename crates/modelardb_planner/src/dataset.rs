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

//! Implementation of [`Dataset`] which is the entry point for executing requests. A dataset builds
//! a plan for each request using its [`StorageQueryPlanBuilder`] and executes it.

use std::time::Instant;

use modelardb_types::request::Request;
use modelardb_types::result::RawQueryResult;
use tracing::info;

use crate::error::Result;
use crate::plan::StorageQueryPlanBuilder;
use crate::runner::QueryRunner;

/// A named set of data that requests can be executed against.
pub struct Dataset {
    name: String,
    plan_builder: Box<dyn StorageQueryPlanBuilder>,
}

impl Dataset {
    pub fn new(name: &str, plan_builder: Box<dyn StorageQueryPlanBuilder>) -> Self {
        Self {
            name: name.to_owned(),
            plan_builder,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a plan for `request` and execute it using `runner`. If the plan cannot be built or
    /// executed, [`ModelarDbPlannerError`](crate::error::ModelarDbPlannerError) is returned.
    pub async fn execute_query(
        &self,
        mut request: Request,
        runner: &dyn QueryRunner,
    ) -> Result<RawQueryResult> {
        let start_time = Instant::now();

        let plan = self.plan_builder.build_plan(&mut request)?;
        let result = plan.execute(request, runner).await?;

        info!(
            "Executed query against dataset '{}' returning {} rows in {} ms.",
            self.name,
            result.num_rows(),
            start_time.elapsed().as_millis()
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use modelardb_test::T0;
    use modelardb_types::query::Query;
    use modelardb_types::request::RequestSettings;

    use crate::error::ModelarDbPlannerError;
    use crate::plan::single_storage::{
        SelectedStorageQueryPlanBuilder, SingleStorageQueryPlanBuilder,
    };
    use crate::storage::selectors::ReadonlyStorageSelector;
    use crate::storage::{StorageKey, StorageRegistry};
    use crate::test::{self, FailingQueryRunner};

    // Tests for Dataset.
    #[tokio::test]
    async fn test_execute_query() {
        let dataset = events_dataset();
        let runner = test::events_runner(&[T0, T0 + 1, T0 + 2]);
        let request = Request::new(Query::new(&["event_id"]).with_limit(2), RequestSettings::default());

        let result = dataset.execute_query(request, &runner).await.unwrap();

        assert_eq!(dataset.name(), "events");
        assert_eq!(result.num_rows(), 2);
    }

    #[tokio::test]
    async fn test_execute_query_propagates_runner_error() {
        let dataset = events_dataset();
        let request = Request::new(Query::new(&["event_id"]), RequestSettings::default());

        let result = dataset.execute_query(request, &FailingQueryRunner).await;

        assert!(matches!(result, Err(ModelarDbPlannerError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_execute_query_with_unregistered_storage() {
        let configuration_manager = test::configuration(0);
        configuration_manager.set_config(crate::configuration::USE_READONLY_STORAGE, 1);

        let storage_selector = ReadonlyStorageSelector::new(
            StorageKey::new(test::EVENTS_STORAGE),
            StorageKey::new("events_ro"),
            configuration_manager,
        );

        let mut storage_registry = StorageRegistry::new();
        storage_registry.register(test::events_storage());

        let plan_builder =
            SelectedStorageQueryPlanBuilder::new(Box::new(storage_selector), storage_registry, vec![]);
        let dataset = Dataset::new("events", Box::new(plan_builder));

        let runner = test::events_runner(&[T0]);
        let request = Request::new(Query::new(&["event_id"]), RequestSettings::default());

        let result = dataset.execute_query(request, &runner).await;

        assert!(matches!(result, Err(ModelarDbPlannerError::Configuration(_))));
    }

    fn events_dataset() -> Dataset {
        let plan_builder = SingleStorageQueryPlanBuilder::new(test::events_storage(), vec![]);
        Dataset::new("events", Box::new(plan_builder))
    }
}
