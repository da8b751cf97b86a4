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

//! Query processors that transform a [`Query`] after a storage has been selected and before it is
//! executed. The processors are applied in the order given by the
//! [`StorageQueryPlan`](crate::plan::StorageQueryPlan).

use std::collections::BTreeSet;

use arrow::datatypes::SchemaRef;
use modelardb_types::query::{Condition, Query};
use modelardb_types::request::RequestSettings;

use crate::error::{ModelarDbPlannerError, Result};

/// A transformation of a [`Query`] applied before it is executed.
pub trait QueryProcessor: Send + Sync {
    fn name(&self) -> &str;

    fn process_query(&self, query: &mut Query, settings: &RequestSettings) -> Result<()>;
}

/// Adds the mandatory conditions of a storage to a query, e.g., `deleted = 0`.
pub struct MandatoryConditionProcessor {
    mandatory_conditions: Vec<Condition>,
}

impl MandatoryConditionProcessor {
    pub fn new(mandatory_conditions: Vec<Condition>) -> Self {
        Self {
            mandatory_conditions,
        }
    }
}

impl QueryProcessor for MandatoryConditionProcessor {
    fn name(&self) -> &str {
        "MandatoryConditionProcessor"
    }

    fn process_query(&self, query: &mut Query, _settings: &RequestSettings) -> Result<()> {
        let missing_conditions: Vec<Condition> = self
            .mandatory_conditions
            .iter()
            .filter(|condition| !query.conditions().contains(condition))
            .cloned()
            .collect();

        query.add_conditions(missing_conditions);
        Ok(())
    }
}

/// Rejects queries that reference columns that are not in the schema of the storage, so the
/// error is reported before any query is sent to the store.
pub struct ColumnValidationProcessor {
    schema: SchemaRef,
}

impl ColumnValidationProcessor {
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }
}

impl QueryProcessor for ColumnValidationProcessor {
    fn name(&self) -> &str {
        "ColumnValidationProcessor"
    }

    fn process_query(&self, query: &mut Query, _settings: &RequestSettings) -> Result<()> {
        // The ordering may refer to the output of an aggregate.
        let aliases: BTreeSet<&str> = query
            .aggregations()
            .iter()
            .map(|aggregation| aggregation.alias.as_str())
            .collect();

        let unknown_columns: Vec<String> = query
            .all_referenced_columns()
            .into_iter()
            .filter(|column| {
                self.schema.field_with_name(column).is_err() && !aliases.contains(column.as_str())
            })
            .collect();

        if unknown_columns.is_empty() {
            Ok(())
        } else {
            Err(ModelarDbPlannerError::InvalidArgument(format!(
                "The columns {} do not exist.",
                unknown_columns.join(", ")
            )))
        }
    }
}
