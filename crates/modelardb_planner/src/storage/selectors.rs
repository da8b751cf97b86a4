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

//! Storage selectors that decide which of the storages of a dataset a query is executed against.
//! A selector only returns a [`StorageKey`], so the rest of the pipeline does not depend on which
//! storage is selected or why.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use modelardb_types::query::Query;
use modelardb_types::request::RequestSettings;
use tracing::debug;

use crate::configuration::{ConfigurationProvider, USE_READONLY_STORAGE};
use crate::storage::StorageKey;

/// Selects the storage to execute a query against. The selection must only depend on `query` and
/// `settings`.
pub trait QueryStorageSelector: Send + Sync {
    fn select_storage(&self, query: &Query, settings: &RequestSettings) -> StorageKey;
}

/// Selects a materialized storage, e.g., an hourly rollup of the raw data, if it contains all of
/// the columns referenced by the query and the request does not require consistency. Otherwise,
/// the raw storage is selected.
pub struct MaterializedStorageSelector {
    raw_storage: StorageKey,
    materialized_storage: StorageKey,
    /// Columns of the materialized storage.
    materialized_schema: SchemaRef,
}

impl MaterializedStorageSelector {
    pub fn new(
        raw_storage: StorageKey,
        materialized_storage: StorageKey,
        materialized_schema: SchemaRef,
    ) -> Self {
        Self {
            raw_storage,
            materialized_storage,
            materialized_schema,
        }
    }
}

impl QueryStorageSelector for MaterializedStorageSelector {
    fn select_storage(&self, query: &Query, settings: &RequestSettings) -> StorageKey {
        let is_materialized = !settings.consistent
            && query
                .all_referenced_columns()
                .iter()
                .all(|column| self.materialized_schema.field_with_name(column).is_ok());

        let storage_key = if is_materialized {
            &self.materialized_storage
        } else {
            &self.raw_storage
        };

        debug!("Selected storage '{storage_key}'.");
        storage_key.clone()
    }
}

/// Selects a read-only replica of a storage if it is enabled in the configuration and the request
/// does not require consistency.
pub struct ReadonlyStorageSelector {
    storage: StorageKey,
    readonly_storage: StorageKey,
    configuration: Arc<dyn ConfigurationProvider>,
}

impl ReadonlyStorageSelector {
    pub fn new(
        storage: StorageKey,
        readonly_storage: StorageKey,
        configuration: Arc<dyn ConfigurationProvider>,
    ) -> Self {
        Self {
            storage,
            readonly_storage,
            configuration,
        }
    }
}

impl QueryStorageSelector for ReadonlyStorageSelector {
    fn select_storage(&self, _query: &Query, settings: &RequestSettings) -> StorageKey {
        let use_readonly_storage = self.configuration.get_config(USE_READONLY_STORAGE, 0) > 0;

        if use_readonly_storage && !settings.consistent {
            self.readonly_storage.clone()
        } else {
            self.storage.clone()
        }
    }
}
