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

//! Storages that queries can be executed against. A storage has a read schema that names the
//! physical data source and its columns, and the query processors that must be applied to every
//! query executed against it, independently of the dataset the storage is used by.

pub mod processors;
pub mod selectors;

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use modelardb_types::query::Condition;

use crate::error::{ModelarDbPlannerError, Result};
use crate::storage::processors::QueryProcessor;

/// Name that uniquely identifies a storage in a [`StorageRegistry`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(name: &str) -> Self {
        Self(name.to_owned())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The physical data source queries are executed against and its schema.
#[derive(Clone, Debug)]
pub struct TableSchema {
    /// Name of the table in the store.
    data_source: String,
    /// Columns of the table.
    schema: SchemaRef,
    /// Conditions that must be added to every query executed against the table, e.g., to exclude
    /// rows that are marked as deleted.
    mandatory_conditions: Vec<Condition>,
}

impl TableSchema {
    pub fn new(data_source: &str, schema: SchemaRef) -> Self {
        Self {
            data_source: data_source.to_owned(),
            schema,
            mandatory_conditions: vec![],
        }
    }

    pub fn with_mandatory_conditions(mut self, mandatory_conditions: Vec<Condition>) -> Self {
        self.mandatory_conditions = mandatory_conditions;
        self
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn mandatory_conditions(&self) -> &[Condition] {
        &self.mandatory_conditions
    }

    pub fn has_column(&self, column_name: &str) -> bool {
        self.schema.field_with_name(column_name).is_ok()
    }
}

/// A storage that can be read from.
pub trait ReadableStorage: Send + Sync {
    fn storage_key(&self) -> &StorageKey;

    fn read_schema(&self) -> &TableSchema;

    /// Return the processors that must be applied to all queries executed against the storage.
    fn query_processors(&self) -> Vec<Arc<dyn QueryProcessor>>;
}

/// A [`ReadableStorage`] backed by a single table.
pub struct TableStorage {
    storage_key: StorageKey,
    read_schema: TableSchema,
    query_processors: Vec<Arc<dyn QueryProcessor>>,
}

impl TableStorage {
    pub fn new(
        storage_key: StorageKey,
        read_schema: TableSchema,
        query_processors: Vec<Arc<dyn QueryProcessor>>,
    ) -> Self {
        Self {
            storage_key,
            read_schema,
            query_processors,
        }
    }
}

impl ReadableStorage for TableStorage {
    fn storage_key(&self) -> &StorageKey {
        &self.storage_key
    }

    fn read_schema(&self) -> &TableSchema {
        &self.read_schema
    }

    fn query_processors(&self) -> Vec<Arc<dyn QueryProcessor>> {
        self.query_processors.clone()
    }
}

/// The storages that a storage selector can choose between.
#[derive(Clone, Default)]
pub struct StorageRegistry {
    storages: HashMap<StorageKey, Arc<dyn ReadableStorage>>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `storage` and return the storage previously registered with the same key.
    pub fn register(
        &mut self,
        storage: Arc<dyn ReadableStorage>,
    ) -> Option<Arc<dyn ReadableStorage>> {
        self.storages.insert(storage.storage_key().clone(), storage)
    }

    /// Return the storage registered with `storage_key`. If no storage is registered with
    /// `storage_key`, [`ModelarDbPlannerError::Configuration`] is returned as the storages of a
    /// dataset are fixed when it is created.
    pub fn get_storage(&self, storage_key: &StorageKey) -> Result<Arc<dyn ReadableStorage>> {
        self.storages.get(storage_key).cloned().ok_or_else(|| {
            ModelarDbPlannerError::Configuration(format!(
                "No storage is registered with the key '{storage_key}'."
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use modelardb_test::EVENTS_TABLE_NAME;

    use crate::test;

    // Tests for TableSchema.
    #[test]
    fn test_has_column() {
        let table_schema = test::events_table_schema();

        assert_eq!(table_schema.data_source(), EVENTS_TABLE_NAME);
        assert!(table_schema.has_column("event_id"));
        assert!(!table_schema.has_column("group_id"));
    }

    // Tests for StorageRegistry.
    #[test]
    fn test_get_registered_storage() {
        let mut storage_registry = StorageRegistry::new();
        assert!(storage_registry.register(test::events_storage()).is_none());

        let storage = storage_registry
            .get_storage(&StorageKey::new(test::EVENTS_STORAGE))
            .unwrap();

        assert_eq!(storage.storage_key().name(), test::EVENTS_STORAGE);
    }

    #[test]
    fn test_register_storage_twice() {
        let mut storage_registry = StorageRegistry::new();
        storage_registry.register(test::events_storage());

        assert!(storage_registry.register(test::events_storage()).is_some());
    }

    #[test]
    fn test_get_unregistered_storage() {
        let storage_registry = StorageRegistry::new();

        let result = storage_registry.get_storage(&StorageKey::new("errors"));

        assert!(matches!(result, Err(ModelarDbPlannerError::Configuration(_))));
    }
}
