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

//! Management of the configuration used to tune query splitting at runtime. The configuration is
//! initialized from environment variables and can be changed while queries are executed without
//! redeploying, as each value is read when a query is split.

use std::env;

use dashmap::DashMap;

use crate::error::{ModelarDbPlannerError, Result};

/// Enables query splitting when set to a positive value.
pub const USE_SPLIT: &str = "use_split";

/// Size in seconds of the first time range queried by the time split strategy.
pub const SPLIT_STEP: &str = "split_step";

/// Number of seconds the time range of a query is aligned to before it is split.
pub const DATE_ALIGN_SECONDS: &str = "date_align_seconds";

/// Granularity in seconds that timestamps are stored with. It is added to the end of the time
/// range computed by the column split strategy, as the end of a time range is exclusive.
pub const TIMESTAMP_GRANULARITY_SECONDS: &str = "timestamp_granularity_seconds";

/// Routes requests that do not require consistency to read-only storage when set to a positive
/// value.
pub const USE_READONLY_STORAGE: &str = "use_readonly_storage";

/// The configuration keys that can be set using environment variables.
const ENVIRONMENT_VARIABLES: [(&str, &str); 5] = [
    (USE_SPLIT, "MODELARDB_USE_SPLIT"),
    (SPLIT_STEP, "MODELARDB_SPLIT_STEP"),
    (DATE_ALIGN_SECONDS, "MODELARDB_DATE_ALIGN_SECONDS"),
    (TIMESTAMP_GRANULARITY_SECONDS, "MODELARDB_TIMESTAMP_GRANULARITY_SECONDS"),
    (USE_READONLY_STORAGE, "MODELARDB_USE_READONLY_STORAGE"),
];

/// Read access to the runtime configuration. The split strategies and storage selectors are given
/// a [`ConfigurationProvider`] when they are created, so tests can provide a fixed configuration.
pub trait ConfigurationProvider: Send + Sync {
    /// Return the value of `key` or `default` if `key` has not been set.
    fn get_config(&self, key: &str, default: i64) -> i64;
}

/// Return the value of `key` or `default` if `key` has not been set. If the value is not positive,
/// [`ModelarDbPlannerError::Configuration`] is returned.
pub fn get_positive_config(
    configuration: &dyn ConfigurationProvider,
    key: &str,
    default: i64,
) -> Result<i64> {
    let value = configuration.get_config(key, default);

    if value > 0 {
        Ok(value)
    } else {
        Err(ModelarDbPlannerError::Configuration(format!(
            "{key} must be positive but is {value}."
        )))
    }
}

/// Manages the configuration and provides functionality for updating it. Values are stored in a
/// [`DashMap`] so they can be read by concurrent queries without locking the entire configuration.
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    configs: DashMap<String, i64>,
}

impl ConfigurationManager {
    /// Create an empty [`ConfigurationManager`] so the default value is used for all keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a [`ConfigurationManager`] with the values of the environment variables that are
    /// set. If a variable does not contain an integer, [`ModelarDbPlannerError`] is returned.
    pub fn try_from_env() -> Result<Self> {
        Self::try_from_variables(|variable| env::var(variable).ok())
    }

    /// Create a [`ConfigurationManager`] with the values returned by `lookup` for the environment
    /// variables. If a value is not an integer, [`ModelarDbPlannerError`] is returned.
    fn try_from_variables(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let configuration_manager = Self::new();

        for (key, variable) in ENVIRONMENT_VARIABLES {
            if let Some(value) = lookup(variable) {
                let value = value.parse::<i64>().map_err(|error| {
                    ModelarDbPlannerError::Configuration(format!(
                        "{variable} must be an integer: {error}"
                    ))
                })?;

                configuration_manager.set_config(key, value);
            }
        }

        Ok(configuration_manager)
    }

    pub fn set_config(&self, key: &str, value: i64) {
        self.configs.insert(key.to_owned(), value);
    }

    /// Remove the value of `key` so the default value is used and return the removed value.
    pub fn remove_config(&self, key: &str) -> Option<i64> {
        self.configs.remove(key).map(|(_key, value)| value)
    }
}

impl ConfigurationProvider for ConfigurationManager {
    fn get_config(&self, key: &str, default: i64) -> i64 {
        self.configs.get(key).map_or(default, |value| *value)
    }
}
