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

//! Implementation of [`Request`] which bundles a [`Query`] with the extensions and settings of
//! one call to the query front end.

use std::collections::HashMap;

use datafusion::scalar::ScalarValue;

use crate::functions;
use crate::query::{Literal, Query};
use crate::types::Timestamp;

/// Namespace of the extension containing the time range of a request.
pub const TIMESERIES_EXTENSION: &str = "timeseries";

/// Key of the inclusive start of the time range in [`TIMESERIES_EXTENSION`].
pub const FROM_DATE: &str = "from_date";

/// Key of the exclusive end of the time range in [`TIMESERIES_EXTENSION`].
pub const TO_DATE: &str = "to_date";

/// Namespace of the extension containing the projects a request is restricted to.
pub const PROJECT_EXTENSION: &str = "project";

/// Key of the project ids in [`PROJECT_EXTENSION`].
pub const PROJECT: &str = "project";

/// Extension values of a request grouped by namespace.
pub type Extensions = HashMap<String, HashMap<String, Literal>>;

/// Settings that apply to a single request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestSettings {
    /// Read from storage that is guaranteed to contain all acknowledged writes.
    pub consistent: bool,
}

/// One call to the query front end. The extensions must stay consistent with the conditions in
/// `query`, so rewriting the conditions must be mirrored with [`Request::mirror_time_range()`]
/// and [`Request::mirror_project_ids()`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Request {
    pub query: Query,
    pub extensions: Extensions,
    pub settings: RequestSettings,
}

impl Request {
    pub fn new(query: Query, settings: RequestSettings) -> Self {
        Self {
            query,
            extensions: HashMap::new(),
            settings,
        }
    }

    /// Return the request with `literal` assigned to `key` in the extension `namespace`.
    pub fn with_extension(mut self, namespace: &str, key: &str, literal: Literal) -> Self {
        self.extensions
            .entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), literal);
        self
    }

    pub fn extension(&self, namespace: &str, key: &str) -> Option<&Literal> {
        self.extensions
            .get(namespace)
            .and_then(|extension| extension.get(key))
    }

    /// Assign `from_date` and `to_date` to the time range extension if the request has one.
    pub fn mirror_time_range(&mut self, from_date: Timestamp, to_date: Timestamp) {
        if let Some(timeseries) = self.extensions.get_mut(TIMESERIES_EXTENSION) {
            timeseries.insert(
                FROM_DATE.to_owned(),
                Literal::Scalar(functions::timestamp_to_scalar(from_date)),
            );
            timeseries.insert(
                TO_DATE.to_owned(),
                Literal::Scalar(functions::timestamp_to_scalar(to_date)),
            );
        }
    }

    /// Assign `project_ids` to the project extension if the request has one.
    pub fn mirror_project_ids(&mut self, project_ids: Vec<ScalarValue>) {
        if let Some(project) = self.extensions.get_mut(PROJECT_EXTENSION) {
            project.insert(PROJECT.to_owned(), Literal::List(project_ids));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests for Request.
    #[test]
    fn test_mirror_time_range_updates_existing_extension() {
        let mut request = Request::default().with_extension(
            TIMESERIES_EXTENSION,
            FROM_DATE,
            Literal::Scalar(ScalarValue::from("1970-01-01T00:00:00Z")),
        );

        request.mirror_time_range(10, 20);

        assert_eq!(
            request.extension(TIMESERIES_EXTENSION, FROM_DATE),
            Some(&Literal::Scalar(functions::timestamp_to_scalar(10)))
        );
        assert_eq!(
            request.extension(TIMESERIES_EXTENSION, TO_DATE),
            Some(&Literal::Scalar(functions::timestamp_to_scalar(20)))
        );
    }

    #[test]
    fn test_mirror_time_range_without_extension() {
        let mut request = Request::default();
        request.mirror_time_range(10, 20);
        assert!(request.extensions.is_empty());
    }

    #[test]
    fn test_mirror_project_ids() {
        let mut request = Request::default().with_extension(
            PROJECT_EXTENSION,
            PROJECT,
            Literal::List(vec![ScalarValue::UInt64(Some(1)), ScalarValue::UInt64(Some(2))]),
        );

        request.mirror_project_ids(vec![ScalarValue::UInt64(Some(2))]);

        assert_eq!(
            request.extension(PROJECT_EXTENSION, PROJECT),
            Some(&Literal::List(vec![ScalarValue::UInt64(Some(2))]))
        );
    }
}
