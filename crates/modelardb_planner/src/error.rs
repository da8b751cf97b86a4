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

//! The [`Error`] and [`Result`] types used throughout `modelardb_planner`.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::result::Result as StdResult;

use arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use modelardb_types::error::ModelarDbTypesError;

/// Result type used throughout `modelardb_planner`.
pub type Result<T> = StdResult<T, ModelarDbPlannerError>;

/// Error type used throughout `modelardb_planner`.
#[derive(Debug)]
pub enum ModelarDbPlannerError {
    /// Error returned by Apache Arrow.
    Arrow(ArrowError),
    /// Error returned when the storages, split strategies, or configuration are not valid.
    Configuration(String),
    /// Error returned by Apache DataFusion.
    DataFusion(DataFusionError),
    /// Error returned when an invalid argument was passed.
    InvalidArgument(String),
    /// Error returned by modelardb_types.
    ModelarDbTypes(ModelarDbTypesError),
}

impl Display for ModelarDbPlannerError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Arrow(reason) => write!(f, "Arrow Error: {reason}"),
            Self::Configuration(reason) => write!(f, "Configuration Error: {reason}"),
            Self::DataFusion(reason) => write!(f, "DataFusion Error: {reason}"),
            Self::InvalidArgument(reason) => write!(f, "Invalid Argument Error: {reason}"),
            Self::ModelarDbTypes(reason) => write!(f, "ModelarDB Types Error: {reason}"),
        }
    }
}

impl Error for ModelarDbPlannerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        // Return the error that caused self to occur if one exists.
        match self {
            Self::Arrow(reason) => Some(reason),
            Self::Configuration(_reason) => None,
            Self::DataFusion(reason) => Some(reason),
            Self::InvalidArgument(_reason) => None,
            Self::ModelarDbTypes(reason) => Some(reason),
        }
    }
}

impl From<ArrowError> for ModelarDbPlannerError {
    fn from(error: ArrowError) -> Self {
        Self::Arrow(error)
    }
}

impl From<DataFusionError> for ModelarDbPlannerError {
    fn from(error: DataFusionError) -> Self {
        Self::DataFusion(error)
    }
}

impl From<ModelarDbTypesError> for ModelarDbPlannerError {
    fn from(error: ModelarDbTypesError) -> Self {
        Self::ModelarDbTypes(error)
    }
}
