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

//! Query planning and execution in front of a columnar store. A [`Dataset`](dataset::Dataset)
//! maps each request to a storage and the processors that must be applied to its query, and
//! executes it either directly or, if the query would force the store to read and sort many rows,
//! as multiple cheaper queries using the [split strategies](split).

pub mod configuration;
pub mod dataset;
pub mod error;
pub mod plan;
pub mod runner;
pub mod split;
pub mod storage;
