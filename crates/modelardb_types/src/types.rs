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

//! Implementation of types that provide a single definition of the representation of time used
//! by queries, conditions, and results.

use arrow::array::PrimitiveArray;
use arrow::datatypes::TimestampMicrosecondType;

/// Number of microseconds since the Unix epoch.
pub type Timestamp = i64;

/// Arrow type of [`Timestamp`].
pub type ArrowTimestamp = TimestampMicrosecondType;

/// Arrow array of [`Timestamps`](Timestamp).
pub type TimestampArray = PrimitiveArray<ArrowTimestamp>;

/// Number of microseconds in one second.
pub const MICROSECONDS_PER_SECOND: i64 = 1_000_000;
