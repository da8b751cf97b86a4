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

//! Types shared by the plan builders, the split strategies, and the query runners: the logical
//! [`Query`](query::Query), the [`Request`](request::Request) it is sent in, and the
//! [`RawQueryResult`](result::RawQueryResult) returned by the store.

pub mod error;
pub mod functions;
pub mod query;
pub mod request;
pub mod result;
pub mod types;
