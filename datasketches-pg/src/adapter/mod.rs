// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Sketch operations in host terms.
//!
//! Every operation performs one call into [`kll`](crate::kll) and converts
//! the result into host values. [`escalate`] runs an operation and hands any
//! failure to the host's [`ErrorChannel`](crate::host::ErrorChannel).

mod aggregate;
mod escalate;
mod handle;

pub use self::aggregate::build_agg;
pub use self::aggregate::combine;
pub use self::aggregate::merge_agg;
pub use self::aggregate::serialize_final;
pub use self::escalate::escalate;
pub use self::handle::DoubleSketchHandle;
pub use self::handle::FloatSketchHandle;
pub(crate) use self::handle::HostItem;
pub use self::handle::SketchHandle;

/// Rank and quantile queries exclude the item at the queried point.
pub const INCLUSIVE: bool = false;
