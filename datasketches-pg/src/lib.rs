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

//! KLL quantiles sketches for PostgreSQL extensions.
//!
//! This crate bundles a KLL sketch library with the glue a database
//! extension needs to expose it: opaque handles, aggregate transitions,
//! a text form, and error escalation. With one of the `pg13` to `pg18`
//! features it also exports the C-linkage entry points of the PostgreSQL
//! extension, bound through `pgrx`.
//!
//! # Usage
//!
//! ```rust
//! use datasketches_pg::adapter::FloatSketchHandle;
//!
//! let mut handle = FloatSketchHandle::new(200).unwrap();
//! for i in 0..100 {
//!     handle.update(i as f32);
//! }
//! let bytes = handle.serialize(0);
//! let copy = FloatSketchHandle::deserialize(&bytes).unwrap();
//! assert_eq!(copy.get_n(), 100);
//! assert_eq!(copy.get_rank(50.0), 0.5);
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod adapter;
pub mod error;
pub mod host;
pub mod kll;

mod codec;
mod common;

#[cfg(any(
    feature = "pg13",
    feature = "pg14",
    feature = "pg15",
    feature = "pg16",
    feature = "pg17",
    feature = "pg18"
))]
pub mod pg_extension;
