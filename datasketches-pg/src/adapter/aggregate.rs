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

//! Aggregate state transitions.
//!
//! The state of a sketch aggregate is an optional handle that stays `None`
//! until the first non-null input arrives, so aggregating only nulls yields
//! a null result.

use super::HostItem;
use super::SketchHandle;
use crate::error::Error;
use crate::kll::DEFAULT_K;

/// Adds one value to the aggregate state.
///
/// The sketch is created on the first non-null value with `k`, or
/// [`DEFAULT_K`] when the caller passes none.
#[allow(private_bounds)]
pub fn build_agg<T: HostItem>(
    state: Option<SketchHandle<T>>,
    value: Option<T>,
    k: Option<u32>,
) -> Result<Option<SketchHandle<T>>, Error> {
    let Some(value) = value else {
        return Ok(state);
    };
    let mut handle = match state {
        Some(handle) => handle,
        None => SketchHandle::new(k.unwrap_or(u32::from(DEFAULT_K)))?,
    };
    handle.update(value);
    Ok(Some(handle))
}

/// Merges one serialized sketch payload into the aggregate state.
#[allow(private_bounds)]
pub fn merge_agg<T: HostItem>(
    state: Option<SketchHandle<T>>,
    sketch: Option<&[u8]>,
    k: Option<u32>,
) -> Result<Option<SketchHandle<T>>, Error> {
    let Some(bytes) = sketch else {
        return Ok(state);
    };
    let mut handle = match state {
        Some(handle) => handle,
        None => SketchHandle::new(k.unwrap_or(u32::from(DEFAULT_K)))?,
    };
    let other = SketchHandle::deserialize(bytes)?;
    handle.merge(&other)?;
    other.delete();
    Ok(Some(handle))
}

/// Combines two partial aggregate states.
#[allow(private_bounds)]
pub fn combine<T: HostItem>(
    left: Option<SketchHandle<T>>,
    right: Option<SketchHandle<T>>,
) -> Result<Option<SketchHandle<T>>, Error> {
    match (left, right) {
        (Some(mut left), Some(right)) => {
            left.merge(&right)?;
            right.delete();
            Ok(Some(left))
        }
        (left, right) => Ok(left.or(right)),
    }
}

/// Finishes an aggregate by serializing its sketch after `header_len`
/// bytes left for the result's length header.
#[allow(private_bounds)]
pub fn serialize_final<T: HostItem>(
    state: Option<&SketchHandle<T>>,
    header_len: usize,
) -> Option<Vec<u8>> {
    state.map(|handle| handle.serialize(header_len))
}
