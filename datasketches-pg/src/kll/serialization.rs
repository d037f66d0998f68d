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

//! Binary layout of serialized KLL sketches.
//!
//! ```text
//! byte 0: preamble ints    byte 1: serial version
//! byte 2: family id        byte 3: flags
//! bytes 4-5: k             byte 6: m        byte 7: unused
//! -- empty sketch ends here, single item sketch stores its item at byte 8 --
//! bytes 8-15: n            bytes 16-17: min k
//! byte 18: num levels      byte 19: unused
//! bytes 20..: level offsets (u32 each), min item, max item, retained items
//! ```

/// Serialization version for empty or full sketches.
pub(crate) const SERIAL_VERSION_EMPTY_FULL: u8 = 1;
/// Serialization version for single-item sketches.
pub(crate) const SERIAL_VERSION_SINGLE: u8 = 2;

/// Preamble ints for empty and single-item sketches.
pub(crate) const PREAMBLE_INTS_SHORT: u8 = 2;
/// Preamble ints for sketches with more than one item.
pub(crate) const PREAMBLE_INTS_FULL: u8 = 5;

pub(crate) const FLAG_EMPTY: u8 = 1 << 0;
pub(crate) const FLAG_LEVEL_ZERO_SORTED: u8 = 1 << 1;
pub(crate) const FLAG_SINGLE_ITEM: u8 = 1 << 2;

/// Serialized size of an empty sketch in bytes.
pub(crate) const EMPTY_SIZE_BYTES: usize = 8;
/// Data offset for single-item sketches.
pub(crate) const DATA_START_SINGLE_ITEM: usize = 8;
/// Data offset for sketches with more than one item.
pub(crate) const DATA_START: usize = 20;
/// Bytes per level offset entry.
pub(crate) const LEVEL_OFFSET_BYTES: usize = 4;
