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

//! Text form of sketch values: standard base64 of the serialized sketch.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::Error;

/// Parses the text form of a sketch into its serialized bytes.
///
/// # Examples
///
/// ```
/// use datasketches_pg::host::sketch_in;
/// use datasketches_pg::host::sketch_out;
///
/// let bytes = sketch_in("AgEPAcgACAA=").unwrap();
/// assert_eq!(bytes, vec![2, 1, 15, 1, 200, 0, 8, 0]);
/// assert_eq!(sketch_out(&bytes), "AgEPAcgACAA=");
/// ```
pub fn sketch_in(encoded: &str) -> Result<Vec<u8>, Error> {
    STANDARD
        .decode(encoded.trim_end())
        .map_err(|err| Error::deserial("sketch text is not valid base64").set_source(err))
}

/// Renders serialized sketch bytes in their text form.
pub fn sketch_out(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
