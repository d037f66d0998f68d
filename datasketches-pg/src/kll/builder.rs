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

use super::DEFAULT_K;
use super::MAX_K;
use super::MIN_K;
use super::sketch::KllItem;
use super::sketch::KllSketch;
use crate::common::XorShift64;
use crate::error::Error;

/// Builder for creating KLL sketches.
///
/// # Examples
///
/// ```
/// use datasketches_pg::kll::KllSketch;
/// use datasketches_pg::kll::KllSketchBuilder;
///
/// let mut sketch: KllSketch<f32> = KllSketchBuilder::default().k(400).seed(7).build().unwrap();
/// sketch.update(3.0);
/// assert_eq!(sketch.k(), 400);
/// assert_eq!(sketch.n(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct KllSketchBuilder {
    k: Option<u16>,
    seed: Option<u64>,
}

impl KllSketchBuilder {
    /// Sets parameter k, which trades accuracy for size.
    pub fn k(mut self, k: u16) -> Self {
        self.k = Some(k);
        self
    }

    /// Seeds the random bits used by compaction.
    ///
    /// Sketches built with the same seed and fed the same stream end up
    /// identical, which makes them reproducible in tests.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds an empty sketch.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if k is not in [`MIN_K`], [`MAX_K`].
    #[allow(private_bounds)]
    pub fn build<T: KllItem>(self) -> Result<KllSketch<T>, Error> {
        let k = self.k.unwrap_or(DEFAULT_K);
        if !(MIN_K..=MAX_K).contains(&k) {
            return Err(Error::invalid_argument(format!(
                "k must be in [{MIN_K}, {MAX_K}], got {k}"
            )));
        }
        let rng = match self.seed {
            Some(seed) => XorShift64::seeded(seed),
            None => XorShift64::from_entropy(),
        };
        Ok(KllSketch::with_rng(k, rng))
    }
}
