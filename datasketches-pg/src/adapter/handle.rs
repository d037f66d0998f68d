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

use super::INCLUSIVE;
use crate::error::Error;
use crate::kll::KllItem;
use crate::kll::KllSketch;
use crate::kll::MAX_K;
use crate::kll::MIN_K;

/// Sketch item types that have a host representation.
pub(crate) trait HostItem: KllItem {
    /// Host type name used in messages.
    const TYPE_NAME: &'static str;
}

impl HostItem for f32 {
    const TYPE_NAME: &'static str = "float4";
}

impl HostItem for f64 {
    const TYPE_NAME: &'static str = "float8";
}

/// Exclusive owner of one sketch instance.
///
/// Dropping the handle, or calling [`delete`](Self::delete), releases the
/// sketch. Nothing else tracks its liveness.
#[allow(private_bounds)]
#[derive(Debug, Clone, PartialEq)]
pub struct SketchHandle<T: HostItem> {
    sketch: Box<KllSketch<T>>,
}

/// Handle of a sketch over `float4` values.
pub type FloatSketchHandle = SketchHandle<f32>;
/// Handle of a sketch over `float8` values.
pub type DoubleSketchHandle = SketchHandle<f64>;

#[allow(private_bounds)]
impl<T: HostItem> SketchHandle<T> {
    /// Creates an empty sketch.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if k is not in [`MIN_K`], [`MAX_K`].
    pub fn new(k: u32) -> Result<Self, Error> {
        let k = u16::try_from(k).map_err(|_| {
            Error::invalid_argument(format!("k must be in [{MIN_K}, {MAX_K}], got {k}"))
        })?;
        let handle = Self::from_sketch(KllSketch::new(k)?);
        tracing::trace!(k, item = T::TYPE_NAME, "created kll sketch");
        Ok(handle)
    }

    pub fn from_sketch(sketch: KllSketch<T>) -> Self {
        Self {
            sketch: Box::new(sketch),
        }
    }

    /// Releases the sketch.
    pub fn delete(self) {
        tracing::trace!(
            n = self.sketch.n(),
            item = T::TYPE_NAME,
            "released kll sketch"
        );
    }

    pub fn sketch(&self) -> &KllSketch<T> {
        &self.sketch
    }

    pub fn into_sketch(self) -> KllSketch<T> {
        *self.sketch
    }

    pub fn update(&mut self, value: T) {
        self.sketch.update(value);
    }

    pub fn merge(&mut self, other: &SketchHandle<T>) -> Result<(), Error> {
        self.sketch.merge(&other.sketch)
    }

    /// Returns the fraction of the stream strictly below `value`, or NaN if
    /// the sketch is empty.
    pub fn get_rank(&self, value: T) -> f64 {
        self.sketch.rank(&value, INCLUSIVE)
    }

    /// Returns the value at `rank`, or NaN if the sketch is empty.
    pub fn get_quantile(&self, rank: f64) -> Result<T, Error> {
        self.sketch.quantile(rank, INCLUSIVE)
    }

    pub fn get_n(&self) -> u64 {
        self.sketch.n()
    }

    /// Returns the sketch summary as it fits a C buffer of `length` bytes:
    /// at most `length - 1` bytes of text, leaving room for the terminator.
    pub fn to_string(&self, length: usize) -> String {
        let mut summary = self.sketch.to_string();
        let mut end = length.saturating_sub(1).min(summary.len());
        while !summary.is_char_boundary(end) {
            end -= 1;
        }
        summary.truncate(end);
        summary
    }

    /// Serializes the sketch after `header_len` bytes left for the caller's
    /// length header.
    pub fn serialize(&self, header_len: usize) -> Vec<u8> {
        let bytes = self.sketch.serialize_with_header(header_len);
        tracing::debug!(
            size = bytes.len(),
            n = self.sketch.n(),
            item = T::TYPE_NAME,
            "serialized kll sketch"
        );
        bytes
    }

    /// Reconstructs a sketch from a serialized payload, without length header.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let sketch = KllSketch::deserialize(bytes)?;
        tracing::debug!(
            size = bytes.len(),
            n = sketch.n(),
            item = T::TYPE_NAME,
            "deserialized kll sketch"
        );
        Ok(Self::from_sketch(sketch))
    }

    /// Size of the serialized sketch, without length header.
    pub fn get_serialized_size_bytes(&self) -> Result<u32, Error> {
        let size = self.sketch.serialized_size();
        u32::try_from(size)
            .map_err(|_| Error::host(format!("serialized size {size} exceeds the host length")))
    }

    /// Returns `len + 1` probability masses.
    pub fn get_pmf(&self, split_points: &[T]) -> Result<Vec<f64>, Error> {
        self.sketch.pmf(split_points, INCLUSIVE)
    }

    /// Returns `len + 1` cumulative ranks, the last being 1.0.
    pub fn get_cdf(&self, split_points: &[T]) -> Result<Vec<f64>, Error> {
        self.sketch.cdf(split_points, INCLUSIVE)
    }

    /// Returns one item per requested rank.
    pub fn get_quantiles(&self, fractions: &[f64]) -> Result<Vec<T>, Error> {
        self.sketch.quantiles(fractions, INCLUSIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_k_wider_than_u16() {
        let err = FloatSketchHandle::new(70_000).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("got 70000"));
    }

    #[test]
    fn test_to_string_truncates_like_snprintf() {
        let handle = DoubleSketchHandle::new(200).unwrap();
        let full = handle.sketch().to_string();
        assert_eq!(handle.to_string(0), "");
        assert_eq!(handle.to_string(1), "");
        assert_eq!(handle.to_string(4), "###");
        assert_eq!(handle.to_string(full.len() + 1), full);
        assert_eq!(handle.to_string(usize::MAX), full);
    }

    #[test]
    fn test_empty_rank_and_quantile_are_nan() {
        let handle = FloatSketchHandle::new(200).unwrap();
        assert!(handle.get_rank(1.0).is_nan());
        assert!(handle.get_quantile(0.5).unwrap().is_nan());
        let err = handle.get_quantiles(&[0.5]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptySketch);
    }

    #[test]
    fn test_serialize_leaves_header_room() {
        let mut handle = DoubleSketchHandle::new(200).unwrap();
        handle.update(-3.0);
        let bytes = handle.serialize(4);
        assert_eq!(&bytes[..4], &[0, 0, 0, 0]);
        assert_eq!(bytes.len() - 4, handle.get_serialized_size_bytes().unwrap() as usize);
        let copy = DoubleSketchHandle::deserialize(&bytes[4..]).unwrap();
        assert_eq!(copy, handle);
    }
}
