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

use datasketches_pg::error::ErrorKind;
use datasketches_pg::kll::KllSketch;
use datasketches_pg::kll::KllSketchBuilder;
use googletest::assert_that;
use googletest::prelude::contains_substring;

#[test]
fn test_empty_layout() {
    let sketch = KllSketch::<f32>::new(200).unwrap();
    let bytes = sketch.serialize();
    assert_eq!(bytes, vec![2, 1, 15, 1, 200, 0, 8, 0]);
    assert_eq!(bytes.len(), sketch.serialized_size());

    let restored = KllSketch::<f32>::deserialize(&bytes).unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.k(), 200);
}

#[test]
fn test_single_item_layout() {
    let mut sketch = KllSketch::<f32>::new(200).unwrap();
    sketch.update(1.0);
    let bytes = sketch.serialize();

    let mut expected = vec![2, 2, 15, 4, 200, 0, 8, 0];
    expected.extend_from_slice(&1.0f32.to_le_bytes());
    assert_eq!(bytes, expected);
    assert_eq!(bytes.len(), sketch.serialized_size());

    let restored = KllSketch::<f32>::deserialize(&bytes).unwrap();
    assert_eq!(restored.n(), 1);
    assert_eq!(restored.min_item(), Some(1.0));
    assert_eq!(restored.max_item(), Some(1.0));
    assert_eq!(restored, sketch);
}

#[test]
fn test_exact_mode_layout() {
    let mut sketch = KllSketch::<f64>::new(20).unwrap();
    sketch.update(2.0);
    sketch.update(1.0);
    let bytes = sketch.serialize();

    // preamble, n, min_k, one level starting at capacity - 2
    assert_eq!(&bytes[..8], &[5, 1, 15, 0, 20, 0, 8, 0]);
    assert_eq!(&bytes[8..16], &2u64.to_le_bytes());
    assert_eq!(&bytes[16..20], &[20, 0, 1, 0]);
    assert_eq!(&bytes[20..24], &18u32.to_le_bytes());
    // min, max, then level zero newest first
    let items: Vec<f64> = bytes[24..]
        .chunks_exact(8)
        .map(|chunk| f64::from_le_bytes(chunk.try_into().unwrap()))
        .collect();
    assert_eq!(items, vec![1.0, 2.0, 1.0, 2.0]);
}

#[test]
fn test_round_trip_is_byte_for_byte() {
    for n in [0, 1, 2, 199, 200, 201, 10_000, 100_000] {
        let mut sketch = KllSketchBuilder::default().seed(7).build::<f32>().unwrap();
        for i in 0..n {
            sketch.update(i as f32);
        }
        let bytes = sketch.serialize();
        assert_eq!(bytes.len(), sketch.serialized_size(), "n = {n}");

        let restored = KllSketch::<f32>::deserialize(&bytes).unwrap();
        assert_eq!(restored, sketch, "n = {n}");
        assert_eq!(restored.serialize(), bytes, "n = {n}");
        if n > 0 {
            assert_eq!(
                restored.quantile(0.5, false).unwrap(),
                sketch.quantile(0.5, false).unwrap()
            );
        }
    }
}

#[test]
fn test_restored_sketch_keeps_updating() {
    let mut sketch = KllSketch::<f64>::new(100).unwrap();
    for i in 0..1_000 {
        sketch.update(i as f64);
    }
    let mut restored = KllSketch::<f64>::deserialize(&sketch.serialize()).unwrap();
    for i in 1_000..2_000 {
        restored.update(i as f64);
    }
    assert_eq!(restored.n(), 2_000);
    assert_eq!(restored.max_item(), Some(1_999.0));
    assert_eq!(restored.min_k(), 100);
}

#[test]
fn test_header_reservation() {
    let mut sketch = KllSketch::<f64>::new(200).unwrap();
    sketch.update(5.0);
    let plain = sketch.serialize();
    let with_header = sketch.serialize_with_header(4);
    assert_eq!(&with_header[..4], &[0, 0, 0, 0]);
    assert_eq!(&with_header[4..], plain.as_slice());
}

#[test]
fn test_truncated_input() {
    let mut sketch = KllSketch::<f32>::new(200).unwrap();
    for i in 0..1_000 {
        sketch.update(i as f32);
    }
    let bytes = sketch.serialize();
    for len in [0, 3, 7, 12, 19, 25, bytes.len() - 1] {
        let err = KllSketch::<f32>::deserialize(&bytes[..len]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData, "len = {len}");
    }
}

#[test]
fn test_invalid_preamble() {
    let sketch = KllSketch::<f32>::new(200).unwrap();
    let bytes = sketch.serialize();

    let mut bad_family = bytes.clone();
    bad_family[2] = 3;
    let err = KllSketch::<f32>::deserialize(&bad_family).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid family"));

    let mut bad_m = bytes.clone();
    bad_m[6] = 4;
    let err = KllSketch::<f32>::deserialize(&bad_m).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid m"));

    let mut bad_k = bytes.clone();
    bad_k[4] = 2;
    bad_k[5] = 0;
    let err = KllSketch::<f32>::deserialize(&bad_k).unwrap_err();
    assert_that!(err.message(), contains_substring("k out of range"));

    let mut bad_preamble = bytes.clone();
    bad_preamble[0] = 5;
    let err = KllSketch::<f32>::deserialize(&bad_preamble).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid preamble ints"));

    for pre_ints in [0, 1, 6, 7] {
        let mut out_of_range = bytes.clone();
        out_of_range[0] = pre_ints;
        let err = KllSketch::<f32>::deserialize(&out_of_range).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_that!(
            err.message(),
            contains_substring("KLL preamble ints must be in [2, 5]")
        );
    }

    let mut bad_version = bytes;
    bad_version[1] = 9;
    let err = KllSketch::<f32>::deserialize(&bad_version).unwrap_err();
    assert_that!(err.message(), contains_substring("invalid serial version"));
}

#[test]
fn test_inconsistent_n() {
    let mut sketch = KllSketch::<f32>::new(200).unwrap();
    sketch.update(1.0);
    sketch.update(2.0);
    let mut bytes = sketch.serialize();
    bytes[8] = 3;
    let err = KllSketch::<f32>::deserialize(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
    assert_that!(err.message(), contains_substring("do not add up to n"));
}
