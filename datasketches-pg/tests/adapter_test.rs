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

use std::cell::Cell;
use std::cell::RefCell;
use std::panic;
use std::panic::AssertUnwindSafe;

use datasketches_pg::adapter::DoubleSketchHandle;
use datasketches_pg::adapter::FloatSketchHandle;
use datasketches_pg::adapter::build_agg;
use datasketches_pg::adapter::escalate;
use datasketches_pg::adapter::merge_agg;
use datasketches_pg::adapter::serialize_final;
use datasketches_pg::error::Error;
use datasketches_pg::error::ErrorKind;
use datasketches_pg::host::ErrorChannel;
use datasketches_pg::host::sketch_in;
use datasketches_pg::host::sketch_out;
use googletest::assert_that;
use googletest::prelude::contains_substring;

/// Records reported messages, then unwinds like a host error would.
#[derive(Default)]
struct RecordingChannel {
    messages: RefCell<Vec<String>>,
}

struct Reported;

impl ErrorChannel for RecordingChannel {
    fn report(&self, message: &str) -> ! {
        self.messages.borrow_mut().push(message.to_string());
        panic::resume_unwind(Box::new(Reported))
    }
}

fn run_escalated<R>(
    channel: &RecordingChannel,
    op: impl FnOnce() -> Result<R, Error>,
) -> Option<R> {
    panic::catch_unwind(AssertUnwindSafe(|| escalate(channel, op))).ok()
}

/// Sets its flag when dropped.
struct DropFlag<'a>(&'a Cell<bool>);

impl Drop for DropFlag<'_> {
    fn drop(&mut self) {
        self.0.set(true);
    }
}

/// Records whether the operation's state was gone by the time of reporting.
struct OrderingChannel<'a> {
    dropped: &'a Cell<bool>,
    dropped_at_report: Cell<Option<bool>>,
}

impl ErrorChannel for OrderingChannel<'_> {
    fn report(&self, _message: &str) -> ! {
        self.dropped_at_report.set(Some(self.dropped.get()));
        panic::resume_unwind(Box::new(Reported))
    }
}

#[test]
fn test_success_does_not_report() {
    let channel = RecordingChannel::default();
    let n = run_escalated(&channel, || {
        let mut handle = FloatSketchHandle::new(200)?;
        handle.update(1.0);
        Ok(handle.get_n())
    });
    assert_eq!(n, Some(1));
    assert!(channel.messages.borrow().is_empty());
}

#[test]
fn test_error_reported_once_unaltered() {
    let channel = RecordingChannel::default();
    let expected = FloatSketchHandle::new(2).unwrap_err().to_string();

    let result = run_escalated(&channel, || FloatSketchHandle::new(2));
    assert!(result.is_none());
    assert_eq!(*channel.messages.borrow(), vec![expected]);
}

#[test]
fn test_operation_state_released_before_report() {
    for panics in [false, true] {
        let dropped = Cell::new(false);
        let channel = OrderingChannel {
            dropped: &dropped,
            dropped_at_report: Cell::new(None),
        };
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            escalate(&channel, || {
                let guard = DropFlag(&dropped);
                let handle = DoubleSketchHandle::new(200)?;
                if panics {
                    panic!("sketch state corrupted");
                }
                let err = handle.get_quantiles(&[0.5]);
                drop(guard);
                err
            })
        }));
        assert!(result.is_err());
        assert_eq!(channel.dropped_at_report.get(), Some(true), "panics = {panics}");
    }
}

#[test]
fn test_empty_sketch_queries() {
    let channel = RecordingChannel::default();
    let handle = DoubleSketchHandle::new(200).unwrap();
    assert!(handle.get_rank(1.0).is_nan());
    let quantile = run_escalated(&channel, || handle.get_quantile(0.5));
    assert!(quantile.unwrap().is_nan());
    assert!(channel.messages.borrow().is_empty());

    let restored = DoubleSketchHandle::deserialize(&handle.serialize(0)).unwrap();
    assert!(restored.get_rank(1.0).is_nan());

    assert!(run_escalated(&channel, || handle.get_pmf(&[1.0])).is_none());
    assert!(run_escalated(&channel, || handle.get_cdf(&[1.0])).is_none());
    assert!(run_escalated(&channel, || handle.get_quantiles(&[0.5])).is_none());
    let messages = channel.messages.borrow();
    assert_eq!(messages.len(), 3);
    for message in messages.iter() {
        assert_that!(message.as_str(), contains_substring("EmptySketch"));
    }
}

#[test]
fn test_panic_is_reported_with_its_message() {
    let channel = RecordingChannel::default();
    let result: Option<()> = run_escalated(&channel, || panic!("sketch state corrupted"));
    assert!(result.is_none());
    assert_eq!(
        *channel.messages.borrow(),
        vec!["sketch state corrupted".to_string()]
    );
}

#[test]
fn test_handle_lifecycle() {
    let mut handle = FloatSketchHandle::new(200).unwrap();
    for i in 1..=10 {
        handle.update(i as f32);
    }
    handle.update(f32::NAN);
    assert_eq!(handle.get_n(), 10);
    assert_eq!(handle.get_rank(6.0), 0.5);
    assert_eq!(handle.get_quantile(0.5).unwrap(), 6.0);
    assert_eq!(handle.get_quantile(0.0).unwrap(), 1.0);
    handle.delete();
}

#[test]
fn test_estimation_mode_extremes() {
    let mut handle = FloatSketchHandle::new(8).unwrap();
    for i in 1..=10_000 {
        handle.update(i as f32);
    }
    assert!(handle.sketch().is_estimation_mode());
    assert_eq!(handle.get_quantile(0.0).unwrap(), 1.0);
    assert_eq!(handle.get_quantile(1.0).unwrap(), 10_000.0);
    assert_eq!(
        handle.get_quantiles(&[0.0, 1.0]).unwrap(),
        vec![1.0, 10_000.0]
    );

    let restored = FloatSketchHandle::deserialize(&handle.serialize(0)).unwrap();
    assert_eq!(restored.get_quantile(0.0).unwrap(), 1.0);
    assert_eq!(restored.get_quantile(1.0).unwrap(), 10_000.0);
}

#[test]
fn test_merge_handles() {
    let mut left = DoubleSketchHandle::new(200).unwrap();
    let mut right = DoubleSketchHandle::new(100).unwrap();
    for i in 0..1_000 {
        left.update(i as f64);
        right.update((i + 1_000) as f64);
    }
    left.merge(&right).unwrap();
    assert_eq!(left.get_n(), 2_000);
    assert_eq!(left.sketch().min_k(), 100);
    assert_eq!(left.sketch().max_item(), Some(1_999.0));
}

#[test]
fn test_serialize_round_trip() {
    let mut handle = FloatSketchHandle::new(200).unwrap();
    for i in 0..5_000 {
        handle.update(i as f32);
    }
    let bytes = handle.serialize(4);
    let size = handle.get_serialized_size_bytes().unwrap() as usize;
    assert_eq!(bytes.len(), size + 4);

    let restored = FloatSketchHandle::deserialize(&bytes[4..]).unwrap();
    assert_eq!(restored.serialize(4), bytes);
    assert_eq!(restored.get_n(), 5_000);
}

#[test]
fn test_text_round_trip() {
    let mut handle = DoubleSketchHandle::new(200).unwrap();
    handle.update(0.25);
    handle.update(0.75);
    let bytes = handle.serialize(0);
    let text = sketch_out(&bytes);
    let parsed = sketch_in(&text).unwrap();
    assert_eq!(parsed, bytes);

    let restored = DoubleSketchHandle::deserialize(&parsed).unwrap();
    assert_eq!(restored.get_n(), 2);
}

#[test]
fn test_pmf_and_cdf() {
    let mut handle = FloatSketchHandle::new(200).unwrap();
    for i in 0..100 {
        handle.update(i as f32);
    }
    let pmf = handle.get_pmf(&[25.0, 50.0]).unwrap();
    assert_eq!(pmf, vec![0.25, 0.25, 0.5]);

    let cdf = handle.get_cdf(&[25.0, 50.0]).unwrap();
    assert_eq!(cdf, vec![0.25, 0.5, 1.0]);

    let empty = handle.get_pmf(&[]).unwrap();
    assert_eq!(empty, vec![1.0]);

    let err = handle.get_pmf(&[50.0, 25.0]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_quantiles() {
    let mut float = FloatSketchHandle::new(200).unwrap();
    let mut double = DoubleSketchHandle::new(200).unwrap();
    for i in 1..=4 {
        float.update(i as f32);
        double.update(i as f64);
    }
    let fractions = [0.0, 0.5, 1.0];
    assert_eq!(float.get_quantiles(&fractions).unwrap(), vec![1.0, 3.0, 4.0]);
    assert_eq!(double.get_quantiles(&fractions).unwrap()[1], 3.0);
    assert!(double.get_quantiles(&[2.0]).is_err());
}

#[test]
fn test_aggregate_over_serialized_sketches() {
    let mut parts = Vec::new();
    for part in 0..4 {
        let mut state = None;
        for i in 0..250 {
            state = build_agg(state, Some((part * 250 + i) as f32), Some(200)).unwrap();
        }
        state = build_agg(state, None, Some(200)).unwrap();
        parts.push(serialize_final(state.as_ref(), 0).unwrap());
    }

    let mut merged = None;
    for part in &parts {
        merged = merge_agg::<f32>(merged, Some(part.as_slice()), None).unwrap();
    }
    merged = merge_agg(merged, None, None).unwrap();

    let merged = merged.unwrap();
    assert_eq!(merged.get_n(), 1_000);
    assert_eq!(merged.sketch().min_item(), Some(0.0));
    assert_eq!(merged.sketch().max_item(), Some(999.0));

    let err = merge_agg::<f32>(None, Some(&[1, 2, 3]), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}
