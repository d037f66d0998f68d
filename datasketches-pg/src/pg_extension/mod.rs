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

//! C-linkage entry points for the PostgreSQL extension.
//!
//! Sketches cross the boundary as opaque handles owned by the current
//! memory context (see [`memory`]). `bytea` results and `Datum` arrays are
//! allocated there too and belong to the caller afterwards.
//!
//! Every entry point is guarded: a failure is raised with `ereport(ERROR)`
//! only after the Rust frames of the call have unwound.

#![allow(unsafe_code)]

mod memory;

use std::ffi::c_char;
use std::ffi::c_uint;
use std::ffi::c_void;
use std::ptr;

use pgrx::IntoDatum;
use pgrx::error;
use pgrx::pg_guard;
use pgrx::pg_sys;

use self::memory::handle_mut;
use self::memory::handle_ref;
use self::memory::into_raw;
use self::memory::palloc_datums;
use self::memory::palloc_varlena;
use crate::adapter::HostItem;
use crate::adapter::SketchHandle;
use crate::adapter::escalate;
use crate::error::Error;
use crate::host::ErrorChannel;

pgrx::pg_module_magic!();

/// Raises errors in the backend.
struct PgErrorChannel;

impl ErrorChannel for PgErrorChannel {
    fn report(&self, message: &str) -> ! {
        error!("{message}")
    }
}

/// # Safety
///
/// `ptr` must be null or point to `len` readable values unless `len` is zero.
unsafe fn slice<'a, U>(ptr: *const U, len: c_uint) -> Result<&'a [U], Error> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(Error::invalid_argument(format!(
            "null array of {len} elements"
        )));
    }
    // SAFETY: guaranteed by the caller.
    Ok(unsafe { std::slice::from_raw_parts(ptr, len as usize) })
}

fn sketch_new<T: HostItem>(k: c_uint) -> *mut c_void {
    escalate(&PgErrorChannel, || SketchHandle::<T>::new(k).map(into_raw))
}

unsafe fn sketch_delete<T: HostItem>(sketch: *mut c_void) {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        unsafe { memory::delete::<T>(sketch) }
    })
}

unsafe fn sketch_update<T: HostItem>(sketch: *mut c_void, value: T) {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        unsafe { handle_mut::<T>(sketch) }.map(|handle| handle.update(value))
    })
}

unsafe fn sketch_merge<T: HostItem>(sketch1: *mut c_void, sketch2: *const c_void) {
    escalate(&PgErrorChannel, || {
        if ptr::eq(sketch1.cast_const(), sketch2) {
            // SAFETY: forwarded from the exported function contract.
            let handle = unsafe { handle_mut::<T>(sketch1) }?;
            let other = handle.clone();
            return handle.merge(&other);
        }
        // SAFETY: forwarded from the exported function contract; the
        // handles are distinct.
        let (handle, other) = unsafe { (handle_mut::<T>(sketch1)?, handle_ref::<T>(sketch2)?) };
        handle.merge(other)
    })
}

unsafe fn sketch_get_rank<T: HostItem>(sketch: *const c_void, value: T) -> f64 {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        unsafe { handle_ref::<T>(sketch) }.map(|handle| handle.get_rank(value))
    })
}

unsafe fn sketch_get_quantile<T: HostItem>(sketch: *const c_void, rank: f64) -> T {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        unsafe { handle_ref::<T>(sketch) }?.get_quantile(rank)
    })
}

unsafe fn sketch_get_n<T: HostItem>(sketch: *const c_void) -> u64 {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        unsafe { handle_ref::<T>(sketch) }.map(SketchHandle::get_n)
    })
}

unsafe fn sketch_to_string<T: HostItem>(
    sketch: *const c_void,
    buffer: *mut c_char,
    length: c_uint,
) {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        let handle = unsafe { handle_ref::<T>(sketch) }?;
        if length == 0 {
            return Ok(());
        }
        if buffer.is_null() {
            return Err(Error::invalid_argument("string buffer is null"));
        }
        let text = handle.to_string(length as usize);
        // SAFETY: the buffer holds `length` bytes and text is shorter.
        unsafe {
            ptr::copy_nonoverlapping(text.as_ptr(), buffer.cast::<u8>(), text.len());
            buffer.add(text.len()).write(0);
        }
        Ok(())
    })
}

unsafe fn sketch_serialize<T: HostItem>(sketch: *const c_void) -> *mut pg_sys::varlena {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        let handle = unsafe { handle_ref::<T>(sketch) }?;
        palloc_varlena(&handle.serialize(pg_sys::VARHDRSZ))
    })
}

unsafe fn sketch_deserialize<T: HostItem>(buffer: *const c_char, length: c_uint) -> *mut c_void {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        let bytes = unsafe { slice(buffer.cast::<u8>(), length) }?;
        SketchHandle::<T>::deserialize(bytes).map(into_raw)
    })
}

unsafe fn sketch_get_serialized_size_bytes<T: HostItem>(sketch: *const c_void) -> c_uint {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        unsafe { handle_ref::<T>(sketch) }?.get_serialized_size_bytes()
    })
}

unsafe fn sketch_get_pmf<T: HostItem>(
    sketch: *const c_void,
    split_points: *const T,
    num_split_points: c_uint,
) -> *mut pg_sys::Datum {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        let (handle, split_points) =
            unsafe { (handle_ref::<T>(sketch)?, slice(split_points, num_split_points)?) };
        palloc_datums(handle.get_pmf(split_points)?)
    })
}

unsafe fn sketch_get_cdf<T: HostItem>(
    sketch: *const c_void,
    split_points: *const T,
    num_split_points: c_uint,
) -> *mut pg_sys::Datum {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        let (handle, split_points) =
            unsafe { (handle_ref::<T>(sketch)?, slice(split_points, num_split_points)?) };
        palloc_datums(handle.get_cdf(split_points)?)
    })
}

unsafe fn sketch_get_quantiles<T: HostItem + IntoDatum>(
    sketch: *const c_void,
    fractions: *const f64,
    num_fractions: c_uint,
) -> *mut pg_sys::Datum {
    escalate(&PgErrorChannel, || {
        // SAFETY: forwarded from the exported function contract.
        let (handle, fractions) =
            unsafe { (handle_ref::<T>(sketch)?, slice(fractions, num_fractions)?) };
        palloc_datums(handle.get_quantiles(fractions)?)
    })
}

macro_rules! export_kll_sketch {
    (
        $item:ty,
        $new:ident,
        $delete:ident,
        $update:ident,
        $merge:ident,
        $get_rank:ident,
        $get_quantile:ident,
        $get_n:ident,
        $to_string:ident,
        $serialize:ident,
        $deserialize:ident,
        $get_serialized_size_bytes:ident,
        $get_pmf:ident,
        $get_cdf:ident,
        $get_quantiles:ident $(,)?
    ) => {
        /// Creates an empty sketch with parameter `k` in the current memory
        /// context.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub extern "C-unwind" fn $new(k: c_uint) -> *mut c_void {
            sketch_new::<$item>(k)
        }

        /// Releases a sketch ahead of its memory context.
        ///
        /// # Safety
        ///
        /// `sketch` must be a handle of this type whose memory context is
        /// still alive; it is invalid afterwards.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $delete(sketch: *mut c_void) {
            unsafe { sketch_delete::<$item>(sketch) }
        }

        /// Adds a value to a sketch. NaN is ignored.
        ///
        /// # Safety
        ///
        /// `sketch` must be a live handle of this type.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $update(sketch: *mut c_void, value: $item) {
            unsafe { sketch_update::<$item>(sketch, value) }
        }

        /// Merges `sketch2` into `sketch1`.
        ///
        /// # Safety
        ///
        /// Both must be live handles of this type.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $merge(sketch1: *mut c_void, sketch2: *const c_void) {
            unsafe { sketch_merge::<$item>(sketch1, sketch2) }
        }

        /// Returns the normalized rank of `value`, NaN for an empty sketch.
        ///
        /// # Safety
        ///
        /// `sketch` must be a live handle of this type.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $get_rank(sketch: *const c_void, value: $item) -> f64 {
            unsafe { sketch_get_rank::<$item>(sketch, value) }
        }

        /// Returns the value at normalized `rank`, NaN for an empty sketch.
        ///
        /// # Safety
        ///
        /// `sketch` must be a live handle of this type.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $get_quantile(sketch: *const c_void, rank: f64) -> $item {
            unsafe { sketch_get_quantile::<$item>(sketch, rank) }
        }

        /// Returns the number of values the sketch has seen.
        ///
        /// # Safety
        ///
        /// `sketch` must be a live handle of this type.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $get_n(sketch: *const c_void) -> u64 {
            unsafe { sketch_get_n::<$item>(sketch) }
        }

        /// Writes the NUL-terminated sketch summary into `buffer`, truncated
        /// to `length` bytes including the terminator.
        ///
        /// # Safety
        ///
        /// `sketch` must be a live handle of this type and `buffer` must be
        /// writable for `length` bytes.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $to_string(
            sketch: *const c_void,
            buffer: *mut c_char,
            length: c_uint,
        ) {
            unsafe { sketch_to_string::<$item>(sketch, buffer, length) }
        }

        /// Serializes a sketch into a `bytea` in the current memory context.
        ///
        /// # Safety
        ///
        /// `sketch` must be a live handle of this type.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $serialize(sketch: *const c_void) -> *mut pg_sys::varlena {
            unsafe { sketch_serialize::<$item>(sketch) }
        }

        /// Creates a sketch from `length` serialized bytes, as found after
        /// the header of a `bytea`.
        ///
        /// # Safety
        ///
        /// `buffer` must be readable for `length` bytes.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $deserialize(
            buffer: *const c_char,
            length: c_uint,
        ) -> *mut c_void {
            unsafe { sketch_deserialize::<$item>(buffer, length) }
        }

        /// Returns the serialized size in bytes, without `bytea` header.
        ///
        /// # Safety
        ///
        /// `sketch` must be a live handle of this type.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $get_serialized_size_bytes(
            sketch: *const c_void,
        ) -> c_uint {
            unsafe { sketch_get_serialized_size_bytes::<$item>(sketch) }
        }

        /// Returns `num_split_points + 1` `float8` datums of probability mass.
        ///
        /// # Safety
        ///
        /// `sketch` must be a live handle of this type and `split_points`
        /// must hold `num_split_points` values.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $get_pmf(
            sketch: *const c_void,
            split_points: *const $item,
            num_split_points: c_uint,
        ) -> *mut pg_sys::Datum {
            unsafe { sketch_get_pmf::<$item>(sketch, split_points, num_split_points) }
        }

        /// Returns `num_split_points + 1` `float8` datums of cumulative rank.
        ///
        /// # Safety
        ///
        /// `sketch` must be a live handle of this type and `split_points`
        /// must hold `num_split_points` values.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $get_cdf(
            sketch: *const c_void,
            split_points: *const $item,
            num_split_points: c_uint,
        ) -> *mut pg_sys::Datum {
            unsafe { sketch_get_cdf::<$item>(sketch, split_points, num_split_points) }
        }

        /// Returns one item datum per fraction.
        ///
        /// # Safety
        ///
        /// `sketch` must be a live handle of this type and `fractions` must
        /// hold `num_fractions` values.
        #[pg_guard]
        #[unsafe(no_mangle)]
        pub unsafe extern "C-unwind" fn $get_quantiles(
            sketch: *const c_void,
            fractions: *const f64,
            num_fractions: c_uint,
        ) -> *mut pg_sys::Datum {
            unsafe { sketch_get_quantiles::<$item>(sketch, fractions, num_fractions) }
        }
    };
}

export_kll_sketch!(
    f32,
    kll_float_sketch_new,
    kll_float_sketch_delete,
    kll_float_sketch_update,
    kll_float_sketch_merge,
    kll_float_sketch_get_rank,
    kll_float_sketch_get_quantile,
    kll_float_sketch_get_n,
    kll_float_sketch_to_string,
    kll_float_sketch_serialize,
    kll_float_sketch_deserialize,
    kll_float_sketch_get_serialized_size_bytes,
    kll_float_sketch_get_pmf,
    kll_float_sketch_get_cdf,
    kll_float_sketch_get_quantiles,
);

export_kll_sketch!(
    f64,
    kll_double_sketch_new,
    kll_double_sketch_delete,
    kll_double_sketch_update,
    kll_double_sketch_merge,
    kll_double_sketch_get_rank,
    kll_double_sketch_get_quantile,
    kll_double_sketch_get_n,
    kll_double_sketch_to_string,
    kll_double_sketch_serialize,
    kll_double_sketch_deserialize,
    kll_double_sketch_get_serialized_size_bytes,
    kll_double_sketch_get_pmf,
    kll_double_sketch_get_cdf,
    kll_double_sketch_get_quantiles,
);

#[cfg(feature = "pg_test")]
#[pgrx::pg_schema]
mod tests {
    use std::ffi::CStr;

    use pgrx::PgMemoryContexts;
    use pgrx::prelude::*;

    use super::*;

    unsafe fn datums_f64(ptr: *mut pg_sys::Datum, len: usize) -> Vec<f64> {
        unsafe { std::slice::from_raw_parts(ptr, len) }
            .iter()
            .map(|&datum| unsafe { f64::from_datum(datum, false) }.unwrap())
            .collect()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "expected {expected:?}, got {actual:?}");
        }
    }

    #[pg_test]
    fn test_float_sketch_entry_points() {
        unsafe {
            let sketch = kll_float_sketch_new(200);
            for i in 1..=10 {
                kll_float_sketch_update(sketch, i as f32);
            }
            assert_eq!(kll_float_sketch_get_n(sketch), 10);
            assert_eq!(kll_float_sketch_get_rank(sketch, 6.0), 0.5);
            assert_eq!(kll_float_sketch_get_quantile(sketch, 0.5), 6.0);

            let split_points = [3.0f32, 8.0];
            let pmf = kll_float_sketch_get_pmf(sketch, split_points.as_ptr(), 2);
            assert_close(&datums_f64(pmf, 3), &[0.2, 0.5, 0.3]);
            let cdf = kll_float_sketch_get_cdf(sketch, split_points.as_ptr(), 2);
            assert_close(&datums_f64(cdf, 3), &[0.2, 0.7, 1.0]);

            let fractions = [0.0, 1.0];
            let quantiles = kll_float_sketch_get_quantiles(sketch, fractions.as_ptr(), 2);
            let quantiles: Vec<f32> = std::slice::from_raw_parts(quantiles, 2)
                .iter()
                .map(|&datum| f32::from_datum(datum, false).unwrap())
                .collect();
            assert_eq!(quantiles, vec![1.0, 10.0]);

            let mut buffer = [0 as c_char; 64];
            kll_float_sketch_to_string(sketch, buffer.as_mut_ptr(), 24);
            let text = CStr::from_ptr(buffer.as_ptr()).to_str().unwrap();
            assert_eq!(text, "### KLL sketch summary:");

            kll_float_sketch_delete(sketch);
        }
    }

    #[pg_test]
    fn test_double_sketch_bytea_round_trip() {
        unsafe {
            let sketch = kll_double_sketch_new(100);
            for i in 0..1_000 {
                kll_double_sketch_update(sketch, i as f64);
            }
            let size = kll_double_sketch_get_serialized_size_bytes(sketch) as usize;
            let bytea = kll_double_sketch_serialize(sketch);
            assert_eq!(pgrx::varlena::varsize_any(bytea), size + pg_sys::VARHDRSZ);
            assert_eq!(pgrx::varlena::varsize_any_exhdr(bytea), size);

            let payload = pgrx::varlena::vardata_any(bytea);
            let copy = kll_double_sketch_deserialize(payload, size as c_uint);
            assert_eq!(kll_double_sketch_get_n(copy), 1_000);
            assert_eq!(
                kll_double_sketch_get_quantile(copy, 0.3),
                kll_double_sketch_get_quantile(sketch, 0.3)
            );
            assert_eq!(kll_double_sketch_get_quantile(copy, 0.0), 0.0);
            assert_eq!(kll_double_sketch_get_quantile(copy, 1.0), 999.0);

            kll_double_sketch_merge(sketch, sketch);
            assert_eq!(kll_double_sketch_get_n(sketch), 2_000);

            kll_double_sketch_delete(copy);
            kll_double_sketch_delete(sketch);
        }
    }

    #[pg_test]
    fn test_empty_sketch_answers_nan() {
        unsafe {
            let sketch = kll_double_sketch_new(200);
            assert!(kll_double_sketch_get_rank(sketch, 1.0).is_nan());
            assert!(kll_double_sketch_get_quantile(sketch, 0.5).is_nan());
            kll_double_sketch_delete(sketch);
        }
    }

    #[pg_test]
    fn test_context_reset_releases_sketch() {
        let mut context = PgMemoryContexts::new("kll sketch test");
        let sketch = unsafe {
            context.switch_to(|_| {
                let sketch = kll_float_sketch_new(200);
                kll_float_sketch_update(sketch, 1.0);
                sketch
            })
        };
        unsafe {
            // the callback is the first field of the handle block
            assert_eq!((*context.value()).reset_cbs.cast::<c_void>(), sketch);
            assert!(handle_ref::<f32>(sketch).is_ok());
            memory::release_handle::<f32>(sketch);
            let err = handle_ref::<f32>(sketch).unwrap_err();
            assert_eq!(err.message(), "sketch handle was already deleted");
            pg_sys::MemoryContextReset(context.value());
        }
    }

    #[pg_test(error = "InvalidArgument => k must be in [8, 65535], got 2")]
    fn test_invalid_k_raises_error() {
        kll_float_sketch_new(2);
    }

    #[pg_test(error = "EmptySketch => operation is undefined for an empty sketch")]
    fn test_empty_pmf_raises_error() {
        unsafe {
            let sketch = kll_double_sketch_new(200);
            let split_points = [1.0f64];
            kll_double_sketch_get_pmf(sketch, split_points.as_ptr(), 1);
        }
    }

    #[pg_test(error = "InvalidArgument => sketch handle was already deleted")]
    fn test_double_delete_raises_error() {
        unsafe {
            let sketch = kll_float_sketch_new(200);
            kll_float_sketch_delete(sketch);
            kll_float_sketch_delete(sketch);
        }
    }
}
