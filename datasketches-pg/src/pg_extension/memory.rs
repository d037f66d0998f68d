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

//! Sketch handles and result buffers in PostgreSQL memory contexts.
//!
//! A handle lives in a block allocated from the current memory context,
//! next to a reset callback of that context. Whatever happens to the
//! statement, resetting or deleting the context drops the sketch; an
//! explicit delete drops it earlier and leaves the emptied block to the
//! context.

use std::ffi::c_void;
use std::mem;
use std::ptr;

use pgrx::IntoDatum;
use pgrx::pg_sys;
use pgrx::varlena::set_varsize_4b;

use crate::adapter::HostItem;
use crate::adapter::SketchHandle;
use crate::error::Error;

#[repr(C)]
struct HandleBlock<T: HostItem> {
    callback: pg_sys::MemoryContextCallback,
    handle: Option<SketchHandle<T>>,
}

/// Moves a handle into the current memory context.
pub(super) fn into_raw<T: HostItem>(handle: SketchHandle<T>) -> *mut c_void {
    // SAFETY: palloc returns a MAXALIGNed block of the requested size or
    // raises an error; the callback lives as long as the block does.
    unsafe {
        let block = pg_sys::palloc(mem::size_of::<HandleBlock<T>>()).cast::<HandleBlock<T>>();
        block.write(HandleBlock {
            callback: pg_sys::MemoryContextCallback {
                func: Some(release_handle::<T>),
                arg: block.cast(),
                next: ptr::null_mut(),
            },
            handle: Some(handle),
        });
        pg_sys::MemoryContextRegisterResetCallback(
            pg_sys::CurrentMemoryContext,
            &raw mut (*block).callback,
        );
        block.cast()
    }
}

/// Reset callback of a handle block: drops the sketch if it is still there.
///
/// # Safety
///
/// `arg` must be the block the callback was registered with.
pub(super) unsafe extern "C-unwind" fn release_handle<T: HostItem>(arg: *mut c_void) {
    // SAFETY: guaranteed by the caller.
    let block = unsafe { &mut *arg.cast::<HandleBlock<T>>() };
    if let Some(handle) = block.handle.take() {
        tracing::trace!(item = T::TYPE_NAME, "memory context released kll sketch");
        handle.delete();
    }
}

/// Drops the sketch behind `ptr`.
///
/// # Safety
///
/// `ptr` must be null or come from [`into_raw`] with the same item type,
/// and its memory context must still be alive.
pub(super) unsafe fn delete<T: HostItem>(ptr: *mut c_void) -> Result<(), Error> {
    // SAFETY: guaranteed by the caller.
    let block = unsafe { block_mut::<T>(ptr) }?;
    let handle = block
        .handle
        .take()
        .ok_or_else(|| Error::invalid_argument("sketch handle was already deleted"))?;
    handle.delete();
    Ok(())
}

/// # Safety
///
/// `ptr` must be null or come from [`into_raw`] with the same item type,
/// and its memory context must still be alive.
pub(super) unsafe fn handle_ref<'a, T: HostItem>(
    ptr: *const c_void,
) -> Result<&'a SketchHandle<T>, Error> {
    // SAFETY: guaranteed by the caller.
    let block = unsafe { ptr.cast::<HandleBlock<T>>().as_ref() }
        .ok_or_else(|| Error::invalid_argument("sketch handle is null"))?;
    block
        .handle
        .as_ref()
        .ok_or_else(|| Error::invalid_argument("sketch handle was already deleted"))
}

/// # Safety
///
/// Same as [`handle_ref`], and the handle must not be otherwise borrowed.
pub(super) unsafe fn handle_mut<'a, T: HostItem>(
    ptr: *mut c_void,
) -> Result<&'a mut SketchHandle<T>, Error> {
    // SAFETY: guaranteed by the caller.
    let block = unsafe { block_mut::<T>(ptr) }?;
    block
        .handle
        .as_mut()
        .ok_or_else(|| Error::invalid_argument("sketch handle was already deleted"))
}

unsafe fn block_mut<'a, T: HostItem>(ptr: *mut c_void) -> Result<&'a mut HandleBlock<T>, Error> {
    // SAFETY: guaranteed by the caller.
    unsafe { ptr.cast::<HandleBlock<T>>().as_mut() }
        .ok_or_else(|| Error::invalid_argument("sketch handle is null"))
}

/// Copies `items` into a fresh block of the current memory context.
pub(super) fn palloc_copy<U: Copy>(items: &[U]) -> *mut U {
    // SAFETY: the block is MAXALIGNed and sized for every item.
    unsafe {
        let ptr = pg_sys::palloc(mem::size_of_val(items).max(1)).cast::<U>();
        ptr::copy_nonoverlapping(items.as_ptr(), ptr, items.len());
        ptr
    }
}

/// Copies a buffer whose first `VARHDRSZ` bytes were left free into a
/// `bytea` and fills in its header.
pub(super) fn palloc_varlena(bytes: &[u8]) -> Result<*mut pg_sys::varlena, Error> {
    let total = i32::try_from(bytes.len())
        .map_err(|_| Error::host(format!("bytea of {} bytes is too large", bytes.len())))?;
    debug_assert!(bytes.len() >= pg_sys::VARHDRSZ);
    let varlena = palloc_copy(bytes).cast::<pg_sys::varlena>();
    // SAFETY: the block holds at least the four header bytes.
    unsafe { set_varsize_4b(varlena, total) };
    Ok(varlena)
}

/// Converts `values` into a `Datum` array in the current memory context.
pub(super) fn palloc_datums<V: IntoDatum>(values: Vec<V>) -> Result<*mut pg_sys::Datum, Error> {
    let datums = values
        .into_iter()
        .map(|value| {
            value
                .into_datum()
                .ok_or_else(|| Error::host("value has no datum form"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(palloc_copy(&datums))
}
