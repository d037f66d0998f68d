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

//! Little-endian byte codec shared by sketch serialization and host buffers.

use std::io;
use std::io::Cursor;

use byteorder::LittleEndian;
use byteorder::ReadBytesExt;
use byteorder::WriteBytesExt;

pub(crate) mod family;

/// Growable output buffer for serialized sketches.
pub(crate) struct SketchBytes {
    bytes: Vec<u8>,
}

impl SketchBytes {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Starts a buffer whose first `header_len` bytes are zero and left for the caller.
    pub fn with_header(header_len: usize, capacity: usize) -> Self {
        let mut bytes = Vec::with_capacity(header_len + capacity);
        bytes.resize(header_len, 0);
        Self { bytes }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write(&mut self, buf: &[u8]) {
        self.bytes.extend_from_slice(buf);
    }

    // Writes into a Vec<u8> cannot fail, so the io::Result is discarded below.

    pub fn write_u8(&mut self, n: u8) {
        self.bytes.push(n);
    }

    pub fn write_u16_le(&mut self, n: u16) {
        let _ = self.bytes.write_u16::<LittleEndian>(n);
    }

    pub fn write_u32_le(&mut self, n: u32) {
        let _ = self.bytes.write_u32::<LittleEndian>(n);
    }

    pub fn write_u64_le(&mut self, n: u64) {
        let _ = self.bytes.write_u64::<LittleEndian>(n);
    }

    pub fn write_f32_le(&mut self, n: f32) {
        let _ = self.bytes.write_f32::<LittleEndian>(n);
    }

    pub fn write_f64_le(&mut self, n: f64) {
        let _ = self.bytes.write_f64::<LittleEndian>(n);
    }
}

/// Read cursor over serialized sketch bytes.
pub(crate) struct SketchSlice<'a> {
    slice: Cursor<&'a [u8]>,
}

impl<'a> SketchSlice<'a> {
    pub fn new(slice: &'a [u8]) -> Self {
        Self {
            slice: Cursor::new(slice),
        }
    }

    /// Number of bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        let len = self.slice.get_ref().len() as u64;
        len.saturating_sub(self.slice.position()) as usize
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.slice.read_u8()
    }

    pub fn read_u16_le(&mut self) -> io::Result<u16> {
        self.slice.read_u16::<LittleEndian>()
    }

    pub fn read_u32_le(&mut self) -> io::Result<u32> {
        self.slice.read_u32::<LittleEndian>()
    }

    pub fn read_u64_le(&mut self) -> io::Result<u64> {
        self.slice.read_u64::<LittleEndian>()
    }

    pub fn read_f32_le(&mut self) -> io::Result<f32> {
        self.slice.read_f32::<LittleEndian>()
    }

    pub fn read_f64_le(&mut self) -> io::Result<f64> {
        self.slice.read_f64::<LittleEndian>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_reserved() {
        let mut bytes = SketchBytes::with_header(4, 2);
        bytes.write_u16_le(0x0102);
        assert_eq!(bytes.into_bytes(), vec![0, 0, 0, 0, 0x02, 0x01]);
    }

    #[test]
    fn test_remaining_tracks_reads() {
        let data = [1u8, 0, 0, 0, 9];
        let mut slice = SketchSlice::new(&data);
        assert_eq!(slice.read_u32_le().unwrap(), 1);
        assert_eq!(slice.remaining(), 1);
        assert_eq!(slice.read_u8().unwrap(), 9);
        assert!(slice.read_u8().is_err());
        assert_eq!(slice.remaining(), 0);
    }
}
