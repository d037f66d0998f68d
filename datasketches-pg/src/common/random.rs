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

//! Random bit source used by KLL compaction.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

const ZERO_STATE_REPLACEMENT: u64 = 0x9e3779b97f4a7c15;

/// Random number source for sketches.
pub(crate) trait RandomSource {
    /// Returns the next random 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Returns a random bit as 0 or 1.
    fn next_bit(&mut self) -> u32 {
        (self.next_u64() & 1) as u32
    }
}

/// Xorshift-based random generator.
///
/// State zero is a fixed point of xorshift, so it is replaced on seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn seeded(seed: u64) -> Self {
        let state = if seed == 0 {
            ZERO_STATE_REPLACEMENT
        } else {
            seed
        };
        Self { state }
    }

    /// Seeds from the wall clock and the process id.
    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self::seeded(nanos as u64 ^ (std::process::id() as u64))
    }
}

impl RandomSource for XorShift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_is_replaced() {
        let mut rng = XorShift64::seeded(0);
        assert_eq!(rng, XorShift64::seeded(ZERO_STATE_REPLACEMENT));
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = XorShift64::seeded(42);
        let mut b = XorShift64::seeded(42);
        for _ in 0..100 {
            assert_eq!(a.next_bit(), b.next_bit());
        }
    }

    #[test]
    fn test_bits_are_mixed() {
        let mut rng = XorShift64::seeded(7);
        let ones: u32 = (0..1000).map(|_| rng.next_bit()).sum();
        assert!(ones > 400 && ones < 600, "got {ones} ones");
    }
}
