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

//! Level capacity arithmetic.

/// Deepest level count whose capacities `int_cap_aux` can evaluate.
pub(crate) const MAX_NUM_LEVELS: usize = 61;

const POWERS_OF_THREE: [u64; 31] = {
    let mut table = [1u64; 31];
    let mut i = 1;
    while i < table.len() {
        table[i] = table[i - 1] * 3;
        i += 1;
    }
    table
};

/// Sum of the capacities of all levels of a sketch with `num_levels` levels.
pub(crate) fn compute_total_capacity(k: u16, m: u8, num_levels: usize) -> u32 {
    (0..num_levels)
        .map(|level| level_capacity(k, num_levels, level, m))
        .sum()
}

/// Capacity of the level at `height`; the top level gets `k`, each level
/// below shrinks by a factor of 2/3 down to `min_wid`.
pub(crate) fn level_capacity(k: u16, num_levels: usize, height: usize, min_wid: u8) -> u32 {
    debug_assert!(height < num_levels, "height must be < num_levels");
    let depth = (num_levels - height - 1) as u8;
    u32::from(int_cap_aux(k, depth)).max(u32::from(min_wid))
}

fn int_cap_aux(k: u16, depth: u8) -> u16 {
    debug_assert!(depth <= 60, "depth must be <= 60");
    if depth <= 30 {
        return int_cap_aux_aux(k, depth);
    }
    let half = depth / 2;
    int_cap_aux_aux(int_cap_aux_aux(k, half), depth - half)
}

// round(k * (2/3)^depth), computed in integers
fn int_cap_aux_aux(k: u16, depth: u8) -> u16 {
    let twok = u64::from(k) << 1;
    let tmp = (twok << depth) / POWERS_OF_THREE[depth as usize];
    ((tmp + 1) >> 1) as u16
}

/// Total weight represented by levels of the given sizes.
pub(crate) fn sum_the_sample_weights<I>(level_sizes: I) -> u64
where
    I: IntoIterator<Item = usize>,
{
    level_sizes
        .into_iter()
        .enumerate()
        .map(|(level, size)| (size as u64) << level)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_powers_of_three() {
        assert_eq!(POWERS_OF_THREE[0], 1);
        assert_eq!(POWERS_OF_THREE[5], 243);
        assert_eq!(POWERS_OF_THREE[30], 205891132094649);
    }

    #[test]
    fn test_single_level_capacity_is_k() {
        assert_eq!(level_capacity(200, 1, 0, 8), 200);
        assert_eq!(compute_total_capacity(200, 8, 1), 200);
    }

    #[test]
    fn test_lower_levels_shrink() {
        // top level keeps k, the level below holds round(2k/3)
        assert_eq!(level_capacity(200, 2, 1, 8), 200);
        assert_eq!(level_capacity(200, 2, 0, 8), 133);
        assert_eq!(compute_total_capacity(200, 8, 2), 333);
    }

    #[test]
    fn test_capacity_floor_is_min_width() {
        assert_eq!(level_capacity(8, 10, 0, 8), 8);
        assert_eq!(level_capacity(200, MAX_NUM_LEVELS, 0, 8), 8);
    }

    #[test]
    fn test_sample_weights() {
        assert_eq!(sum_the_sample_weights([3, 0, 2]), 3 + 8);
        assert_eq!(sum_the_sample_weights(Vec::<usize>::new()), 0);
    }
}
