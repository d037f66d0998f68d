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

use std::cmp::Ordering;
use std::fmt;

use super::DEFAULT_K;
use super::DEFAULT_M;
use super::MAX_K;
use super::MIN_K;
use super::helper::MAX_NUM_LEVELS;
use super::helper::compute_total_capacity;
use super::helper::level_capacity;
use super::helper::sum_the_sample_weights;
use super::serialization::DATA_START;
use super::serialization::DATA_START_SINGLE_ITEM;
use super::serialization::EMPTY_SIZE_BYTES;
use super::serialization::FLAG_EMPTY;
use super::serialization::FLAG_LEVEL_ZERO_SORTED;
use super::serialization::FLAG_SINGLE_ITEM;
use super::serialization::LEVEL_OFFSET_BYTES;
use super::serialization::PREAMBLE_INTS_FULL;
use super::serialization::PREAMBLE_INTS_SHORT;
use super::serialization::SERIAL_VERSION_EMPTY_FULL;
use super::serialization::SERIAL_VERSION_SINGLE;
use super::sorted_view::SortedView;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::family::Family;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;

/// Item types a [`KllSketch`] can hold.
///
/// Items are fixed-width floating point numbers; NaN never enters a sketch.
pub(crate) trait KllItem: Copy + fmt::Display {
    /// Serialized width in bytes.
    const SIZE_BYTES: usize;

    /// Answer of quantile queries on an empty sketch.
    const NAN: Self;

    fn compare(a: &Self, b: &Self) -> Ordering;

    fn is_nan(&self) -> bool;

    fn write(&self, bytes: &mut SketchBytes);

    fn read(input: &mut SketchSlice<'_>) -> Result<Self, Error>;
}

impl KllItem for f32 {
    const SIZE_BYTES: usize = 4;
    const NAN: Self = f32::NAN;

    fn compare(a: &Self, b: &Self) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Greater)
    }

    fn is_nan(&self) -> bool {
        f32::is_nan(*self)
    }

    fn write(&self, bytes: &mut SketchBytes) {
        bytes.write_f32_le(*self);
    }

    fn read(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
        input
            .read_f32_le()
            .map_err(|_| Error::insufficient_data("item"))
    }
}

impl KllItem for f64 {
    const SIZE_BYTES: usize = 8;
    const NAN: Self = f64::NAN;

    fn compare(a: &Self, b: &Self) -> Ordering {
        a.partial_cmp(b).unwrap_or(Ordering::Greater)
    }

    fn is_nan(&self) -> bool {
        f64::is_nan(*self)
    }

    fn write(&self, bytes: &mut SketchBytes) {
        bytes.write_f64_le(*self);
    }

    fn read(input: &mut SketchSlice<'_>) -> Result<Self, Error> {
        input
            .read_f64_le()
            .map_err(|_| Error::insufficient_data("item"))
    }
}

/// KLL sketch for estimating quantiles and ranks.
///
/// Level `i` holds items of weight `2^i`. Level zero keeps the most recent
/// item first and is only sorted when it gets compacted.
///
/// See the [kll module level documentation](crate::kll) for more.
#[allow(private_bounds)]
#[derive(Debug, Clone)]
pub struct KllSketch<T: KllItem> {
    k: u16,
    m: u8,
    min_k: u16,
    n: u64,
    is_level_zero_sorted: bool,
    levels: Vec<Vec<T>>,
    min_item: Option<T>,
    max_item: Option<T>,
    rng: XorShift64,
}

impl<T: KllItem> PartialEq for KllSketch<T> {
    fn eq(&self, other: &Self) -> bool {
        // the random state is not part of the sketch content
        self.k == other.k
            && self.m == other.m
            && self.min_k == other.min_k
            && self.n == other.n
            && self.is_level_zero_sorted == other.is_level_zero_sorted
            && same_items(self.min_item.as_slice(), other.min_item.as_slice())
            && same_items(self.max_item.as_slice(), other.max_item.as_slice())
            && self.levels.len() == other.levels.len()
            && self
                .levels
                .iter()
                .zip(&other.levels)
                .all(|(a, b)| same_items(a, b))
    }
}

fn same_items<T: KllItem>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| T::compare(x, y) == Ordering::Equal)
}

impl<T: KllItem> Default for KllSketch<T> {
    fn default() -> Self {
        Self::with_rng(DEFAULT_K, XorShift64::from_entropy())
    }
}

#[allow(private_bounds)]
impl<T: KllItem> KllSketch<T> {
    /// Creates a new sketch with the given value of k.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if k is not in [`MIN_K`], [`MAX_K`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use datasketches_pg::kll::KllSketch;
    /// let sketch = KllSketch::<f64>::new(200).unwrap();
    /// assert_eq!(sketch.k(), 200);
    /// assert!(KllSketch::<f64>::new(4).is_err());
    /// ```
    pub fn new(k: u16) -> Result<Self, Error> {
        check_k(k)?;
        Ok(Self::with_rng(k, XorShift64::from_entropy()))
    }

    pub(super) fn with_rng(k: u16, rng: XorShift64) -> Self {
        Self {
            k,
            m: DEFAULT_M,
            min_k: k,
            n: 0,
            is_level_zero_sorted: false,
            levels: vec![Vec::new()],
            min_item: None,
            max_item: None,
            rng,
        }
    }

    /// Returns parameter k used to configure this sketch.
    pub fn k(&self) -> u16 {
        self.k
    }

    /// Returns parameter m, the minimum level width.
    pub fn m(&self) -> u8 {
        self.m
    }

    /// Returns the smallest k among the sketches merged into this one.
    pub fn min_k(&self) -> u16 {
        self.min_k
    }

    /// Returns the length of the input stream.
    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Returns true once the sketch has compacted at least once.
    pub fn is_estimation_mode(&self) -> bool {
        self.levels.len() > 1
    }

    /// Returns the number of retained items.
    pub fn num_retained(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn is_level_zero_sorted(&self) -> bool {
        self.is_level_zero_sorted
    }

    /// Returns the number of items the current levels can hold.
    pub fn capacity(&self) -> usize {
        compute_total_capacity(self.k, self.m, self.levels.len()) as usize
    }

    pub fn min_item(&self) -> Option<T> {
        self.min_item
    }

    pub fn max_item(&self) -> Option<T> {
        self.max_item
    }

    pub(super) fn levels(&self) -> &[Vec<T>] {
        &self.levels
    }

    /// Updates the sketch with a new item.
    ///
    /// NaN values are ignored.
    pub fn update(&mut self, item: T) {
        if item.is_nan() {
            return;
        }
        self.update_min_max(item, item);
        self.insert_level_zero(item);
        self.n += 1;
    }

    /// Merges another sketch into this one.
    ///
    /// Sketches with different k can be merged; the accuracy of the result is
    /// that of the smaller k.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IncompatibleSketch`](crate::error::ErrorKind::IncompatibleSketch)
    /// if the sketches use different values of m.
    pub fn merge(&mut self, other: &KllSketch<T>) -> Result<(), Error> {
        if other.is_empty() {
            return Ok(());
        }
        if self.m != other.m {
            return Err(Error::incompatible(format!(
                "incompatible m values: {} and {}",
                self.m, other.m
            )));
        }

        let final_n = self.n + other.n;
        if let (Some(min), Some(max)) = (other.min_item, other.max_item) {
            self.update_min_max(min, max);
        }

        for &item in &other.levels[0] {
            self.insert_level_zero(item);
        }
        if other.levels.len() > 1 {
            self.merge_higher_levels(other);
        }

        self.n = final_n;
        if other.is_estimation_mode() {
            self.min_k = self.min_k.min(other.min_k);
        }

        debug_assert_eq!(
            sum_the_sample_weights(self.levels.iter().map(Vec::len)),
            self.n,
            "total weight does not match n"
        );
        Ok(())
    }

    /// Returns the normalized rank of the given item, or NaN if the sketch
    /// is empty.
    pub fn rank(&self, item: &T, inclusive: bool) -> f64 {
        if self.is_empty() {
            return f64::NAN;
        }
        SortedView::from_levels(&self.levels).rank(item, inclusive)
    }

    /// Returns the item at the given normalized rank, or NaN if the sketch
    /// is empty.
    ///
    /// Ranks 0.0 and 1.0 answer the exact minimum and maximum of the stream.
    ///
    /// # Errors
    ///
    /// Fails if rank is not in [0.0, 1.0].
    ///
    /// # Examples
    ///
    /// ```
    /// # use datasketches_pg::kll::KllSketch;
    /// let mut sketch = KllSketch::<f64>::new(200).unwrap();
    /// assert!(sketch.quantile(0.5, false).unwrap().is_nan());
    /// sketch.update(3.0);
    /// sketch.update(1.0);
    /// assert_eq!(sketch.quantile(0.0, false).unwrap(), 1.0);
    /// assert_eq!(sketch.quantile(1.0, false).unwrap(), 3.0);
    /// ```
    pub fn quantile(&self, rank: f64, inclusive: bool) -> Result<T, Error> {
        if self.is_empty() {
            return Ok(T::NAN);
        }
        check_rank(rank)?;
        if let Some(item) = self.extreme_item(rank) {
            return Ok(item);
        }
        Ok(SortedView::from_levels(&self.levels).quantile(rank, inclusive))
    }

    /// Returns the items at each of the given normalized ranks.
    ///
    /// # Errors
    ///
    /// Fails on an empty sketch or if any rank is not in [0.0, 1.0].
    pub fn quantiles(&self, ranks: &[f64], inclusive: bool) -> Result<Vec<T>, Error> {
        let view = self.sorted_view()?;
        ranks
            .iter()
            .map(|&rank| {
                check_rank(rank)?;
                Ok(self
                    .extreme_item(rank)
                    .unwrap_or_else(|| view.quantile(rank, inclusive)))
            })
            .collect()
    }

    /// Returns the approximate cumulative distribution at the split points,
    /// followed by a final 1.0.
    pub fn cdf(&self, split_points: &[T], inclusive: bool) -> Result<Vec<f64>, Error> {
        self.sorted_view()?.cdf(split_points, inclusive)
    }

    /// Returns the approximate probability mass of the `len + 1` intervals
    /// bounded by the split points.
    pub fn pmf(&self, split_points: &[T], inclusive: bool) -> Result<Vec<f64>, Error> {
        self.sorted_view()?.pmf(split_points, inclusive)
    }

    /// Returns the normalized rank error, single-sided when `pmf` is false.
    pub fn normalized_rank_error(&self, pmf: bool) -> f64 {
        normalized_rank_error(self.min_k, pmf)
    }

    /// Serializes the sketch to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        self.serialize_with_header(0)
    }

    /// Serializes the sketch after `header_len` zeroed bytes the caller fills in.
    pub fn serialize_with_header(&self, header_len: usize) -> Vec<u8> {
        let mut bytes = SketchBytes::with_header(header_len, self.serialized_size());

        let is_empty = self.is_empty();
        let is_single_item = self.n == 1;

        let mut flags = 0;
        if is_empty {
            flags |= FLAG_EMPTY;
        }
        if self.is_level_zero_sorted {
            flags |= FLAG_LEVEL_ZERO_SORTED;
        }
        if is_single_item {
            flags |= FLAG_SINGLE_ITEM;
        }

        bytes.write_u8(if is_empty || is_single_item {
            PREAMBLE_INTS_SHORT
        } else {
            PREAMBLE_INTS_FULL
        });
        bytes.write_u8(if is_single_item {
            SERIAL_VERSION_SINGLE
        } else {
            SERIAL_VERSION_EMPTY_FULL
        });
        bytes.write_u8(Family::KLL.id);
        bytes.write_u8(flags);
        bytes.write_u16_le(self.k);
        bytes.write_u8(self.m);
        bytes.write_u8(0);

        if is_empty {
            return bytes.into_bytes();
        }
        if is_single_item {
            self.levels[0][0].write(&mut bytes);
            return bytes.into_bytes();
        }

        bytes.write_u64_le(self.n);
        bytes.write_u16_le(self.min_k);
        bytes.write_u8(self.levels.len() as u8);
        bytes.write_u8(0);
        // the offset past the top level is implied by the capacity
        let offsets = self.level_offsets();
        for offset in &offsets[..self.levels.len()] {
            bytes.write_u32_le(*offset);
        }
        if let (Some(min), Some(max)) = (self.min_item, self.max_item) {
            min.write(&mut bytes);
            max.write(&mut bytes);
        }
        for item in self.levels.iter().flatten() {
            item.write(&mut bytes);
        }
        bytes.into_bytes()
    }

    /// Returns the size of [`serialize`](Self::serialize) output in bytes.
    pub fn serialized_size(&self) -> usize {
        match self.n {
            0 => EMPTY_SIZE_BYTES,
            1 => DATA_START_SINGLE_ITEM + T::SIZE_BYTES,
            _ => {
                DATA_START
                    + self.levels.len() * LEVEL_OFFSET_BYTES
                    + (self.num_retained() + 2) * T::SIZE_BYTES
            }
        }
    }

    /// Deserializes a sketch from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidData`](crate::error::ErrorKind::InvalidData)
    /// if the bytes are truncated or are not a KLL sketch of this item type.
    pub fn deserialize(bytes: &[u8]) -> Result<KllSketch<T>, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = SketchSlice::new(bytes);
        let preamble_ints = cursor.read_u8().map_err(make_error("preamble_ints"))?;
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        let k = cursor.read_u16_le().map_err(make_error("k"))?;
        let m = cursor.read_u8().map_err(make_error("m"))?;
        cursor.read_u8().map_err(make_error("unused"))?;

        Family::KLL.validate_id(family_id)?;
        Family::KLL.validate_pre_ints(preamble_ints)?;
        if m != DEFAULT_M {
            return Err(Error::deserial(format!(
                "invalid m: expected {DEFAULT_M}, got {m}"
            )));
        }
        if !(MIN_K..=MAX_K).contains(&k) {
            return Err(Error::deserial(format!("k out of range: {k}")));
        }

        let is_empty = flags & FLAG_EMPTY != 0;
        let is_single_item = flags & FLAG_SINGLE_ITEM != 0;
        let is_level_zero_sorted = flags & FLAG_LEVEL_ZERO_SORTED != 0;

        let expected_version = if is_single_item {
            SERIAL_VERSION_SINGLE
        } else {
            SERIAL_VERSION_EMPTY_FULL
        };
        if serial_version != expected_version {
            return Err(Error::deserial(format!(
                "invalid serial version: expected {expected_version}, got {serial_version}"
            )));
        }
        let expected_preamble = if is_empty || is_single_item {
            PREAMBLE_INTS_SHORT
        } else {
            PREAMBLE_INTS_FULL
        };
        if preamble_ints != expected_preamble {
            return Err(Error::deserial(format!(
                "invalid preamble ints: expected {expected_preamble}, got {preamble_ints}"
            )));
        }

        let mut sketch = Self::with_rng(k, XorShift64::from_entropy());
        sketch.is_level_zero_sorted = is_level_zero_sorted;
        if is_empty {
            return Ok(sketch);
        }
        if is_single_item {
            let item = T::read(&mut cursor)?;
            if item.is_nan() {
                return Err(Error::deserial("single item must not be NaN"));
            }
            sketch.n = 1;
            sketch.levels[0].push(item);
            sketch.min_item = Some(item);
            sketch.max_item = Some(item);
            return Ok(sketch);
        }

        let n = cursor.read_u64_le().map_err(make_error("n"))?;
        let min_k = cursor.read_u16_le().map_err(make_error("min_k"))?;
        let num_levels = cursor.read_u8().map_err(make_error("num_levels"))? as usize;
        cursor.read_u8().map_err(make_error("unused"))?;

        if num_levels == 0 || num_levels > MAX_NUM_LEVELS {
            return Err(Error::deserial(format!(
                "num_levels must be in [1, {MAX_NUM_LEVELS}], got {num_levels}"
            )));
        }
        if !(MIN_K..=k).contains(&min_k) {
            return Err(Error::deserial(format!(
                "min_k must be in [{MIN_K}, {k}], got {min_k}"
            )));
        }

        let capacity = compute_total_capacity(k, m, num_levels);
        let mut offsets = Vec::with_capacity(num_levels + 1);
        for _ in 0..num_levels {
            offsets.push(cursor.read_u32_le().map_err(make_error("levels"))?);
        }
        offsets.push(capacity);
        if offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::deserial(
                "level offsets must be non-decreasing and within capacity",
            ));
        }

        let retained = (capacity - offsets[0]) as usize;
        let needed = (retained + 2) * T::SIZE_BYTES;
        if cursor.remaining() < needed {
            return Err(Error::insufficient_data("items")
                .with_context("expected", needed)
                .with_context("actual", cursor.remaining()));
        }

        let min_item = T::read(&mut cursor)?;
        let max_item = T::read(&mut cursor)?;
        let mut levels = Vec::with_capacity(num_levels);
        for window in offsets.windows(2) {
            let size = (window[1] - window[0]) as usize;
            let level = (0..size)
                .map(|_| T::read(&mut cursor))
                .collect::<Result<Vec<_>, _>>()?;
            levels.push(level);
        }

        if sum_the_sample_weights(levels.iter().map(Vec::len)) != n {
            return Err(Error::deserial("level weights do not add up to n"));
        }

        sketch.min_k = min_k;
        sketch.n = n;
        sketch.levels = levels;
        sketch.min_item = Some(min_item);
        sketch.max_item = Some(max_item);
        Ok(sketch)
    }

    // compaction may discard the extremes from the levels, so they are kept apart
    fn extreme_item(&self, rank: f64) -> Option<T> {
        if rank == 0.0 {
            self.min_item
        } else if rank == 1.0 {
            self.max_item
        } else {
            None
        }
    }

    fn sorted_view(&self) -> Result<SortedView<T>, Error> {
        if self.is_empty() {
            return Err(Error::empty_sketch());
        }
        Ok(SortedView::from_levels(&self.levels))
    }

    fn level_offsets(&self) -> Vec<u32> {
        let capacity = self.capacity() as u32;
        let mut offset = capacity - self.num_retained() as u32;
        let mut offsets = Vec::with_capacity(self.levels.len() + 1);
        offsets.push(offset);
        for level in &self.levels {
            offset += level.len() as u32;
            offsets.push(offset);
        }
        offsets
    }

    fn update_min_max(&mut self, min: T, max: T) {
        match (self.min_item, self.max_item) {
            (Some(cur_min), Some(cur_max)) => {
                if T::compare(&min, &cur_min) == Ordering::Less {
                    self.min_item = Some(min);
                }
                if T::compare(&cur_max, &max) == Ordering::Less {
                    self.max_item = Some(max);
                }
            }
            _ => {
                self.min_item = Some(min);
                self.max_item = Some(max);
            }
        }
    }

    fn insert_level_zero(&mut self, item: T) {
        if self.num_retained() >= self.capacity() {
            self.compress_while_updating();
        }
        self.is_level_zero_sorted = false;
        self.levels[0].insert(0, item);
    }

    fn compress_while_updating(&mut self) {
        let level = self.find_level_to_compact();
        if level + 1 == self.levels.len() {
            self.levels.push(Vec::new());
        }
        let sort_current = level == 0 && !self.is_level_zero_sorted;
        let current = std::mem::take(&mut self.levels[level]);
        let above = std::mem::take(&mut self.levels[level + 1]);
        let (leftover, promoted) = compact_level(current, above, sort_current, &mut self.rng);
        self.levels[level] = leftover;
        self.levels[level + 1] = promoted;
    }

    fn find_level_to_compact(&self) -> usize {
        let num_levels = self.levels.len();
        self.levels
            .iter()
            .enumerate()
            .position(|(level, items)| {
                items.len() as u32 >= level_capacity(self.k, num_levels, level, self.m)
            })
            // a full sketch always has one level at or over its capacity
            .unwrap_or(num_levels - 1)
    }

    fn merge_higher_levels(&mut self, other: &KllSketch<T>) {
        let num_levels = self.levels.len().max(other.levels.len());
        let mut work = std::mem::take(&mut self.levels);
        work.resize_with(num_levels, Vec::new);
        for (level, items) in work.iter_mut().enumerate().skip(1) {
            let theirs = other.levels.get(level).map(Vec::as_slice).unwrap_or(&[]);
            if !theirs.is_empty() {
                *items = merge_sorted(std::mem::take(items), theirs.to_vec());
            }
        }
        self.levels = self.general_compress(work);
    }

    // Compacts bottom-up until the retained items fit the capacity of the
    // resulting number of levels.
    fn general_compress(&mut self, mut levels: Vec<Vec<T>>) -> Vec<Vec<T>> {
        let mut num_levels = levels.len();
        let mut retained: usize = levels.iter().map(Vec::len).sum();
        let mut target = compute_total_capacity(self.k, self.m, num_levels) as usize;

        let mut level = 0;
        while level < num_levels {
            if level + 1 == levels.len() {
                levels.push(Vec::new());
            }
            let cap = level_capacity(self.k, num_levels, level, self.m) as usize;
            if retained >= target && levels[level].len() >= cap {
                let sort_current = level == 0 && !self.is_level_zero_sorted;
                let current = std::mem::take(&mut levels[level]);
                let above = std::mem::take(&mut levels[level + 1]);
                let before = current.len() + above.len();
                let (leftover, promoted) =
                    compact_level(current, above, sort_current, &mut self.rng);
                retained -= before - leftover.len() - promoted.len();
                levels[level] = leftover;
                levels[level + 1] = promoted;

                if level + 1 == num_levels {
                    num_levels += 1;
                    target += level_capacity(self.k, num_levels, 0, self.m) as usize;
                }
            }
            level += 1;
        }

        levels.truncate(num_levels);
        levels
    }
}

impl<T: KllItem> fmt::Display for KllSketch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary(false, false))
    }
}

/// Halves `current` into the level above, keeping an odd item behind.
///
/// Returns the new contents of the compacted level and of the level above.
fn compact_level<T: KllItem>(
    mut current: Vec<T>,
    above: Vec<T>,
    sort_current: bool,
    rng: &mut impl RandomSource,
) -> (Vec<T>, Vec<T>) {
    let leftover = if current.len() % 2 == 1 {
        vec![current.remove(0)]
    } else {
        Vec::new()
    };
    if sort_current {
        current.sort_by(T::compare);
    }
    let offset = rng.next_bit() as usize;
    let promoted: Vec<T> = current.into_iter().skip(offset).step_by(2).collect();
    let above = if above.is_empty() {
        promoted
    } else {
        merge_sorted(promoted, above)
    };
    (leftover, above)
}

fn merge_sorted<T: KllItem>(left: Vec<T>, right: Vec<T>) -> Vec<T> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => T::compare(l, r) == Ordering::Less,
            _ => break,
        };
        let next = if take_left { left.next() } else { right.next() };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    merged
}

fn check_k(k: u16) -> Result<(), Error> {
    if (MIN_K..=MAX_K).contains(&k) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "k must be in [{MIN_K}, {MAX_K}], got {k}"
        )))
    }
}

fn check_rank(rank: f64) -> Result<(), Error> {
    if (0.0..=1.0).contains(&rank) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "rank must be in [0.0, 1.0], got {rank}"
        )))
    }
}

pub(super) fn normalized_rank_error(k: u16, pmf: bool) -> f64 {
    let k = f64::from(k);
    if pmf {
        2.446 / k.powf(0.9433)
    } else {
        2.296 / k.powf(0.9723)
    }
}
