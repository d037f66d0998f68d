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

use super::sketch::KllItem;
use crate::error::Error;

/// Retained items sorted ascending, each with the cumulative weight up to
/// and including itself.
#[derive(Debug, Clone)]
pub(crate) struct SortedView<T: KllItem> {
    items: Vec<T>,
    cumulative_weights: Vec<u64>,
    total_weight: u64,
}

impl<T: KllItem> SortedView<T> {
    pub fn from_levels(levels: &[Vec<T>]) -> Self {
        let mut entries: Vec<(T, u64)> = levels
            .iter()
            .enumerate()
            .flat_map(|(level, items)| items.iter().map(move |&item| (item, 1u64 << level)))
            .collect();
        entries.sort_by(|a, b| T::compare(&a.0, &b.0));

        let mut total_weight = 0;
        let mut items = Vec::with_capacity(entries.len());
        let mut cumulative_weights = Vec::with_capacity(entries.len());
        for (item, weight) in entries {
            total_weight += weight;
            items.push(item);
            cumulative_weights.push(total_weight);
        }
        Self {
            items,
            cumulative_weights,
            total_weight,
        }
    }

    pub fn rank(&self, item: &T, inclusive: bool) -> f64 {
        // number of retained items strictly below (or at most, if inclusive) the item
        let below = self.items.partition_point(|retained| match T::compare(retained, item) {
            Ordering::Less => true,
            Ordering::Equal => inclusive,
            Ordering::Greater => false,
        });
        match below {
            0 => 0.0,
            idx => self.cumulative_weights[idx - 1] as f64 / self.total_weight as f64,
        }
    }

    pub fn quantile(&self, rank: f64, inclusive: bool) -> T {
        let scaled = rank * self.total_weight as f64;
        let idx = if inclusive {
            let weight = scaled.ceil() as u64;
            self.cumulative_weights.partition_point(|&w| w < weight)
        } else {
            let weight = scaled as u64;
            self.cumulative_weights.partition_point(|&w| w <= weight)
        };
        self.items[idx.min(self.items.len() - 1)]
    }

    pub fn cdf(&self, split_points: &[T], inclusive: bool) -> Result<Vec<f64>, Error> {
        check_split_points(split_points)?;
        let mut ranks: Vec<f64> = split_points
            .iter()
            .map(|item| self.rank(item, inclusive))
            .collect();
        ranks.push(1.0);
        Ok(ranks)
    }

    pub fn pmf(&self, split_points: &[T], inclusive: bool) -> Result<Vec<f64>, Error> {
        let mut buckets = self.cdf(split_points, inclusive)?;
        for i in (1..buckets.len()).rev() {
            buckets[i] -= buckets[i - 1];
        }
        Ok(buckets)
    }
}

fn check_split_points<T: KllItem>(split_points: &[T]) -> Result<(), Error> {
    if split_points.iter().any(KllItem::is_nan) {
        return Err(Error::invalid_argument(
            "split_points must not contain NaN values",
        ));
    }
    if split_points
        .windows(2)
        .any(|w| T::compare(&w[0], &w[1]) != Ordering::Less)
    {
        return Err(Error::invalid_argument(
            "split_points must be unique and monotonically increasing",
        ));
    }
    Ok(())
}
