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

//! Human readable description of a sketch.

use std::fmt::Write;

use super::helper::level_capacity;
use super::sketch::KllItem;
use super::sketch::KllSketch;

#[allow(private_bounds)]
impl<T: KllItem> KllSketch<T> {
    /// Returns a multi-line summary of the sketch, optionally listing the
    /// level sizes and every retained item.
    ///
    /// # Examples
    ///
    /// ```
    /// # use datasketches_pg::kll::KllSketch;
    /// let mut sketch = KllSketch::<f64>::new(200).unwrap();
    /// sketch.update(1.5);
    /// let summary = sketch.summary(false, false);
    /// assert!(summary.starts_with("### KLL sketch summary:"));
    /// assert!(summary.contains("   N              : 1\n"));
    /// ```
    pub fn summary(&self, print_levels: bool, print_items: bool) -> String {
        // writing into a String cannot fail
        let mut out = String::new();
        let _ = self.write_summary(&mut out, print_levels, print_items);
        out
    }

    fn write_summary(
        &self,
        out: &mut String,
        print_levels: bool,
        print_items: bool,
    ) -> std::fmt::Result {
        writeln!(out, "### KLL sketch summary:")?;
        writeln!(out, "   K              : {}", self.k())?;
        writeln!(out, "   min K          : {}", self.min_k())?;
        writeln!(out, "   M              : {}", self.m())?;
        writeln!(out, "   N              : {}", self.n())?;
        writeln!(
            out,
            "   Epsilon        : {}%",
            significant(self.normalized_rank_error(false) * 100.0, 3)
        )?;
        writeln!(
            out,
            "   Epsilon PMF    : {}%",
            significant(self.normalized_rank_error(true) * 100.0, 3)
        )?;
        writeln!(out, "   Empty          : {}", self.is_empty())?;
        writeln!(out, "   Estimation mode: {}", self.is_estimation_mode())?;
        writeln!(out, "   Levels         : {}", self.num_levels())?;
        writeln!(out, "   Sorted         : {}", self.is_level_zero_sorted())?;
        writeln!(out, "   Capacity items : {}", self.capacity())?;
        writeln!(out, "   Retained items : {}", self.num_retained())?;
        if let (Some(min), Some(max)) = (self.min_item(), self.max_item()) {
            writeln!(out, "   Min item       : {min}")?;
            writeln!(out, "   Max item       : {max}")?;
        }
        writeln!(out, "### End sketch summary")?;

        let num_levels = self.num_levels();
        if print_levels {
            writeln!(out, "### KLL sketch levels:")?;
            writeln!(out, "   index: nominal capacity, actual size")?;
            for (level, items) in self.levels().iter().enumerate() {
                let cap = level_capacity(self.k(), num_levels, level, self.m());
                writeln!(out, "   {level}: {cap}, {}", items.len())?;
            }
            writeln!(out, "### End sketch levels")?;
        }

        if print_items {
            writeln!(out, "### KLL sketch data:")?;
            for (level, items) in self.levels().iter().enumerate() {
                if items.is_empty() {
                    continue;
                }
                writeln!(out, " level {level}:")?;
                for item in items {
                    writeln!(out, "   {item}")?;
                }
            }
            writeln!(out, "### End sketch data")?;
        }
        Ok(())
    }
}

// Formats with the given number of significant digits.
fn significant(value: f64, digits: i32) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits - 1 - magnitude).max(0) as usize;
    format!("{value:.decimals$}")
}
