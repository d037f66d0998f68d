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

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;

use crate::error::Error;
use crate::host::ErrorChannel;

/// Runs `op` and returns its value, or reports its failure to `channel`.
///
/// Both an [`Error`] and a panic count as failure. The channel sees the
/// error's display text or the panic message unchanged, and is called at
/// most once.
///
/// # Examples
///
/// ```
/// use datasketches_pg::adapter::escalate;
/// use datasketches_pg::host::PanicChannel;
///
/// let n = escalate(&PanicChannel, || Ok(42u64));
/// assert_eq!(n, 42);
/// ```
pub fn escalate<C, R, F>(channel: &C, op: F) -> R
where
    C: ErrorChannel + ?Sized,
    F: FnOnce() -> Result<R, Error>,
{
    let message = match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(Ok(value)) => return value,
        Ok(Err(err)) => err.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };
    tracing::error!(%message, "escalating sketch operation failure to host");
    channel.report(&message)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "sketch operation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&"owned".to_string()), "owned");
        assert_eq!(panic_message(&7u8), "sketch operation panicked");
    }
}
