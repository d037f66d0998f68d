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

/// The host's fatal error reporting call.
///
/// Reporting never returns: the host unwinds the current statement (or the
/// process) on its own terms. Implementations receive each message exactly
/// as the failing operation produced it.
pub trait ErrorChannel {
    fn report(&self, message: &str) -> !;
}

/// Reports by panicking with the message as payload.
///
/// Useful when the adapter is driven from Rust rather than from a host.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicChannel;

impl ErrorChannel for PanicChannel {
    fn report(&self, message: &str) -> ! {
        std::panic::panic_any(message.to_string())
    }
}

impl<C: ErrorChannel + ?Sized> ErrorChannel for &C {
    fn report(&self, message: &str) -> ! {
        (**self).report(message)
    }
}
