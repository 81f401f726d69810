// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Panic Hook
//!
//! Panics in background tasks (resolver, monitor, teardown) would otherwise
//! only reach stderr, which the player window hides. This hook routes them
//! through tracing so they land in the log files too.

use std::panic;

use backtrace::Backtrace;

/// Set up panic handling with structured logging.
///
/// Replaces the default panic handler with one that logs the panic and a
/// backtrace as a tracing error event, then chains to the previous hook.
pub fn set_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic| {
        let backtrace = Backtrace::new();
        let backtrace = format!("{backtrace:?}");
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("<unnamed>");
        if let Some(location) = panic.location() {
            tracing::error!(
                message = %panic,
                backtrace = %backtrace,
                thread = thread_name,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
            );
        } else {
            tracing::error!(message = %panic, backtrace = %backtrace, thread = thread_name);
        }
        default_hook(panic);
    }));
}
