// Copyright (c) 2019 King's College London created by the Software Development
// Team <http://soft-dev.org/>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0>, or the MIT license <LICENSE-MIT
// or http://opensource.org/licenses/MIT>, or the UPL-1.0 license
// <http://opensource.org/licenses/UPL> at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Usage-error conditions and the fatal-abort path.
//!
//! Usage errors (mutator broke a precondition) and system errors (allocator
//! exhaustion) are both unrecoverable: the interpreter this collector
//! serves has no exception mechanism. Internal code still threads
//! `GcError` through `Result` so it stays composable and unit-testable;
//! only the public ABI boundary converts an `Err` into [`fatal`].

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GcError {
    #[error("pop_root: root stack underflow")]
    StackUnderflow,

    #[error("expected class `{expected}`, found `{found}`")]
    ClassMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("register_object: object count limit reached after collection")]
    CapReachedAfterCollection,

    #[error("set_root: address is not on the root stack")]
    UnbalancedRoot,
}

/// Logs `err` at error level and aborts the process.
///
/// Mirrors the original C `error()`: `puts(msg); abort();`. Used at the
/// public ABI boundary for the fail-fast operations the collector's
/// external interface exposes.
pub fn fatal(err: GcError) -> ! {
    log::error!("{err}");
    std::process::abort()
}
