// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Runtime data structures: values, objects, functions and scopes.

mod environment;
mod exception;
mod function;
mod object;
mod value;

pub use environment::{Assignment, Scope};
pub use exception::Exception;
pub use function::{Callable, NativeFn};
pub use object::{Object, ObjectKind};
pub use value::{Value, number_to_string};
