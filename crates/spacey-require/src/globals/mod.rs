// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Node.js global objects
//!
//! Native modules whose main job is installing a global when a runtime is
//! enabled:
//! - `console` - [`console::Console`], registered as `node:console`
//! - `process` - [`process::Process`], registered as `node:process`

pub mod console;
pub mod process;
