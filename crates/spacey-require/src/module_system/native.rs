// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host-implemented modules

use crate::error::Result;
use spacey_script::{Object, Runtime};

/// A module implemented by the host rather than loaded from source.
///
/// One instance is registered per name and shared by every runtime the
/// registry enables, so implementations keep per-runtime state in the
/// runtime itself.
pub trait NativeModule: Send + Sync {
    /// Called once per runtime from [`Registry::enable`](super::Registry::enable),
    /// after `require` is installed. Typically installs globals.
    fn enable(&self, runtime: &mut Runtime) -> Result<()>;

    /// Called the first time the module is required in a runtime.
    /// `module` is the fresh `{ exports: {} }` object; either populate
    /// `module.exports` or replace it.
    fn export(&self, runtime: &mut Runtime, module: &Object) -> Result<()>;
}
