// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CommonJS module system
//!
//! - [`Registry`] - shared, thread-safe: native modules, compiled programs,
//!   source loader, global folders
//! - [`ModuleResolver`] - one per runtime: module caches and the
//!   resolution algorithm behind `require()`
//! - [`NativeModule`] - modules implemented by the host
//! - [`path`] - lexical module path helpers

mod cache;
mod loader;
mod native;
pub mod path;
mod registry;
mod resolver;
mod sourcemap;

pub use cache::{CompiledModule, ProgramCache};
pub use loader::{SourceLoader, default_source_loader};
pub use native::NativeModule;
pub use registry::{Registry, RegistryBuilder};
pub use resolver::{Module, ModuleResolver};
pub use sourcemap::SourceMap;
