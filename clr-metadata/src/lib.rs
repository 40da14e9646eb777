// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read ECMA-335 metadata from managed (.NET / Mono) PE images.
//!
//! This crate reads the metadata embedded in managed `.exe` and `.dll`
//! files: the assemblies they reference, the types and members they
//! reference in other assemblies, the types, methods, fields and
//! properties they define, and the custom attributes attached to those
//! definitions, including decoded constructor arguments.
//!
//! It does not decode IL. Method bodies are never read.
//!
//! The main entry point is [Assembly], which owns the bytes of a module and
//! lazily builds the indices needed for name lookups. [AssemblyResolver]
//! locates assemblies by name in a set of directories.
//!
//! # Features
//!
//! The `builder` feature exposes [builder::AssemblyBuilder], which writes
//! minimal managed modules. It exists so test suites of downstream crates
//! can fabricate assemblies without a .NET toolchain.

mod assembly;
pub use assembly::*;
#[cfg(any(test, feature = "builder"))]
pub mod builder;
mod error;
pub use error::*;
pub mod heaps;
pub mod pe;
mod resolver;
pub use resolver::*;
pub mod signature;
pub use signature::{AttributeValue, MemberSignature, MethodSignature, SigType};
pub mod tables;
pub use tables::{MetadataToken, TableId};
