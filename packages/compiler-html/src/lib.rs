//! # Vibe HTML Compiler
//!
//! Flattens a Vibe Tree into one executable document:
//!
//! ```text
//! <!DOCTYPE html><html>
//!   <head>{head}<style>{css}</style></head>
//!   <body>{nested html}{form capture?}<script>(function(){js})();</script></body>
//! </html>
//! ```
//!
//! Compilation never fails. Fragments that cannot be nested into are
//! reported through [`CompiledDocument::degradations`] and rendered with
//! their children appended after them.

mod compiler;
pub mod fragment;
pub mod instrumentation;

#[cfg(test)]
mod tests;

pub use compiler::{compile, compile_document, CompileContext, CompiledDocument, Degradation};
pub use fragment::{DegradeReason, Fragment, TRACE_ATTRIBUTE};
pub use instrumentation::{form_capture_block, DEFAULT_FORMS_ENDPOINT, FORM_ATTRIBUTE};
