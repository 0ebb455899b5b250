//! Query text compilation and document formatting for docpeek.
//!
//! [`compile`] turns what a user types (`{name: /^jo/i, age: {$gt: 30}}`)
//! into a typed [`Document`]; [`render_document`] turns a document back into
//! indented text that compiles to an equal document.

mod compiler;
mod dates;
mod error;
pub mod extjson;
mod formatter;
mod value;

pub use compiler::CompileOptions;
pub use compiler::compile;
pub use compiler::compile_with;
pub use compiler::expand_shell_syntax;
pub use compiler::is_empty_query;
pub use dates::DatePolicy;
pub use error::CompileError;
pub use error::FormatError;
pub use formatter::format_document;
pub use formatter::indent;
pub use formatter::render_document;
pub use value::Binary;
pub use value::Decimal128;
pub use value::DecimalError;
pub use value::Document;
pub use value::ObjectId;
pub use value::ObjectIdError;
pub use value::Regex;
pub use value::Value;
