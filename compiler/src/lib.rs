//! relgen-compiler
//!
//! This crate implements:
//!  1) A tokenizer + declaration scanner for C++ headers carrying `// @relais` annotations,
//!  2) The annotation tag grammar (`table=`, `primary_key`, `filterable:...`, ...),
//!  3) The entity model builder (defaults, enum resolution from `glz::meta`),
//!  4) Code generation (`compile_entity_to_cpp` → mapping header `String`),
//!  5) Error types (`RelgenError`).

pub mod error;
pub mod types;
pub mod utils;
pub mod tags;
pub mod tokenizer;
pub mod parser;
pub mod builder;
pub mod compiler;
pub mod gen_cpp;

pub use compiler::compile_entities;
pub use compiler::compile_header;
pub use compiler::scan_entities;
pub use compiler::GeneratedUnit;
pub use gen_cpp::compile_entity_to_cpp;
pub use gen_cpp::GenOptions;
