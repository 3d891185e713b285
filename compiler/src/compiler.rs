use serde::Serialize;
use tracing::debug;

use crate::{
    builder::build_entity,
    error::RelgenError,
    gen_cpp::{compile_entity_to_cpp, output_file_name, GenOptions},
    parser::scan_tokens,
    tokenizer::tokenize_source,
    types::EntityDescriptor,
};

/// One generated header, ready for the driver to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedUnit {
    pub class_name: String,
    pub file_name:  String,
    pub text:       String,
}

/// Scans `text` and builds a descriptor per annotated class.
/// Entities fail independently: an unresolved enum only spoils its own entry.
pub fn scan_entities(
    text: &str,
    source_file: &str,
) -> Vec<Result<EntityDescriptor, RelgenError>> {
    let tokens = tokenize_source(text);
    let classes = scan_tokens(text, &tokens);
    debug!("{}: {} annotated classes", source_file, classes.len());
    classes
        .iter()
        .map(|class| build_entity(class, text, source_file))
        .collect()
}

/// Like [`scan_entities`], but stops at the first entity that cannot be built.
pub fn compile_entities(
    text: &str,
    source_file: &str,
) -> Result<Vec<EntityDescriptor>, RelgenError> {
    scan_entities(text, source_file).into_iter().collect()
}

/// Runs the whole pipeline over one header.
/// Returns `Err(RelgenError)` if any entity in the file cannot be built.
pub fn compile_header(
    text: &str,
    source_file: &str,
    options: &GenOptions,
) -> Result<Vec<GeneratedUnit>, RelgenError> {
    let entities = compile_entities(text, source_file)?;
    Ok(entities
        .iter()
        .map(|entity| GeneratedUnit {
            class_name: entity.class_name.clone(),
            file_name:  output_file_name(entity),
            text:       compile_entity_to_cpp(entity, options),
        })
        .collect())
}
