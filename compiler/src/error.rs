use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelgenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "@relais enum on field \"{field}\": no glz::meta<{enum_type}> with glz::enumerate() found in {file}. \
         Either define glz::meta<{enum_type}> in the source header, \
         or use an explicit mapping: enum=val1:Variant1,val2:Variant2"
    )]
    UnresolvedEnum {
        field:     String,
        enum_type: String,
        file:      String,
    },

    #[error("{path}: {msg}")]
    InvalidSource {
        path: PathBuf,
        msg:  String,
    },
}
