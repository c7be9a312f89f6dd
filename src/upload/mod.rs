//! Validation of uploaded layer files and the names layers are stored under.

pub mod files;
pub mod form;
pub mod json_field;
pub mod layer_type;
pub mod names;

pub use files::{get_files, LayerFiles};
pub use form::{CleanedUpload, FileField, LayerUploadForm, UploadedFile};
pub use json_field::JsonField;
pub use layer_type::{layer_type, LayerType};
pub use names::{get_valid_layer_name, get_valid_name, sanitize_name, LayerNameSource};
