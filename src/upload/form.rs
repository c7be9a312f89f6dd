use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use strum::{Display, EnumIter, EnumString};
use tempfile::TempDir;
use tracing::debug;

use crate::errors::{LayerError, LayerResult, ValidationError};
use crate::upload::json_field::JsonField;
use crate::upload::layer_type::{layer_type, LayerType};

const DIFFERENT_SHAPEFILES: &str = "It looks like you're uploading components from different Shapefiles. Please double-check your file selections.";

/// The file inputs of the upload form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum FileField {
    BaseFile,
    DbfFile,
    ShxFile,
    PrjFile,
    XmlFile,
    SldFile,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

/// What a valid form boils down to.
#[derive(Clone, Debug, PartialEq)]
pub struct CleanedUpload {
    /// Base file name without its extension.
    pub base_name: String,
    pub layer_type: LayerType,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub charset: String,
    pub permissions: Option<Value>,
}

/// Upload of a shapefile bundle or a GeoTIFF, validated on file names alone.
#[derive(Clone, Debug, Default)]
pub struct LayerUploadForm {
    files: BTreeMap<FileField, UploadedFile>,
    pub layer_title: Option<String>,
    pub abstract_text: Option<String>,
    pub charset: Option<String>,
    pub permissions: Option<String>,
}

impl LayerUploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, field: FileField, file: UploadedFile) -> Self {
        self.set_file(field, file);
        self
    }

    pub fn set_file(&mut self, field: FileField, file: UploadedFile) {
        self.files.insert(field, file);
    }

    pub fn file(&self, field: FileField) -> Option<&UploadedFile> {
        self.files.get(&field)
    }

    /// Assigns a text input by its form name; unknown names are reported.
    pub fn set_text(&mut self, name: &str, value: String) -> Result<(), ValidationError> {
        let slot = match name {
            "layer_title" => &mut self.layer_title,
            "abstract" => &mut self.abstract_text,
            "charset" => &mut self.charset,
            "permissions" => &mut self.permissions,
            other => return Err(ValidationError::field(other, "Unknown form field.")),
        };
        *slot = Some(value);
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.clean().is_ok()
    }

    /// Checks the form, returning every problem found.
    pub fn clean(&self) -> Result<CleanedUpload, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let base = match self.file(FileField::BaseFile) {
            Some(base) => base,
            None => {
                errors.push(ValidationError::field(
                    FileField::BaseFile.to_string(),
                    "This field is required.",
                ));
                return Err(errors);
            }
        };

        for (field, file) in &self.files {
            if let Err(message) = check_file(file) {
                errors.push(ValidationError::field(field.to_string(), message));
            }
        }

        let permissions = JsonField::optional("permissions")
            .clean_optional(self.permissions.as_deref().unwrap_or(""))
            .unwrap_or_else(|e| {
                errors.push(e);
                None
            });

        if !errors.is_empty() {
            return Err(errors);
        }

        let layer_type = match layer_type(&base.name) {
            Ok(layer_type) => layer_type,
            Err(_) => {
                let ext = Path::new(&base.name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{}", e))
                    .unwrap_or_default();
                return Err(vec![ValidationError::new(format!(
                    "Only Shapefiles and GeoTiffs are supported. You uploaded a {} file",
                    ext
                ))]);
            }
        };

        if layer_type == LayerType::Vector {
            let (dbf, shx) = match (self.file(FileField::DbfFile), self.file(FileField::ShxFile)) {
                (Some(dbf), Some(shx)) => (dbf, shx),
                _ => {
                    return Err(vec![ValidationError::new(
                        "When uploading Shapefiles, .shx and .dbf files are also required.",
                    )])
                }
            };

            let base_stem = base.stem();
            let optional = [FileField::PrjFile, FileField::XmlFile, FileField::SldFile]
                .into_iter()
                .filter_map(|field| self.file(field));
            let mismatched = [dbf, shx]
                .into_iter()
                .chain(optional)
                .any(|file| file.stem() != base_stem);
            if mismatched {
                return Err(vec![ValidationError::new(DIFFERENT_SHAPEFILES)]);
            }
        }

        Ok(CleanedUpload {
            base_name: base.stem().to_string(),
            layer_type,
            title: self.layer_title.clone().filter(|t| !t.trim().is_empty()),
            abstract_text: self.abstract_text.clone().filter(|a| !a.trim().is_empty()),
            charset: self
                .charset
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "UTF-8".to_string()),
            permissions,
        })
    }

    /// Writes the uploaded files into a fresh temporary directory.
    ///
    /// Returns the directory, removed when dropped, and the path of the base file.
    pub fn write_files(&self) -> LayerResult<(TempDir, PathBuf)> {
        let dir = TempDir::new()?;
        let base = self.write_into(dir.path())?;
        Ok((dir, base))
    }

    /// Like [`Self::write_files`], with the temporary directory created inside `parent`.
    pub fn write_files_in(&self, parent: &Path) -> LayerResult<(TempDir, PathBuf)> {
        fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new().prefix("upload").tempdir_in(parent)?;
        let base = self.write_into(dir.path())?;
        Ok((dir, base))
    }

    fn write_into(&self, dir: &Path) -> LayerResult<PathBuf> {
        let base = self
            .file(FileField::BaseFile)
            .ok_or_else(|| LayerError::InvalidFileType("no base file".to_string()))?;

        for file in self.files.values() {
            if let Err(message) = check_file(file) {
                return Err(LayerError::InvalidFileType(format!("{}: {}", file.name, message)));
            }
            fs::write(dir.join(&file.name), &file.content)?;
        }

        debug!("Wrote {} uploaded files to {}", self.files.len(), dir.display());
        Ok(dir.join(&base.name))
    }
}

/// Rejects empty bodies and names that could escape the upload directory.
fn check_file(file: &UploadedFile) -> Result<(), &'static str> {
    let name = file.name.as_str();
    if name.is_empty() {
        return Err("No file was submitted.");
    }
    if name.contains('\0') || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err("File names cannot contain path separators.");
    }
    if file.content.is_empty() {
        return Err("The submitted file is empty.");
    }
    Ok(())
}
