use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{LayerError, LayerResult};
use crate::upload::layer_type::{extension_of, RASTER_EXTENSIONS};

/// Components every shapefile bundle must carry, keyed by extension.
pub const SHAPEFILE_REQUIRED: [&str; 3] = ["shp", "dbf", "shx"];

/// Files found next to a base file, keyed by component (`shp`, `prj`, `sld`, ...).
pub type LayerFiles = BTreeMap<String, PathBuf>;

struct Siblings {
    dir: PathBuf,
    names: Vec<String>,
}

impl Siblings {
    fn list(dir: &Path) -> LayerResult<Self> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(Self {
            dir: dir.to_path_buf(),
            names,
        })
    }

    /// Files named exactly `<prefix>.<ext>`, the extension compared ignoring case.
    fn matching(&self, prefix: &str, ext: &str) -> Vec<PathBuf> {
        self.names
            .iter()
            .filter(|name| {
                name.len() == prefix.len() + 1 + ext.len()
                    && name.starts_with(prefix)
                    && name[prefix.len()..].starts_with('.')
                    && name[prefix.len() + 1..].eq_ignore_ascii_case(ext)
            })
            .map(|name| self.dir.join(name))
            .collect()
    }

    /// At most one match is allowed for an optional component.
    fn optional(&self, prefix: &str, ext: &str, base: &Path) -> LayerResult<Option<PathBuf>> {
        let mut matches = self.matching(prefix, ext);
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => Err(LayerError::DuplicateHelperFiles(base.to_path_buf())),
        }
    }
}

/// Collects the component files belonging to `filename`.
///
/// Siblings must share the exact file stem; only their extensions are compared
/// case-insensitively. Two siblings differing only by extension case make the
/// bundle ambiguous and are rejected.
pub fn get_files(filename: &Path) -> LayerResult<LayerFiles> {
    let invalid = || LayerError::InvalidFileType(filename.display().to_string());

    let file_name = filename.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
    let stem = filename.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    let extension = extension_of(file_name).ok_or_else(invalid)?;
    let dir = match filename.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let siblings = Siblings::list(dir)?;
    let mut files = LayerFiles::new();

    if extension == "shp" {
        for required in SHAPEFILE_REQUIRED {
            let mut matches = siblings.matching(stem, required);
            match matches.len() {
                0 => {
                    return Err(LayerError::MissingHelperFile {
                        missing: format!("{}.{}", stem, required),
                        required: SHAPEFILE_REQUIRED.join(", "),
                    })
                }
                1 => {
                    files.insert(required.to_string(), matches.remove(0));
                }
                _ => return Err(LayerError::DuplicateHelperFiles(filename.to_path_buf())),
            }
        }
        if let Some(prj) = siblings.optional(stem, "prj", filename)? {
            files.insert("prj".to_string(), prj);
        }
    } else if RASTER_EXTENSIONS.contains(&extension.as_str()) {
        files.insert(extension.clone(), filename.to_path_buf());
    } else {
        return Err(invalid());
    }

    if let Some(sld) = siblings.optional(stem, "sld", filename)? {
        files.insert("sld".to_string(), sld);
    }

    // Metadata is either `foo.xml` or `foo.shp.xml`
    let xml = match siblings.optional(stem, "xml", filename)? {
        Some(xml) => Some(xml),
        None => siblings.optional(file_name, "xml", filename)?,
    };
    if let Some(xml) = xml {
        files.insert("xml".to_string(), xml);
    }

    debug!("Grouped {} component files for {}", files.len(), filename.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bundle(names: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    fn relative(dir: &TempDir, files: LayerFiles) -> BTreeMap<String, String> {
        files
            .into_iter()
            .map(|(k, v)| {
                let rel = v.strip_prefix(dir.path()).unwrap().to_str().unwrap().to_string();
                (k, rel)
            })
            .collect()
    }

    fn expected(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Some filesystems fold case; the duplicate checks only make sense where they don't.
    fn is_case_sensitive(dir: &TempDir, created: usize) -> bool {
        fs::read_dir(dir.path()).unwrap().count() == created
    }

    #[test]
    fn test_well_formed_shapefile() {
        let dir = bundle(&["foo.shp", "foo.shx", "foo.prj", "foo.dbf"]);
        let files = get_files(&dir.path().join("foo.shp")).unwrap();
        assert_eq!(
            relative(&dir, files),
            expected(&[("shp", "foo.shp"), ("shx", "foo.shx"), ("prj", "foo.prj"), ("dbf", "foo.dbf")])
        );
    }

    #[test]
    fn test_missing_component_is_rejected() {
        let dir = bundle(&["foo.shp", "foo.shx", "foo.prj"]);
        let err = get_files(&dir.path().join("foo.shp")).unwrap_err();
        assert!(matches!(err, LayerError::MissingHelperFile { .. }));
    }

    #[test]
    fn test_sld_is_picked_up() {
        let dir = bundle(&["foo.shp", "foo.shx", "foo.prj", "foo.dbf", "foo.sld"]);
        let files = get_files(&dir.path().join("foo.shp")).unwrap();
        assert_eq!(
            relative(&dir, files),
            expected(&[
                ("shp", "foo.shp"),
                ("shx", "foo.shx"),
                ("prj", "foo.prj"),
                ("dbf", "foo.dbf"),
                ("sld", "foo.sld"),
            ])
        );
    }

    #[test]
    fn test_capitalized_extensions() {
        let dir = bundle(&["foo.SHP", "foo.SHX", "foo.PRJ", "foo.DBF"]);
        let files = get_files(&dir.path().join("foo.SHP")).unwrap();
        assert_eq!(
            relative(&dir, files),
            expected(&[("shp", "foo.SHP"), ("shx", "foo.SHX"), ("prj", "foo.PRJ"), ("dbf", "foo.DBF")])
        );
    }

    #[test]
    fn test_mixed_case_extensions() {
        let dir = bundle(&["foo.SHP", "foo.shx", "foo.pRJ", "foo.DBF"]);
        let files = get_files(&dir.path().join("foo.SHP")).unwrap();
        assert_eq!(
            relative(&dir, files),
            expected(&[("shp", "foo.SHP"), ("shx", "foo.shx"), ("prj", "foo.pRJ"), ("dbf", "foo.DBF")])
        );
    }

    #[test]
    fn test_both_cases_of_every_component_are_rejected() {
        let names = [
            "foo.SHP", "foo.SHX", "foo.PRJ", "foo.DBF", "foo.shp", "foo.shx", "foo.prj", "foo.dbf",
        ];
        let dir = bundle(&names);
        if !is_case_sensitive(&dir, names.len()) {
            return;
        }
        for base in ["foo.SHP", "foo.shp"] {
            let err = get_files(&dir.path().join(base)).unwrap_err();
            assert!(matches!(err, LayerError::DuplicateHelperFiles(_)), "{}", base);
        }
    }

    #[test]
    fn test_both_cases_of_prj_are_rejected() {
        let names = ["foo.SHP", "foo.SHX", "foo.PRJ", "foo.DBF", "foo.prj"];
        let dir = bundle(&names);
        if !is_case_sensitive(&dir, names.len()) {
            return;
        }
        let err = get_files(&dir.path().join("foo.SHP")).unwrap_err();
        assert!(matches!(err, LayerError::DuplicateHelperFiles(_)));
    }

    #[test]
    fn test_both_cases_of_sld_are_rejected() {
        let names = ["foo.SHP", "foo.SHX", "foo.PRJ", "foo.DBF", "foo.SLD", "foo.sld"];
        let dir = bundle(&names);
        if !is_case_sensitive(&dir, names.len()) {
            return;
        }
        let err = get_files(&dir.path().join("foo.SHP")).unwrap_err();
        assert!(matches!(err, LayerError::DuplicateHelperFiles(_)));
    }

    #[test]
    fn test_other_stems_are_ignored() {
        let dir = bundle(&["foo.shp", "foo.shx", "foo.dbf", "foobar.prj", "Foo.sld"]);
        let files = get_files(&dir.path().join("foo.shp")).unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_raster_with_metadata() {
        let dir = bundle(&["dem.TIF", "dem.TIF.xml"]);
        let files = get_files(&dir.path().join("dem.TIF")).unwrap();
        assert_eq!(
            relative(&dir, files),
            expected(&[("tif", "dem.TIF"), ("xml", "dem.TIF.xml")])
        );
    }
}
