//! Package-list descriptor loading and CLI input validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::build_type::BuildType;
use crate::config::BuildConfig;
use crate::error::InputError;

/// Image name used when `--output-file` is not given.
pub const DEFAULT_OUTPUT_FILE: &str = "openEuler-image.iso";

#[derive(Debug, Deserialize)]
struct RawPackageList {
    packages: Option<Vec<String>>,
}

/// Ordered, non-empty list of requested package names. Duplicates are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageList(Vec<String>);

impl PackageList {
    /// Load `{"packages": [...]}` from a JSON file.
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let text = fs::read_to_string(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    pub fn from_json(text: &str, origin: &Path) -> Result<Self, InputError> {
        if text.trim().is_empty() {
            return Err(InputError::EmptyPackageList {
                path: origin.to_path_buf(),
            });
        }

        let raw: RawPackageList =
            serde_json::from_str(text).map_err(|e| InputError::Malformed {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;

        let packages = raw.packages.ok_or_else(|| InputError::MissingField {
            path: origin.to_path_buf(),
            field: "packages",
        })?;
        Self::new(packages, origin)
    }

    /// Validate an in-memory list. `origin` names the source in errors.
    pub fn new(packages: Vec<String>, origin: &Path) -> Result<Self, InputError> {
        if packages.is_empty() {
            return Err(InputError::EmptyPackageList {
                path: origin.to_path_buf(),
            });
        }
        if let Some(bad) = packages.iter().find(|p| !is_valid_package_name(p)) {
            return Err(InputError::InvalidPackageName {
                path: origin.to_path_buf(),
                name: bad.clone(),
            });
        }
        Ok(Self(packages))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A package name is handed to dnf as its own argv element, so it only
/// has to be non-blank and must not look like an option.
pub fn is_valid_package_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed == name && !name.starts_with('-')
}

/// Validate the image file name. The image always lands directly in the
/// working directory, so anything path-like is refused.
pub fn validate_output_name(name: &str) -> Result<String, InputError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\0');
    if invalid {
        return Err(InputError::InvalidOutputName(name.to_string()));
    }
    Ok(name.to_string())
}

/// Everything a run needs, loaded and validated with no side effects.
#[derive(Debug, Clone)]
pub struct BuildInputs {
    pub build_type: BuildType,
    pub packages: PackageList,
    pub config: BuildConfig,
    /// Bare image file name, written to `config.working_dir`.
    pub output_file: String,
}

impl BuildInputs {
    /// Load both descriptors and validate the CLI values.
    ///
    /// Build type and output name are checked first since they need no I/O.
    pub fn load(
        package_list: &Path,
        config_file: &Path,
        build_type: &str,
        output_file: &str,
    ) -> Result<Self, InputError> {
        let build_type: BuildType = build_type.parse()?;
        let output_file = validate_output_name(output_file)?;
        let config = BuildConfig::load(config_file)?;
        let packages = PackageList::load(package_list)?;

        Ok(Self {
            build_type,
            packages,
            config,
            output_file,
        })
    }

    /// Final image location. This is the only place the path is derived.
    pub fn output_path(&self) -> PathBuf {
        self.config.working_dir.join(&self.output_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> PathBuf {
        PathBuf::from("/srv/lists/packages.json")
    }

    #[test]
    fn test_parse_package_list_preserves_order_and_duplicates() {
        let list =
            PackageList::from_json(r#"{"packages": ["vim", "bash", "vim"]}"#, &origin()).unwrap();
        assert_eq!(list.as_slice(), ["vim", "bash", "vim"]);
    }

    #[test]
    fn test_empty_list_rejected() {
        let err = PackageList::from_json(r#"{"packages": []}"#, &origin()).unwrap_err();
        assert!(matches!(err, InputError::EmptyPackageList { .. }));

        let err = PackageList::from_json("   \n", &origin()).unwrap_err();
        assert!(matches!(err, InputError::EmptyPackageList { .. }));
    }

    #[test]
    fn test_missing_packages_field() {
        let err = PackageList::from_json(r#"{"version": "22.03"}"#, &origin()).unwrap_err();
        assert!(matches!(err, InputError::MissingField { field: "packages", .. }));
    }

    #[test]
    fn test_malformed_list() {
        let err = PackageList::from_json(r#"{"packages": "bash"}"#, &origin()).unwrap_err();
        assert!(matches!(err, InputError::Malformed { .. }));

        let err = PackageList::from_json("[\"bash\"", &origin()).unwrap_err();
        assert!(matches!(err, InputError::Malformed { .. }));
    }

    #[test]
    fn test_option_like_names_rejected() {
        let err =
            PackageList::from_json(r#"{"packages": ["bash", "--nogpgcheck"]}"#, &origin())
                .unwrap_err();
        assert!(matches!(err, InputError::InvalidPackageName { ref name, .. } if name == "--nogpgcheck"));

        assert!(!is_valid_package_name(""));
        assert!(!is_valid_package_name("  "));
        assert!(!is_valid_package_name(" bash"));
        assert!(is_valid_package_name("NetworkManager-config-server"));
        assert!(is_valid_package_name("sg3_utils"));
    }

    #[test]
    fn test_output_name_validation() {
        assert_eq!(validate_output_name("image.iso").unwrap(), "image.iso");
        for bad in ["", ".", "..", "../image.iso", "/tmp/image.iso", "out/image.iso"] {
            assert!(validate_output_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_unknown_build_type_checked_before_any_read() {
        // Neither descriptor exists; the build type error must win.
        let err = BuildInputs::load(
            Path::new("/nonexistent/list.json"),
            Path::new("/nonexistent/config.yaml"),
            "qcow2",
            DEFAULT_OUTPUT_FILE,
        )
        .unwrap_err();
        assert!(matches!(err, InputError::UnsupportedBuildType(_)));
    }

    #[test]
    fn test_missing_descriptor_is_read_error() {
        let err = PackageList::load(Path::new("/nonexistent/list.json")).unwrap_err();
        assert!(matches!(err, InputError::Read { .. }));
    }
}
