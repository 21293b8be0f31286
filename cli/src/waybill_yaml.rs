use std::path::{Path, PathBuf};

use waybill::manifest::{read_manifest, Manifest, ReadManifestError, YAML_CONFIG_NAME};

use crate::console::print_warn_message;

/// Reads the manifest at `config`, or `./waybill.yaml` when no path was given. A missing
/// default file is not an error: everything falls back to defaults and `DATABASE_URL`.
pub fn load_manifest(config: Option<&Path>) -> Result<Manifest, ReadManifestError> {
    match config {
        Some(path) => read_manifest(&path.to_path_buf()),
        None => {
            let default_path = PathBuf::from(YAML_CONFIG_NAME);
            if default_path.exists() {
                read_manifest(&default_path)
            } else {
                print_warn_message(&format!(
                    "{} not found in the current directory, using defaults",
                    YAML_CONFIG_NAME
                ));
                Ok(Manifest::default())
            }
        }
    }
}
