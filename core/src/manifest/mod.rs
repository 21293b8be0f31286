pub mod database;
pub mod settings;
pub mod yaml;

pub use database::DatabaseDetails;
pub use settings::{DocumentSettings, PaymentTerms, PaymentTermsError, UpdateSettings};
pub use yaml::{parse_manifest, read_manifest, Manifest, ReadManifestError, YAML_CONFIG_NAME};
