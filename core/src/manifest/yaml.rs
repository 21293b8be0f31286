use std::{
    env,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use dotenv::{dotenv, from_path};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::manifest::{
    database::DatabaseDetails,
    settings::{DocumentSettings, UpdateSettings},
};

pub const YAML_CONFIG_NAME: &str = "waybill.yaml";

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Manifest {
    #[serde(default)]
    pub database: DatabaseDetails,

    #[serde(default)]
    pub updates: UpdateSettings,

    #[serde(default)]
    pub documents: DocumentSettings,
}

#[derive(thiserror::Error, Debug)]
pub enum ReadManifestError {
    #[error("Could not open file: {0}")]
    CouldNotOpenFile(#[from] std::io::Error),

    #[error("Could not parse manifest: {0}")]
    CouldNotParseManifest(#[from] serde_yaml::Error),

    #[error("Could not substitute env variables: {0}")]
    CouldNotSubstituteEnvVariables(#[from] regex::Error),

    #[error("Environment variable {0} not found")]
    EnvironmentVariableNotFound(String),
}

fn substitute_env_variables(contents: &str) -> Result<String, ReadManifestError> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;

    let mut missing: Option<String> = None;
    let result = re.replace_all(contents, |caps: &Captures| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(val) => val,
            Err(_) => {
                error!("Environment variable {} not found", var_name);
                missing.get_or_insert_with(|| var_name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(var_name) => Err(ReadManifestError::EnvironmentVariableNotFound(var_name)),
        None => Ok(result.into_owned()),
    }
}

/// Loads `.env` next to the manifest (falling back to the working directory) so that
/// `${VAR}` references resolve.
fn load_env_for_manifest(file_path: &Path) {
    let env_path = file_path.parent().unwrap_or(Path::new("")).join(".env");
    if env_path.exists() {
        if let Err(e) = from_path(&env_path) {
            error!("Could not load env file {}: {}", env_path.display(), e);
        }
    } else {
        dotenv().ok();
    }
}

pub fn parse_manifest(contents: &str) -> Result<Manifest, ReadManifestError> {
    let contents = substitute_env_variables(contents)?;
    let manifest: Manifest = serde_yaml::from_str(&contents)?;
    Ok(manifest)
}

pub fn read_manifest(file_path: &PathBuf) -> Result<Manifest, ReadManifestError> {
    let mut file = File::open(file_path)?;
    let mut contents = String::new();

    file.read_to_string(&mut contents)?;

    load_env_for_manifest(file_path);

    let manifest = parse_manifest(&contents)?;
    info!("Loaded manifest from {}", file_path.display());

    Ok(manifest)
}
