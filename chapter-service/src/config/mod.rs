use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CREDENTIALS_FILE: &str = "serviceAccountKey.json";
pub const DEFAULT_DATABASE: &str = "(default)";
pub const DEFAULT_COLLECTION: &str = "content";
pub const WELL_KNOWN_CREDENTIALS_FILE: &str = "application_default_credentials.json";

#[derive(Debug, Clone)]
pub struct ChapterConfig {
    pub common: core_config::Config,
    pub firestore: FirestoreConfig,
    /// Accepted for deployment parity; the chapter lookup never reads it.
    pub database_url: Option<String>,
    pub openai_api_key: Option<Secret<String>>,
}

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// Service account key file. Falls back to `serviceAccountKey.json`.
    pub credentials_path: Option<String>,
    /// Overrides the project id found in the credentials.
    pub project_id: Option<String>,
    pub database: String,
    pub collection: String,
    /// `host:port` of a local emulator; disables authentication.
    pub emulator_host: Option<String>,
    /// Overrides the REST endpoint, e.g. `http://127.0.0.1:8080/v1`.
    pub base_url: Option<String>,
    /// gcloud configuration directory holding application default credentials.
    pub gcloud_config_dir: Option<PathBuf>,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            project_id: None,
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            emulator_host: None,
            base_url: None,
            gcloud_config_dir: None,
        }
    }
}

impl ChapterConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and server settings)
        let common = core_config::Config::load()?;

        Ok(ChapterConfig {
            common,
            firestore: FirestoreConfig::from_env(),
            database_url: get_env("DATABASE_URL"),
            openai_api_key: get_env("OPENAI_API_KEY").map(Secret::new),
        })
    }
}

impl FirestoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(get_env)
    }

    /// Reads settings through `lookup`, which returns `None` for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        FirestoreConfig {
            credentials_path: lookup("GOOGLE_APPLICATION_CREDENTIALS"),
            project_id: lookup("GOOGLE_CLOUD_PROJECT"),
            database: lookup("FIRESTORE_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            collection: lookup("FIRESTORE_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            emulator_host: lookup("FIRESTORE_EMULATOR_HOST"),
            base_url: lookup("FIRESTORE_BASE_URL"),
            gcloud_config_dir: gcloud_config_dir(&lookup),
        }
    }

    /// Absolute path of the credentials file; relative paths resolve against the working directory.
    pub fn credentials_file(&self) -> PathBuf {
        let path = PathBuf::from(
            self.credentials_path
                .as_deref()
                .unwrap_or(DEFAULT_CREDENTIALS_FILE),
        );
        if path.is_absolute() {
            return path;
        }
        match env::current_dir() {
            Ok(dir) => dir.join(path),
            Err(_) => path,
        }
    }

    /// `application_default_credentials.json` in the gcloud config directory, if one is known.
    pub fn well_known_credentials_file(&self) -> Option<PathBuf> {
        self.gcloud_config_dir
            .as_ref()
            .map(|dir| dir.join(WELL_KNOWN_CREDENTIALS_FILE))
    }
}

fn gcloud_config_dir<F>(lookup: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(dir));
    }
    if cfg!(windows) {
        lookup("APPDATA").map(|dir| PathBuf::from(dir).join("gcloud"))
    } else {
        lookup("HOME").map(|home| PathBuf::from(home).join(".config").join("gcloud"))
    }
}

fn get_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn firestore_defaults() {
        let config = FirestoreConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.database, "(default)");
        assert_eq!(config.collection, "content");
        assert!(config.emulator_host.is_none());
        assert!(config
            .credentials_file()
            .ends_with(DEFAULT_CREDENTIALS_FILE));
        assert!(config.credentials_file().is_absolute());
    }

    #[test]
    fn firestore_overrides() {
        let config = FirestoreConfig::from_lookup(lookup_from(&[
            ("GOOGLE_APPLICATION_CREDENTIALS", "/etc/keys/sa.json"),
            ("GOOGLE_CLOUD_PROJECT", "schools-prod"),
            ("FIRESTORE_COLLECTION", "content_v2"),
            ("FIRESTORE_EMULATOR_HOST", "localhost:8080"),
        ]));
        assert_eq!(config.credentials_file(), PathBuf::from("/etc/keys/sa.json"));
        assert_eq!(config.project_id.as_deref(), Some("schools-prod"));
        assert_eq!(config.collection, "content_v2");
        assert_eq!(config.emulator_host.as_deref(), Some("localhost:8080"));
    }

    #[test]
    fn well_known_credentials_follow_gcloud_config() {
        let from_home = FirestoreConfig::from_lookup(lookup_from(&[("HOME", "/home/dev")]));
        let from_override = FirestoreConfig::from_lookup(lookup_from(&[
            ("HOME", "/home/dev"),
            ("CLOUDSDK_CONFIG", "/opt/gcloud"),
        ]));

        if !cfg!(windows) {
            assert_eq!(
                from_home.well_known_credentials_file(),
                Some(PathBuf::from(
                    "/home/dev/.config/gcloud/application_default_credentials.json"
                ))
            );
        }
        assert_eq!(
            from_override.well_known_credentials_file(),
            Some(PathBuf::from("/opt/gcloud/application_default_credentials.json"))
        );
        assert!(FirestoreConfig::default().well_known_credentials_file().is_none());
    }

    #[test]
    fn relative_credentials_resolve_against_working_directory() {
        let config = FirestoreConfig::from_lookup(lookup_from(&[(
            "GOOGLE_APPLICATION_CREDENTIALS",
            "keys/sa.json",
        )]));
        let expected = env::current_dir().unwrap().join("keys/sa.json");
        assert_eq!(config.credentials_file(), expected);
    }
}
