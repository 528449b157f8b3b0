use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Runtime configuration, read from environment variables.
///
/// Every field has a sensible default so AuthVault works out-of-the-box
/// with nothing configured: local JSON file, no encryption.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path of the local JSON vault artifact.
    pub data_file: PathBuf,

    /// Remote document store settings; `None` means local-file mode.
    pub remote: Option<RemoteSettings>,

    /// Base64 key material for secret encryption, if any.
    pub encryption_key: Option<String>,
}

/// Connection settings for the remote document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub uri: String,
    pub database: String,
    pub collection: String,

    /// TLS mode used for the first connection attempt.
    pub tls: bool,

    /// `true` when `tls` came from configuration rather than inference.
    pub tls_explicit: bool,

    pub allow_invalid_certificates: bool,
    pub server_selection_timeout: Duration,
}

// ── Variable names and defaults ──────────────────────────────────────

pub const ENV_DATA_FILE: &str = "VAULT_DATA_FILE";
pub const ENV_MONGODB_URI: &str = "MONGODB_URI";
pub const ENV_MONGODB_DB: &str = "MONGODB_DB";
pub const ENV_MONGODB_COLLECTION: &str = "MONGODB_COLLECTION";
pub const ENV_MONGODB_TLS: &str = "MONGODB_TLS";
pub const ENV_MONGODB_TLS_ALLOW_INVALID: &str = "MONGODB_TLS_ALLOW_INVALID_CERTIFICATES";
pub const ENV_MONGODB_TIMEOUT_MS: &str = "MONGODB_SERVER_SELECTION_TIMEOUT_MS";
pub const ENV_ENCRYPTION_KEY: &str = "SECRET_ENCRYPTION_KEY_BASE64";

fn default_data_file() -> PathBuf {
    PathBuf::from("data").join("user-secrets.json")
}

const DEFAULT_DATABASE: &str = "authvault";
const DEFAULT_COLLECTION: &str = "user_vaults";
const DEFAULT_SERVER_SELECTION_TIMEOUT_MS: u64 = 5_000;

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            remote: None,
            encryption_key: None,
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_file = get(ENV_DATA_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_file);

        let remote = get(ENV_MONGODB_URI).map(|uri| {
            let explicit_tls = get(ENV_MONGODB_TLS).and_then(|v| parse_bool(ENV_MONGODB_TLS, &v));
            let tls = explicit_tls.unwrap_or_else(|| uri_requires_tls(&uri));

            let allow_invalid_certificates = get(ENV_MONGODB_TLS_ALLOW_INVALID)
                .and_then(|v| parse_bool(ENV_MONGODB_TLS_ALLOW_INVALID, &v))
                .unwrap_or(false);

            let timeout_ms = get(ENV_MONGODB_TIMEOUT_MS)
                .and_then(|v| match v.parse::<u64>() {
                    Ok(ms) if ms > 0 => Some(ms),
                    _ => {
                        warn!(
                            variable = ENV_MONGODB_TIMEOUT_MS,
                            value = %v,
                            "Ignoring invalid timeout, using default"
                        );
                        None
                    }
                })
                .unwrap_or(DEFAULT_SERVER_SELECTION_TIMEOUT_MS);

            RemoteSettings {
                uri,
                database: get(ENV_MONGODB_DB).unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
                collection: get(ENV_MONGODB_COLLECTION)
                    .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
                tls,
                tls_explicit: explicit_tls.is_some(),
                allow_invalid_certificates,
                server_selection_timeout: Duration::from_millis(timeout_ms),
            }
        });

        Self {
            data_file,
            remote,
            encryption_key: get(ENV_ENCRYPTION_KEY),
        }
    }
}

impl RemoteSettings {
    /// Whether a failed first connection may be retried with the opposite
    /// TLS mode.
    pub fn tls_flip_allowed(&self) -> bool {
        !self.tls_explicit && !uri_requires_tls(&self.uri)
    }

    /// `db.collection`, for log lines.
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }
}

/// Returns `true` if the connection string itself mandates TLS.
///
/// SRV connection strings enable TLS by default, and a `tls=true` or
/// `ssl=true` query option pins it on.
pub fn uri_requires_tls(uri: &str) -> bool {
    let uri = uri.trim();
    if uri.to_ascii_lowercase().starts_with("mongodb+srv://") {
        return true;
    }

    let Some((_, query)) = uri.split_once('?') else {
        return false;
    };

    query.split('&').any(|pair| {
        let Some((key, value)) = pair.split_once('=') else {
            return false;
        };
        let key = key.trim().to_ascii_lowercase();
        (key == "tls" || key == "ssl") && value.trim().eq_ignore_ascii_case("true")
    })
}

/// Parse a boolean variable; unrecognised values are logged and ignored.
fn parse_bool(name: &str, value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            warn!(variable = name, value, "Ignoring unrecognised boolean value");
            None
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_are_local_file_without_encryption() {
        let s = settings(&[]);
        assert_eq!(s.data_file, PathBuf::from("data").join("user-secrets.json"));
        assert!(s.remote.is_none());
        assert!(s.encryption_key.is_none());
    }

    #[test]
    fn blank_uri_means_local_file_mode() {
        assert!(settings(&[(ENV_MONGODB_URI, "  ")]).remote.is_none());
    }

    #[test]
    fn remote_defaults_are_filled_in() {
        let s = settings(&[(ENV_MONGODB_URI, "mongodb://db.local:27017")]);
        let remote = s.remote.unwrap();
        assert_eq!(remote.database, "authvault");
        assert_eq!(remote.collection, "user_vaults");
        assert!(!remote.tls);
        assert!(!remote.tls_explicit);
        assert!(!remote.allow_invalid_certificates);
        assert_eq!(remote.server_selection_timeout, Duration::from_millis(5_000));
        assert!(remote.tls_flip_allowed());
        assert_eq!(remote.namespace(), "authvault.user_vaults");
    }

    #[test]
    fn srv_uri_infers_tls_and_forbids_flip() {
        let s = settings(&[(ENV_MONGODB_URI, "mongodb+srv://cluster0.example.net/")]);
        let remote = s.remote.unwrap();
        assert!(remote.tls);
        assert!(!remote.tls_explicit);
        assert!(!remote.tls_flip_allowed());
    }

    #[test]
    fn explicit_tls_pins_mode() {
        let s = settings(&[
            (ENV_MONGODB_URI, "mongodb://db.local"),
            (ENV_MONGODB_TLS, "TRUE"),
        ]);
        let remote = s.remote.unwrap();
        assert!(remote.tls);
        assert!(remote.tls_explicit);
        assert!(!remote.tls_flip_allowed());
    }

    #[test]
    fn unrecognised_tls_value_is_treated_as_unset() {
        let s = settings(&[
            (ENV_MONGODB_URI, "mongodb://db.local"),
            (ENV_MONGODB_TLS, "maybe"),
        ]);
        let remote = s.remote.unwrap();
        assert!(!remote.tls_explicit);
        assert!(remote.tls_flip_allowed());
    }

    #[test]
    fn invalid_timeout_falls_back_to_default() {
        let s = settings(&[
            (ENV_MONGODB_URI, "mongodb://db.local"),
            (ENV_MONGODB_TIMEOUT_MS, "soon"),
        ]);
        assert_eq!(
            s.remote.unwrap().server_selection_timeout,
            Duration::from_millis(5_000)
        );
    }

    #[test]
    fn custom_values_are_read() {
        let s = settings(&[
            (ENV_DATA_FILE, "/var/lib/authvault/store.json"),
            (ENV_MONGODB_URI, "mongodb://db.local"),
            (ENV_MONGODB_DB, "bots"),
            (ENV_MONGODB_COLLECTION, "vaults"),
            (ENV_MONGODB_TLS_ALLOW_INVALID, "yes"),
            (ENV_MONGODB_TIMEOUT_MS, "1500"),
            (ENV_ENCRYPTION_KEY, "a2V5"),
        ]);
        assert_eq!(s.data_file, PathBuf::from("/var/lib/authvault/store.json"));
        assert_eq!(s.encryption_key.as_deref(), Some("a2V5"));
        let remote = s.remote.unwrap();
        assert_eq!(remote.namespace(), "bots.vaults");
        assert!(remote.allow_invalid_certificates);
        assert_eq!(remote.server_selection_timeout, Duration::from_millis(1_500));
    }

    #[test]
    fn uri_query_can_mandate_tls() {
        assert!(uri_requires_tls("mongodb://h:27017/?ssl=true"));
        assert!(uri_requires_tls("mongodb://h:27017/db?retryWrites=true&tls=TRUE"));
        assert!(!uri_requires_tls("mongodb://h:27017/db?tls=false"));
        assert!(!uri_requires_tls("mongodb://h:27017/db?retryWrites=true"));
    }
}
