use crate::error::{ErrorKind, Result};
use crate::registry::Registry;
use crate::resolved::{ResolvedConfig, ServerEndpoint, TransportPolicy};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Server used when neither configuration nor registry names one.
pub const DEFAULT_SERVER_URL: &str = "https://debuginfod.elfutils.org/";
/// Basename of the layered configuration files.
const CONFIG_NAME: &str = "debuginfod";
/// Older basename, still read but overridden by [`CONFIG_NAME`] files in the
/// same directory.
const LEGACY_CONFIG_NAME: &str = "pydebuginfod";
const REGISTRY_FILE: &str = "symbols.toml";
const ENV_PREFIX: &str = "DEBUGINFOD_";

/// Raw, merged configuration values before validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub cache_path: PathBuf,
    #[serde(deserialize_with = "flag")]
    pub verbose: bool,
    /// Request timeout in seconds; `0` disables it.
    pub timeout: u64,
    #[serde(deserialize_with = "flag")]
    pub progress: bool,
    #[serde(deserialize_with = "url_list")]
    pub urls: Vec<String>,
    pub transport_failure: TransportPolicy,
}

impl Default for Config {
    fn default() -> Self {
        let cache_path = ProjectDirs::from("", "", CONFIG_NAME)
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join(CONFIG_NAME));
        Self {
            cache_path,
            verbose: false,
            timeout: 90,
            progress: true,
            urls: vec![DEFAULT_SERVER_URL.to_string()],
            transport_failure: TransportPolicy::default(),
        }
    }
}

impl Config {
    /// Validate and combine with the registry into a [`ResolvedConfig`].
    ///
    /// Readable registry servers come first, followed by `urls` in order.
    pub fn resolve(&self, registry: &Registry) -> Result<ResolvedConfig> {
        if self.cache_path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::InvalidPath(self.cache_path.clone()));
        }
        let mut servers: Vec<ServerEndpoint> = Vec::new();
        for endpoint in registry.readable() {
            match endpoint {
                ServerEndpoint::Http { url } => validate_url(url)?,
                ServerEndpoint::S3 { bucket, key_id, key_secret, .. } => {
                    if key_id.is_some() != key_secret.is_some() {
                        exn::bail!(ErrorKind::Credentials(bucket.clone()));
                    }
                },
            }
            servers.push(endpoint.clone());
        }
        for url in &self.urls {
            validate_url(url)?;
            servers.push(ServerEndpoint::http(url.as_str()));
        }
        Ok(ResolvedConfig {
            cache_root: self.cache_path.clone(),
            servers,
            timeout: (self.timeout > 0).then(|| Duration::from_secs(self.timeout)),
            show_progress: self.progress,
            transport_policy: self.transport_failure,
        })
    }
}

fn validate_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw).or_raise(|| ErrorKind::InvalidUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        exn::bail!(ErrorKind::InvalidUrl(raw.to_string()));
    }
    Ok(())
}

/// Finds and merges configuration sources.
#[derive(Clone, Debug)]
pub struct ConfigLoader {
    /// Directories searched for `debuginfod.*` (and `pydebuginfod.*`), highest precedence last.
    search_paths: Vec<PathBuf>,
    registry: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        let mut search_paths = Vec::new();
        if let Some(dirs) = ProjectDirs::from("", "", CONFIG_NAME) {
            search_paths.push(dirs.config_dir().to_path_buf());
        }
        search_paths.push(PathBuf::from("."));
        let registry =
            ProjectDirs::from("", "", "symbols").map(|dirs| dirs.config_dir().join(REGISTRY_FILE));
        Self { search_paths, registry }
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the search paths. Later paths override earlier ones.
    pub fn with_search_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Use a specific registry file, or none at all.
    pub fn with_registry(mut self, path: Option<PathBuf>) -> Self {
        self.registry = path;
        self
    }

    pub fn figment(&self) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        for dir in &self.search_paths {
            figment = merge_files(figment, dir);
        }
        figment.merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().replace('_', "-").into()))
    }

    pub fn load(&self) -> Result<Config> {
        let config: Config = self.figment().extract().or_raise(|| ErrorKind::Load)?;
        debug!(cache = %config.cache_path.display(), urls = ?config.urls, "Loaded configuration");
        Ok(config)
    }

    /// Read the server registry, if one is configured.
    pub fn registry(&self) -> Result<Registry> {
        match &self.registry {
            Some(path) => Registry::load(path),
            None => Ok(Registry::default()),
        }
    }

    /// Load, read the registry and produce the snapshot handed to the client.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.load()?.resolve(&self.registry()?)
    }
}

fn merge_files(figment: Figment, dir: &Path) -> Figment {
    [LEGACY_CONFIG_NAME, CONFIG_NAME].into_iter().fold(figment, |figment, name| {
        let base = dir.join(name);
        figment
            .merge(Toml::file(base.with_extension("toml")))
            .merge(Yaml::file(base.with_extension("yaml")))
            .merge(Yaml::file(base.with_extension("yml")))
            .merge(Json::file(base.with_extension("json")))
    })
}

/// Accepts a list of URLs or a single whitespace-separated string.
fn url_list<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Urls {
        One(String),
        Many(Vec<String>),
    }
    let urls = match Urls::deserialize(deserializer)? {
        Urls::One(joined) => joined.split_whitespace().map(str::to_string).collect(),
        Urls::Many(list) => list,
    };
    Ok(urls)
}

/// Booleans as they tend to appear in environment variables.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Str(String),
    }
    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Int(value) => Ok(value != 0),
        Flag::Str(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "" | "0" | "false" | "no" | "off" => Ok(false),
            other => Err(serde::de::Error::custom(format!("expected a boolean, found {other:?}"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Access, RegistryEntry};
    use figment::Jail;
    use rstest::rstest;

    fn loader(jail: &Jail) -> ConfigLoader {
        ConfigLoader::new()
            .with_search_paths([jail.directory().to_path_buf()])
            .with_registry(Some(jail.directory().join(REGISTRY_FILE)))
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            let config = loader(jail).load().unwrap();
            assert_eq!(config.timeout, 90);
            assert!(config.progress);
            assert!(!config.verbose);
            assert_eq!(config.urls, vec![DEFAULT_SERVER_URL.to_string()]);
            assert_eq!(config.transport_failure, TransportPolicy::Abort);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "debuginfod.toml",
                r#"
                cache-path = "/var/cache/symbols"
                timeout = 5
                progress = false
                urls = ["https://a.example/", "https://b.example/"]
                transport-failure = "next"
                "#,
            )?;
            let resolved = loader(jail).resolve().unwrap();
            assert_eq!(resolved.cache_root, PathBuf::from("/var/cache/symbols"));
            assert_eq!(resolved.timeout, Some(Duration::from_secs(5)));
            assert!(!resolved.show_progress);
            assert_eq!(resolved.transport_policy, TransportPolicy::NextServer);
            assert_eq!(
                resolved.servers,
                vec![ServerEndpoint::http("https://a.example/"), ServerEndpoint::http("https://b.example/")]
            );
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("debuginfod.yaml", "timeout: 5\nverbose: false\n")?;
            jail.set_env("DEBUGINFOD_TIMEOUT", "0");
            jail.set_env("DEBUGINFOD_VERBOSE", "1");
            jail.set_env("DEBUGINFOD_CACHE_PATH", "/tmp/elsewhere");
            jail.set_env("DEBUGINFOD_URLS", "https://a.example/ https://b.example/");
            let config = loader(jail).load().unwrap();
            assert_eq!(config.timeout, 0);
            assert!(config.verbose);
            assert_eq!(config.cache_path, PathBuf::from("/tmp/elsewhere"));
            assert_eq!(config.urls.len(), 2);
            let resolved = config.resolve(&Registry::default()).unwrap();
            assert_eq!(resolved.timeout, None);
            Ok(())
        });
    }

    #[test]
    fn test_later_search_path_wins() {
        Jail::expect_with(|jail| {
            jail.create_dir("user")?;
            jail.create_dir("local")?;
            jail.create_file("user/debuginfod.toml", "timeout = 1\nprogress = false\n")?;
            jail.create_file("local/debuginfod.json", r#"{"timeout": 2}"#)?;
            let config = ConfigLoader::new()
                .with_search_paths([jail.directory().join("user"), jail.directory().join("local")])
                .with_registry(None)
                .load()
                .unwrap();
            assert_eq!(config.timeout, 2);
            assert!(!config.progress);
            Ok(())
        });
    }

    #[test]
    fn test_legacy_file_name_is_read_with_lower_precedence() {
        Jail::expect_with(|jail| {
            jail.create_file("pydebuginfod.yaml", "timeout: 7\nprogress: false\n")?;
            let config = loader(jail).load().unwrap();
            assert_eq!(config.timeout, 7);
            assert!(!config.progress);

            jail.create_file("debuginfod.toml", "timeout = 3")?;
            let config = loader(jail).load().unwrap();
            assert_eq!(config.timeout, 3);
            assert!(!config.progress);
            Ok(())
        });
    }

    #[test]
    fn test_registry_servers_come_first() {
        Jail::expect_with(|jail| {
            jail.create_file("debuginfod.toml", r#"urls = "https://public.example/""#)?;
            jail.create_file(
                REGISTRY_FILE,
                r#"
                [[servers]]
                type = "http"
                url = "https://private.example/"
                "#,
            )?;
            let resolved = loader(jail).resolve().unwrap();
            assert_eq!(
                resolved.servers,
                vec![ServerEndpoint::http("https://private.example/"), ServerEndpoint::http("https://public.example/")]
            );
            Ok(())
        });
    }

    #[rstest]
    #[case::bucket_only(None, None, true)]
    #[case::key_pair(Some("AKIA"), Some("secret"), true)]
    #[case::id_without_secret(Some("AKIA"), None, false)]
    #[case::secret_without_id(None, Some("secret"), false)]
    fn test_s3_credentials(#[case] key_id: Option<&str>, #[case] key_secret: Option<&str>, #[case] valid: bool) {
        let endpoint = ServerEndpoint::S3 {
            bucket: "symbols".to_string(),
            prefix: None,
            region: "us-east-1".to_string(),
            endpoint: None,
            key_id: key_id.map(str::to_string),
            key_secret: key_secret.map(str::to_string),
        };
        let registry = Registry { servers: vec![RegistryEntry { access: Access::Read, endpoint: endpoint.clone() }] };
        match Config::default().resolve(&registry) {
            Ok(resolved) => {
                assert!(valid);
                assert_eq!(resolved.servers[0], endpoint);
            },
            Err(err) => {
                assert!(!valid);
                assert!(matches!(&*err, ErrorKind::Credentials(bucket) if bucket == "symbols"));
            },
        }
    }

    #[rstest]
    #[case::relative("debuginfod.example")]
    #[case::ftp("ftp://debuginfod.example/")]
    #[case::not_a_base("mailto:someone@example.com")]
    fn test_rejects_invalid_urls(#[case] url: &str) {
        let config = Config { urls: vec![url.to_string()], ..Config::default() };
        let err = config.resolve(&Registry::default()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidUrl(u) if u == url));
    }

    #[test]
    fn test_rejects_empty_cache_path() {
        let config = Config { cache_path: PathBuf::new(), ..Config::default() };
        let err = config.resolve(&Registry::default()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_malformed_file_is_load_error() {
        Jail::expect_with(|jail| {
            jail.create_file("debuginfod.toml", "timeout = \"soon\"")?;
            let err = loader(jail).load().unwrap_err();
            assert!(matches!(&*err, ErrorKind::Load));
            Ok(())
        });
    }

    #[rstest]
    #[case("true", true)]
    #[case("yes", true)]
    #[case("0", false)]
    #[case("off", false)]
    fn test_env_flags(#[case] raw: &'static str, #[case] expected: bool) {
        Jail::expect_with(|jail| {
            jail.set_env("DEBUGINFOD_PROGRESS", raw);
            let config = loader(jail).load().unwrap();
            assert_eq!(config.progress, expected);
            Ok(())
        });
    }
}
