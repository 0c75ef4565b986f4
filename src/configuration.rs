use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use resolve_path::PathResolveExt;
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Settings {
    #[serde(default = "default_output_directory")]
    pub output_directory: String,
    #[serde(default)]
    pub sessdata: Option<String>,
    #[serde(default)]
    pub bili_jct: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

fn default_output_directory() -> String {
    "download".into()
}

impl Settings {
    /// Load settings from an optional config file plus `BILIMANGA_*`
    /// environment variables. A missing file just means defaults.
    pub fn new(config_file: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(config_file).required(false))
            .add_source(Environment::with_prefix("BILIMANGA"))
            .build()?;
        builder.try_deserialize()
    }

    pub fn output_root(&self) -> PathBuf {
        self.output_directory.resolve().into_owned()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.sessdata.clone(), self.bili_jct.clone())
    }
}

/// Optional bilibili session cookies. Both halves must be present for
/// authenticated requests; a failed verification replaces the value with a
/// cleared one instead of mutating shared state.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    sessdata: Option<String>,
    bili_jct: Option<String>,
}

impl Credentials {
    pub fn new(sessdata: Option<String>, bili_jct: Option<String>) -> Self {
        Self { sessdata, bili_jct }
    }

    pub fn is_configured(&self) -> bool {
        self.sessdata.is_some() && self.bili_jct.is_some()
    }

    pub fn cookie_header(&self) -> Option<String> {
        match (&self.sessdata, &self.bili_jct) {
            (Some(sessdata), Some(bili_jct)) => {
                Some(format!("SESSDATA={sessdata}; bili_jct={bili_jct}"))
            }
            _ => None,
        }
    }

    pub fn cleared() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config() {
        let c = Settings::new("bilimanga.test.json").unwrap();

        assert_eq!("./test/manga", c.output_directory);
        assert_eq!(c.sessdata.as_deref(), Some("test-sessdata"));
        assert_eq!(c.bili_jct.as_deref(), Some("test-jct"));
        assert_eq!(c.proxy, None);
        assert!(c.credentials().is_configured());
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let c = Settings::new("does-not-exist-anywhere").unwrap();
        assert_eq!(c.output_directory, "download");
        assert!(!c.credentials().is_configured());
    }

    #[test]
    fn cookie_header_requires_both_halves() {
        let full = Credentials::new(Some("abc".into()), Some("def".into()));
        assert_eq!(
            full.cookie_header().unwrap(),
            "SESSDATA=abc; bili_jct=def"
        );

        let half = Credentials::new(Some("abc".into()), None);
        assert_eq!(half.cookie_header(), None);
        assert!(!half.is_configured());

        assert_eq!(Credentials::cleared().cookie_header(), None);
    }
}
