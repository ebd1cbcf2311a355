//! Where the server keeps its records and which address it listens on.

use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    /// Root of the stores; each record kind gets a subdirectory.
    pub data_path: PathBuf,
    pub bind: String,
}

fn default_data_path() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join("bookshelf"),
        None => PathBuf::from("./bookshelf-data"),
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `BOOKSHELF_DATA_PATH` and `BOOKSHELF_BIND`.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Blank values are ignored so an exported-but-empty variable keeps the default.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            data_path: set("BOOKSHELF_DATA_PATH").map(PathBuf::from).unwrap_or(defaults.data_path),
            bind: set("BOOKSHELF_BIND").unwrap_or(defaults.bind),
        }
    }

    pub fn bind_addr(&self) -> &str {
        &self.bind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = ServerConfig::from_vars(vars(&[]));
        assert_eq!(cfg.bind_addr(), DEFAULT_BIND);
        assert!(cfg.data_path.ends_with("bookshelf") || cfg.data_path.ends_with("bookshelf-data"));
    }

    #[test]
    fn env_overrides() {
        let cfg = ServerConfig::from_vars(vars(&[
            ("BOOKSHELF_DATA_PATH", "/srv/books"),
            ("BOOKSHELF_BIND", "0.0.0.0:8080"),
        ]));
        assert_eq!(cfg.data_path, PathBuf::from("/srv/books"));
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn blank_values_keep_defaults() {
        let cfg = ServerConfig::from_vars(vars(&[("BOOKSHELF_BIND", "  ")]));
        assert_eq!(cfg.bind_addr(), DEFAULT_BIND);
    }
}
