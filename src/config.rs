//! Bootstrap configuration from the container environment.
//!
//! The host-side launcher passes the host user's ids and the directories to
//! hand over through environment variables. Only `DEV_UID` and `DEV_GID`
//! are required; everything else has a default.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::etc::ContainerIdentity;

pub const ENV_UID: &str = "DEV_UID";
pub const ENV_GID: &str = "DEV_GID";
/// Colon-separated directories to chown recursively.
pub const ENV_CHOWN: &str = "DEV_CHOWN";
/// Colon-separated paths left alone by the chown sweep.
pub const ENV_CHOWN_EXCLUDE: &str = "DEV_CHOWNEXCLUDE";
pub const ENV_HOME: &str = "DEV_HOME";
pub const ENV_USER: &str = "DEV_USER";
pub const ENV_ETC: &str = "DEV_ETC";

const BOOTSTRAP_VARS: [&str; 7] = [
    ENV_UID,
    ENV_GID,
    ENV_CHOWN,
    ENV_CHOWN_EXCLUDE,
    ENV_HOME,
    ENV_USER,
    ENV_ETC,
];

pub const DEFAULT_USER: &str = "dev106";
pub const DEFAULT_HOME: &str = "/home/dev106";
pub const DEFAULT_ETC: &str = "/etc";

/// Everything one bootstrap pass needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub uid: u32,
    pub gid: u32,
    pub chown: Vec<PathBuf>,
    pub chown_exclude: Vec<PathBuf>,
    /// Home directory of the container user, always swept.
    pub home: PathBuf,
    /// Reserved container user and group name.
    pub user: String,
    /// Directory holding passwd, group and shadow.
    pub etc_dir: PathBuf,
}

impl BootstrapConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Load from raw environment pairs.
    ///
    /// Variables that are not valid UTF-8 are ignored unless they are one of
    /// ours, in which case the whole configuration is rejected.
    pub fn from_os_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut unicode = Vec::new();
        for (key, value) in vars {
            let Ok(key) = key.into_string() else {
                continue;
            };
            match value.into_string() {
                Ok(value) => unicode.push((key, value)),
                Err(_) => {
                    if let Some(&var) = BOOTSTRAP_VARS.iter().find(|&&v| v == key) {
                        return Err(ConfigError::NotUnicode(var));
                    }
                }
            }
        }
        Self::from_vars(unicode)
    }

    /// Load from arbitrary key/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let uid = parse_id(ENV_UID, vars.get(ENV_UID))?;
        let gid = parse_id(ENV_GID, vars.get(ENV_GID))?;

        let chown = split_paths(vars.get(ENV_CHOWN));
        let chown_exclude = split_paths(vars.get(ENV_CHOWN_EXCLUDE));

        let home = vars
            .get(ENV_HOME)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME));

        let user = vars
            .get(ENV_USER)
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER.to_string());

        let etc_dir = vars
            .get(ENV_ETC)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ETC));

        Ok(Self {
            uid,
            gid,
            chown,
            chown_exclude,
            home,
            user,
            etc_dir,
        })
    }

    /// Directories to sweep: the configured ones followed by the home.
    pub fn chown_roots(&self) -> Vec<PathBuf> {
        let mut roots = self.chown.clone();
        roots.push(self.home.clone());
        roots
    }

    pub fn identity(&self) -> ContainerIdentity {
        ContainerIdentity {
            name: self.user.clone(),
            uid: self.uid,
            gid: self.gid,
            home: self.home.to_string_lossy().into_owned(),
        }
    }
}

fn parse_id(var: &'static str, value: Option<&String>) -> Result<u32, ConfigError> {
    let value = value.ok_or(ConfigError::Missing(var))?;
    value.parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.clone(),
    })
}

fn split_paths(value: Option<&String>) -> Vec<PathBuf> {
    value
        .map(|v| {
            v.split(':')
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = BootstrapConfig::from_vars([("DEV_UID", "1000"), ("DEV_GID", "100")]).unwrap();
        assert_eq!(cfg.uid, 1000);
        assert_eq!(cfg.gid, 100);
        assert!(cfg.chown.is_empty());
        assert_eq!(cfg.user, DEFAULT_USER);
        assert_eq!(cfg.home, PathBuf::from(DEFAULT_HOME));
        assert_eq!(cfg.etc_dir, PathBuf::from(DEFAULT_ETC));
        assert_eq!(cfg.chown_roots(), vec![PathBuf::from(DEFAULT_HOME)]);
    }

    #[test]
    fn test_missing_gid() {
        let err = BootstrapConfig::from_vars([("DEV_UID", "1000")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_GID));
    }

    #[test]
    fn test_negative_uid_rejected() {
        let err = BootstrapConfig::from_vars([("DEV_UID", "-1"), ("DEV_GID", "0")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: ENV_UID,
                value: "-1".to_string()
            }
        );
    }

    #[test]
    fn test_non_numeric_gid_rejected() {
        let err =
            BootstrapConfig::from_vars([("DEV_UID", "1"), ("DEV_GID", "staff")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: ENV_GID, .. }));
    }

    #[test]
    fn test_empty_uid_rejected() {
        assert!(BootstrapConfig::from_vars([("DEV_UID", ""), ("DEV_GID", "0")]).is_err());
    }

    #[test]
    fn test_foreign_non_utf8_vars_are_ignored() {
        use std::os::unix::ffi::OsStringExt;

        let cfg = BootstrapConfig::from_os_vars([
            (OsString::from("LANG_LEGACY"), OsString::from_vec(b"caf\xe9".to_vec())),
            (OsString::from_vec(b"K\xff".to_vec()), OsString::from("v")),
            (OsString::from("DEV_UID"), OsString::from("1000")),
            (OsString::from("DEV_GID"), OsString::from("1000")),
        ])
        .unwrap();
        assert_eq!((cfg.uid, cfg.gid), (1000, 1000));
    }

    #[test]
    fn test_non_utf8_bootstrap_var_rejected() {
        use std::os::unix::ffi::OsStringExt;

        let err = BootstrapConfig::from_os_vars([
            (OsString::from("DEV_UID"), OsString::from("1000")),
            (OsString::from("DEV_GID"), OsString::from("1000")),
            (OsString::from("DEV_CHOWN"), OsString::from_vec(b"/d\xe9".to_vec())),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::NotUnicode(ENV_CHOWN));
    }

    #[test]
    fn test_colon_lists_drop_empty_segments() {
        let cfg = BootstrapConfig::from_vars([
            ("DEV_UID", "1"),
            ("DEV_GID", "1"),
            ("DEV_CHOWN", "/work::/data:"),
            ("DEV_CHOWNEXCLUDE", ":/data/cache"),
            ("DEV_HOME", "/home/me"),
        ])
        .unwrap();
        assert_eq!(cfg.chown, vec![PathBuf::from("/work"), PathBuf::from("/data")]);
        assert_eq!(cfg.chown_exclude, vec![PathBuf::from("/data/cache")]);
        assert_eq!(
            cfg.chown_roots(),
            vec![
                PathBuf::from("/work"),
                PathBuf::from("/data"),
                PathBuf::from("/home/me")
            ]
        );
    }

    #[test]
    fn test_identity_mirrors_config() {
        let cfg = BootstrapConfig::from_vars([
            ("DEV_UID", "501"),
            ("DEV_GID", "20"),
            ("DEV_USER", "box"),
        ])
        .unwrap();
        let id = cfg.identity();
        assert_eq!(id.name, "box");
        assert_eq!((id.uid, id.gid), (501, 20));
        assert_eq!(id.home, DEFAULT_HOME);
    }
}
