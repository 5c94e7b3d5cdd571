//! Directory backend storing one JSON file per record under a root folder.
//!
//! Layout: `<root>/<table>/<key>.json`, written atomically.

use super::*;
use crate::fsutil;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Directory backend persisted as JSON files.
#[derive(Debug, Clone)]
pub struct FolderBackend {
    root: PathBuf,
}

impl FolderBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, table: &str, key: &str) -> PathBuf {
        self.root.join(table).join(format!("{}.json", key))
    }

    fn put<T: Serialize>(&self, table: &str, key: &str, value: &T) -> Result<()> {
        fsutil::write_json_atomic(&self.record_path(table, key), value)
    }

    fn get<T: DeserializeOwned>(&self, table: &str, key: &str) -> Result<Option<T>> {
        let path = self.record_path(table, key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::io(format!("cannot read {}", path.display()), e))?;
        let value = serde_json::from_str(&content)
            .map_err(|e| Error::Directory(format!("invalid record {}: {}", path.display(), e)))?;
        Ok(Some(value))
    }
}

/// `escape` never emits `+`, so joined keys cannot collide.
fn app_key(lookup: &AppLookup) -> String {
    [&lookup.app_id, &lookup.infra_type, &lookup.infra_flavor]
        .iter()
        .map(|part| escape(part))
        .collect::<Vec<_>>()
        .join("+")
}

/// File-name-safe form of `part`: every byte outside `[A-Za-z0-9.-]`
/// becomes `_xx` (lowercase hex).
fn escape(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for b in part.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'.' {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("_{:02x}", b));
        }
    }
    out
}

impl Backend for FolderBackend {
    fn put_app(&self, lookup: &AppLookup, app: &App) -> Result<()> {
        self.put("app", &app_key(lookup), app)
    }

    fn get_app(&self, lookup: &AppLookup) -> Result<Option<App>> {
        self.get("app", &app_key(lookup))
    }

    fn put_dev(&self, dev: &Dev) -> Result<()> {
        self.put("dev", &app_key(&dev.lookup), dev)
    }

    fn get_dev(&self, lookup: &AppLookup) -> Result<Option<Dev>> {
        self.get("dev", &app_key(lookup))
    }

    fn put_build(&self, build: &Build) -> Result<()> {
        self.put("build", &app_key(&build.lookup), build)
    }

    fn get_build(&self, lookup: &AppLookup) -> Result<Option<Build>> {
        self.get("build", &app_key(lookup))
    }

    fn put_deploy(&self, deploy: &Deploy) -> Result<()> {
        self.put("deploy", &app_key(&deploy.lookup), deploy)
    }

    fn get_deploy(&self, lookup: &AppLookup) -> Result<Option<Deploy>> {
        self.get("deploy", &app_key(lookup))
    }

    fn put_infra(&self, infra: &Infra) -> Result<()> {
        self.put("infra", &escape(&infra.lookup.name), infra)
    }

    fn get_infra(&self, lookup: &InfraLookup) -> Result<Option<Infra>> {
        self.get("infra", &escape(&lookup.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup() -> AppLookup {
        AppLookup {
            app_id: "web/1".to_string(),
            infra_type: "aws".to_string(),
            infra_flavor: "simple".to_string(),
        }
    }

    #[test]
    fn test_folder_app_key_escaped() {
        assert_eq!(app_key(&lookup()), "web_2f1+aws+simple");
    }

    fn key(app: &str, infra: &str, flavor: &str) -> String {
        app_key(&AppLookup {
            app_id: app.to_string(),
            infra_type: infra.to_string(),
            infra_flavor: flavor.to_string(),
        })
    }

    #[test]
    fn test_folder_app_keys_do_not_collide() {
        assert_ne!(key("a--b", "c", "d"), key("a", "b--c", "d"));
        assert_ne!(key("a+b", "c", "d"), key("a", "b+c", "d"));
        assert_ne!(key("a/b", "c", "d"), key("a_b", "c", "d"));
        assert_ne!(key("a_2fb", "c", "d"), key("a/b", "c", "d"));
    }

    #[test]
    fn test_folder_similar_ids_stored_apart() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FolderBackend::new(dir.path());
        let dev = |app: &str, state: DevState| Dev {
            lookup: AppLookup {
                app_id: app.to_string(),
                infra_type: "aws".to_string(),
                infra_flavor: "simple".to_string(),
            },
            state,
        };
        backend.put_dev(&dev("a/b", DevState::Ready)).unwrap();
        backend.put_dev(&dev("a_b", DevState::NotCreated)).unwrap();

        let got = backend.get_dev(&dev("a/b", DevState::Ready).lookup).unwrap();
        assert_eq!(got, Some(dev("a/b", DevState::Ready)));
    }

    #[test]
    fn test_folder_put_get_deploy() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FolderBackend::new(dir.path());
        let deploy = Deploy {
            lookup: lookup(),
            state: DeployState::Deployed,
            outputs: BTreeMap::from([("url".to_string(), "http://x".to_string())]),
        };
        backend.put_deploy(&deploy).unwrap();

        let reopened = FolderBackend::new(dir.path());
        assert_eq!(reopened.get_deploy(&lookup()).unwrap(), Some(deploy));
        assert!(dir
            .path()
            .join("deploy")
            .join("web_2f1+aws+simple.json")
            .exists());
    }

    #[test]
    fn test_folder_missing_record() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FolderBackend::new(dir.path());
        assert_eq!(backend.get_build(&lookup()).unwrap(), None);
    }

    #[test]
    fn test_folder_corrupt_record() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FolderBackend::new(dir.path());
        let path = dir.path().join("dev").join("web_2f1+aws+simple.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[").unwrap();
        assert!(backend.get_dev(&lookup()).is_err());
    }
}
