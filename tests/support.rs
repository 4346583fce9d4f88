#![allow(dead_code)]

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Points `HOME` and the app data dir at a fresh temp directory until dropped.
pub struct TestHome {
    dir: TempDir,
    old_home: Option<OsString>,
    old_config: Option<OsString>,
}

impl TestHome {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp home");
        let old_home = std::env::var_os("HOME");
        let old_config = std::env::var_os("CC_SWITCH_CONFIG_DIR");
        std::env::set_var("HOME", dir.path());
        std::env::set_var("CC_SWITCH_CONFIG_DIR", dir.path().join(".cc-switch"));
        Self {
            dir,
            old_home,
            old_config,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join(".cc-switch").join("config.json")
    }
}

impl Drop for TestHome {
    fn drop(&mut self) {
        match self.old_home.take() {
            Some(v) => std::env::set_var("HOME", v),
            None => std::env::remove_var("HOME"),
        }
        match self.old_config.take() {
            Some(v) => std::env::set_var("CC_SWITCH_CONFIG_DIR", v),
            None => std::env::remove_var("CC_SWITCH_CONFIG_DIR"),
        }
    }
}
