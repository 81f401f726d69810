// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

static HOME_DIR: OnceLock<PathBuf> = OnceLock::new();

/// A custom data directory override, set only by `set_custom_data_dir`.
static CUSTOM_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// The resolved data directory.
/// On macOS, this is `~/Library/Application Support/RaspyTube`.
/// On Linux/FreeBSD, this is `$XDG_DATA_HOME/raspytube`.
static CURRENT_DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// The resolved config directory.
/// On Linux/FreeBSD, this is `$XDG_CONFIG_HOME/raspytube`.
static CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the path to the user's home directory.
pub fn home_dir() -> &'static PathBuf {
    HOME_DIR.get_or_init(|| dirs::home_dir().expect("failed to determine home directory"))
}

/// Returns the path to the configuration directory used by RaspyTube.
pub fn config_dir() -> &'static PathBuf {
    CONFIG_DIR.get_or_init(|| {
        if let Some(custom_dir) = CUSTOM_DATA_DIR.get() {
            custom_dir.join("config")
        } else if cfg!(target_os = "windows") {
            dirs::config_dir()
                .expect("failed to determine RoamingAppData directory")
                .join("RaspyTube")
        } else if cfg!(any(target_os = "linux", target_os = "freebsd")) {
            dirs::config_dir()
                .expect("failed to determine XDG_CONFIG_HOME directory")
                .join("raspytube")
        } else {
            home_dir().join(".config").join("raspytube")
        }
    })
}

/// Returns the path to the data directory used by RaspyTube.
pub fn data_dir() -> &'static PathBuf {
    CURRENT_DATA_DIR.get_or_init(|| {
        if let Some(custom_dir) = CUSTOM_DATA_DIR.get() {
            custom_dir.clone()
        } else if cfg!(any(target_os = "linux", target_os = "freebsd")) {
            dirs::data_local_dir()
                .expect("failed to determine XDG_DATA_HOME directory")
                .join("raspytube")
        } else {
            dirs::data_local_dir()
                .expect("failed to determine LocalAppData directory")
                .join("RaspyTube")
        }
    })
}

/// Sets a custom directory for all user data. Must be called before any
/// other path function. The directory is created if missing.
///
/// # Panics
///
/// Panics if called after `data_dir` or `config_dir` was initialized, or if
/// the directory cannot be created.
pub fn set_custom_data_dir<P: ?Sized + AsRef<Path>>(dir: &P) -> &'static PathBuf {
    assert!(
        CURRENT_DATA_DIR.get().is_none() && CONFIG_DIR.get().is_none(),
        "set_custom_data_dir called after data_dir or config_dir was initialized"
    );
    CUSTOM_DATA_DIR.get_or_init(|| {
        let mut path = dir.as_ref().to_path_buf();
        if path.is_relative() {
            if let Ok(abs) = path.canonicalize() {
                path = abs;
            }
        }

        std::fs::create_dir_all(&path).unwrap_or_else(|e| {
            panic!(
                "failed to create custom data directory {}: {e}",
                path.display()
            )
        });

        path
    })
}

/// Returns the path to the logs directory.
pub fn logs_dir() -> &'static PathBuf {
    static LOGS_DIR: OnceLock<PathBuf> = OnceLock::new();
    LOGS_DIR.get_or_init(|| {
        if cfg!(target_os = "macos") {
            home_dir().join("Library/Logs/RaspyTube")
        } else {
            data_dir().join("logs")
        }
    })
}

/// Returns the path to the `player.json` file holding player settings.
pub fn player_config_file() -> &'static PathBuf {
    static PLAYER_CONFIG_FILE: OnceLock<PathBuf> = OnceLock::new();
    PLAYER_CONFIG_FILE.get_or_init(|| config_dir().join("player.json"))
}
