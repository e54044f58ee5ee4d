//! Application names and launch commands from desktop entries
//!
//! Windows only tell us their resource class or desktop-file hint. The
//! matching `.desktop` file under the XDG data directories gives a
//! human-readable (localized) name and the command that starts the app.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::WindowRecord;
use crate::error::Result;

/// Field codes the desktop-entry spec defines for `Exec`
const EXEC_FIELD_CODES: [&str; 13] = [
    "%f", "%F", "%u", "%U", "%d", "%D", "%n", "%N", "%i", "%c", "%k", "%v", "%m",
];

/// Display name and launch command from one desktop entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppInfo {
    pub name: Option<String>,
    pub exec: Option<String>,
}

impl AppInfo {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.exec.is_none()
    }
}

/// Drop desktop-entry field codes (`%f`, `%U`, ...) from an `Exec` line
pub fn sanitize_exec_command(value: Option<&str>) -> Option<String> {
    let value = value?;
    let kept: Vec<&str> = value
        .split_whitespace()
        .filter(|part| !(EXEC_FIELD_CODES.contains(part) || part.starts_with('%')))
        .collect();
    let joined = kept.join(" ");
    if joined.is_empty() { None } else { Some(joined) }
}

/// Looks up desktop entries under a fixed list of data directories
#[derive(Debug, Clone)]
pub struct AppCatalog {
    data_dirs: Vec<PathBuf>,
    lang: String,
}

impl AppCatalog {
    pub fn new(data_dirs: Vec<PathBuf>, lang: impl Into<String>) -> Self {
        Self {
            data_dirs,
            lang: lang.into(),
        }
    }

    /// User data dir, `$XDG_DATA_DIRS`, then the usual system and flatpak/snap locations
    pub fn from_env() -> Self {
        let mut dirs_list = Vec::new();
        if let Some(home) = dirs::home_dir() {
            dirs_list.push(home.join(".local/share"));
        }
        if let Ok(xdg) = std::env::var("XDG_DATA_DIRS") {
            dirs_list.extend(xdg.split(':').filter(|d| !d.is_empty()).map(PathBuf::from));
        }
        dirs_list.extend(
            [
                "/usr/local/share",
                "/usr/share",
                "/var/lib/flatpak/exports/share",
                "/usr/share/flatpak/exports/share",
                "/var/lib/snapd/desktop",
            ]
            .into_iter()
            .map(PathBuf::from),
        );
        let lang = std::env::var("LANG").unwrap_or_default();
        Self::new(dirs_list, lang)
    }

    /// Catalog that never finds anything
    pub fn empty() -> Self {
        Self::new(Vec::new(), "")
    }

    /// Path of the desktop file for `hint`, with or without `.desktop`
    pub fn find_desktop_file(&self, hint: &str) -> Option<PathBuf> {
        if hint.is_empty() {
            return None;
        }
        let hint_path = Path::new(hint);
        if hint_path.is_absolute() && hint_path.exists() {
            return Some(hint_path.to_path_buf());
        }

        let mut names = vec![hint.to_string()];
        if !hint.ends_with(".desktop") {
            names.push(format!("{hint}.desktop"));
        }

        self.data_dirs
            .iter()
            .flat_map(|base| names.iter().map(move |n| base.join("applications").join(n)))
            .find(|p| p.exists())
    }

    /// Read `[Desktop Entry]` name (localized if available) and `Exec`
    pub fn read_entry(&self, path: &Path) -> AppInfo {
        let Ok(bytes) = std::fs::read(path) else {
            return AppInfo::default();
        };
        let text = String::from_utf8_lossy(&bytes);

        let lang = self.lang.split('.').next().unwrap_or("");
        let lang_short = lang.split_once('_').map(|(short, _)| short).unwrap_or("");
        let localized_key = format!("Name[{lang}]");
        let short_key = format!("Name[{lang_short}]");

        let mut in_section = false;
        let mut name = None;
        let mut localized = None;
        let mut exec = None;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                in_section = line == "[Desktop Entry]";
                continue;
            }
            if !in_section {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            if key == "Name" {
                name = Some(value.to_string());
            } else if !lang.is_empty() && key == localized_key {
                localized = Some(value.to_string());
            } else if !lang_short.is_empty() && key == short_key {
                localized = Some(value.to_string());
            } else if key == "X-GNOME-FullName" && name.is_none() {
                name = Some(value.to_string());
            } else if key == "Exec" {
                exec = sanitize_exec_command(Some(value));
            }
        }

        AppInfo {
            name: localized.or(name),
            exec,
        }
    }

    /// Fill `app_name`/`app_exec` on every window
    ///
    /// Tries the desktop-file hint, resource class and resource name (each
    /// also lowercased) and stops at the first entry that yields anything.
    pub fn enrich(&self, windows: &mut [WindowRecord]) {
        let mut cache: HashMap<String, AppInfo> = HashMap::new();

        for w in windows.iter_mut() {
            let mut candidates = Vec::new();
            for value in [&w.desktop_file_name, &w.resource_class, &w.resource_name]
                .into_iter()
                .flatten()
            {
                if value.is_empty() {
                    continue;
                }
                candidates.push(value.clone());
                let lower = value.to_lowercase();
                if &lower != value {
                    candidates.push(lower);
                }
            }

            let mut info = AppInfo::default();
            for candidate in candidates {
                info = cache
                    .entry(candidate.clone())
                    .or_insert_with(|| {
                        self.find_desktop_file(&candidate)
                            .map(|p| self.read_entry(&p))
                            .unwrap_or_default()
                    })
                    .clone();
                if !info.is_empty() {
                    break;
                }
            }

            w.app_name = info.name;
            w.app_exec = info.exec;
        }
    }

    /// [`enrich`](Self::enrich) on the blocking pool, off the async workers
    pub async fn enrich_async(&self, mut windows: Vec<WindowRecord>) -> Result<Vec<WindowRecord>> {
        if self.data_dirs.is_empty() || windows.is_empty() {
            return Ok(windows);
        }
        let catalog = self.clone();
        let windows = tokio::task::spawn_blocking(move || {
            catalog.enrich(&mut windows);
            windows
        })
        .await?;
        Ok(windows)
    }
}
