//! Dateibasierter Einstellungs-Speicher
//!
//! Persistiert Schluessel/Wert-Paare zeilenweise (`schluessel=wert`) in
//! einer Textdatei. Traegt vor allem die Geraete-Identitaet, die
//! Neustarts ueberdauern muss.

use camsync_sync::SettingsStore;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Einstellungs-Speicher ueber einer `schluessel=wert`-Datei
pub struct FileSettings {
    pfad: PathBuf,
}

impl FileSettings {
    /// Erstellt einen Speicher ueber der gegebenen Datei
    ///
    /// Die Datei wird erst beim ersten `save` angelegt.
    pub fn new(pfad: impl Into<PathBuf>) -> Self {
        Self { pfad: pfad.into() }
    }

    fn alle_lesen(&self) -> BTreeMap<String, String> {
        let Ok(inhalt) = std::fs::read_to_string(&self.pfad) else {
            return BTreeMap::new();
        };

        inhalt
            .lines()
            .filter_map(|zeile| {
                let zeile = zeile.trim();
                if zeile.is_empty() || zeile.starts_with('#') {
                    return None;
                }
                let (k, v) = zeile.split_once('=')?;
                Some((k.trim().to_string(), v.trim().to_string()))
            })
            .collect()
    }

    fn alle_schreiben(&self, werte: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(eltern) = self.pfad.parent() {
            if !eltern.as_os_str().is_empty() {
                std::fs::create_dir_all(eltern)?;
            }
        }

        // Atomarer Austausch ueber eine Nachbardatei
        let temp = self.pfad.with_extension("tmp");
        {
            let mut datei = std::fs::File::create(&temp)?;
            for (k, v) in werte {
                writeln!(datei, "{k}={v}")?;
            }
            datei.sync_all()?;
        }
        std::fs::rename(&temp, &self.pfad)
    }

    /// Pfad der Speicherdatei
    pub fn pfad(&self) -> &Path {
        &self.pfad
    }
}

impl SettingsStore for FileSettings {
    fn load(&self, key: &str) -> Option<String> {
        self.alle_lesen().get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) -> std::io::Result<()> {
        let mut werte = self.alle_lesen();
        werte.insert(key.to_string(), value.to_string());
        self.alle_schreiben(&werte)
    }
}
