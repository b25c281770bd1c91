//! Persistente Geraete-Identitaet
//!
//! Die Geraete-ID wird beim allerersten Start erzeugt und ueberdauert
//! danach alle Neustarts. Solange der Speicher erreichbar ist, wird sie
//! nie neu generiert – der Koordinator ordnet Port und Archivverzeichnis
//! ueber diese ID zu.

use camsync_core::{DeviceId, Result, SyncError};
use rand::Rng;

/// Schluessel unter dem die Identitaet abgelegt wird
pub const IDENTITY_KEY: &str = "device_id";

/// Namespace-Prefix neuer Geraete-IDs
pub const IDENTITY_PREFIX: &str = "cam_";

/// Schnittstelle zum ausgelagerten Einstellungs-Speicher
///
/// Die konkrete Ablage (Datei, Systemspeicher) liefert der Host; der Kern
/// kennt nur Laden und Speichern einzelner Schluessel.
pub trait SettingsStore {
    /// Laedt einen gespeicherten Wert, `None` wenn nicht vorhanden
    fn load(&self, key: &str) -> Option<String>;

    /// Speichert einen Wert dauerhaft
    fn save(&self, key: &str, value: &str) -> std::io::Result<()>;
}

/// Liefert die stabile Geraete-Identitaet
pub struct IdentityStore<S: SettingsStore> {
    store: S,
}

impl<S: SettingsStore> IdentityStore<S> {
    /// Erstellt einen IdentityStore ueber dem gegebenen Speicher
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Gibt die persistierte Identitaet zurueck oder erzeugt sie einmalig
    ///
    /// Neue IDs bestehen aus dem Prefix und einer zufaelligen
    /// fuenfstelligen Zahl; die ID wird VOR der Rueckgabe persistiert.
    /// Speicherfehler sind fatal fuer den Start – ohne stabile Identitaet
    /// kann das Geraet nicht am Verbund teilnehmen.
    pub fn get_or_create(&self) -> Result<DeviceId> {
        if let Some(existing) = self.store.load(IDENTITY_KEY) {
            if !existing.is_empty() {
                return Ok(DeviceId::new(existing));
            }
        }

        let id = format!(
            "{}{}",
            IDENTITY_PREFIX,
            rand::thread_rng().gen_range(10_000..=99_999)
        );
        self.store
            .save(IDENTITY_KEY, &id)
            .map_err(|e| SyncError::Identity(e.to_string()))?;

        tracing::info!(device_id = %id, "Neue Geraete-Identitaet erzeugt");
        Ok(DeviceId::new(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-Memory-Speicher fuer Tests
    #[derive(Default)]
    struct MemorySettings {
        werte: Mutex<HashMap<String, String>>,
        schreibgeschuetzt: bool,
    }

    impl SettingsStore for MemorySettings {
        fn load(&self, key: &str) -> Option<String> {
            self.werte.lock().unwrap().get(key).cloned()
        }

        fn save(&self, key: &str, value: &str) -> std::io::Result<()> {
            if self.schreibgeschuetzt {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "Speicher nicht beschreibbar",
                ));
            }
            self.werte
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[test]
    fn erste_erzeugung_persistiert_vor_rueckgabe() {
        let store = IdentityStore::new(MemorySettings::default());
        let id = store.get_or_create().unwrap();

        assert!(id.inner().starts_with(IDENTITY_PREFIX));
        let suffix = &id.inner()[IDENTITY_PREFIX.len()..];
        let zahl: u32 = suffix.parse().expect("Suffix muss numerisch sein");
        assert!((10_000..=99_999).contains(&zahl));

        // Persistiert?
        assert_eq!(store.store.load(IDENTITY_KEY).as_deref(), Some(id.inner()));
    }

    #[test]
    fn zweiter_aufruf_liefert_dieselbe_id() {
        let store = IdentityStore::new(MemorySettings::default());
        let erste = store.get_or_create().unwrap();
        let zweite = store.get_or_create().unwrap();
        assert_eq!(erste, zweite);
    }

    #[test]
    fn vorhandene_id_wird_nie_ueberschrieben() {
        let settings = MemorySettings::default();
        settings.save(IDENTITY_KEY, "cam_77777").unwrap();

        let store = IdentityStore::new(settings);
        let id = store.get_or_create().unwrap();
        assert_eq!(id.inner(), "cam_77777");
    }

    #[test]
    fn speicherfehler_ist_fatal() {
        let settings = MemorySettings {
            schreibgeschuetzt: true,
            ..Default::default()
        };
        let store = IdentityStore::new(settings);

        let err = store.get_or_create().unwrap_err();
        assert!(err.ist_fatal());
        assert!(matches!(err, SyncError::Identity(_)));
    }
}
