//! Geraete-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass das Geraet ohne Konfigurationsdatei
//! lauffaehig ist.

use camsync_core::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Vollstaendige Geraete-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct DeviceConfig {
    /// Allgemeine Geraete-Einstellungen
    pub geraet: GeraetEinstellungen,
    /// Koordinator-Einstellungen
    pub koordinator: KoordinatorEinstellungen,
    /// Aufnahme-Einstellungen
    pub aufnahme: AufnahmeEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Geraete-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeraetEinstellungen {
    /// Anzeigename des Geraets (geht mit dem Handshake an den Koordinator)
    pub name: String,
    /// Datei in der die Geraete-Identitaet persistiert wird
    pub identitaets_datei: String,
}

impl Default for GeraetEinstellungen {
    fn default() -> Self {
        Self {
            name: "CamSync Device".into(),
            identitaets_datei: "device.settings".into(),
        }
    }
}

/// Koordinator-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KoordinatorEinstellungen {
    /// IP-Adresse des Koordinators
    pub adresse: String,
    /// Kontroll-Port (UDP)
    pub kontroll_port: u16,
    /// Gemeinsames Auth-Token des Verbunds
    pub token: String,
    /// Zeitlimit fuer den CONNECT-Handshake in Millisekunden
    pub handshake_timeout_ms: u64,
}

impl Default for KoordinatorEinstellungen {
    fn default() -> Self {
        Self {
            adresse: "172.19.0.1".into(),
            kontroll_port: 5000,
            token: "123456".into(),
            handshake_timeout_ms: 5_000,
        }
    }
}

/// Aufnahme-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AufnahmeEinstellungen {
    /// Mindestabstand zwischen gesendeten Frames in Millisekunden
    pub frame_intervall_ms: u64,
    /// Native Capture-Rate der Testmuster-Quelle in Millisekunden
    pub capture_intervall_ms: u64,
    /// Nutzlast-Groesse der Testmuster-Frames in Bytes
    pub test_frame_bytes: usize,
}

impl Default for AufnahmeEinstellungen {
    fn default() -> Self {
        Self {
            frame_intervall_ms: 200,
            capture_intervall_ms: 33,
            test_frame_bytes: 4096,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl DeviceConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt).map_err(|e| {
                    SyncError::Config(format!("Konfigurationsfehler in '{pfad}': {e}"))
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(SyncError::Config(format!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            ))),
        }
    }

    /// Gibt den Kontroll-Endpunkt des Koordinators zurueck
    pub fn kontroll_endpunkt(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.koordinator.adresse.parse().map_err(|e| {
            SyncError::Config(format!("Ungueltige Koordinator-Adresse: {e}"))
        })?;
        Ok(SocketAddr::new(ip, self.koordinator.kontroll_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = DeviceConfig::default();
        assert_eq!(cfg.koordinator.adresse, "172.19.0.1");
        assert_eq!(cfg.koordinator.kontroll_port, 5000);
        assert_eq!(cfg.koordinator.handshake_timeout_ms, 5_000);
        assert_eq!(cfg.aufnahme.frame_intervall_ms, 200);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn kontroll_endpunkt_aus_standard() {
        let cfg = DeviceConfig::default();
        assert_eq!(
            cfg.kontroll_endpunkt().unwrap().to_string(),
            "172.19.0.1:5000"
        );
    }

    #[test]
    fn ungueltige_adresse_ist_config_fehler() {
        let mut cfg = DeviceConfig::default();
        cfg.koordinator.adresse = "kein-host".into();

        let err = cfg.kontroll_endpunkt().unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.ist_fatal());
    }

    #[test]
    fn kaputtes_toml_ist_config_fehler() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("device.toml");
        std::fs::write(&pfad, "[koordinator\nadresse = ").unwrap();

        let err = DeviceConfig::laden(pfad.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
        assert!(err.ist_fatal());
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = DeviceConfig::laden("/nicht/vorhanden/device.toml").unwrap();
        assert_eq!(cfg.koordinator.kontroll_port, 5000);
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [geraet]
            name = "Halle Nord"

            [koordinator]
            adresse = "10.0.0.5"
            token = "geheim"

            [aufnahme]
            frame_intervall_ms = 100
        "#;
        let cfg: DeviceConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.geraet.name, "Halle Nord");
        assert_eq!(cfg.koordinator.adresse, "10.0.0.5");
        assert_eq!(cfg.koordinator.token, "geheim");
        assert_eq!(cfg.aufnahme.frame_intervall_ms, 100);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.koordinator.kontroll_port, 5000);
    }
}
