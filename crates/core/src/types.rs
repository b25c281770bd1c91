//! Gemeinsame Identifikationstypen fuer CamSync
//!
//! Die Geraete-ID verwendet das Newtype-Pattern um Verwechslungen mit
//! anderen Strings (Token, Anzeigenamen) zur Compilezeit auszuschliessen.
//! Auf dem Draht ist die ID ein opaker String – der Server vergibt keine
//! IDs, jedes Geraet bringt seine eigene mit.

use serde::{Deserialize, Serialize};

/// Eindeutige, persistente Geraete-ID
///
/// Wird einmalig beim ersten Start erzeugt und danach unveraendert
/// wiederverwendet (siehe `IdentityStore` in camsync-sync).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    /// Erstellt eine DeviceId aus einem vorhandenen String
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gibt die innere String-Repraesentation zurueck
    pub fn inner(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_display_ohne_prefix() {
        // Die ID geht unveraendert auf den Draht, Display darf nichts anhaengen
        let id = DeviceId::new("cam_12345");
        assert_eq!(id.to_string(), "cam_12345");
    }

    #[test]
    fn device_id_serde_transparent() {
        // Newtype muss als blanker JSON-String serialisiert werden
        let id = DeviceId::new("cam_12345");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"cam_12345\"");

        let zurueck: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, id);
    }

    #[test]
    fn device_id_vergleich() {
        assert_eq!(DeviceId::from("a"), DeviceId::new("a"));
        assert_ne!(DeviceId::from("a"), DeviceId::from("b"));
    }
}
