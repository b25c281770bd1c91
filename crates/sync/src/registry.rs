//! Geraete-Roster
//!
//! Haelt die vom Koordinator mit der CONNECT-Antwort gelieferte Liste der
//! Verbund-Geraete und loest den Eintrag des lokalen Geraets auf. Das
//! Roster wird bei jedem erfolgreichen Handshake als Ganzes ersetzt, nie
//! teilweise aktualisiert.

use camsync_core::DeviceId;
use camsync_protocol::DeviceDescriptor;

/// Roster-Snapshot eines Handshakes
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    roster: Vec<DeviceDescriptor>,
}

impl DeviceRegistry {
    /// Erstellt ein Registry aus einer dekodierten CONNECT-Antwort
    pub fn new(roster: Vec<DeviceDescriptor>) -> Self {
        Self { roster }
    }

    /// Gibt alle Eintraege in Server-Reihenfolge zurueck
    pub fn roster(&self) -> &[DeviceDescriptor] {
        &self.roster
    }

    /// Anzahl der Eintraege
    pub fn len(&self) -> usize {
        self.roster.len()
    }

    /// Prueft ob das Roster leer ist
    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    /// Loest den Eintrag des lokalen Geraets auf
    ///
    /// Exakter `deviceId`-Treffer an beliebiger Position gewinnt. Fehlt
    /// der Treffer, faellt die Aufloesung auf den ERSTEN Eintrag zurueck
    /// – das haelt ein einzeln fehlkonfiguriertes Geraet benutzbar, ist
    /// aber fast sicher eine Identitaets-Diskrepanz und wird deshalb laut
    /// gemeldet statt still uebernommen. `None` nur bei leerem Roster.
    pub fn resolve_self(&self, local_id: &DeviceId) -> Option<&DeviceDescriptor> {
        if let Some(treffer) = self
            .roster
            .iter()
            .find(|d| d.device_id == local_id.inner())
        {
            return Some(treffer);
        }

        let erster = self.roster.first()?;
        tracing::warn!(
            lokal = %local_id,
            fallback = %erster.device_id,
            "Lokale Geraete-ID nicht im Roster – Fallback auf ersten Eintrag"
        );
        Some(erster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(id: &str, port: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            device_id: id.to_string(),
            name: format!("Cam_{id}"),
            port,
            subdir: id.to_string(),
        }
    }

    #[test]
    fn exakter_treffer_an_beliebiger_position() {
        let registry = DeviceRegistry::new(vec![
            descriptor("a", 6001),
            descriptor("b", 6002),
            descriptor("c", 6003),
        ]);

        // Treffer am Ende, nicht vorn
        let me = registry.resolve_self(&DeviceId::new("c")).unwrap();
        assert_eq!(me.device_id, "c");
        assert_eq!(me.port, 6003);

        // Treffer in der Mitte
        let me = registry.resolve_self(&DeviceId::new("b")).unwrap();
        assert_eq!(me.port, 6002);
    }

    #[test]
    fn fallback_auf_ersten_eintrag() {
        let registry = DeviceRegistry::new(vec![descriptor("a", 6001), descriptor("b", 6002)]);

        let me = registry.resolve_self(&DeviceId::new("unbekannt")).unwrap();
        assert_eq!(me.device_id, "a");
    }

    #[test]
    fn leeres_roster_liefert_none() {
        let registry = DeviceRegistry::new(Vec::new());
        assert!(registry.resolve_self(&DeviceId::new("a")).is_none());
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }
}
