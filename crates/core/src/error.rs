//! Fehlertypen fuer CamSync
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende des
//! Protokoll-Kerns abdeckt. Pro-Frame- und Pro-Kommando-Fehler werden
//! lokal behandelt (geloggt, Fluss laeuft weiter); Handshake- und
//! Verbindungsfehler werden synchron an den Aufrufer gemeldet.

use thiserror::Error;

/// Globaler Result-Alias fuer CamSync
pub type Result<T> = std::result::Result<T, SyncError>;

/// Alle moeglichen Fehler im CamSync-Protokollkern
#[derive(Debug, Error)]
pub enum SyncError {
    // --- Handshake ---
    #[error("Handshake-Zeitlimit ueberschritten: keine Antwort nach {0} ms")]
    HandshakeTimeout(u64),

    #[error("Ungueltige Roster-Antwort: {0}")]
    MalformedResponse(String),

    #[error("Leeres Roster: Server hat keine gueltigen Geraete zurueckgegeben")]
    EmptyRoster,

    // --- Datenkanal ---
    #[error("Datenkanal-Verbindung fehlgeschlagen: {0}")]
    DataConnect(String),

    #[error("Frame-Versand fehlgeschlagen: {0}")]
    DataSend(String),

    // --- Kontrollkanal ---
    #[error("Kommando-Versand fehlgeschlagen: {0}")]
    ControlSend(String),

    // --- Identitaet & Konfiguration ---
    #[error("Geraete-Identitaet konnte nicht gelesen/gespeichert werden: {0}")]
    Identity(String),

    #[error("Konfigurationsfehler: {0}")]
    Config(String),

    // --- Intern ---
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Gibt true zurueck wenn der Fehler den Sitzungsfluss nicht beenden darf
    ///
    /// Pro-Frame- und Pro-Kommando-Fehler fallen hierunter: der naechste
    /// Frame bzw. das naechste Kommando ist wichtiger als eine Wiederholung.
    pub fn ist_lokal_behandelbar(&self) -> bool {
        matches!(self, Self::DataSend(_) | Self::ControlSend(_))
    }

    /// Gibt true zurueck wenn der Fehler den Prozessstart verhindert
    ///
    /// Ohne stabile Identitaet kann das Geraet nicht am Verbund teilnehmen.
    pub fn ist_fatal(&self) -> bool {
        matches!(self, Self::Identity(_) | Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = SyncError::HandshakeTimeout(5000);
        assert_eq!(
            e.to_string(),
            "Handshake-Zeitlimit ueberschritten: keine Antwort nach 5000 ms"
        );
    }

    #[test]
    fn lokal_behandelbare_fehler() {
        assert!(SyncError::DataSend("broken pipe".into()).ist_lokal_behandelbar());
        assert!(SyncError::ControlSend("network unreachable".into()).ist_lokal_behandelbar());
        assert!(!SyncError::HandshakeTimeout(5000).ist_lokal_behandelbar());
        assert!(!SyncError::EmptyRoster.ist_lokal_behandelbar());
    }

    #[test]
    fn fatale_fehler() {
        assert!(SyncError::Identity("Datei nicht beschreibbar".into()).ist_fatal());
        assert!(SyncError::Config("ungueltiges TOML".into()).ist_fatal());
        assert!(!SyncError::DataConnect("refused".into()).ist_fatal());
    }
}
