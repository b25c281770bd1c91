//! Kontroll-Protokoll (UDP)
//!
//! Definiert die Steuerungsnachrichten die als einzelne UDP-Datagramme
//! zwischen Geraet und Koordinator ausgetauscht werden.
//!
//! ## Design
//! - Ausgehend: JSON-Objekte mit expliziten Feldnamen (kein positionales
//!   Encoding), UTF-8. Die Feldnamen sind Draht-Vertrag und weichen von
//!   den Rust-Namen ab (`type`, `deviceId`).
//! - Eingehend: entweder die Roster-Antwort auf CONNECT (JSON-Array von
//!   Geraete-Beschreibungen) oder blanke Text-Broadcasts
//!   (`SYNC_START` / `SYNC_STOP` / `ACK_REGISTER`).
//! - Unbekannte Broadcast-Texte sind vorwaertskompatibel: sie werden
//!   unklassifiziert weitergereicht, nie als Fehler behandelt.

use camsync_core::DeviceId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Broadcast-Konstanten
// ---------------------------------------------------------------------------

/// Broadcast des Koordinators: alle Geraete starten die Aufnahme
pub const SYNC_START: &str = "SYNC_START";

/// Broadcast des Koordinators: alle Geraete stoppen die Aufnahme
pub const SYNC_STOP: &str = "SYNC_STOP";

/// Antwort des Koordinators auf ein REGISTER-Kommando
///
/// Trifft auf dem Listener ein, wird aber nicht abgewartet – REGISTER
/// bleibt fire-and-forget.
pub const ACK_REGISTER: &str = "ACK_REGISTER";

// ---------------------------------------------------------------------------
// Kommando-Arten
// ---------------------------------------------------------------------------

/// Art einer ausgehenden Kontrollnachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandKind {
    /// Meldet die UDP-Ruecksendeadresse fuer Broadcasts an
    Register,
    /// Handshake: fordert das Geraete-Roster an
    Connect,
    /// Bittet den Koordinator, SYNC_START an alle zu senden
    Start,
    /// Bittet den Koordinator, SYNC_STOP an alle zu senden
    Stop,
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CommandKind::Register => "REGISTER",
            CommandKind::Connect => "CONNECT",
            CommandKind::Start => "START",
            CommandKind::Stop => "STOP",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// ControlMessage
// ---------------------------------------------------------------------------

/// Ausgehende Kontrollnachricht (ein UDP-Datagramm)
///
/// `kind`, `device_id` und `token` sind immer vorhanden; `name` wird nur
/// beim CONNECT-Handshake mitgesendet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(rename = "deviceId")]
    pub device_id: DeviceId,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ControlMessage {
    /// Erstellt eine CONNECT-Nachricht (Handshake, mit Anzeigename)
    pub fn connect(device_id: DeviceId, token: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: CommandKind::Connect,
            device_id,
            token: token.into(),
            name: Some(name.into()),
        }
    }

    /// Erstellt ein Kommando ohne Anzeigename (REGISTER/START/STOP)
    pub fn command(kind: CommandKind, device_id: DeviceId, token: impl Into<String>) -> Self {
        Self {
            kind,
            device_id,
            token: token.into(),
            name: None,
        }
    }

    /// Serialisiert die Nachricht als UTF-8 JSON-Datagramm
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

// ---------------------------------------------------------------------------
// DeviceDescriptor & Roster
// ---------------------------------------------------------------------------

/// Vom Koordinator zugewiesene Fakten ueber ein Geraet im Verbund
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Eindeutige Geraete-ID innerhalb eines Roster-Snapshots
    #[serde(rename = "deviceId")]
    pub device_id: String,
    /// Anzeigename
    #[serde(default)]
    pub name: String,
    /// Zugewiesener TCP-Port fuer den Datenkanal dieses Geraets
    #[serde(default)]
    pub port: u16,
    /// Serverseitiges Archiv-Unterverzeichnis fuer die Frames
    #[serde(default)]
    pub subdir: String,
}

impl DeviceDescriptor {
    /// Prueft die Minimal-Invariante eines Eintrags
    ///
    /// Eintraege ohne Geraete-ID oder ohne zugewiesenen Port sind
    /// unbrauchbar und werden beim Dekodieren verworfen.
    pub fn ist_gueltig(&self) -> bool {
        !self.device_id.is_empty() && self.port != 0
    }
}

/// Dekodiert die CONNECT-Antwort (JSON-Array) zu einem Roster
///
/// Jeder Eintrag wird unabhaengig validiert: ungueltige oder nicht
/// parsebare Eintraege werden mit einer Warnung uebersprungen, ohne die
/// gesamte Antwort zu verwerfen. Nur wenn die Antwort gar kein Array
/// ist, schlaegt die Dekodierung fehl.
pub fn decode_roster(data: &[u8]) -> Result<Vec<DeviceDescriptor>, serde_json::Error> {
    let eintraege: Vec<serde_json::Value> = serde_json::from_slice(data)?;

    let mut roster = Vec::with_capacity(eintraege.len());
    for eintrag in eintraege {
        match serde_json::from_value::<DeviceDescriptor>(eintrag) {
            Ok(d) if d.ist_gueltig() => roster.push(d),
            Ok(d) => {
                tracing::warn!(
                    device_id = %d.device_id,
                    port = d.port,
                    "Roster-Eintrag verworfen: Geraete-ID leer oder Port 0"
                );
            }
            Err(e) => {
                tracing::warn!(fehler = %e, "Roster-Eintrag nicht parsebar, uebersprungen");
            }
        }
    }

    Ok(roster)
}

/// Serialisiert ein Roster als JSON-Array
///
/// Gegenstueck zu [`decode_roster`]; wird fuer Test-Fixtures und den
/// simulierten Koordinator gebraucht, nicht im Produktionspfad.
pub fn encode_roster(roster: &[DeviceDescriptor]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(roster)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
