//! Status-Senke fuer Protokollereignisse
//!
//! Jedes Protokollereignis (Handshake-Ergebnis, Verbindungsaufbau,
//! gesendetes Kommando, empfangener Broadcast, Fehler) erzeugt eine kurze,
//! menschenlesbare Statuszeile. Die Senke wird einmal beim Bau der Engine
//! injiziert und per Referenz an die Kanaele gereicht – nicht pro Aufruf
//! als Callback durchgeschleift.

use std::sync::Mutex;

/// UI-agnostische Senke fuer Statuszeilen
pub trait StatusSink: Send + Sync {
    /// Nimmt eine Statuszeile entgegen
    fn status(&self, message: &str);
}

/// Standard-Senke: leitet Statuszeilen als tracing-Events weiter
#[derive(Debug, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn status(&self, message: &str) {
        tracing::info!(target: "camsync_status", "{}", message);
    }
}

/// Sammelnde Senke fuer Tests und eingebettete Oberflaechen
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Erstellt eine leere Senke
    pub fn new() -> Self {
        Self::default()
    }

    /// Gibt eine Kopie aller bisher gesammelten Statuszeilen zurueck
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Prueft ob irgendeine Statuszeile den Teilstring enthaelt
    pub fn contains(&self, teil: &str) -> bool {
        self.messages().iter().any(|m| m.contains(teil))
    }
}

impl StatusSink for MemorySink {
    fn status(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_sammelt() {
        let sink = MemorySink::new();
        sink.status("TCP Connected to 10.0.0.1:6001");
        sink.status("UDP -> REGISTER");

        assert_eq!(sink.messages().len(), 2);
        assert!(sink.contains("REGISTER"));
        assert!(!sink.contains("SYNC_START"));
    }
}
