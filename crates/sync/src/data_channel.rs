//! Datenkanal (TCP)
//!
//! Besitzt genau einen Stream-Socket zum vom Koordinator zugewiesenen
//! Endpunkt und rahmt ausgehende Frames mit dem Laengen-Prefix aus
//! `camsync_protocol::wire`. Der Kanal wird vom Frame-Hot-Path und der
//! Engine geteilt; der Lock wird nur fuer die Dauer eines Schreibvorgangs
//! gehalten, nie ueber Kontroll-Aufrufe hinweg.

use crate::sink::StatusSink;
use camsync_core::{Result, SyncError};
use camsync_protocol::wire::{write_frame, DEFAULT_MAX_FRAME_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Datenkanal ueber einem exklusiv gehaltenen TCP-Stream
pub struct DataChannel {
    stream: Mutex<Option<TcpStream>>,
    sink: Arc<dyn StatusSink>,
    max_frame_size: usize,
}

impl DataChannel {
    /// Erstellt einen Datenkanal ohne Verbindung
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self {
            stream: Mutex::new(None),
            sink,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Verbindet zum zugewiesenen Endpunkt
    ///
    /// Eine bestehende Verbindung wird vorher geschlossen (idempotenter
    /// Reconnect). Ablehnung oder Timeout werden dem Aufrufer gemeldet,
    /// nicht intern wiederholt.
    pub async fn connect(&self, addr: SocketAddr) -> Result<()> {
        let mut guard = self.stream.lock().await;

        if let Some(mut alt) = guard.take() {
            let _ = alt.shutdown().await;
            tracing::debug!("Vorherige Datenkanal-Verbindung geschlossen");
        }

        match TcpStream::connect(addr).await {
            Ok(stream) => {
                *guard = Some(stream);
                tracing::info!(ziel = %addr, "Datenkanal verbunden");
                self.sink.status(&format!("TCP Connected to {addr}"));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(ziel = %addr, fehler = %e, "Datenkanal-Verbindung fehlgeschlagen");
                self.sink.status(&format!("TCP ERROR: {e}"));
                Err(SyncError::DataConnect(e.to_string()))
            }
        }
    }

    /// Sendet einen Frame: u32-BE-Laengen-Prefix + Payload, dann Flush
    ///
    /// Fehlt die Verbindung oder schlaegt das Schreiben fehl, bekommt der
    /// Aufrufer `DataSend` – er verwirft den Frame und laesst die
    /// Aufnahme weiterlaufen; ein einzelner Fehlversand beendet die
    /// Sitzung nicht.
    pub async fn send_frame(&self, payload: &[u8]) -> Result<()> {
        let mut guard = self.stream.lock().await;

        let stream = guard
            .as_mut()
            .ok_or_else(|| SyncError::DataSend("Datenkanal nicht verbunden".into()))?;

        write_frame(stream, payload, self.max_frame_size)
            .await
            .map_err(|e| SyncError::DataSend(e.to_string()))
    }

    /// Schliesst die Verbindung (falls vorhanden)
    pub async fn close(&self) {
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            let _ = stream.shutdown().await;
            tracing::debug!("Datenkanal geschlossen");
        }
    }

    /// Besteht gerade eine Verbindung?
    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
