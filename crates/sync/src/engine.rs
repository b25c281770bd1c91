//! Orchestrierende State-Machine
//!
//! Die Engine ist der einzige Konsument der Event-Queue: Operator-Intents
//! und Koordinator-Broadcasts laufen seriell durch `handle_event`, damit
//! Zustandsuebergaenge nie nebenlaeufig passieren. Mit dem Frame-Hot-Path
//! wird nur das `RecordingGate` geteilt (Atomics, kein Lock).
//!
//! Wichtigste Regel: lokale START/STOP-Intents senden NUR das Kommando an
//! den Koordinator – der Aufnahme-Zustand kippt erst wenn der zugehoerige
//! Broadcast (SYNC_START/SYNC_STOP) eintrifft. So starten alle Geraete
//! der Gruppe auf denselben Ausloeser, auch das ausloesende.

use crate::control_channel::ControlChannel;
use crate::data_channel::DataChannel;
use crate::registry::DeviceRegistry;
use crate::session::{RecordingGate, SyncSession};
use crate::sink::StatusSink;
use camsync_core::{DeviceId, SyncError};
use camsync_protocol::{CommandKind, ACK_REGISTER, SYNC_START, SYNC_STOP};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Standard-Zeitlimit fuer den CONNECT-Handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 5_000;

/// Kapazitaet der Event-Queue
const EVENT_QUEUE_SIZE: usize = 64;

// ---------------------------------------------------------------------------
// Events und Zustaende
// ---------------------------------------------------------------------------

/// Eingaben der Engine, seriell konsumiert
#[derive(Debug)]
pub enum SyncEvent {
    /// Operator-Intent: Sitzung zum Koordinator aufbauen
    Connect {
        server: SocketAddr,
        token: String,
        name: String,
    },
    /// Operator-Intent: Aufnahme-Start anfragen (sendet nur das Kommando)
    StartIntent,
    /// Operator-Intent: Aufnahme-Stopp anfragen (sendet nur das Kommando)
    StopIntent,
    /// Broadcast-Text des Koordinators (klassifiziert die Engine)
    Broadcast(String),
    /// Engine beenden und Sitzung abbauen
    Shutdown,
}

/// Sitzungszustand der Engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// Keine Sitzung
    Disconnected,
    /// Handshake laeuft
    Handshaking,
    /// Sitzung aktiv; `recording` spiegelt den Broadcast-Zustand
    Registered { recording: bool },
}

impl SyncState {
    /// Besteht eine aktive Sitzung?
    pub fn ist_registriert(&self) -> bool {
        matches!(self, SyncState::Registered { .. })
    }
}

/// Konfiguration der Engine
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Zeitlimit fuer den CONNECT-Handshake
    pub handshake_timeout: Duration,
    /// Mindestabstand zwischen gesendeten Frames
    pub frame_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_millis(DEFAULT_HANDSHAKE_TIMEOUT_MS),
            frame_interval_ms: crate::limiter::DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// SyncEngine
// ---------------------------------------------------------------------------

/// Engine: konsumiert Events, besitzt Sitzung und Kanaele
pub struct SyncEngine {
    device_id: DeviceId,
    config: SyncConfig,
    sink: Arc<dyn StatusSink>,
    gate: Arc<RecordingGate>,
    data: Arc<DataChannel>,
    state: SyncState,
    session: Option<SyncSession>,
    events_tx: mpsc::Sender<SyncEvent>,
    events_rx: mpsc::Receiver<SyncEvent>,
}

impl SyncEngine {
    /// Erstellt die Engine mit eigener Event-Queue
    pub fn new(device_id: DeviceId, config: SyncConfig, sink: Arc<dyn StatusSink>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let gate = Arc::new(RecordingGate::new(config.frame_interval_ms));
        let data = Arc::new(DataChannel::new(Arc::clone(&sink)));
        Self {
            device_id,
            config,
            sink,
            gate,
            data,
            state: SyncState::Disconnected,
            session: None,
            events_tx,
            events_rx,
        }
    }

    /// Sender-Haelfte der Event-Queue (fuer Operator-Frontends)
    pub fn handle(&self) -> mpsc::Sender<SyncEvent> {
        self.events_tx.clone()
    }

    /// Gate fuer die Frame-Pipeline
    pub fn gate(&self) -> Arc<RecordingGate> {
        Arc::clone(&self.gate)
    }

    /// Datenkanal fuer die Frame-Pipeline
    pub fn data_channel(&self) -> Arc<DataChannel> {
        Arc::clone(&self.data)
    }

    /// Aktueller Sitzungszustand
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Event-Loop: laeuft bis `Shutdown` oder bis alle Sender weg sind
    pub async fn run(mut self) {
        tracing::info!(geraet = %self.device_id, "Sync-Engine gestartet");

        while let Some(event) = self.events_rx.recv().await {
            let shutdown = matches!(event, SyncEvent::Shutdown);
            self.handle_event(event).await;
            if shutdown {
                break;
            }
        }

        tracing::info!("Sync-Engine beendet");
    }

    /// Verarbeitet genau ein Event (seriell, nie nebenlaeufig)
    pub async fn handle_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Connect {
                server,
                token,
                name,
            } => self.handle_connect(server, token, name).await,
            SyncEvent::StartIntent => self.handle_intent(CommandKind::Start).await,
            SyncEvent::StopIntent => self.handle_intent(CommandKind::Stop).await,
            SyncEvent::Broadcast(text) => self.handle_broadcast(&text),
            SyncEvent::Shutdown => self.teardown().await,
        }
    }

    // -----------------------------------------------------------------------
    // Verbindungsaufbau
    // -----------------------------------------------------------------------

    /// Baut eine Sitzung auf: Handshake, Roster, Listener, REGISTER, TCP
    ///
    /// Eine bestehende Sitzung wird vorher komplett abgebaut (Reconnect
    /// ist Neuaufbau, nie Reparatur). Scheitert nur der TCP-Aufbau,
    /// bleibt die Sitzung registriert – Kommandos und Broadcasts laufen
    /// weiter, lediglich Frames koennen nicht gesendet werden.
    async fn handle_connect(&mut self, server: SocketAddr, token: String, name: String) {
        self.teardown().await;
        self.state = SyncState::Handshaking;

        let control = Arc::new(ControlChannel::new(Arc::clone(&self.sink)));

        let roster = match control
            .handshake(
                &self.device_id,
                &token,
                &name,
                server,
                self.config.handshake_timeout,
            )
            .await
        {
            Ok(roster) => roster,
            Err(e) => {
                self.melde_verbindungsfehler(&e);
                self.state = SyncState::Disconnected;
                return;
            }
        };

        let registry = DeviceRegistry::new(roster);
        let me = match registry.resolve_self(&self.device_id) {
            Some(descriptor) => descriptor.clone(),
            None => {
                // decode_roster garantiert ein nicht-leeres Roster; hier
                // landet nur ein leerer Snapshot aus fremder Quelle.
                self.melde_verbindungsfehler(&SyncError::EmptyRoster);
                self.state = SyncState::Disconnected;
                return;
            }
        };
        self.sink.status(&format!(
            "My device info: port={}, subdir={}",
            me.port, me.subdir
        ));

        // Listener vor REGISTER starten damit kein Broadcast verloren geht
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let listener = control.spawn_listener(self.events_tx.clone(), shutdown_rx);

        // REGISTER vor dem TCP-Aufbau: der Koordinator lernt die
        // Broadcast-Adresse auch wenn der Datenkanal scheitert
        control
            .send_command(CommandKind::Register, &self.device_id, &token, server)
            .await;

        let data_addr = SocketAddr::new(server.ip(), me.port);
        if let Err(e) = self.data.connect(data_addr).await {
            tracing::warn!(fehler = %e, "Datenkanal nicht verfuegbar, Sitzung bleibt bestehen");
        }

        self.session = Some(SyncSession::new(
            control,
            server,
            token,
            registry,
            me,
            listener,
            shutdown_tx,
        ));
        self.state = SyncState::Registered { recording: false };
        tracing::info!(server = %server, "Sitzung registriert");
    }

    fn melde_verbindungsfehler(&self, e: &SyncError) {
        tracing::warn!(fehler = %e, "Verbindungsaufbau fehlgeschlagen");
        self.sink.status(&format!("Connection failed: {e}"));
    }

    // -----------------------------------------------------------------------
    // Intents und Broadcasts
    // -----------------------------------------------------------------------

    /// Sendet ein START/STOP-Kommando; kippt den Zustand NICHT
    async fn handle_intent(&mut self, kind: CommandKind) {
        let Some(session) = &self.session else {
            self.sink.status("Nicht verbunden");
            return;
        };
        session
            .control
            .send_command(kind, &self.device_id, &session.token, session.server)
            .await;
    }

    /// Klassifiziert einen Broadcast-Text und kippt ggf. den Zustand
    ///
    /// SYNC_START wirkt nur innerhalb einer registrierten Sitzung: ohne
    /// Sitzung bleibt das Gate geschlossen. SYNC_STOP schliesst das Gate
    /// in jedem Zustand (sichere Richtung).
    fn handle_broadcast(&mut self, text: &str) {
        self.sink.status(&format!("UDP Empfang: {text}"));

        match text {
            SYNC_START => {
                if !self.state.ist_registriert() {
                    tracing::debug!("SYNC_START ohne Sitzung ignoriert");
                    return;
                }
                self.gate.set_recording(true);
                self.state = SyncState::Registered { recording: true };
                self.sink.status(">>> START RECORDING <<<");
                tracing::info!("Aufnahme gestartet (Broadcast)");
            }
            SYNC_STOP => {
                self.gate.set_recording(false);
                if self.state.ist_registriert() {
                    self.state = SyncState::Registered { recording: false };
                }
                self.sink.status(">>> STOP RECORDING <<<");
                tracing::info!("Aufnahme gestoppt (Broadcast)");
            }
            ACK_REGISTER => {
                // Bestaetigung ist informativ; registriert sind wir schon
                tracing::debug!("Registrierung bestaetigt");
            }
            andere => {
                tracing::debug!(text = andere, "Unbekannter Broadcast");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Abbau
    // -----------------------------------------------------------------------

    /// Baut die aktive Sitzung ab (idempotent)
    ///
    /// Reihenfolge: erst das Gate schliessen damit die Pipeline keine
    /// Frames mehr einreicht, dann Listener und Kontroll-Socket, zuletzt
    /// den Datenkanal.
    async fn teardown(&mut self) {
        self.gate.set_recording(false);
        if let Some(session) = self.session.take() {
            session.teardown().await;
            self.data.close().await;
            self.sink.status("Disconnected");
        }
        self.state = SyncState::Disconnected;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
