//! Kontrollkanal (UDP)
//!
//! Besitzt genau einen Datagramm-Socket fuer die Lebensdauer einer
//! Sitzung. Derselbe Socket traegt drei Rollen:
//!
//! 1. CONNECT-Handshake: ein Request, genau eine Antwort mit Zeitlimit
//! 2. Kommandos (REGISTER/START/STOP): fire-and-forget
//! 3. Listener-Loop: empfaengt Broadcasts des Koordinators unbegrenzt
//!
//! Der Socket durchlaeuft die Zustaende Absent -> Open -> Closed; das
//! Zeitlimit des Handshakes ist kein Socket-Zustand sondern ein
//! `tokio::time::timeout` um genau einen Empfang – danach nutzt der
//! Listener denselben Socket ohne Deadline weiter. So genuegt ein
//! gebundener Port fuer Request/Response und den Broadcast-Kanal.
//!
//! Senden und Empfangen sind unabhaengige Richtungen eines
//! Vollduplex-Kanals: Kommando-Sender und Listener teilen sich den
//! Socket ohne zusaetzliches Locking.

use crate::engine::SyncEvent;
use crate::sink::StatusSink;
use camsync_core::{DeviceId, Result, SyncError};
use camsync_protocol::{decode_roster, CommandKind, ControlMessage, DeviceDescriptor};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Empfangspuffer fuer die Handshake-Antwort (Roster-Array)
const HANDSHAKE_BUFFER_SIZE: usize = 8192;

/// Empfangspuffer fuer Broadcast-Datagramme
const LISTENER_BUFFER_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// ControlChannel
// ---------------------------------------------------------------------------

/// Kontrollkanal ueber einem lazily gebundenen UDP-Socket
pub struct ControlChannel {
    /// Absent (None) -> Open (Some) -> Closed (wieder None nach `close`)
    socket: Mutex<Option<Arc<UdpSocket>>>,
    sink: Arc<dyn StatusSink>,
}

impl ControlChannel {
    /// Erstellt einen Kontrollkanal ohne gebundenen Socket
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self {
            socket: Mutex::new(None),
            sink,
        }
    }

    /// Gibt den offenen Socket zurueck, bindet ihn bei Bedarf
    ///
    /// Das OS waehlt den lokalen Port; der Koordinator lernt die
    /// Absenderadresse aus den eintreffenden Datagrammen.
    async fn ensure_socket(&self) -> std::io::Result<Arc<UdpSocket>> {
        if let Some(socket) = self.socket.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Ok(socket);
        }

        let neu = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        tracing::debug!(
            lokal = %neu.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            "Kontroll-Socket gebunden"
        );

        let mut guard = self.socket.lock().unwrap_or_else(|e| e.into_inner());
        // Zwei Aufrufer koennen gleichzeitig gebunden haben; der erste
        // Eintrag im Guard gewinnt, der ueberzaehlige Socket wird verworfen.
        if let Some(vorhanden) = guard.clone() {
            return Ok(vorhanden);
        }
        *guard = Some(Arc::clone(&neu));
        Ok(neu)
    }

    /// Schliesst den Socket (terminal fuer diesen Kanal)
    ///
    /// Ein neuer Kanal muss erstellt werden um die Verbindung wieder
    /// aufzunehmen.
    pub fn close(&self) {
        let mut guard = self.socket.lock().unwrap_or_else(|e| e.into_inner());
        if guard.take().is_some() {
            tracing::debug!("Kontroll-Socket geschlossen");
        }
    }

    /// Prueft ob der Socket gebunden ist (fuer Tests/Diagnose)
    pub fn is_open(&self) -> bool {
        self.socket.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    /// Fuehrt den CONNECT-Handshake durch und liefert das Roster
    ///
    /// Sendet genau eine CONNECT-Nachricht und wartet mit Zeitlimit auf
    /// genau ein Antwort-Datagramm. Zeitueberschreitung bedeutet "Server
    /// nicht erreichbar oder abgelehnt" – der Aufrufer wiederholt NICHT
    /// automatisch. Nach Erfolg bleibt der Socket ohne Deadline offen und
    /// wird vom Listener weiterverwendet.
    pub async fn handshake(
        &self,
        device_id: &DeviceId,
        token: &str,
        name: &str,
        server: SocketAddr,
        timeout: Duration,
    ) -> Result<Vec<DeviceDescriptor>> {
        let socket = self.ensure_socket().await?;

        let msg = ControlMessage::connect(device_id.clone(), token, name);
        let data = msg
            .encode()
            .map_err(|e| SyncError::ControlSend(e.to_string()))?;

        socket
            .send_to(&data, server)
            .await
            .map_err(|e| SyncError::ControlSend(e.to_string()))?;
        self.sink.status(&format!(
            "UDP -> CONNECT (deviceId={}, name={})",
            device_id, name
        ));

        let mut buf = [0u8; HANDSHAKE_BUFFER_SIZE];
        let (len, absender) = match tokio::time::timeout(timeout, socket.recv_from(&mut buf)).await
        {
            Ok(Ok(empfangen)) => empfangen,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                self.sink
                    .status(&format!("CONNECT timeout nach {} ms", timeout.as_millis()));
                return Err(SyncError::HandshakeTimeout(timeout.as_millis() as u64));
            }
        };

        tracing::debug!(bytes = len, absender = %absender, "CONNECT-Antwort empfangen");

        let roster = decode_roster(&buf[..len]).map_err(|e| {
            self.sink.status("CONNECT FAILED: Antwort nicht parsebar");
            SyncError::MalformedResponse(e.to_string())
        })?;

        if roster.is_empty() {
            self.sink
                .status("CONNECT FAILED: keine gueltigen Geraete in der Antwort");
            return Err(SyncError::EmptyRoster);
        }

        Ok(roster)
    }

    // -----------------------------------------------------------------------
    // Kommandos
    // -----------------------------------------------------------------------

    /// Sendet ein Kommando fire-and-forget
    ///
    /// Fehler werden gemeldet aber nie propagiert: der serverseitige
    /// Broadcast ist der massgebliche Ausloeser fuer Zustandswechsel,
    /// nicht der Erfolg des lokalen Sendens.
    pub async fn send_command(
        &self,
        kind: CommandKind,
        device_id: &DeviceId,
        token: &str,
        server: SocketAddr,
    ) {
        let ergebnis: Result<()> = async {
            let socket = self.ensure_socket().await?;
            let msg = ControlMessage::command(kind, device_id.clone(), token);
            let data = msg
                .encode()
                .map_err(|e| SyncError::ControlSend(e.to_string()))?;
            socket
                .send_to(&data, server)
                .await
                .map_err(|e| SyncError::ControlSend(e.to_string()))?;
            Ok(())
        }
        .await;

        match ergebnis {
            Ok(()) => self.sink.status(&format!("UDP -> {kind}")),
            Err(e) => {
                tracing::warn!(kommando = %kind, fehler = %e, "Kommando-Versand fehlgeschlagen");
                self.sink.status(&format!("UDP ERR ({kind}): {e}"));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Listener
    // -----------------------------------------------------------------------

    /// Startet den Broadcast-Listener auf eigenem Task
    ///
    /// Laeuft bis zum Abbruchsignal und reicht jedes empfangene Datagramm
    /// als Text-Event an die Engine weiter – auch unbekannte Texte
    /// (vorwaertskompatibel, die Engine klassifiziert). Ein
    /// Empfangsfehler nach dem Schliessen des Sockets ist regulaeres
    /// Ende, kein Fehler.
    pub fn spawn_listener(
        self: &Arc<Self>,
        events_tx: mpsc::Sender<SyncEvent>,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> JoinHandle<()> {
        let kanal = Arc::clone(self);
        tokio::spawn(async move {
            kanal.listen(events_tx, shutdown_rx).await;
        })
    }

    /// Listener-Loop (laeuft auf dem von `spawn_listener` gestarteten Task)
    async fn listen(
        &self,
        events_tx: mpsc::Sender<SyncEvent>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let socket = match self.ensure_socket().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(fehler = %e, "Listener: Socket nicht verfuegbar");
                return;
            }
        };

        let mut buf = [0u8; LISTENER_BUFFER_SIZE];
        tracing::info!("Broadcast-Listener gestartet");

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, _absender)) => {
                            let text = String::from_utf8_lossy(&buf[..len]).trim().to_string();
                            if events_tx.send(SyncEvent::Broadcast(text)).await.is_err() {
                                // Engine beendet, Queue geschlossen
                                break;
                            }
                        }
                        Err(e) => {
                            // Tritt nach close() auf und beendet die Loop
                            // regulaer; davor ist es ein echter Fehler.
                            tracing::debug!(fehler = %e, "Listener: Empfang beendet");
                            break;
                        }
                    }
                }

                _ = &mut shutdown_rx => {
                    tracing::debug!("Listener: Abbruchsignal empfangen");
                    break;
                }
            }
        }

        tracing::info!("Broadcast-Listener beendet");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
