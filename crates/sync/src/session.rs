//! Live-Sitzungszustand
//!
//! Buendelt alle Ressourcen einer aktiven Sitzung in einem Struct das
//! exklusiv der Engine gehoert – Sockets und Flags leben nie als
//! ambiente Globale. Erstellt nach erfolgreichem Handshake, explizit
//! abgebaut bei Disconnect, fatalem Fehler oder Shutdown.

use crate::control_channel::ControlChannel;
use crate::limiter::FrameRateLimiter;
use crate::registry::DeviceRegistry;
use camsync_protocol::DeviceDescriptor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// RecordingGate
// ---------------------------------------------------------------------------

/// Tor zwischen Frame-Pipeline und Datenkanal
///
/// Der Hot-Path der Pipeline liest das Aufnahme-Flag und fragt den
/// Limiter; geschrieben wird beides nur von der Engine (Einzelschreiber,
/// Mehrfachleser – Atomics statt Mutex, nie ueber einen Netzwerkaufruf
/// hinweg gehalten).
#[derive(Debug)]
pub struct RecordingGate {
    recording: AtomicBool,
    limiter: FrameRateLimiter,
}

impl RecordingGate {
    /// Erstellt ein Gate mit dem gegebenen Frame-Mindestabstand
    pub fn new(frame_interval_ms: u64) -> Self {
        Self {
            recording: AtomicBool::new(false),
            limiter: FrameRateLimiter::new(frame_interval_ms),
        }
    }

    /// Schaltet die Aufnahme um und setzt den Limiter zurueck
    ///
    /// Der Reset bei beiden Uebergaengen stellt sicher dass der erste
    /// Frame jeder Aufnahme sofort akzeptiert wird.
    pub fn set_recording(&self, recording: bool) {
        self.recording.store(recording, Ordering::Relaxed);
        self.limiter.reset();
    }

    /// Laeuft gerade eine Aufnahme?
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Relaxed)
    }

    /// Entscheidet ob ein Frame zum Zeitpunkt `now_ms` gesendet werden darf
    pub fn admit(&self, now_ms: u64) -> bool {
        self.is_recording() && self.limiter.allow(now_ms)
    }

    /// Zugriff auf den Limiter (fuer Tests/Diagnose)
    pub fn limiter(&self) -> &FrameRateLimiter {
        &self.limiter
    }
}

// ---------------------------------------------------------------------------
// SyncSession
// ---------------------------------------------------------------------------

/// Ressourcen einer aktiven Sitzung
pub struct SyncSession {
    /// Kontrollkanal (UDP) – von Kommando-Sendern und Listener geteilt
    pub control: Arc<ControlChannel>,
    /// Kontroll-Endpunkt des Koordinators
    pub server: SocketAddr,
    /// Auth-Token dieser Sitzung
    pub token: String,
    /// Roster-Snapshot des Handshakes
    pub registry: DeviceRegistry,
    /// Aufgeloester Eintrag des lokalen Geraets
    pub self_descriptor: DeviceDescriptor,
    /// Listener-Task (laeuft bis zum Teardown)
    listener: JoinHandle<()>,
    /// Abbruchsignal fuer den Listener
    listener_shutdown: oneshot::Sender<()>,
}

impl SyncSession {
    /// Baut eine Sitzung aus den Handshake-Ergebnissen
    pub fn new(
        control: Arc<ControlChannel>,
        server: SocketAddr,
        token: String,
        registry: DeviceRegistry,
        self_descriptor: DeviceDescriptor,
        listener: JoinHandle<()>,
        listener_shutdown: oneshot::Sender<()>,
    ) -> Self {
        Self {
            control,
            server,
            token,
            registry,
            self_descriptor,
            listener,
            listener_shutdown,
        }
    }

    /// Baut die Sitzung deterministisch ab
    ///
    /// Reihenfolge: Abbruchsignal an den Listener, Kontroll-Socket
    /// schliessen (unterbricht einen haengenden Empfang zusaetzlich zum
    /// Signal), dann auf das Task-Ende warten. Danach sind alle
    /// Sitzungsressourcen freigegeben.
    pub async fn teardown(self) {
        let _ = self.listener_shutdown.send(());
        self.control.close();
        let _ = self.listener.await;
        tracing::debug!("Sitzung abgebaut");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_initial_geschlossen() {
        let gate = RecordingGate::new(200);
        assert!(!gate.is_recording());
        assert!(!gate.admit(1_000_000));
    }

    #[test]
    fn gate_kombiniert_flag_und_limiter() {
        let gate = RecordingGate::new(200);
        gate.set_recording(true);

        let t = 1_000_000;
        assert!(gate.admit(t));
        assert!(!gate.admit(t + 100), "Limiter muss greifen");
        assert!(gate.admit(t + 200));

        gate.set_recording(false);
        assert!(!gate.admit(t + 400), "Flag muss greifen");
    }

    #[test]
    fn stopp_setzt_limiter_zurueck() {
        let gate = RecordingGate::new(200);
        gate.set_recording(true);
        assert!(gate.admit(1_000_000));

        gate.set_recording(false);
        assert_eq!(gate.limiter().last_accepted_ms(), 0);

        // Naechste Aufnahme: erster Frame sofort akzeptiert
        gate.set_recording(true);
        assert!(gate.admit(1_000_050));
    }
}
