//! CamSync Synchronisations-Engine
//!
//! Der Protokollkern des Geraets: Kontrollkanal (UDP), Datenkanal (TCP),
//! Geraete-Roster, Raten-Begrenzung und die orchestrierende State-Machine.
//!
//! ## Architektur
//!
//! ```text
//! Operator-Intents (connect/start/stop)     UDP-Listener (Broadcasts)
//!            |                                      |
//!            +------------> SyncEvent-Queue <-------+
//!                                 |
//!                                 v
//!                            SyncEngine              Frame-Quelle
//!                          (ein Konsument)                |
//!                           /          \                  v
//!                   ControlChannel   DataChannel <-- RecordingGate
//!                      (UDP)           (TCP)        (Flag + Limiter)
//! ```
//!
//! Alle Zustandsuebergaenge laufen seriell durch die Event-Queue; nur der
//! Aufnahme-Status wird als atomares Flag mit dem Frame-Hot-Path geteilt.

pub mod control_channel;
pub mod data_channel;
pub mod engine;
pub mod identity;
pub mod limiter;
pub mod pump;
pub mod registry;
pub mod session;
pub mod sink;

pub use control_channel::ControlChannel;
pub use data_channel::DataChannel;
pub use engine::{SyncConfig, SyncEngine, SyncEvent, SyncState};
pub use identity::{IdentityStore, SettingsStore};
pub use limiter::FrameRateLimiter;
pub use pump::{run_frame_pump, FrameSource};
pub use registry::DeviceRegistry;
pub use session::{RecordingGate, SyncSession};
pub use sink::{MemorySink, StatusSink, TracingSink};

/// Aktueller Unix-Zeitstempel in Millisekunden
///
/// Monotonie ist hier nicht gefordert: der Limiter vergleicht nur grob
/// gegen das Sende-Intervall.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
