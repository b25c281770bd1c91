//! Frame-Raten-Begrenzung
//!
//! Obergrenze fuer die Senderate der Frame-Pipeline waehrend einer
//! Aufnahme. Kein Scheduler: abgelehnte Frames werden verworfen, nicht
//! verzoegert oder gepuffert – der Kanal bevorzugt Frische vor
//! Vollstaendigkeit (Live-Vorschau/Synchronisation).

use std::sync::atomic::{AtomicU64, Ordering};

/// Standard-Sendeintervall: 200 ms entspricht maximal 5 Frames/Sekunde
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 200;

/// Raten-Begrenzer ueber einem einzelnen "zuletzt akzeptiert"-Zeitstempel
///
/// Hot-Path-tauglich: ein AtomicU64, kein Mutex. Der Zeitstempel wird nur
/// vom Frame-Pfad geschrieben (Einzelschreiber); `reset` greift nur
/// ausserhalb aktiver Aufnahmen.
#[derive(Debug)]
pub struct FrameRateLimiter {
    /// Mindestabstand zwischen zwei akzeptierten Frames in Millisekunden
    interval_ms: u64,
    /// Zeitstempel (Unix-ms) des zuletzt akzeptierten Frames, 0 = nie
    last_ms: AtomicU64,
}

impl FrameRateLimiter {
    /// Erstellt einen Limiter mit dem gegebenen Mindestabstand
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: AtomicU64::new(0),
        }
    }

    /// Entscheidet ob ein Frame zum Zeitpunkt `now_ms` gesendet werden darf
    ///
    /// Gibt true zurueck und uebernimmt `now_ms` als neuen Referenzpunkt
    /// genau dann wenn seit dem letzten akzeptierten Frame mindestens das
    /// Intervall vergangen ist; sonst false ohne Zustandsaenderung.
    pub fn allow(&self, now_ms: u64) -> bool {
        let last = self.last_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) >= self.interval_ms {
            self.last_ms.store(now_ms, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Setzt den Referenzpunkt auf 0 zurueck
    ///
    /// Wird bei jedem Aufnahme-Stopp gerufen, damit der erste Frame der
    /// naechsten Aufnahme sofort akzeptiert wird.
    pub fn reset(&self) {
        self.last_ms.store(0, Ordering::Relaxed);
    }

    /// Gibt den aktuellen Referenzpunkt zurueck (fuer Tests/Diagnose)
    pub fn last_accepted_ms(&self) -> u64 {
        self.last_ms.load(Ordering::Relaxed)
    }

    /// Gibt das konfigurierte Intervall zurueck
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

impl Default for FrameRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL_MS)
    }
}
