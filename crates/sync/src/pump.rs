//! Frame-Pipeline
//!
//! Verbindet die ausgelagerte Frame-Quelle (Kamera/Encoder) mit dem
//! Datenkanal. Die Quelle liefert in nativer Rate; das `RecordingGate`
//! entscheidet pro Frame ob gesendet wird (Aufnahme-Flag + Limiter).
//! Abgelehnte Frames und Sendefehler sind beide nicht fatal – verlustige
//! Zustellung mit Vorrang fuer den juengsten Frame ist gewollt.
//!
//! ```text
//! FrameSource::next_encoded_frame()
//!     |
//!     v
//! RecordingGate::admit(now)   <- Aufnahme-Flag + Raten-Limit
//!     |
//!     v
//! DataChannel::send_frame()   <- Fehler: Frame verwerfen, weiterlaufen
//! ```

use crate::data_channel::DataChannel;
use crate::now_ms;
use crate::session::RecordingGate;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Quelle enkodierter Frames (ausgelagertes Capture-Subsystem)
///
/// `None` bedeutet: die Quelle ist versiegt und die Pipeline endet.
pub trait FrameSource: Send {
    /// Liefert den naechsten enkodierten Frame in nativer Capture-Rate
    fn next_encoded_frame(&mut self) -> impl std::future::Future<Output = Option<Bytes>> + Send;
}

/// Pump-Loop: Quelle -> Gate -> Datenkanal
///
/// Laeuft bis die Quelle versiegt oder das Abbruchsignal eintrifft.
/// Das Gate wird VOR dem Senden geprueft, damit ausserhalb von
/// Aufnahmen kein Lock auf dem Datenkanal genommen wird.
pub async fn run_frame_pump<S: FrameSource>(
    mut source: S,
    gate: Arc<RecordingGate>,
    data: Arc<DataChannel>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    tracing::debug!("Frame-Pump gestartet");

    loop {
        tokio::select! {
            frame = source.next_encoded_frame() => {
                let Some(frame) = frame else {
                    tracing::debug!("Frame-Quelle versiegt");
                    break;
                };

                if !gate.admit(now_ms()) {
                    continue;
                }

                if let Err(e) = data.send_frame(&frame).await {
                    // Frame verwerfen, Aufnahme laeuft weiter
                    tracing::debug!(fehler = %e, bytes = frame.len(), "Frame verworfen");
                }
            }

            _ = &mut shutdown_rx => {
                tracing::debug!("Frame-Pump: Abbruchsignal empfangen");
                break;
            }
        }
    }

    tracing::debug!("Frame-Pump beendet");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use camsync_protocol::wire::{read_frame, DEFAULT_MAX_FRAME_SIZE};
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Frame-Quelle ueber einer vorbereiteten Liste
    struct ListSource {
        frames: VecDeque<Bytes>,
    }

    impl ListSource {
        fn new(anzahl: usize) -> Self {
            let frames = (0..anzahl)
                .map(|i| Bytes::from(vec![i as u8; 16]))
                .collect();
            Self { frames }
        }
    }

    impl FrameSource for ListSource {
        async fn next_encoded_frame(&mut self) -> Option<Bytes> {
            // Kurze Pause simuliert die native Capture-Rate
            tokio::time::sleep(Duration::from_millis(1)).await;
            self.frames.pop_front()
        }
    }

    /// Quelle die nie liefert (fuer Abbruch-Tests)
    struct BlockingSource;

    impl FrameSource for BlockingSource {
        async fn next_encoded_frame(&mut self) -> Option<Bytes> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn pump_sendet_nur_bei_aufnahme() {
        let (listener, addr) = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = l.local_addr().unwrap();
            (l, addr)
        };

        let sink = Arc::new(MemorySink::new());
        let data = Arc::new(DataChannel::new(sink));
        data.connect(addr).await.unwrap();
        let (mut server_seite, _) = listener.accept().await.unwrap();

        // Intervall 0: jeder Frame darf durch sobald die Aufnahme laeuft
        let gate = Arc::new(RecordingGate::new(0));
        gate.set_recording(true);

        let (_shutdown_tx, shutdown_rx) = oneshot::channel();
        let pump = tokio::spawn(run_frame_pump(
            ListSource::new(3),
            Arc::clone(&gate),
            Arc::clone(&data),
            shutdown_rx,
        ));

        for i in 0..3u8 {
            let frame = read_frame(&mut server_seite, DEFAULT_MAX_FRAME_SIZE)
                .await
                .unwrap();
            assert_eq!(frame, vec![i; 16]);
        }

        pump.await.unwrap();
    }

    #[tokio::test]
    async fn pump_verwirft_ohne_aufnahme() {
        let sink = Arc::new(MemorySink::new());
        let data = Arc::new(DataChannel::new(sink));
        // Absichtlich nicht verbunden: ohne Aufnahme darf trotzdem kein
        // DataSend-Fehler entstehen weil das Gate vorher ablehnt
        let gate = Arc::new(RecordingGate::new(0));

        let (_shutdown_tx, shutdown_rx) = oneshot::channel();
        run_frame_pump(ListSource::new(5), gate, data, shutdown_rx).await;
        // Kein Panic, Quelle versiegt -> Pump endet
    }

    #[tokio::test]
    async fn sendefehler_beendet_pump_nicht() {
        // Pipeline-Ebene: Datenkanal fehlt, Aufnahme laeuft
        let sink = Arc::new(MemorySink::new());
        let data = Arc::new(DataChannel::new(sink));
        let gate = Arc::new(RecordingGate::new(0));
        gate.set_recording(true);

        let (_shutdown_tx, shutdown_rx) = oneshot::channel();
        run_frame_pump(ListSource::new(5), Arc::clone(&gate), data, shutdown_rx).await;

        // Pump hat alle Frames verworfen und ist regulaer geendet;
        // der Aufnahme-Zustand ist unveraendert
        assert!(gate.is_recording());
    }

    #[tokio::test]
    async fn abbruchsignal_beendet_pump() {
        let sink = Arc::new(MemorySink::new());
        let data = Arc::new(DataChannel::new(sink));
        let gate = Arc::new(RecordingGate::new(0));

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let pump = tokio::spawn(run_frame_pump(BlockingSource, gate, data, shutdown_rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(2), pump)
            .await
            .expect("Pump muss enden")
            .expect("Pump darf nicht panicken");
    }
}
