//! Testmuster-Frame-Quelle
//!
//! Stellvertreter fuer das ausgelagerte Kamera/Encoder-Subsystem: erzeugt
//! JPEG-artig gerahmte Platzhalter-Frames in fester Rate. Die Pipeline
//! dahinter (Gate, Limiter, Datenkanal) verhaelt sich identisch zu einer
//! echten Quelle.

use bytes::{BufMut, Bytes, BytesMut};
use camsync_sync::FrameSource;
use std::time::Duration;

/// JPEG Start-of-Image
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
/// JPEG End-of-Image
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// Frame-Quelle mit synthetischen JPEG-Huellen
pub struct TestPatternSource {
    intervall: Duration,
    nutzlast_groesse: usize,
    zaehler: u64,
}

impl TestPatternSource {
    /// Erstellt eine Quelle mit gegebener Capture-Rate und Frame-Groesse
    pub fn new(intervall: Duration, nutzlast_groesse: usize) -> Self {
        Self {
            intervall,
            nutzlast_groesse,
            zaehler: 0,
        }
    }

    fn baue_frame(&self) -> Bytes {
        let mut frame = BytesMut::with_capacity(self.nutzlast_groesse + 12);
        frame.put_slice(&JPEG_SOI);
        frame.put_u64(self.zaehler);
        // Fuellmuster statt echter Bilddaten
        frame.resize(frame.len() + self.nutzlast_groesse, (self.zaehler & 0xFF) as u8);
        frame.put_slice(&JPEG_EOI);
        frame.freeze()
    }
}

impl FrameSource for TestPatternSource {
    async fn next_encoded_frame(&mut self) -> Option<Bytes> {
        tokio::time::sleep(self.intervall).await;
        let frame = self.baue_frame();
        self.zaehler += 1;
        Some(frame)
    }
}
