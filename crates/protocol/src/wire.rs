//! Wire-Format der Datenebene (TCP)
//!
//! Frame-basiertes Protokoll: Laenge (u32 big-endian) + rohe Payload.
//!
//! ## Frame-Format
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4
//! Laengen-Bytes). Pro Frame genau ein Prefix, keine Trenner, keine
//! nachlaufenden Metadaten – der Koordinator liest exakt dieses Format.
//! Die Payload ist fuer diese Ebene opak (enkodierte Kamera-Frames).

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (4 MB, grosszuegig fuer JPEG-Frames)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer den frame-basierten Datenkanal
///
/// Implementiert `Encoder<Bytes>` und `Decoder` fuer die Integration mit
/// `tokio_util::codec::Framed`. Der Encoder-Pfad wird vom Geraet genutzt,
/// der Decoder-Pfad von Tests die den Koordinator nachspielen.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limit
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefiniertem Limit
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen (big-endian u32) ohne den Buffer zu veraendern
        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

        if length > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                    length, self.max_frame_size
                ),
            ));
        }

        // Pruefen ob der vollstaendige Frame bereits im Buffer ist
        let total_size = LENGTH_FIELD_SIZE + length;
        if src.len() < total_size {
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        // Laengen-Feld verbrauchen, Payload extrahieren
        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(length).freeze();

        Ok(Some(payload))
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<Bytes> for FrameCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                    item.len(),
                    self.max_frame_size
                ),
            ));
        }

        dst.reserve(LENGTH_FIELD_SIZE + item.len());
        dst.put_u32(item.len() as u32);
        dst.put_slice(&item);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Hilfsfunktionen fuer direktes async Lesen/Schreiben
// ---------------------------------------------------------------------------

/// Schreibt genau einen Frame in einen `AsyncWrite` und flusht
///
/// # Fehler
/// - `InvalidData` wenn die Payload das Limit ueberschreitet
/// - IO-Fehler beim Schreiben/Flushen
pub async fn write_frame<W>(writer: &mut W, payload: &[u8], max_frame_size: usize) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                payload.len(),
                max_frame_size
            ),
        ));
    }

    let len_bytes = (payload.len() as u32).to_be_bytes();
    writer.write_all(&len_bytes).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;

    Ok(())
}

/// Liest genau einen Frame aus einem `AsyncRead`
///
/// # Fehler
/// - `UnexpectedEof` wenn die Verbindung vor Frame-Ende getrennt wird
/// - `InvalidData` bei zu grossem Frame
pub async fn read_frame<R>(reader: &mut R, max_frame_size: usize) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LENGTH_FIELD_SIZE];
    reader.read_exact(&mut len_buf).await?;
    let length = u32::from_be_bytes(len_buf) as usize;

    if length > max_frame_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                length, max_frame_size
            ),
        ));
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;

    Ok(payload)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frame(len: usize) -> Bytes {
        Bytes::from(vec![0xAB; len])
    }

    #[test]
    fn frame_codec_encode_byte_exakt() {
        // Fuer Payload der Laenge L muessen exakt 4 + L Bytes entstehen,
        // die ersten 4 als big-endian L
        let mut codec = FrameCodec::new();
        let payload = test_frame(260);

        let mut buf = BytesMut::new();
        codec.encode(payload.clone(), &mut buf).unwrap();

        assert_eq!(buf.len(), LENGTH_FIELD_SIZE + 260);
        assert_eq!(&buf[..4], &260u32.to_be_bytes());
        assert_eq!(&buf[4..], &payload[..]);
    }

    #[test]
    fn frame_codec_encode_decode_round_trip() {
        let mut codec = FrameCodec::new();
        let original = test_frame(512);

        let mut buf = BytesMut::new();
        codec.encode(original.clone(), &mut buf).unwrap();

        let decoded = codec
            .decode(&mut buf)
            .unwrap()
            .expect("Muss einen Frame enthalten");
        assert_eq!(decoded, original);
        assert!(buf.is_empty());
    }

    #[test]
    fn frame_codec_unvollstaendiger_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(test_frame(100), &mut buf).unwrap();

        // Nur die Haelfte der Bytes behalten
        let half = buf.len() / 2;
        let mut partial = buf.split_to(half);

        let result = codec.decode(&mut partial).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn frame_codec_zu_wenig_bytes_fuer_laengenfeld() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&[0x00, 0x00][..]);
        let result = codec.decode(&mut buf).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn frame_codec_ablehnung_zu_grosser_frame() {
        let mut codec = FrameCodec::with_max_size(100);

        let mut buf = BytesMut::new();
        buf.put_u32(200);
        buf.put_slice(&[b'x'; 200]);

        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn frame_codec_ablehnung_beim_encode() {
        let mut codec = FrameCodec::with_max_size(10);
        let mut buf = BytesMut::new();
        assert!(codec.encode(test_frame(11), &mut buf).is_err());
    }

    #[test]
    fn frame_codec_mehrere_frames_im_buffer() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        for i in 1..=3usize {
            codec.encode(test_frame(i * 10), &mut buf).unwrap();
        }

        for i in 1..=3usize {
            let frame = codec.decode(&mut buf).unwrap().expect("Frame erwartet");
            assert_eq!(frame.len(), i * 10);
        }

        assert!(buf.is_empty());
    }

    #[test]
    fn leerer_frame_erlaubt() {
        // Laenge 0 ist ein gueltiger Frame (4 Bytes Prefix, keine Payload)
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(Bytes::new(), &mut buf).unwrap();
        assert_eq!(buf.len(), LENGTH_FIELD_SIZE);

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert!(decoded.is_empty());
    }

    #[tokio::test]
    async fn async_write_read_frame_round_trip() {
        let payload = vec![0xCD; 777];

        let mut buffer: Vec<u8> = Vec::new();
        write_frame(&mut buffer, &payload, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();

        assert_eq!(buffer.len(), LENGTH_FIELD_SIZE + 777);
        assert_eq!(&buffer[..4], &777u32.to_be_bytes());

        let mut cursor = io::Cursor::new(buffer);
        let gelesen = read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE)
            .await
            .unwrap();
        assert_eq!(gelesen, payload);
    }

    #[tokio::test]
    async fn async_read_frame_ablehnung_zu_grosser_frame() {
        let mut buffer: Vec<u8> = Vec::new();
        buffer.extend_from_slice(&(8u32 * 1024 * 1024).to_be_bytes());

        let mut cursor = io::Cursor::new(buffer);
        assert!(read_frame(&mut cursor, DEFAULT_MAX_FRAME_SIZE).await.is_err());
    }

    #[tokio::test]
    async fn async_write_frame_ablehnung_zu_grosse_payload() {
        let mut buffer: Vec<u8> = Vec::new();
        let result = write_frame(&mut buffer, &[0u8; 20], 5).await;
        assert!(result.is_err());
        assert!(buffer.is_empty(), "Bei Ablehnung darf nichts geschrieben sein");
    }
}
