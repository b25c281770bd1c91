//! CamSync-Protokoll
//!
//! Definiert beide Ebenen des Netzwerkprotokolls:
//!
//! - **Kontrollebene** (UDP, JSON): Handshake, Kommandos und
//!   Broadcast-Benachrichtigungen – siehe [`control`].
//! - **Datenebene** (TCP, binaer): Frame-basiertes Wire-Format mit
//!   Laengen-Prefix – siehe [`wire`].

pub mod control;
pub mod wire;

pub use control::{
    decode_roster, encode_roster, CommandKind, ControlMessage, DeviceDescriptor, ACK_REGISTER,
    SYNC_START, SYNC_STOP,
};
pub use wire::{FrameCodec, DEFAULT_MAX_FRAME_SIZE, LENGTH_FIELD_SIZE};
