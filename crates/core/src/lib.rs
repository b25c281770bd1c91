//! CamSync Core – gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate enthaelt die Bausteine die von allen anderen
//! CamSync-Crates verwendet werden: die Geraete-Identitaet als
//! Newtype und den zentralen Fehler-Enum.

pub mod error;
pub mod types;

pub use error::{Result, SyncError};
pub use types::DeviceId;
