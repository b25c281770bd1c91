//! CamSync Geraet – Einstiegspunkt
//!
//! Laedt die Konfiguration, stellt die Geraete-Identitaet her und startet
//! Engine und Frame-Pipeline. Die Standardeingabe dient als minimales
//! Operator-Frontend: `connect`, `start`, `stop` und `quit` werden als
//! Intents in die Event-Queue der Engine gereicht.

mod config;
mod frames;
mod settings;

use anyhow::Result;
use camsync_sync::{
    run_frame_pump, IdentityStore, StatusSink, SyncConfig, SyncEngine, SyncEvent, TracingSink,
};
use config::DeviceConfig;
use frames::TestPatternSource;
use settings::FileSettings;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad =
        std::env::var("CAMSYNC_CONFIG").unwrap_or_else(|_| "device.toml".into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = DeviceConfig::laden(&config_pfad)?;

    // Logging initialisieren
    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "CamSync Geraet wird initialisiert"
    );

    // Stabile Identitaet herstellen (fatal wenn nicht persistierbar)
    let identitaet = IdentityStore::new(FileSettings::new(&config.geraet.identitaets_datei));
    let device_id = identitaet.get_or_create()?;
    tracing::info!(geraet = %device_id, name = %config.geraet.name, "Identitaet geladen");

    let server = config.kontroll_endpunkt()?;

    // Engine und Frame-Pipeline starten
    let sync_config = SyncConfig {
        handshake_timeout: Duration::from_millis(config.koordinator.handshake_timeout_ms),
        frame_interval_ms: config.aufnahme.frame_intervall_ms,
    };
    let sink: Arc<dyn StatusSink> = Arc::new(TracingSink);
    let engine = SyncEngine::new(device_id, sync_config, sink);
    let events = engine.handle();

    let quelle = TestPatternSource::new(
        Duration::from_millis(config.aufnahme.capture_intervall_ms),
        config.aufnahme.test_frame_bytes,
    );
    let (pump_stop_tx, pump_stop_rx) = oneshot::channel();
    let pump = tokio::spawn(run_frame_pump(
        quelle,
        engine.gate(),
        engine.data_channel(),
        pump_stop_rx,
    ));
    let engine_task = tokio::spawn(engine.run());

    // Operator-Schleife bis quit oder Ctrl+C
    kommando_schleife(&events, server, &config).await;

    // Geordneter Abbau: erst die Engine (baut die Sitzung ab), dann die
    // Pipeline
    let _ = events.send(SyncEvent::Shutdown).await;
    let _ = engine_task.await;
    let _ = pump_stop_tx.send(());
    let _ = pump.await;

    tracing::info!("CamSync Geraet beendet");
    Ok(())
}

/// Liest Operator-Kommandos von der Standardeingabe
///
/// Kehrt bei `quit`, Eingabe-Ende oder Ctrl+C zurueck; den Abbau erledigt
/// der Aufrufer.
async fn kommando_schleife(
    events: &mpsc::Sender<SyncEvent>,
    server: SocketAddr,
    config: &DeviceConfig,
) {
    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
    tracing::info!("Kommandos: connect | start | stop | quit");

    loop {
        let zeile = tokio::select! {
            zeile = zeilen.next_line() => match zeile {
                Ok(Some(zeile)) => zeile,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(fehler = %e, "Standardeingabe nicht lesbar");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C empfangen");
                break;
            }
        };

        let event = match zeile.trim() {
            "" => continue,
            "connect" => SyncEvent::Connect {
                server,
                token: config.koordinator.token.clone(),
                name: config.geraet.name.clone(),
            },
            "start" => SyncEvent::StartIntent,
            "stop" => SyncEvent::StopIntent,
            "quit" | "exit" => break,
            unbekannt => {
                tracing::warn!(kommando = unbekannt, "Unbekanntes Kommando");
                continue;
            }
        };

        if events.send(event).await.is_err() {
            // Engine bereits beendet
            break;
        }
    }
}

/// Initialisiert tracing-subscriber mit dem konfigurierten Level und Format
///
/// `CAMSYNC_LOG_LEVEL` und `CAMSYNC_LOG_FORMAT` uebersteuern die
/// Konfigurationsdatei.
fn logging_initialisieren(level: &str, format: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("CAMSYNC_LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format_env =
        std::env::var("CAMSYNC_LOG_FORMAT").unwrap_or_else(|_| format.to_string());

    match format_env.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().with_env_filter(filter).with_target(true).init();
        }
    }
}
