//! # MQTT Logger
//!
//! Assina os tópicos de status da geladeira e da estufa de cogumelos, grava
//! as leituras em SQLite e envia email quando o sensor da geladeira para de
//! responder (e quando volta).
//!
//! ## Uso
//! ```bash
//! mqtt_logger                  # config.toml ao lado do executável
//! mqtt_logger /etc/logger.toml # caminho explícito
//! ```

mod mqtt;
mod shutdown;

use logger_core::build_router;
use logger_core::config::{AlertConfig, AppConfig};
use logger_core::notifier::{LogNotifier, Notifier, SendmailNotifier};
use logger_core::store::Database;
use shutdown::{Shutdown, watch_ctrl_c};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Configuração inválida: {e}");
        }
        return ExitCode::FAILURE;
    }

    // ── Banco ──
    let db = match Database::open(&config.database.path) {
        Ok(db) => db,
        Err(e) => {
            error!("Falha ao abrir {}: {e}", config.database.path.display());
            return ExitCode::FAILURE;
        }
    };
    info!("Banco aberto em {}", config.database.path.display());

    // ── Pipelines ──
    let router = build_router(&config.topics, &db, notifier(&config.alerts));
    let workers = match router.spawn_workers(config.workers.queue_capacity) {
        Ok(w) => w,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   MQTT LOGGER – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  Broker:    {}:{}", config.mqtt.host, config.mqtt.port);
    println!("  Tópicos:   {}", workers.topics().join(", "));
    println!("  Banco:     {}", config.database.path.display());
    println!(
        "  Alertas:   {}",
        if config.alerts.enabled { config.alerts.recipient.as_str() } else { "somente log" }
    );
    println!("══════════════════════════════════════════════");
    println!();

    // ── Loop principal ──
    let (client, mut connection) = mqtt::connect(&config.mqtt);
    let shutdown = Shutdown::new(client.clone());
    if let Err(e) = watch_ctrl_c(shutdown.clone()) {
        warn!("Ctrl-C não será tratado: {e}");
    }
    mqtt::run(&client, &mut connection, &workers, &shutdown);

    for stats in workers.shutdown() {
        info!(
            "{}: {} gravadas, {} rejeitadas, {} falhas",
            stats.topic, stats.stored, stats.rejected, stats.failed
        );
    }
    ExitCode::SUCCESS
}

/// Escolhe o notificador: sendmail quando habilitado, senão só log.
fn notifier(alerts: &AlertConfig) -> Box<dyn Notifier> {
    if !alerts.enabled {
        info!("Alertas por email desabilitados");
        return Box::new(LogNotifier);
    }
    match SendmailNotifier::new(&alerts.sendmail_path, &alerts.recipient, &alerts.sender) {
        Ok(n) => Box::new(n),
        Err(e) => {
            warn!("{e}; alertas só no log");
            Box::new(LogNotifier)
        }
    }
}
