//! # Logger Core
//!
//! Pipeline de ingestão das leituras MQTT dos sensores da geladeira e da
//! estufa de cogumelos: decodificação, validação, alerta por email e
//! persistência em SQLite.
//!
//! ## Módulos
//! - [`types`] – Leituras por tipo de dispositivo
//! - [`protocol`] – Decodificação tolerante dos payloads JSON
//! - [`validation`] – Plausibilidade das leituras da geladeira
//! - [`alerts`] – Máquina de estados de alerta (falha / recuperação)
//! - [`notifier`] – Envio de emails (sendmail ou log)
//! - [`store`] – Gateways de persistência SQLite
//! - [`pipeline`] – Pipeline genérico por dispositivo
//! - [`router`] – Roteamento por tópico e workers
//! - [`config`] – Configuração unificada via TOML

pub mod types;
pub mod protocol;
pub mod validation;
pub mod alerts;
pub mod notifier;
pub mod store;
pub mod pipeline;
pub mod router;
pub mod config;

// Re-exports convenientes
pub use config::AppConfig;
pub use pipeline::{Fridge, Mushroom, Outcome, Pipeline};
pub use router::{Router, TopicWorkers};

use alerts::FridgeAlarm;
use notifier::Notifier;
use store::Database;

/// Monta o router com os dois pipelines: geladeira (com alerta) e estufa.
pub fn build_router<N: Notifier + 'static>(
    topics: &config::TopicConfig,
    db: &Database,
    notifier: N,
) -> Router {
    Router::new()
        .route(
            topics.fridge.as_str(),
            Pipeline::<Fridge, _>::new(db.fridge_store()).with_hook(FridgeAlarm::new(notifier)),
        )
        .route(
            topics.mushroom.as_str(),
            Pipeline::<Mushroom, _>::new(db.mushroom_store()),
        )
}
