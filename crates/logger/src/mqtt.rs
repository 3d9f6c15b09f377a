//! Conexão MQTT (rumqttc síncrono) que entrega as mensagens aos workers.

use logger_core::config::MqttConfig;
use crate::shutdown::Shutdown;
use logger_core::router::{SubscribeError, Subscriber, TopicWorkers};
use rumqttc::{Client, ConnectReturnCode, Connection, Event, MqttOptions, Packet, QoS, SubscribeReasonCode};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Assina tópicos com QoS 0 (at-most-once).
struct MqttSubscriber<'a> {
    client: &'a Client,
}

impl Subscriber for MqttSubscriber<'_> {
    fn subscribe(&mut self, topic: &str) -> Result<(), SubscribeError> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| SubscribeError {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Cria o cliente. A conexão só acontece ao iterar a [`Connection`].
pub fn connect(cfg: &MqttConfig) -> (Client, Connection) {
    let mut options = MqttOptions::new(cfg.client_id.as_str(), cfg.host.as_str(), cfg.port);
    options.set_keep_alive(Duration::from_secs(cfg.keep_alive_secs));
    options.set_clean_session(true);
    if !cfg.username.is_empty() {
        options.set_credentials(cfg.username.as_str(), cfg.password.as_str());
    }
    info!("Conectando ao broker {}:{} como {}", cfg.host, cfg.port, cfg.client_id);
    Client::new(options, cfg.channel_capacity.max(1))
}

/// Loop de eventos: (re)assina os tópicos a cada ConnAck e repassa cada
/// publish para o worker do tópico. Erros de conexão não encerram o loop;
/// a próxima iteração reconecta. Retorna quando `shutdown` é pedido.
pub fn run(client: &Client, connection: &mut Connection, workers: &TopicWorkers, shutdown: &Shutdown) {
    for notification in connection.iter() {
        if shutdown.is_requested() {
            info!("Loop MQTT encerrado");
            break;
        }
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    error!("Broker recusou a conexão: {:?}", ack.code);
                    continue;
                }
                info!("Conectado ao broker");
                // Sessão limpa: as assinaturas precisam ser refeitas.
                if let Err(e) = workers.subscribe_all(&mut MqttSubscriber { client }) {
                    error!("{e}");
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                if ack
                    .return_codes
                    .iter()
                    .any(|code| matches!(code, SubscribeReasonCode::Failure))
                {
                    warn!("Broker rejeitou assinatura (pkid {})", ack.pkid);
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if let Err(e) = workers.deliver(&publish.topic, publish.payload.to_vec()) {
                    debug!("{e}");
                }
            }
            Ok(_) => {}
            Err(e) => {
                error!("Erro na conexão MQTT: {e}. Tentando novamente em {}s...", RECONNECT_DELAY.as_secs());
                std::thread::sleep(RECONNECT_DELAY);
            }
        }
    }
}
