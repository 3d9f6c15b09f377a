//! Roteamento de mensagens por tópico.
//!
//! [`Router`] associa cada tópico a um [`MessageHandler`]. Pode ser usado de
//! forma síncrona ([`Router::dispatch`]) ou convertido em [`TopicWorkers`],
//! que move cada pipeline para a sua própria thread, alimentada por um
//! channel limitado. Mensagens de tópicos diferentes são tratadas em
//! paralelo; mensagens do mesmo tópico, em ordem e uma de cada vez.

use crate::pipeline::{MessageHandler, Outcome, PipelineError};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::collections::HashMap;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Erros de roteamento.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("Nenhum pipeline para o tópico {0}")]
    UnknownTopic(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Fila do tópico {0} cheia, mensagem descartada")]
    QueueFull(String),

    #[error("Worker do tópico {0} não está mais rodando")]
    WorkerStopped(String),

    #[error("Falha ao criar thread para {topic}: {source}")]
    Spawn {
        topic: String,
        #[source]
        source: std::io::Error,
    },
}

/// Falha ao assinar um tópico no broker.
#[derive(Debug, thiserror::Error)]
#[error("Falha ao assinar {topic}: {reason}")]
pub struct SubscribeError {
    pub topic: String,
    pub reason: String,
}

/// Lado de assinatura do transporte (MQTT, QoS 0).
pub trait Subscriber {
    fn subscribe(&mut self, topic: &str) -> Result<(), SubscribeError>;
}

fn subscribe_each<'a, S>(
    topics: impl IntoIterator<Item = &'a str>,
    subscriber: &mut S,
) -> Result<(), SubscribeError>
where
    S: Subscriber + ?Sized,
{
    for topic in topics {
        subscriber.subscribe(topic)?;
        info!("Assinado: {topic}");
    }
    Ok(())
}

fn log_arrival(topic: &str, payload: &[u8]) {
    info!("{topic} -> {}", String::from_utf8_lossy(payload));
}

// ──────────────────────────────────────────────
// Router síncrono
// ──────────────────────────────────────────────

/// Tabela tópico → pipeline.
#[derive(Default)]
pub struct Router {
    routes: HashMap<String, Box<dyn MessageHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associa `topic` a `handler` (substitui um registro anterior).
    pub fn route(mut self, topic: impl Into<String>, handler: impl MessageHandler + 'static) -> Self {
        self.routes.insert(topic.into(), Box::new(handler));
        self
    }

    /// Tópicos roteados, em ordem alfabética.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    /// Assina todos os tópicos roteados. Para no primeiro erro.
    pub fn subscribe_all<S: Subscriber + ?Sized>(&self, subscriber: &mut S) -> Result<(), SubscribeError> {
        subscribe_each(self.topics(), subscriber)
    }

    /// Trata a mensagem de forma síncrona na thread chamadora.
    pub fn dispatch(&mut self, topic: &str, payload: &[u8]) -> Result<Outcome, RouteError> {
        let Some(handler) = self.routes.get_mut(topic) else {
            debug!("Mensagem em tópico não roteado: {topic}");
            return Err(RouteError::UnknownTopic(topic.to_string()));
        };
        log_arrival(topic, payload);
        Ok(handler.handle(payload)?)
    }

    /// Move cada pipeline para uma thread própria.
    ///
    /// `queue_capacity` limita as mensagens pendentes por tópico; acima disso
    /// [`TopicWorkers::deliver`] descarta a mensagem (entrega at-most-once).
    pub fn spawn_workers(self, queue_capacity: usize) -> Result<TopicWorkers, RouteError> {
        let mut senders = HashMap::new();
        let mut threads = Vec::new();

        for (topic, handler) in self.routes {
            let (tx, rx) = bounded::<Vec<u8>>(queue_capacity.max(1));
            let worker_topic = topic.clone();
            let kind = handler.kind();
            let thread = std::thread::Builder::new()
                .name(format!("worker-{}", topic.replace('/', "-")))
                .spawn(move || worker_loop(worker_topic, handler, rx))
                .map_err(|source| RouteError::Spawn {
                    topic: topic.clone(),
                    source,
                })?;
            info!("Worker iniciado para {topic} ({kind})");
            senders.insert(topic, tx);
            threads.push(thread);
        }

        Ok(TopicWorkers { senders, threads })
    }
}

// ──────────────────────────────────────────────
// Workers por tópico
// ──────────────────────────────────────────────

/// Contadores de um worker, devolvidos no encerramento.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub topic: String,
    pub stored: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Pipelines rodando em threads dedicadas, uma por tópico.
pub struct TopicWorkers {
    senders: HashMap<String, Sender<Vec<u8>>>,
    threads: Vec<JoinHandle<WorkerStats>>,
}

impl TopicWorkers {
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.senders.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    pub fn subscribe_all<S: Subscriber + ?Sized>(&self, subscriber: &mut S) -> Result<(), SubscribeError> {
        subscribe_each(self.topics(), subscriber)
    }

    /// Enfileira a mensagem para o worker do tópico sem bloquear.
    pub fn deliver(&self, topic: &str, payload: Vec<u8>) -> Result<(), RouteError> {
        let Some(tx) = self.senders.get(topic) else {
            debug!("Mensagem em tópico não roteado: {topic}");
            return Err(RouteError::UnknownTopic(topic.to_string()));
        };
        log_arrival(topic, &payload);
        tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(_) => {
                warn!("Fila de {topic} cheia, descartando mensagem");
                RouteError::QueueFull(topic.to_string())
            }
            TrySendError::Disconnected(_) => RouteError::WorkerStopped(topic.to_string()),
        })
    }

    /// Fecha as filas, espera os workers esvaziarem e devolve os contadores.
    pub fn shutdown(self) -> Vec<WorkerStats> {
        drop(self.senders);
        let mut stats: Vec<WorkerStats> = self
            .threads
            .into_iter()
            .filter_map(|t| match t.join() {
                Ok(s) => Some(s),
                Err(_) => {
                    error!("Worker terminou em pânico");
                    None
                }
            })
            .collect();
        stats.sort_by(|a, b| a.topic.cmp(&b.topic));
        stats
    }
}

fn worker_loop(topic: String, mut handler: Box<dyn MessageHandler>, rx: Receiver<Vec<u8>>) -> WorkerStats {
    let mut stats = WorkerStats {
        topic,
        ..Default::default()
    };

    for payload in rx.iter() {
        match handler.handle(&payload) {
            Ok(Outcome::Stored) => stats.stored += 1,
            Ok(Outcome::Rejected) => stats.rejected += 1,
            Err(e) => {
                // Falha isolada: o worker continua consumindo.
                stats.failed += 1;
                error!("[{}] {e}", stats.topic);
            }
        }
    }

    info!(
        "Worker {} encerrado ({} gravadas, {} rejeitadas, {} falhas)",
        stats.topic, stats.stored, stats.rejected, stats.failed
    );
    stats
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
