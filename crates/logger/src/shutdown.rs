//! Encerramento por Ctrl-C.
//!
//! O sinal é esperado numa thread própria com um runtime tokio mínimo; ao
//! chegar, marca o pedido e envia DISCONNECT ao broker, o que acorda o loop
//! MQTT bloqueado em [`rumqttc::Connection::iter`].

use rumqttc::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// Pedido de encerramento compartilhado entre o handler de sinal e o loop MQTT.
#[derive(Clone)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
    client: Client,
}

impl Shutdown {
    pub fn new(client: Client) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            client,
        }
    }

    /// Idempotente: só o primeiro pedido desconecta.
    pub fn request(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Encerrando...");
        if let Err(e) = self.client.disconnect() {
            debug!("DISCONNECT não enviado: {e}");
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Inicia a thread que espera o Ctrl-C.
pub fn watch_ctrl_c(shutdown: Shutdown) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name("signal".into())
        .spawn(move || match runtime.block_on(tokio::signal::ctrl_c()) {
            Ok(()) => shutdown.request(),
            Err(e) => error!("Falha ao escutar Ctrl-C: {e}"),
        })?;
    Ok(())
}
