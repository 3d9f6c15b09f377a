//! Pipeline genérico de tratamento de uma mensagem:
//! decodificar → [gancho de alerta] → validar → persistir.
//!
//! O comportamento específico de cada dispositivo fica no trait [`Device`];
//! o alerta é um [`ReadingHook`] opcional, aplicado só à geladeira.

use crate::protocol::{decode_fridge, decode_mushroom};
use crate::store::{PersistenceGateway, StoreError};
use crate::types::{Decoded, DeviceKind, EnclosureReading, FridgeReading};
use crate::validation::{Plausibility, check_fridge};
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Erros visíveis fora do pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Falha ao gravar leitura de {kind}: {source}")]
    Store {
        kind: DeviceKind,
        #[source]
        source: StoreError,
    },
}

/// Destino de uma leitura após o pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Leitura gravada.
    Stored,
    /// Leitura implausível, não gravada.
    Rejected,
}

/// Comportamento específico de um tipo de dispositivo.
pub trait Device {
    type Reading: Debug + Send;

    const KIND: DeviceKind;

    fn decode(payload: &[u8]) -> Decoded<Self::Reading>;

    /// Por padrão toda leitura decodificada é gravada.
    fn validate(_reading: &Self::Reading) -> Plausibility {
        Plausibility::Plausible
    }
}

/// Geladeira: leituras fora de (-100, 100) não são gravadas.
pub struct Fridge;

impl Device for Fridge {
    type Reading = FridgeReading;

    const KIND: DeviceKind = DeviceKind::Fridge;

    fn decode(payload: &[u8]) -> Decoded<FridgeReading> {
        decode_fridge(payload)
    }

    fn validate(reading: &FridgeReading) -> Plausibility {
        check_fridge(reading)
    }
}

/// Estufa de cogumelos: sem validação, tudo é gravado.
pub struct Mushroom;

impl Device for Mushroom {
    type Reading = EnclosureReading;

    const KIND: DeviceKind = DeviceKind::Mushroom;

    fn decode(payload: &[u8]) -> Decoded<EnclosureReading> {
        decode_mushroom(payload)
    }
}

/// Observa cada leitura decodificada antes da persistência, inclusive as
/// implausíveis.
pub trait ReadingHook<R>: Send {
    fn observe(&mut self, reading: &R);
}

/// Tratador de mensagens de um tópico, independente do tipo de dispositivo.
pub trait MessageHandler: Send {
    fn kind(&self) -> DeviceKind;

    fn handle(&mut self, payload: &[u8]) -> Result<Outcome, PipelineError>;
}

/// Pipeline de um tipo de dispositivo.
pub struct Pipeline<D: Device, G> {
    gateway: G,
    hook: Option<Box<dyn ReadingHook<D::Reading>>>,
    _device: PhantomData<fn() -> D>,
}

impl<D, G> Pipeline<D, G>
where
    D: Device,
    G: PersistenceGateway<Reading = D::Reading>,
{
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            hook: None,
            _device: PhantomData,
        }
    }

    /// Acrescenta um gancho (ex.: alerta) ao pipeline.
    pub fn with_hook(mut self, hook: impl ReadingHook<D::Reading> + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Processa um payload bruto.
    ///
    /// A transição de alerta já aplicada não é desfeita se a gravação falhar.
    pub fn process(&mut self, payload: &[u8]) -> Result<Outcome, PipelineError> {
        let decoded = D::decode(payload);
        if decoded.is_degraded() {
            warn!(
                "Leitura de {} degradada, campos zerados: {:?}",
                D::KIND,
                decoded.degraded
            );
        }
        let reading = decoded.reading;

        if let Some(hook) = self.hook.as_mut() {
            hook.observe(&reading);
        }

        if !D::validate(&reading).is_plausible() {
            debug!("Leitura implausível de {} descartada: {:?}", D::KIND, reading);
            return Ok(Outcome::Rejected);
        }

        self.gateway
            .store(&reading)
            .map_err(|source| PipelineError::Store {
                kind: D::KIND,
                source,
            })?;
        debug!("Leitura de {} gravada: {:?}", D::KIND, reading);
        Ok(Outcome::Stored)
    }
}

impl<D, G> MessageHandler for Pipeline<D, G>
where
    D: Device,
    G: PersistenceGateway<Reading = D::Reading>,
{
    fn kind(&self) -> DeviceKind {
        D::KIND
    }

    fn handle(&mut self, payload: &[u8]) -> Result<Outcome, PipelineError> {
        self.process(payload)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
