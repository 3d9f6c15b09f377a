//! Verificação de plausibilidade física das leituras.

use crate::types::FridgeReading;

/// Limite (exclusivo) aceito para temperatura e umidade.
pub const PLAUSIBLE_LIMIT: f32 = 100.0;

/// Resultado da validação de uma leitura.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plausibility {
    Plausible,
    Implausible,
}

impl Plausibility {
    pub fn is_plausible(self) -> bool {
        self == Plausibility::Plausible
    }
}

/// Plausível sse temperatura e umidade estão estritamente em (-100, 100).
///
/// Pressão, compressor e temperatura alvo não são verificados. `NaN` nunca
/// está dentro do intervalo.
pub fn check_fridge(reading: &FridgeReading) -> Plausibility {
    if within_limit(reading.temperature) && within_limit(reading.humidity) {
        Plausibility::Plausible
    } else {
        Plausibility::Implausible
    }
}

fn within_limit(value: f32) -> bool {
    value > -PLAUSIBLE_LIMIT && value < PLAUSIBLE_LIMIT
}
