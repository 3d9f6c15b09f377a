//! Tipos das leituras publicadas pelos sensores.
//!
//! Cada mensagem MQTT vira exatamente uma leitura imutável, consumida dentro
//! de um único ciclo de tratamento (alerta + persistência) e depois descartada.

use std::fmt;

// ──────────────────────────────────────────────
// Tipos de dispositivo
// ──────────────────────────────────────────────

/// Tipo de dispositivo monitorado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Geladeira (temperatura, umidade, pressão, compressor)
    Fridge,
    /// Estufa de cogumelos (atuadores de luz, umidificador e ventilação)
    Mushroom,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Fridge => "fridge",
            DeviceKind::Mushroom => "mushroom",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Geladeira
// ──────────────────────────────────────────────

/// Leitura da geladeira (tópico `fridge/status`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FridgeReading {
    /// Temperatura interna (°C). `0.0` é tratado como sensor ilegível.
    pub temperature: f32,
    /// Umidade relativa (%)
    pub humidity: f32,
    /// Pressão
    pub pressure: f32,
    /// Compressor ligado
    pub compressor_on: bool,
    /// Temperatura alvo do termostato (°C)
    pub goal_temperature: f32,
}

// ──────────────────────────────────────────────
// Estufa de cogumelos
// ──────────────────────────────────────────────

/// Leitura da estufa de cogumelos (tópico `mushroom/status`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnclosureReading {
    pub temperature: f32,
    pub humidity: f32,
    pub light_on: bool,
    pub humidifier_on: bool,
    pub intake_fan_on: bool,
    pub circulation_fan_on: bool,
}

// ──────────────────────────────────────────────
// Resultado da decodificação
// ──────────────────────────────────────────────

/// Leitura decodificada junto com os campos que não puderam ser lidos.
///
/// Campos ausentes ou com tipo errado ficam com o valor zero do tipo e são
/// listados em `degraded`. Uma leitura degradada segue o pipeline normalmente;
/// o marcador só existe para que o chamador consiga distinguir um payload
/// corrompido de uma leitura genuinamente zerada.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<R> {
    pub reading: R,
    pub degraded: Vec<&'static str>,
}

impl<R> Decoded<R> {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }
}

// ──────────────────────────────────────────────
// Leituras armazenadas
// ──────────────────────────────────────────────

/// Linha lida de volta da tabela `fridge_readings`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFridgeReading {
    pub id: i64,
    /// Instante de gravação (Unix ms)
    pub received_at: u64,
    pub reading: FridgeReading,
}

/// Linha lida de volta da tabela `mushroom_readings`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEnclosureReading {
    pub id: i64,
    pub received_at: u64,
    pub reading: EnclosureReading,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_readings_are_zeroed() {
        let f = FridgeReading::default();
        assert_eq!(f.temperature, 0.0);
        assert!(!f.compressor_on);

        let m = EnclosureReading::default();
        assert_eq!(m.humidity, 0.0);
        assert!(!m.light_on && !m.circulation_fan_on);
    }

    #[test]
    fn degraded_marker() {
        let clean = Decoded {
            reading: FridgeReading::default(),
            degraded: vec![],
        };
        assert!(!clean.is_degraded());

        let broken = Decoded {
            reading: FridgeReading::default(),
            degraded: vec!["temperature"],
        };
        assert!(broken.is_degraded());
    }

    #[test]
    fn device_kind_names() {
        assert_eq!(DeviceKind::Fridge.to_string(), "fridge");
        assert_eq!(DeviceKind::Mushroom.as_str(), "mushroom");
    }
}
