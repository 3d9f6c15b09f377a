//! Decodificação dos payloads JSON publicados pelos sensores.
//!
//! Formato (um objeto JSON por mensagem):
//!
//! ```text
//! fridge/status   {"temperature": 4.2, "humidity": 40, "pressure": 1013,
//!                  "compressor": true, "goal": 4}
//! mushroom/status {"temperature": 22, "humidity": 85, "light": true,
//!                  "humidifier": false, "fan_intake": true, "fan_flow": false}
//! ```
//!
//! A decodificação é tolerante: um campo ausente ou com tipo errado vira o
//! valor zero do tipo (`0.0` / `false`) e é registrado em
//! [`Decoded::degraded`]. Um payload que nem é um objeto JSON produz uma
//! leitura zerada com todos os campos degradados. Nenhuma dessas situações
//! interrompe o pipeline.
//!
//! Os nomes dos campos casam primeiro de forma exata e depois ignorando
//! maiúsculas/minúsculas (`Temperature` também é aceito).

use crate::types::{Decoded, EnclosureReading, FridgeReading};
use serde_json::{Map, Value};

/// Campos do tópico `fridge/status`.
pub const FRIDGE_FIELDS: [&str; 5] = ["temperature", "humidity", "pressure", "compressor", "goal"];

/// Campos do tópico `mushroom/status`.
pub const MUSHROOM_FIELDS: [&str; 6] = [
    "temperature",
    "humidity",
    "light",
    "humidifier",
    "fan_intake",
    "fan_flow",
];

/// Erros ao interpretar o envelope do payload.
///
/// Nunca saem deste módulo: viram uma leitura totalmente degradada.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Payload não é UTF-8 válido: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("JSON inválido: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Payload não é um objeto JSON (recebido {0})")]
    NotAnObject(&'static str),
}

/// Decodifica um payload de `fridge/status`.
pub fn decode_fridge(data: &[u8]) -> Decoded<FridgeReading> {
    let mut fields = FieldReader::new(data);
    let reading = FridgeReading {
        temperature: fields.number("temperature"),
        humidity: fields.number("humidity"),
        pressure: fields.number("pressure"),
        compressor_on: fields.flag("compressor"),
        goal_temperature: fields.number("goal"),
    };
    fields.finish(reading)
}

/// Decodifica um payload de `mushroom/status`.
pub fn decode_mushroom(data: &[u8]) -> Decoded<EnclosureReading> {
    let mut fields = FieldReader::new(data);
    let reading = EnclosureReading {
        temperature: fields.number("temperature"),
        humidity: fields.number("humidity"),
        light_on: fields.flag("light"),
        humidifier_on: fields.flag("humidifier"),
        intake_fan_on: fields.flag("fan_intake"),
        circulation_fan_on: fields.flag("fan_flow"),
    };
    fields.finish(reading)
}

fn parse_object(data: &[u8]) -> Result<Map<String, Value>, ProtocolError> {
    let text = std::str::from_utf8(data)?;
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        Value::Null => Err(ProtocolError::NotAnObject("null")),
        Value::Bool(_) => Err(ProtocolError::NotAnObject("bool")),
        Value::Number(_) => Err(ProtocolError::NotAnObject("number")),
        Value::String(_) => Err(ProtocolError::NotAnObject("string")),
        Value::Array(_) => Err(ProtocolError::NotAnObject("array")),
    }
}

/// Extrai campos de um objeto JSON anotando os que falharam.
struct FieldReader {
    object: Option<Map<String, Value>>,
    degraded: Vec<&'static str>,
}

impl FieldReader {
    fn new(data: &[u8]) -> Self {
        let object = match parse_object(data) {
            Ok(map) => Some(map),
            Err(e) => {
                tracing::debug!("Payload ilegível, usando valores zero: {e}");
                None
            }
        };
        Self {
            object,
            degraded: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        let map = self.object.as_ref()?;
        map.get(name).or_else(|| {
            map.iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// Números fora da faixa de `f32` contam como falha de decodificação.
    fn number(&mut self, name: &'static str) -> f32 {
        let value = self
            .lookup(name)
            .and_then(Value::as_f64)
            .map(|v| v as f32)
            .filter(|v| v.is_finite());
        match value {
            Some(v) => v,
            None => {
                self.degraded.push(name);
                0.0
            }
        }
    }

    fn flag(&mut self, name: &'static str) -> bool {
        match self.lookup(name).and_then(Value::as_bool) {
            Some(v) => v,
            None => {
                self.degraded.push(name);
                false
            }
        }
    }

    fn finish<R>(self, reading: R) -> Decoded<R> {
        Decoded {
            reading,
            degraded: self.degraded,
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
