//! Máquina de estados de alerta da geladeira.
//!
//! Dispara um email quando o sensor deixa de responder (temperatura `0.0`) e
//! outro quando volta, sem repetir o aviso enquanto a falha persiste:
//!
//! ```text
//!            temp == 0.0 / Malfunction
//!   Normal ─────────────────────────────▶ Alerted
//!     ▲                                     │
//!     └─────────────────────────────────────┘
//!            temp != 0.0 / Recovery
//! ```
//!
//! O estado não é persistido: após reiniciar o processo volta a `Normal`.

use crate::notifier::Notifier;
use crate::pipeline::ReadingHook;
use crate::types::FridgeReading;

/// Estado de alerta de um dispositivo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlertState {
    /// Nenhuma notificação de falha pendente.
    #[default]
    Normal,
    /// Notificação de falha já enviada, aguardando recuperação.
    Alerted,
}

/// Notificação a ser enviada após uma transição.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Malfunction,
    Recovery,
}

impl Notification {
    pub fn subject(self) -> &'static str {
        match self {
            Notification::Malfunction => "Fridge is malfunctioning",
            Notification::Recovery => "Fridge is working again",
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            Notification::Malfunction => "Couldn't get sensor value.",
            Notification::Recovery => "Everything OK.",
        }
    }
}

/// `true` quando a temperatura indica sensor ilegível.
///
/// Uma leitura genuína de 0.0 °C é indistinguível desse caso.
pub fn is_unreadable(reading: &FridgeReading) -> bool {
    reading.temperature == 0.0
}

/// Aplica uma leitura ao estado e retorna a notificação devida, se houver.
pub fn evaluate(state: &mut AlertState, reading: &FridgeReading) -> Option<Notification> {
    match (*state, is_unreadable(reading)) {
        (AlertState::Normal, true) => {
            *state = AlertState::Alerted;
            Some(Notification::Malfunction)
        }
        (AlertState::Alerted, false) => {
            *state = AlertState::Normal;
            Some(Notification::Recovery)
        }
        _ => None,
    }
}

/// Gancho de alerta do pipeline da geladeira.
///
/// Dono exclusivo do [`AlertState`]; a transição é efetivada antes do envio
/// e não é desfeita se o envio falhar.
pub struct FridgeAlarm<N> {
    state: AlertState,
    notifier: N,
}

impl<N: Notifier> FridgeAlarm<N> {
    pub fn new(notifier: N) -> Self {
        Self::with_state(AlertState::Normal, notifier)
    }

    pub fn with_state(state: AlertState, notifier: N) -> Self {
        Self { state, notifier }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }
}

impl<N: Notifier> ReadingHook<FridgeReading> for FridgeAlarm<N> {
    fn observe(&mut self, reading: &FridgeReading) {
        let Some(notification) = evaluate(&mut self.state, reading) else {
            return;
        };

        tracing::warn!(
            "Alerta da geladeira: {:?} (temperatura {:.1})",
            notification,
            reading.temperature
        );
        if let Err(e) = self.notifier.send(notification.subject(), notification.body()) {
            tracing::error!("Falha ao enviar alerta '{}': {e}", notification.subject());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NotifyError;
    use std::sync::{Arc, Mutex};

    fn temp(temperature: f32) -> FridgeReading {
        FridgeReading {
            temperature,
            humidity: 10.0,
            ..Default::default()
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Notifier for Recorder {
        fn send(&self, subject: &str, _body: &str) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(subject.to_string());
            if self.fail {
                Err(NotifyError::MissingRecipient)
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn starts_normal() {
        assert_eq!(AlertState::default(), AlertState::Normal);
    }

    #[test]
    fn zero_temperature_alerts_once() {
        let mut state = AlertState::Normal;
        assert_eq!(evaluate(&mut state, &temp(0.0)), Some(Notification::Malfunction));
        assert_eq!(state, AlertState::Alerted);
        for _ in 0..5 {
            assert_eq!(evaluate(&mut state, &temp(0.0)), None);
        }
        assert_eq!(state, AlertState::Alerted);
    }

    #[test]
    fn recovery_fires_once() {
        let mut state = AlertState::Alerted;
        assert_eq!(evaluate(&mut state, &temp(21.5)), Some(Notification::Recovery));
        assert_eq!(state, AlertState::Normal);
        assert_eq!(evaluate(&mut state, &temp(22.0)), None);
    }

    #[test]
    fn negative_zero_counts_as_unreadable() {
        let mut state = AlertState::Normal;
        assert_eq!(evaluate(&mut state, &temp(-0.0)), Some(Notification::Malfunction));
    }

    #[test]
    fn implausible_nonzero_temperature_is_not_a_malfunction() {
        let mut state = AlertState::Normal;
        assert_eq!(evaluate(&mut state, &temp(150.0)), None);
        assert_eq!(state, AlertState::Normal);
    }

    #[test]
    fn flapping_sends_one_email_per_edge() {
        let recorder = Recorder::default();
        let mut alarm = FridgeAlarm::new(recorder.clone());
        for t in [0.0, 0.0, 5.0, 5.0, 0.0, 6.0, 0.0, 0.0] {
            alarm.observe(&temp(t));
        }
        assert_eq!(
            *recorder.sent.lock().unwrap(),
            vec![
                "Fridge is malfunctioning",
                "Fridge is working again",
                "Fridge is malfunctioning",
                "Fridge is working again",
                "Fridge is malfunctioning",
            ]
        );
        assert_eq!(alarm.state(), AlertState::Alerted);
    }

    #[test]
    fn failed_send_keeps_transition() {
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let mut alarm = FridgeAlarm::new(recorder.clone());
        alarm.observe(&temp(0.0));
        alarm.observe(&temp(0.0));
        assert_eq!(alarm.state(), AlertState::Alerted);
        assert_eq!(recorder.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn messages_match_templates() {
        assert_eq!(Notification::Malfunction.body(), "Couldn't get sensor value.");
        assert_eq!(Notification::Recovery.body(), "Everything OK.");
    }
}
