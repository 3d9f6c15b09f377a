//! Envio das notificações de alerta por email.
//!
//! O pipeline só conhece o contrato [`Notifier`]. Há duas implementações:
//! [`SendmailNotifier`] (entrega real via binário `sendmail`) e
//! [`LogNotifier`] (apenas registra no log, usado quando alertas por email
//! estão desabilitados).

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Erros de envio.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Destinatário de alerta não configurado")]
    MissingRecipient,

    #[error("Falha ao executar {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Falha ao escrever mensagem: {0}")]
    Io(#[from] std::io::Error),

    #[error("sendmail terminou com {0}")]
    Exit(std::process::ExitStatus),
}

/// Contrato de envio de email.
///
/// O resultado só é usado para log; o chamador nunca desfaz uma transição de
/// alerta por causa de uma falha aqui.
pub trait Notifier: Send {
    fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        (**self).send(subject, body)
    }
}

// ──────────────────────────────────────────────
// Log
// ──────────────────────────────────────────────

/// Notificador que só registra o alerta no log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        tracing::warn!("[alerta] {subject}: {body}");
        Ok(())
    }
}

// ──────────────────────────────────────────────
// sendmail
// ──────────────────────────────────────────────

/// Entrega emails através de `sendmail -t` (ou compatível: msmtp, ssmtp…).
#[derive(Debug, Clone)]
pub struct SendmailNotifier {
    sendmail_path: PathBuf,
    recipient: String,
    sender: String,
}

impl SendmailNotifier {
    pub fn new(
        sendmail_path: impl Into<PathBuf>,
        recipient: impl Into<String>,
        sender: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let recipient = recipient.into();
        if recipient.trim().is_empty() {
            return Err(NotifyError::MissingRecipient);
        }
        Ok(Self {
            sendmail_path: sendmail_path.into(),
            recipient,
            sender: sender.into(),
        })
    }

    /// Monta a mensagem RFC 5322 entregue no stdin do sendmail.
    pub fn format_message(&self, subject: &str, body: &str) -> String {
        let mut msg = String::new();
        if !self.sender.is_empty() {
            msg.push_str(&format!("From: {}\r\n", single_line(&self.sender)));
        }
        msg.push_str(&format!("To: {}\r\n", single_line(&self.recipient)));
        msg.push_str(&format!("Subject: {}\r\n", single_line(subject)));
        msg.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        msg.push_str("\r\n");
        msg.push_str(body);
        msg.push_str("\r\n");
        msg
    }
}

impl Notifier for SendmailNotifier {
    fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mut child = Command::new(&self.sendmail_path)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|source| NotifyError::Spawn {
                path: self.sendmail_path.display().to_string(),
                source,
            })?;

        // O filho é sempre aguardado, mesmo se a escrita falhar.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(self.format_message(subject, body).as_bytes()),
            None => Ok(()),
        };
        let status = child.wait()?;
        written?;
        if !status.success() {
            return Err(NotifyError::Exit(status));
        }
        tracing::info!("Email '{subject}' enviado para {}", self.recipient);
        Ok(())
    }
}

/// Remove quebras de linha que permitiriam injetar cabeçalhos.
fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}
