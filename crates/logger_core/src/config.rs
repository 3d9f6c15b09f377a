//! Configuração unificada via TOML (`config.toml`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Erros ao gravar a configuração.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao serializar configuração: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Erro ao escrever {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Conexão com o broker MQTT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Usuário (vazio = sem autenticação)
    pub username: String,
    pub password: String,
    pub keep_alive_secs: u64,
    /// Capacidade da fila de requisições do cliente
    pub channel_capacity: usize,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: "broker".into(),
            username: String::new(),
            password: String::new(),
            keep_alive_secs: 30,
            channel_capacity: 16,
        }
    }
}

/// Tópicos assinados.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub fridge: String,
    pub mushroom: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            fridge: "fridge/status".into(),
            mushroom: "mushroom/status".into(),
        }
    }
}

/// Banco SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mqtt_logger.db"),
        }
    }
}

/// Alertas por email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Desabilitado = alertas só no log
    pub enabled: bool,
    pub recipient: String,
    /// Remetente (`From:`); vazio = padrão do sendmail
    pub sender: String,
    pub sendmail_path: PathBuf,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            recipient: String::new(),
            sender: String::new(),
            sendmail_path: PathBuf::from("/usr/sbin/sendmail"),
        }
    }
}

/// Workers de tópico.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Mensagens pendentes por tópico antes de descartar
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mqtt: MqttConfig,
    pub topics: TopicConfig,
    pub database: DatabaseConfig,
    pub alerts: AlertConfig,
    pub workers: WorkerConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML. Em caso de erro usa o padrão.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Caminho padrão: `config.toml` ao lado do executável.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.mqtt.host.trim().is_empty() {
            errors.push("Host MQTT vazio".into());
        }
        if self.mqtt.port == 0 {
            errors.push("Porta MQTT não pode ser 0".into());
        }
        if self.mqtt.client_id.is_empty() {
            errors.push("client_id MQTT vazio".into());
        }
        if self.mqtt.keep_alive_secs < 5 {
            errors.push(format!(
                "keep_alive_secs inválido: {} (mínimo 5)",
                self.mqtt.keep_alive_secs
            ));
        }
        if self.topics.fridge.is_empty() || self.topics.mushroom.is_empty() {
            errors.push("Tópicos não podem ser vazios".into());
        } else if self.topics.fridge == self.topics.mushroom {
            errors.push(format!(
                "Geladeira e estufa usam o mesmo tópico: {}",
                self.topics.fridge
            ));
        }
        // O roteamento é por igualdade exata de tópico.
        for topic in [&self.topics.fridge, &self.topics.mushroom] {
            if topic.contains(['+', '#']) {
                errors.push(format!("Tópico com curinga não é suportado: {topic}"));
            }
        }
        if self.alerts.enabled && self.alerts.recipient.trim().is_empty() {
            errors.push("Alertas habilitados sem destinatário".into());
        }
        if self.workers.queue_capacity == 0 {
            errors.push("queue_capacity deve ser maior que 0".into());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "Erros: {:?}", errors);
    }

    #[test]
    fn default_topics() {
        let config = AppConfig::default();
        assert_eq!(config.topics.fridge, "fridge/status");
        assert_eq!(config.topics.mushroom, "mushroom/status");
    }

    #[test]
    fn roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.mqtt.port, parsed.mqtt.port);
        assert_eq!(config.database.path, parsed.database.path);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let partial = r#"
[mqtt]
host = "10.0.0.6"

[alerts]
enabled = true
recipient = "ops@example.com"
"#;
        let config: AppConfig = toml::from_str(partial).unwrap();
        assert_eq!(config.mqtt.host, "10.0.0.6");
        // Outros campos devem ter valor padrão
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.workers.queue_capacity, 64);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn enabled_alerts_need_recipient() {
        let mut config = AppConfig::default();
        config.alerts.enabled = true;
        assert_eq!(config.validate().len(), 1);
    }

    #[test]
    fn duplicate_topics_are_rejected() {
        let mut config = AppConfig::default();
        config.topics.mushroom = config.topics.fridge.clone();
        assert!(!config.validate().is_empty());
    }

    #[test]
    fn wildcard_topics_are_rejected() {
        let mut config = AppConfig::default();
        config.topics.fridge = "fridge/+".into();
        config.topics.mushroom = "mushroom/#".into();
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("fridge/+"));
        assert!(errors[1].contains("mushroom/#"));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let config = AppConfig::load(Path::new("/nonexistent/dir/config.toml"));
        assert_eq!(config.mqtt.port, 1883);
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!(
            "mqtt_logger_config_test_{}.toml",
            std::process::id()
        ));
        let mut config = AppConfig::default();
        config.mqtt.port = 8883;
        config.save(&path).unwrap();
        let loaded = AppConfig::load(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.mqtt.port, 8883);
    }
}
