//! Startup: one factory shared by every command.
//!
//! Order is fixed: load and validate configuration, derive the storage
//! identity, open the archive (announcing new files over NATS when
//! configured), then build participants on demand.

use crate::config::{AppConfig, Chain, Settings};
use crate::error::CliError;
use rootcause::prelude::{Report, ResultExt};
use roundtable_ai::{OllamaBackend, Participant};
use roundtable_archive::gateway::DEFAULT_GATEWAY_TIMEOUT_SECS;
use roundtable_archive::{ArchiveSink, DirectoryArchive, GatewayClient};
use roundtable_trigger::NatsTrigger;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Who the archive records as the author of new files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StorageIdentity {
    pub(crate) chain: Chain,
    pub(crate) namespace: String,
    /// `0x`-prefixed fingerprint of the signing key. Not an on-chain address.
    pub(crate) author: String,
}

impl StorageIdentity {
    pub(crate) fn derive(settings: &Settings) -> Self {
        let digest = Sha256::digest(settings.private_key.as_bytes());
        let fingerprint = hex::encode(&digest[..20]);

        Self {
            chain: settings.chain,
            namespace: settings.namespace.clone(),
            author: format!("0x{fingerprint}"),
        }
    }
}

/// Everything a command needs, ready to use.
#[derive(Debug)]
pub(crate) struct Bootstrap {
    settings: Settings,
    identity: StorageIdentity,
    archive: Arc<DirectoryArchive>,
    notifier: Option<Arc<NatsTrigger>>,
}

impl Bootstrap {
    /// Loads configuration from the process environment and builds everything.
    pub(crate) async fn init() -> Result<Self, Report<CliError>> {
        let settings = AppConfig::load()
            .and_then(|config| config.validate())
            .context(CliError::Configuration)?;
        info!(chain = %settings.chain, namespace = %settings.namespace, "configuration loaded");

        Self::from_settings(settings).await
    }

    #[instrument(skip(settings), fields(namespace = %settings.namespace))]
    pub(crate) async fn from_settings(settings: Settings) -> Result<Self, Report<CliError>> {
        let identity = StorageIdentity::derive(&settings);

        let notifier = match &settings.nats_url {
            Some(url) => {
                let trigger = NatsTrigger::connect(url, settings.nats_subject_prefix.clone())
                    .await
                    .context(CliError::Storage {
                        operation: "notifier connect",
                    })?;
                info!(url = %url, "announcing new files over NATS");
                Some(Arc::new(trigger))
            }
            None => None,
        };

        let mut archive = DirectoryArchive::open(&settings.archive_dir, &settings.namespace)
            .await
            .context(CliError::Storage { operation: "open" })?
            .with_author(identity.author.clone());
        if let Some(notifier) = &notifier {
            archive = archive.with_observer(notifier.clone());
        }
        info!(path = %archive.path().display(), author = %identity.author, "archive ready");

        Ok(Self {
            settings,
            identity,
            archive: Arc::new(archive),
            notifier,
        })
    }

    pub(crate) fn identity(&self) -> &StorageIdentity {
        &self.identity
    }

    pub(crate) fn archive(&self) -> Arc<dyn ArchiveSink> {
        self.archive.clone()
    }

    /// The NATS trigger, if `NATS_URL` is configured.
    pub(crate) fn notifier(&self) -> Option<Arc<NatsTrigger>> {
        self.notifier.clone()
    }

    /// A client for the configured content gateway.
    pub(crate) fn gateway(&self) -> Result<GatewayClient, Report<CliError>> {
        GatewayClient::new(
            &self.settings.pinata_gateway,
            Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS),
        )
        .context(CliError::Storage {
            operation: "gateway setup",
        })
    }

    /// An Ollama-backed participant for `model` at `position`.
    pub(crate) fn participant(
        &self,
        position: usize,
        model: &str,
    ) -> Result<Participant, Report<CliError>> {
        let backend = OllamaBackend::new(self.settings.ollama.clone(), model).context(
            CliError::Backend {
                model: model.to_string(),
            },
        )?;
        Ok(Participant::seated(position, Arc::new(backend)))
    }

    /// Seats one participant per model, in order.
    pub(crate) fn participants(
        &self,
        models: &[String],
    ) -> Result<Vec<Participant>, Report<CliError>> {
        models
            .iter()
            .enumerate()
            .map(|(position, model)| self.participant(position, model))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roundtable_ai::OllamaConfig;
    use std::path::Path;

    fn settings(dir: &Path) -> Settings {
        Settings {
            chain: Chain::Gnosis,
            private_key: "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
                .to_string(),
            pimlico_api_key: "pim".to_string(),
            namespace: "demo-agent".to_string(),
            pinata_jwt: "jwt".to_string(),
            pinata_gateway: "demo.mypinata.cloud".to_string(),
            ollama: OllamaConfig::default(),
            archive_dir: dir.to_path_buf(),
            nats_url: None,
            nats_subject_prefix: "roundtable.files".to_string(),
        }
    }

    #[test]
    fn identity_is_stable_and_hides_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        let a = StorageIdentity::derive(&s);
        let b = StorageIdentity::derive(&s);

        assert_eq!(a, b);
        assert_eq!(a.author.len(), 42);
        assert!(a.author.starts_with("0x"));
        assert!(!s.private_key.contains(&a.author[2..]));
    }

    #[tokio::test]
    async fn factory_opens_namespaced_archive() {
        let dir = tempfile::tempdir().unwrap();
        let boot = Bootstrap::from_settings(settings(dir.path())).await.unwrap();

        assert_eq!(boot.archive().source_id(), "demo-agent");
        assert!(dir.path().join("demo-agent").is_dir());
        assert!(boot.notifier().is_none());
        assert_eq!(boot.identity().chain, Chain::Gnosis);

        let created = boot.archive().create("Hello World").await.unwrap();
        assert_eq!(boot.archive().read(created.file_id).await.unwrap(), "Hello World");
    }

    #[tokio::test]
    async fn participants_are_seated_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let boot = Bootstrap::from_settings(settings(dir.path())).await.unwrap();

        let seated = boot
            .participants(&["smollm:360m".to_string(), "qwen3:0.6b".to_string()])
            .unwrap();
        let labels: Vec<_> = seated.iter().map(|p| (p.label(), p.model())).collect();
        assert_eq!(
            labels,
            vec![("Model 1", "smollm:360m"), ("Model 2", "qwen3:0.6b")]
        );
    }

    #[tokio::test]
    async fn bad_namespace_fails_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.namespace = "../escape".to_string();

        let report = Bootstrap::from_settings(s).await.unwrap_err();
        assert!(report.to_string().contains("archive open failed"), "{report}");
    }
}
