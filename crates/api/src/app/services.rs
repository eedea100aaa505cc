//! Service wiring: the in-memory directory and the document generator.

use std::sync::Arc;

use anyhow::Context;

use factoring_documents::{InvoiceDocumentGenerator, Lookups};
use factoring_invoicing::{InMemoryDirectory, Session};

use crate::config::ServerConfig;
use crate::context::ActingUser;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppServices {
    pub directory: Arc<InMemoryDirectory>,
    pub generator: InvoiceDocumentGenerator,
}

impl AppServices {
    pub fn new(directory: Arc<InMemoryDirectory>, config: &ServerConfig) -> Self {
        let generator =
            InvoiceDocumentGenerator::from_config(Lookups::shared(directory.clone()), &config.generator);
        Self {
            directory,
            generator,
        }
    }

    /// Generator resolving the current user as the request's acting user.
    pub fn generator_for(&self, acting: ActingUser) -> InvoiceDocumentGenerator {
        match acting.user_id() {
            Some(user_id) => {
                let session = Arc::new(Session::new(self.directory.clone(), user_id));
                self.generator.with_session(session.clone(), session)
            }
            None => self.generator.clone(),
        }
    }
}

/// Load the directory seed named by the configuration and wire the generator.
pub fn build_services(config: &ServerConfig) -> anyhow::Result<AppServices> {
    let seed = std::fs::read_to_string(&config.data_path)
        .with_context(|| format!("failed to read directory seed {}", config.data_path.display()))?;
    let directory = InMemoryDirectory::from_json(&seed)
        .with_context(|| format!("invalid directory seed {}", config.data_path.display()))?;

    tracing::info!(
        data = %config.data_path.display(),
        template = %config.generator.template_path.display(),
        barcode_policy = ?config.generator.barcode_policy,
        "services ready"
    );
    Ok(AppServices::new(Arc::new(directory), config))
}
