// src/state.rs

use std::sync::Arc;

use crate::cache::Sweepable;
use crate::config::JunoConfig;
use crate::continuity::{ContinuityBackend, ContinuityStore, FallbackContinuityStore};
use crate::db::Database;
use crate::escalation::ContactDirectory;
use crate::knowledge::KnowledgeStore;
use crate::llm::CompletionModel;
use crate::memory::ConversationMemory;
use crate::services::ChatService;
use crate::session::SessionRegistry;

/// Shared handles for every request handler.
///
/// `database` is populated only in durable mode and exists for the
/// analytics queries; everything else goes through the backend-agnostic
/// `continuity` trait object.
pub struct AppState {
    pub config: JunoConfig,
    pub registry: Arc<SessionRegistry>,
    pub memory: Arc<ConversationMemory>,
    pub continuity: Arc<dyn ContinuityStore>,
    pub database: Option<Database>,
    pub fallback_continuity: Option<Arc<FallbackContinuityStore>>,
    pub knowledge: Arc<KnowledgeStore>,
    pub contacts: Arc<ContactDirectory>,
    pub chat: Arc<ChatService>,
}

impl AppState {
    /// Caches the background sweeper should prune. The fallback continuity
    /// store joins only when it is the live backend.
    pub fn sweep_targets(&self) -> Vec<Arc<dyn Sweepable>> {
        let mut targets: Vec<Arc<dyn Sweepable>> =
            vec![self.registry.clone(), self.memory.clone()];
        if let Some(fallback) = &self.fallback_continuity {
            targets.push(fallback.clone());
        }
        targets
    }
}

/// Wire the full service graph from a config, a model provider, and the
/// continuity backend chosen at startup. Tests inject scripted models and
/// hand-built backends through the same seam as `main`.
pub fn create_app_state(
    config: JunoConfig,
    model: Arc<dyn CompletionModel>,
    backend: ContinuityBackend,
) -> Arc<AppState> {
    let knowledge = Arc::new(KnowledgeStore::load(&config.knowledge_path));
    let contacts = Arc::new(ContactDirectory::new());
    let memory = Arc::new(ConversationMemory::new(config.session_ttl_secs, config.history_cap));
    let registry = Arc::new(SessionRegistry::new(config.session_ttl_secs, backend.store.clone()));

    let chat = Arc::new(ChatService::new(
        model,
        registry.clone(),
        memory.clone(),
        backend.store.clone(),
        knowledge.clone(),
        contacts.clone(),
        &config,
    ));

    Arc::new(AppState {
        config,
        registry,
        memory,
        continuity: backend.store,
        database: backend.database,
        fallback_continuity: backend.fallback,
        knowledge,
        contacts,
        chat,
    })
}
