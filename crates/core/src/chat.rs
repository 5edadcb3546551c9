//! Chat controller
//!
//! Owns the current conversation and runs at most one streaming session at
//! a time. Cancellation bumps a generation counter; a session started under
//! an older generation stops applying events and its view calls go nowhere.

use crate::client::{AskClient, AskRequest, TransportError};
use crate::config::ChatConfig;
use crate::conversation::{ChatMessage, Conversation, Role};
use crate::render::{ChatView, SessionRenderer};
use crate::store::{ConversationHistory, ConversationStore};
use crate::stream::{Diagnostic, StreamSession};
use crate::text::{DescriptionRules, ResultCard, sanitize};
use futures_util::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    Busy,
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The assistant turn was appended to the conversation and saved.
    Completed {
        message: ChatMessage,
        diagnostics: Vec<Diagnostic>,
    },
    /// Nothing was sent.
    Rejected(RejectReason),
    /// Cancelled mid-session; nothing was saved.
    Abandoned,
}

pub struct ChatController {
    client: Arc<dyn AskClient>,
    store: Arc<dyn ConversationStore>,
    view: Arc<dyn ChatView>,
    config: ChatConfig,
    rules: DescriptionRules,
    conversation: Mutex<Conversation>,
    history: Mutex<ConversationHistory>,
    streaming: AtomicBool,
    generation: watch::Sender<u64>,
}

impl ChatController {
    /// Build a controller with a fresh conversation. A history that fails
    /// to load is treated as empty.
    pub async fn open(
        client: Arc<dyn AskClient>,
        store: Arc<dyn ConversationStore>,
        view: Arc<dyn ChatView>,
        config: ChatConfig,
    ) -> Self {
        let max_entries = config.storage.max_conversations;
        let history = match store.load().await {
            Ok(conversations) => ConversationHistory::from_conversations(conversations, max_entries),
            Err(e) => {
                warn!("Failed to load conversation history: {}", e);
                ConversationHistory::new(max_entries)
            }
        };
        info!("Loaded {} conversations", history.len());

        let (generation, _) = watch::channel(0);
        Self {
            client,
            store,
            view,
            rules: DescriptionRules::new(&config.summary),
            config,
            conversation: Mutex::new(Conversation::new()),
            history: Mutex::new(history),
            streaming: AtomicBool::new(false),
            generation,
        }
    }

    /// Description rules built from the loaded summary config.
    pub fn description_rules(&self) -> &DescriptionRules {
        &self.rules
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    pub fn current_conversation(&self) -> Conversation {
        lock(&self.conversation).clone()
    }

    /// Saved conversations, most recently updated first.
    pub fn history(&self) -> Vec<Conversation> {
        lock(&self.history).conversations().to_vec()
    }

    /// Send `query` and stream the answer into the view.
    pub async fn submit(&self, query: &str) -> Result<SubmitOutcome, ChatError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SubmitOutcome::Rejected(RejectReason::Empty));
        }
        if self
            .streaming
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Rejecting query while a session is streaming");
            return Ok(SubmitOutcome::Rejected(RejectReason::Busy));
        }
        let _streaming = StreamingFlag(&self.streaming);

        let mut cancelled = self.generation.subscribe();
        let generation = *cancelled.borrow_and_update();

        let (conversation_id, request) = {
            let mut conversation = lock(&self.conversation);
            let prev = if self.config.client.send_prev {
                conversation.user_queries()
            } else {
                Vec::new()
            };
            conversation.push(ChatMessage::user(query));
            (conversation.id.clone(), self.build_request(query, prev))
        };

        self.view.append_message(Role::User, query);
        let view: Arc<dyn ChatView> = Arc::new(GuardedView {
            inner: self.view.clone(),
            generation: self.generation.subscribe(),
            started: generation,
        });
        view.begin_assistant_message();

        let mut chunks = tokio::select! {
            biased;
            _ = cancelled.changed() => return Ok(self.abandon(&conversation_id)),
            response = self.client.ask(&request) => match response {
                Ok(chunks) => chunks,
                Err(e) => return Err(self.fail(view.as_ref(), e)),
            },
        };
        view.stop_loading();

        let renderer = SessionRenderer::new(view.clone(), self.rules.clone())
            .with_sites(self.config.render.show_sites);
        let mut session = StreamSession::new(renderer);

        loop {
            tokio::select! {
                biased;
                _ = cancelled.changed() => return Ok(self.abandon(&conversation_id)),
                chunk = chunks.next() => match chunk {
                    Some(Ok(bytes)) => {
                        session.feed(&bytes);
                        if session.is_complete() {
                            break;
                        }
                    }
                    Some(Err(e)) => return Err(self.fail(view.as_ref(), e)),
                    None => break,
                },
            }
        }

        let report = session.finish();
        for diagnostic in &report.diagnostics {
            debug!("Stream diagnostic: {}", diagnostic);
        }
        let message = report.message.into_chat_message();

        let snapshot = {
            let mut conversation = lock(&self.conversation);
            if *cancelled.borrow() != generation {
                drop(conversation);
                return Ok(self.abandon(&conversation_id));
            }
            conversation.push(message.clone());
            conversation.ensure_title();
            conversation.clone()
        };

        if let Err(e) = self.store.save(&snapshot).await {
            warn!("Failed to save conversation {}: {}", snapshot.id, e);
        }
        lock(&self.history).upsert(&snapshot);

        Ok(SubmitOutcome::Completed {
            message,
            diagnostics: report.diagnostics,
        })
    }

    fn build_request(&self, query: &str, prev: Vec<String>) -> AskRequest {
        let client = &self.config.client;
        AskRequest::new(query, client.site.clone().unwrap_or_default())
            .with_mode(client.mode.clone())
            .with_sites(client.sites.clone())
            .with_prev(prev)
    }

    /// Drop the unanswered user turn of an abandoned session so it is not
    /// saved with a later answer. A replaced conversation is left alone.
    fn abandon(&self, conversation_id: &str) -> SubmitOutcome {
        debug!("Session abandoned");
        let mut conversation = lock(&self.conversation);
        if conversation.id == conversation_id
            && conversation
                .messages
                .last()
                .is_some_and(|message| message.role == Role::User)
        {
            conversation.messages.pop();
        }
        SubmitOutcome::Abandoned
    }

    fn fail(&self, view: &dyn ChatView, error: TransportError) -> ChatError {
        warn!("Session failed: {}", error);
        view.show_error(&error.to_string());
        ChatError::Transport(error)
    }

    /// Abandon the in-flight session, if any.
    pub fn cancel(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }

    /// Abandon any session and start an empty conversation.
    pub fn start_new_conversation(&self) -> String {
        let id = {
            let mut conversation = lock(&self.conversation);
            self.cancel();
            *conversation = Conversation::new();
            conversation.id.clone()
        };
        self.view.clear();
        id
    }

    /// Abandon any session and make a saved conversation current,
    /// replaying it into the view.
    pub fn resume_conversation(&self, id: &str) -> Result<(), ChatError> {
        let Some(saved) = lock(&self.history).get(id).cloned() else {
            return Err(ChatError::ConversationNotFound(id.to_string()));
        };
        {
            let mut conversation = lock(&self.conversation);
            self.cancel();
            *conversation = saved.clone();
        }
        self.view.clear();
        self.replay(&saved);
        Ok(())
    }

    fn replay(&self, conversation: &Conversation) {
        for message in &conversation.messages {
            match message.role {
                Role::User => self.view.append_message(Role::User, &message.content),
                Role::Assistant => {
                    let text = sanitize(&message.content);
                    if !text.is_empty() {
                        self.view.append_message(Role::Assistant, &text);
                    }
                    let results = message.results.as_deref().unwrap_or_default();
                    if !results.is_empty() {
                        self.view.show_results_header(results.len());
                        for record in results {
                            self.view
                                .append_result_card(&ResultCard::from_record(record, &self.rules));
                        }
                    }
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clears the streaming flag however `submit` exits, including when its
/// future is dropped.
struct StreamingFlag<'a>(&'a AtomicBool);

impl Drop for StreamingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Forwards to the real view only while the session's generation is current.
struct GuardedView {
    inner: Arc<dyn ChatView>,
    generation: watch::Receiver<u64>,
    started: u64,
}

impl GuardedView {
    fn live(&self) -> Option<&dyn ChatView> {
        (*self.generation.borrow() == self.started).then_some(self.inner.as_ref())
    }
}

impl ChatView for GuardedView {
    fn append_message(&self, role: Role, content: &str) {
        if let Some(view) = self.live() {
            view.append_message(role, content);
        }
    }
    fn begin_assistant_message(&self) {
        if let Some(view) = self.live() {
            view.begin_assistant_message();
        }
    }
    fn stop_loading(&self) {
        if let Some(view) = self.live() {
            view.stop_loading();
        }
    }
    fn create_answer(&self) {
        if let Some(view) = self.live() {
            view.create_answer();
        }
    }
    fn update_answer(&self, text: &str) {
        if let Some(view) = self.live() {
            view.update_answer(text);
        }
    }
    fn show_sites(&self, sites: &[String]) {
        if let Some(view) = self.live() {
            view.show_sites(sites);
        }
    }
    fn show_results_header(&self, count: usize) {
        if let Some(view) = self.live() {
            view.show_results_header(count);
        }
    }
    fn append_result_card(&self, card: &ResultCard) {
        if let Some(view) = self.live() {
            view.append_result_card(card);
        }
    }
    fn show_no_results(&self) {
        if let Some(view) = self.live() {
            view.show_no_results();
        }
    }
    fn show_error(&self, message: &str) {
        if let Some(view) = self.live() {
            view.show_error(message);
        }
    }
    fn clear(&self) {
        if let Some(view) = self.live() {
            view.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChunkStream;
    use crate::render::testing::{RecordingView, ViewCall};
    use crate::store::{MemoryConversationStore, PersistenceError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::{Mutex as TokioMutex, mpsc};

    type Chunk = Result<Vec<u8>, TransportError>;

    enum Script {
        Lines(Vec<&'static str>),
        Fail(TransportError),
        Channel(mpsc::UnboundedReceiver<Chunk>),
    }

    struct ScriptedClient {
        scripts: TokioMutex<VecDeque<Script>>,
        requests: TokioMutex<Vec<AskRequest>>,
    }

    impl ScriptedClient {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: TokioMutex::new(scripts.into()),
                requests: TokioMutex::new(Vec::new()),
            })
        }

        async fn requests(&self) -> Vec<AskRequest> {
            self.requests.lock().await.clone()
        }
    }

    #[async_trait]
    impl AskClient for ScriptedClient {
        async fn ask(&self, request: &AskRequest) -> Result<ChunkStream, TransportError> {
            self.requests.lock().await.push(request.clone());
            let script = self
                .scripts
                .lock()
                .await
                .pop_front()
                .expect("scripted response");
            match script {
                Script::Lines(lines) => {
                    let chunks: Vec<Chunk> = lines
                        .into_iter()
                        .map(|line| Ok(format!("{}\n", line).into_bytes()))
                        .collect();
                    Ok(futures_util::stream::iter(chunks).boxed())
                }
                Script::Fail(error) => Err(error),
                Script::Channel(rx) => Ok(futures_util::stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|chunk| (chunk, rx))
                })
                .boxed()),
            }
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ConversationStore for FailingStore {
        async fn load(&self) -> Result<Vec<Conversation>, PersistenceError> {
            Err(PersistenceError::Corrupt {
                path: PathBuf::from("history.json"),
                message: "truncated".to_string(),
            })
        }

        async fn save(&self, _conversation: &Conversation) -> Result<(), PersistenceError> {
            Err(PersistenceError::Corrupt {
                path: PathBuf::from("history.json"),
                message: "read-only".to_string(),
            })
        }
    }

    fn config() -> ChatConfig {
        let mut config = ChatConfig::default();
        config.client.site = Some("blog".to_string());
        config
    }

    async fn controller(
        client: Arc<ScriptedClient>,
        store: Arc<dyn ConversationStore>,
        config: ChatConfig,
    ) -> (Arc<ChatController>, Arc<RecordingView>) {
        let view = Arc::new(RecordingView::default());
        let controller = ChatController::open(client, store, view.clone(), config).await;
        (Arc::new(controller), view)
    }

    async fn wait_until_streaming(controller: &ChatController) {
        for _ in 0..100 {
            if controller.is_streaming() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("session never started");
    }

    const ANSWER: &[&str] = &[
        r#"data: {"message_type":"api_version","version":"1"}"#,
        r#"data: {"message_type":"result_batch","results":[{"url":"https://s/setup-guide.html","description":"Install steps for the site generator."}]}"#,
        r#"data: {"message_type":"content","content":"Use **cargo**"}"#,
        r#"data: {"message_type":"content","content":" install."}"#,
        r#"data: {"message_type":"complete"}"#,
    ];

    #[tokio::test]
    async fn test_completed_session_is_saved_once() {
        let client = ScriptedClient::new(vec![Script::Lines(ANSWER.to_vec())]);
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, view) = controller(client.clone(), store.clone(), config()).await;

        let outcome = controller.submit("  how do I install?  ").await.unwrap();
        let SubmitOutcome::Completed { message, diagnostics } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "Use **cargo** install.");
        assert_eq!(message.results.as_ref().map(Vec::len), Some(1));
        assert!(diagnostics.is_empty());

        let requests = client.requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query, "how do I install?");
        assert_eq!(requests[0].site, "blog");
        assert_eq!(requests[0].mode, "answer");

        let saved = store.load().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].title, "how do I install?");
        assert_eq!(saved[0].messages.len(), 2);
        assert_eq!(controller.history().len(), 1);

        assert_eq!(
            view.calls()[..3],
            [
                ViewCall::Message(Role::User, "how do I install?".to_string()),
                ViewCall::BeginAssistant,
                ViewCall::StopLoading,
            ]
        );
        assert_eq!(view.last_answer().as_deref(), Some("Use cargo install."));
        assert_eq!(view.count(|c| *c == ViewCall::NoResults), 0);
        assert!(!controller.is_streaming());
    }

    #[tokio::test]
    async fn test_complete_only_renders_fallback() {
        let client = ScriptedClient::new(vec![Script::Lines(vec![
            r#"data: {"message_type":"complete"}"#,
        ])]);
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, view) = controller(client, store.clone(), config()).await;

        let outcome = controller.submit("anything?").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
        assert_eq!(view.count(|c| *c == ViewCall::NoResults), 1);
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let client = ScriptedClient::new(vec![]);
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, view) = controller(client.clone(), store, config()).await;

        let outcome = controller.submit("   ").await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Rejected(RejectReason::Empty)
        ));
        assert!(client.requests().await.is_empty());
        assert!(view.calls().is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_while_streaming_is_rejected() {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = ScriptedClient::new(vec![Script::Channel(rx)]);
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, _view) = controller(client.clone(), store, config()).await;

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("first").await }
        });
        wait_until_streaming(&controller).await;

        let second = controller.submit("second").await.unwrap();
        assert!(matches!(second, SubmitOutcome::Rejected(RejectReason::Busy)));

        tx.send(Ok(b"data: {\"message_type\":\"content\",\"content\":\"ok\"}\n".to_vec()))
            .unwrap();
        drop(tx);
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, SubmitOutcome::Completed { .. }));

        assert_eq!(client.requests().await.len(), 1);
        let conversation = controller.current_conversation();
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].content, "first");
    }

    #[tokio::test]
    async fn test_new_conversation_abandons_session() {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = ScriptedClient::new(vec![Script::Channel(rx)]);
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, view) = controller(client, store.clone(), config()).await;

        let running = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("slow question").await }
        });
        wait_until_streaming(&controller).await;
        tx.send(Ok(b"data: {\"message_type\":\"content\",\"content\":\"par".to_vec()))
            .unwrap();

        let old_id = controller.current_conversation().id;
        let new_id = controller.start_new_conversation();
        assert_ne!(old_id, new_id);
        tx.send(Ok(b"tial\"}\ndata: {\"message_type\":\"complete\"}\n".to_vec()))
            .ok();

        let outcome = running.await.unwrap().unwrap();
        assert!(matches!(outcome, SubmitOutcome::Abandoned));
        assert!(store.load().await.unwrap().is_empty());
        assert!(controller.current_conversation().messages.is_empty());
        assert!(!controller.is_streaming());

        let calls = view.calls();
        let cleared = calls
            .iter()
            .rposition(|c| *c == ViewCall::Clear)
            .expect("view cleared");
        assert!(calls[cleared + 1..].is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_turn_is_not_saved_with_next_answer() {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = ScriptedClient::new(vec![
            Script::Channel(rx),
            Script::Lines(ANSWER.to_vec()),
        ]);
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, _view) = controller(client, store.clone(), config()).await;

        let running = tokio::spawn({
            let controller = controller.clone();
            async move { controller.submit("never mind").await }
        });
        wait_until_streaming(&controller).await;
        let id = controller.current_conversation().id;
        controller.cancel();
        let outcome = running.await.unwrap().unwrap();
        assert!(matches!(outcome, SubmitOutcome::Abandoned));
        drop(tx);

        let conversation = controller.current_conversation();
        assert_eq!(conversation.id, id);
        assert!(conversation.messages.is_empty());

        controller.submit("how do I install it?").await.unwrap();
        let saved = store.load().await.unwrap();
        let queries: Vec<&str> = saved[0]
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(queries, vec!["how do I install it?"]);
    }

    #[tokio::test]
    async fn test_description_rules_follow_config() {
        let mut config = config();
        config.summary.strip_fields = vec!["summary".to_string()];
        config.summary.min_description_len = 5;
        let client = ScriptedClient::new(vec![]);
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, _view) = controller(client, store, config).await;

        let description = crate::text::derive_description(
            Some("summary: short text"),
            controller.description_rules(),
        );
        assert_eq!(description, "short text");
    }

    #[tokio::test]
    async fn test_transport_failure_shows_error_and_discards() {
        let client = ScriptedClient::new(vec![Script::Fail(TransportError::Status {
            status: 500,
            reason: "Internal Server Error".to_string(),
        })]);
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, view) = controller(client, store.clone(), config()).await;

        let err = controller.submit("boom").await.unwrap_err();
        assert!(matches!(
            err,
            ChatError::Transport(TransportError::Status { status: 500, .. })
        ));
        assert_eq!(
            view.calls().last(),
            Some(&ViewCall::Error("HTTP 500: Internal Server Error".to_string()))
        );
        assert_eq!(view.count(|c| *c == ViewCall::StopLoading), 0);
        assert!(store.load().await.unwrap().is_empty());
        assert!(!controller.is_streaming());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_is_not_completion() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Ok(b"data: {\"message_type\":\"content\",\"content\":\"half\"}\n".to_vec()))
            .unwrap();
        tx.send(Err(TransportError::Read {
            message: "connection reset".to_string(),
        }))
        .unwrap();
        let client = ScriptedClient::new(vec![Script::Channel(rx)]);
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, view) = controller(client, store.clone(), config()).await;

        let err = controller.submit("question").await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(TransportError::Read { .. })));
        assert_eq!(view.count(|c| matches!(c, ViewCall::Error(_))), 1);
        assert_eq!(view.count(|c| *c == ViewCall::NoResults), 0);
        assert!(store.load().await.unwrap().is_empty());
        assert_eq!(controller.current_conversation().messages.len(), 1);
    }

    #[tokio::test]
    async fn test_prev_queries_sent_when_enabled() {
        let complete = vec![r#"data: {"message_type":"complete"}"#];
        let client = ScriptedClient::new(vec![
            Script::Lines(complete.clone()),
            Script::Lines(complete),
        ]);
        let mut config = config();
        config.client.send_prev = true;
        config.client.sites = vec!["docs".to_string()];
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, _view) = controller(client.clone(), store.clone(), config).await;

        controller.submit("one").await.unwrap();
        controller.submit("two").await.unwrap();

        let requests = client.requests().await;
        assert!(requests[0].prev.is_empty());
        assert_eq!(requests[1].prev, vec!["one".to_string()]);
        assert_eq!(requests[1].sites, vec!["docs".to_string()]);

        let saved = store.load().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].messages.len(), 4);
        assert_eq!(saved[0].title, "one");
    }

    #[tokio::test]
    async fn test_load_failure_means_empty_history() {
        let client = ScriptedClient::new(vec![Script::Lines(vec![
            r#"data: {"message_type":"content","content":"hi"}"#,
        ])]);
        let (controller, _view) = controller(client, Arc::new(FailingStore), config()).await;
        assert!(controller.history().is_empty());

        // Save failures are logged; the turn still completes.
        let outcome = controller.submit("hello").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed { .. }));
        assert_eq!(controller.history().len(), 1);
    }

    #[tokio::test]
    async fn test_resume_replays_saved_conversation() {
        let client = ScriptedClient::new(vec![Script::Lines(ANSWER.to_vec())]);
        let store = Arc::new(MemoryConversationStore::new());
        let (controller, view) = controller(client, store, config()).await;

        controller.submit("install?").await.unwrap();
        let saved_id = controller.current_conversation().id;
        controller.start_new_conversation();

        assert!(matches!(
            controller.resume_conversation("missing"),
            Err(ChatError::ConversationNotFound(_))
        ));
        controller.resume_conversation(&saved_id).unwrap();
        assert_eq!(controller.current_conversation().id, saved_id);

        let calls = view.calls();
        let cleared = calls.iter().rposition(|c| *c == ViewCall::Clear).unwrap();
        assert_eq!(
            calls[cleared + 1..],
            [
                ViewCall::Message(Role::User, "install?".to_string()),
                ViewCall::Message(Role::Assistant, "Use cargo install.".to_string()),
                ViewCall::ResultsHeader(1),
                ViewCall::Card("Setup Guide".to_string()),
            ]
        );
    }
}
