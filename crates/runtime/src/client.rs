//! The chat client: one model turn, at most one tool dispatch.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value};
use storage::{Event, EventKind, EventStore, Role, SessionId};
use toolkit::{ToolError, ToolSpec, ToolkitServer};
use tracing::{debug, warn};

use crate::model::{Backend, ModelError, ToolCall};
use crate::pipeline::{AgentStep, LlmPipeline, Pipeline};
use crate::prompt::ChatInput;
use crate::registry::Registry;
use crate::Result;

/// What one `chat` call produced.
///
/// Serializes with a `type` tag:
/// `{"type": "chat", "output": ...}` or
/// `{"type": "tool", "toolkit", "tool_name", "tool_input", "tool_output"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// The model answered directly.
    ///
    /// `type` is reserved: a return value under that key clashes with the tag.
    Chat {
        #[serde(flatten)]
        return_values: Map<String, Value>,
    },
    /// The model called a tool and it ran.
    Tool {
        toolkit: String,
        tool_name: String,
        tool_input: Value,
        tool_output: Value,
    },
}

impl Reply {
    /// The final answer text, for chat replies that carry one.
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Chat { return_values } => return_values.get("output").and_then(Value::as_str),
            Self::Tool { .. } => None,
        }
    }
}

struct Journal {
    store: EventStore,
    session: SessionId,
}

/// Drives a language-model pipeline and dispatches its tool calls to
/// connected toolkits.
pub struct Client<P> {
    pipeline: P,
    registry: Registry,
    tool_timeout: Option<Duration>,
    journal: Option<Journal>,
}

impl<B: Backend> Client<LlmPipeline<B>> {
    /// Build a client whose pipeline renders `prompt` and calls `backend`.
    pub fn from_backend(prompt: &str, backend: B) -> Result<Self> {
        Ok(Self::new(LlmPipeline::from_template(prompt, backend)?))
    }
}

impl<P: Pipeline> Client<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            registry: Registry::new(),
            tool_timeout: None,
            journal: None,
        }
    }

    /// Fail tool runs that take longer than `timeout`.
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Record every turn to `store` under a fresh session.
    pub fn with_journal(mut self, store: EventStore) -> Result<Self> {
        let session = SessionId::new();
        store.append(&Event::new(session, EventKind::SessionStart))?;
        self.journal = Some(Journal { store, session });
        Ok(self)
    }

    /// Journal session, if one is attached.
    pub fn session_id(&self) -> Option<SessionId> {
        self.journal.as_ref().map(|j| j.session)
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Connected toolkits, sorted by name.
    pub fn toolkits(&self) -> impl Iterator<Item = &ToolkitServer> {
        self.registry.toolkits()
    }

    /// Every tool the model may call.
    pub fn tools(&self) -> Vec<ToolSpec> {
        self.registry.specs()
    }

    /// Connect a toolkit.
    ///
    /// Toolkits may be connected between turns; the next turn offers the
    /// model the new tools.
    pub fn connect(&mut self, toolkit: ToolkitServer) -> Result<()> {
        self.registry.connect(toolkit)
    }

    /// Run one turn.
    pub async fn chat(&mut self, input: impl Into<ChatInput>) -> Result<Reply> {
        let input = input.into();
        self.record(|session| Event::message(session, Role::User, input.to_string()))?;

        let tools = self.registry.specs();
        let step = self.pipeline.invoke(&input, &tools).await?;

        match step {
            AgentStep::Finish { return_values } => {
                let text = match return_values.get("output") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                self.record(|session| Event::message(session, Role::Assistant, text))?;
                Ok(Reply::Chat { return_values })
            }
            AgentStep::Actions(calls) => self.dispatch(calls).await,
        }
    }

    async fn dispatch(&mut self, calls: Vec<ToolCall>) -> Result<Reply> {
        let mut calls = calls.into_iter();
        let call = calls.next().ok_or_else(|| {
            ModelError::InvalidResponse("action turn without tool calls".into())
        })?;

        let dropped: Vec<_> = calls.map(|c| c.name).collect();
        if !dropped.is_empty() {
            warn!(tool = %call.name, ?dropped, "model requested several tools; running only the first");
        }

        let toolkit = self.registry.resolve(&call.name)?.clone();
        let started = Instant::now();
        let run = toolkit.use_tool(&call.name, call.input.clone());

        let output = match self.tool_timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                ToolError::Timeout {
                    tool: call.name.clone(),
                    millis: limit.as_millis() as u64,
                }
            })??,
            None => run.await?,
        };

        debug!(
            toolkit = toolkit.name(),
            tool = %call.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool call complete"
        );

        self.record(|session| {
            Event::tool_call(session, toolkit.name(), &call.name, call.input.clone())
        })?;
        self.record(|session| Event::tool_result(session, &call.name, output.clone()))?;

        Ok(Reply::Tool {
            toolkit: toolkit.name().to_string(),
            tool_name: call.name,
            tool_input: call.input,
            tool_output: output,
        })
    }

    fn record(&self, event: impl FnOnce(SessionId) -> Event) -> Result<()> {
        if let Some(journal) = &self.journal {
            journal.store.append(&event(journal.session))?;
        }
        Ok(())
    }

    /// Close the journal session.
    pub fn end(self) -> Result<()> {
        self.record(|session| Event::new(session, EventKind::SessionEnd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use toolkit::{Feature, FnFeature};

    /// Replays canned steps and remembers which tools each turn offered.
    #[derive(Default)]
    struct ScriptedPipeline {
        steps: Mutex<VecDeque<AgentStep>>,
        offered: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedPipeline {
        fn new(steps: impl IntoIterator<Item = AgentStep>) -> Self {
            Self {
                steps: Mutex::new(steps.into_iter().collect()),
                offered: Mutex::default(),
            }
        }
    }

    impl Pipeline for ScriptedPipeline {
        async fn invoke(&self, _input: &ChatInput, tools: &[ToolSpec]) -> Result<AgentStep> {
            self.offered
                .lock()
                .unwrap()
                .push(tools.iter().map(|t| t.name.clone()).collect());
            self.steps
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ModelError::InvalidResponse("script exhausted".into()).into())
        }
    }

    fn call(name: &str, input: Value) -> ToolCall {
        ToolCall {
            id: format!("call_{name}"),
            name: name.into(),
            input,
        }
    }

    fn search_kit() -> ToolkitServer {
        let search: Arc<dyn Feature> = Arc::new(FnFeature::new(
            "search",
            "Search the web",
            json!({
                "type": "object",
                "properties": {"q": {"type": "string"}},
                "required": ["q"]
            }),
            |_| Ok(json!("result-y")),
        ));
        ToolkitServer::new("web", [search]).unwrap()
    }

    fn named_kit(toolkit: &str, tool: &str) -> ToolkitServer {
        let feature: Arc<dyn Feature> = Arc::new(FnFeature::new(
            tool,
            "",
            json!({}),
            |input| Ok(input),
        ));
        ToolkitServer::new(toolkit, [feature]).unwrap()
    }

    struct Sleepy;

    #[async_trait]
    impl Feature for Sleepy {
        fn name(&self) -> &str {
            "nap"
        }

        fn description(&self) -> &str {
            "Sleeps far too long"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn run(&self, _input: Value) -> std::result::Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn final_answer_becomes_chat_reply() {
        let mut client = Client::new(ScriptedPipeline::new([AgentStep::finish("hello")]));

        let reply = client.chat("hi").await.unwrap();

        assert_eq!(reply.output(), Some("hello"));
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"type": "chat", "output": "hello"})
        );
    }

    #[test]
    fn chat_reply_flattens_every_return_value() {
        let mut return_values = Map::new();
        return_values.insert("output".into(), json!("hi"));
        return_values.insert("confidence".into(), json!(0.9));
        let reply = Reply::Chat { return_values };

        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"type": "chat", "output": "hi", "confidence": 0.9})
        );
    }

    #[tokio::test]
    async fn tool_call_is_dispatched_to_owner() {
        let step = AgentStep::Actions(vec![call("search", json!({"q": "x"}))]);
        let mut client = Client::new(ScriptedPipeline::new([step]));
        client.connect(search_kit()).unwrap();

        let reply = client.chat("find x").await.unwrap();

        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({
                "type": "tool",
                "toolkit": "web",
                "tool_name": "search",
                "tool_input": {"q": "x"},
                "tool_output": "result-y"
            })
        );
    }

    #[tokio::test]
    async fn unowned_tool_fails_with_toolkit_not_found() {
        let step = AgentStep::Actions(vec![call("browse", json!({}))]);
        let mut client = Client::new(ScriptedPipeline::new([step]));
        client.connect(search_kit()).unwrap();

        let err = client.chat("go").await.unwrap_err();

        assert!(matches!(err, Error::ToolkitNotFound { ref tool } if tool == "browse"));
    }

    #[tokio::test]
    async fn invalid_tool_input_surfaces() {
        let step = AgentStep::Actions(vec![call("search", json!({"q": 1}))]);
        let mut client = Client::new(ScriptedPipeline::new([step]));
        client.connect(search_kit()).unwrap();

        let err = client.chat("go").await.unwrap_err();

        assert!(matches!(err, Error::Tool(ToolError::InvalidInput { .. })));
    }

    #[test]
    fn connecting_same_toolkit_twice_fails() {
        let mut client = Client::new(ScriptedPipeline::default());
        client.connect(search_kit()).unwrap();

        let err = client.connect(search_kit()).unwrap_err();

        assert!(matches!(err, Error::DuplicateToolkit { .. }));
    }

    #[test]
    fn toolkits_sharing_a_tool_name_conflict() {
        let mut client = Client::new(ScriptedPipeline::default());
        client.connect(named_kit("one", "x")).unwrap();

        let err = client.connect(named_kit("two", "x")).unwrap_err();

        assert!(matches!(err, Error::DuplicateToolName { ref tool, .. } if tool == "x"));
        assert_eq!(client.toolkits().count(), 1);
    }

    #[tokio::test]
    async fn only_first_of_several_calls_runs() {
        let step = AgentStep::Actions(vec![
            call("first", json!({"n": 1})),
            call("second", json!({"n": 2})),
        ]);
        let mut client = Client::new(ScriptedPipeline::new([step]));
        client.connect(named_kit("a", "first")).unwrap();
        client.connect(named_kit("b", "second")).unwrap();

        let reply = client.chat("both").await.unwrap();

        match reply {
            Reply::Tool {
                toolkit,
                tool_name,
                tool_output,
                ..
            } => {
                assert_eq!(toolkit, "a");
                assert_eq!(tool_name, "first");
                assert_eq!(tool_output, json!({"n": 1}));
            }
            other => panic!("expected tool reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_action_list_is_invalid() {
        let mut client = Client::new(ScriptedPipeline::new([AgentStep::Actions(vec![])]));

        let err = client.chat("x").await.unwrap_err();

        assert!(matches!(err, Error::Model(ModelError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn tools_connected_later_are_offered_next_turn() {
        let mut client = Client::new(ScriptedPipeline::new([
            AgentStep::finish("one"),
            AgentStep::finish("two"),
        ]));

        client.chat("first").await.unwrap();
        client.connect(search_kit()).unwrap();
        client.chat("second").await.unwrap();

        let offered = client.pipeline().offered.lock().unwrap().clone();
        assert_eq!(offered, vec![vec![], vec!["search".to_string()]]);
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let nap: Arc<dyn Feature> = Arc::new(Sleepy);
        let step = AgentStep::Actions(vec![call("nap", json!({}))]);
        let mut client = Client::new(ScriptedPipeline::new([step]))
            .with_tool_timeout(Duration::from_millis(50));
        client
            .connect(ToolkitServer::new("slow", [nap]).unwrap())
            .unwrap();

        let err = client.chat("rest").await.unwrap_err();

        assert!(matches!(
            err,
            Error::Tool(ToolError::Timeout { millis: 50, .. })
        ));
    }

    #[tokio::test]
    async fn journal_records_tool_turn() {
        let store = EventStore::in_memory().unwrap();
        let step = AgentStep::Actions(vec![call("search", json!({"q": "x"}))]);
        let mut client = Client::new(ScriptedPipeline::new([step]))
            .with_journal(store)
            .unwrap();
        client.connect(search_kit()).unwrap();

        client.chat("find x").await.unwrap();

        let journal = client.journal.as_ref().unwrap();
        let events = journal.store.load_session(journal.session).unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.kind.name()).collect();
        assert_eq!(kinds, ["session_start", "message", "tool_call", "tool_result"]);
        assert_eq!(
            events[3].kind,
            EventKind::ToolResult {
                name: "search".into(),
                output: json!("result-y"),
            }
        );
    }

    #[tokio::test]
    async fn failed_turn_journals_only_the_question() {
        let store = EventStore::in_memory().unwrap();
        let step = AgentStep::Actions(vec![call("missing", json!({}))]);
        let mut client = Client::new(ScriptedPipeline::new([step]))
            .with_journal(store)
            .unwrap();

        client.chat("try").await.unwrap_err();

        let journal = client.journal.as_ref().unwrap();
        let events = journal.store.load_session(journal.session).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1].kind,
            EventKind::Message {
                role: Role::User,
                content: "try".into(),
            }
        );
    }
}
