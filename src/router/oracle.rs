use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::Mutex;

use super::DispatchError;
use crate::providers::llm::{parse_json_response, ChatMessage, LLMProvider};
use crate::types::{CapabilityKind, RouteTarget, RoutingDecision, Session, FINISH};

/// The decision-making collaborator the dispatcher consults each cycle.
/// Injectable so router tests run against deterministic scripts instead of a
/// live model.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn decide(&self, session: &Session) -> Result<RoutingDecision>;
}

/// Production oracle: a structured-output call against the routing model.
pub struct LlmDecisionOracle {
    llm: Arc<dyn LLMProvider>,
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    next: String,
    reason: Option<String>,
}

fn routing_prompt() -> String {
    let agents: Vec<String> = CapabilityKind::ALL
        .iter()
        .map(|kind| format!("- {}: {}", kind.as_str(), kind.summary()))
        .collect();
    format!(
        "You are the supervisor of a travel assistant coordinating these expert agents:\n\
         {}\n\n\
         Read the conversation, decide which expert is needed next, and call only \
         experts that are actually relevant. Decompose multi-part queries into \
         sequential steps handled by different experts. Never invoke an expert that \
         is not listed above and never fabricate input data.\n\n\
         Respond with only a JSON object: {{\"next\": \"<expert name or {}>\", \
         \"reason\": \"<one short sentence>\"}}. \
         Return {} when every relevant task is complete.",
        agents.join("\n"),
        FINISH,
        FINISH,
    )
}

impl LlmDecisionOracle {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl DecisionOracle for LlmDecisionOracle {
    async fn decide(&self, session: &Session) -> Result<RoutingDecision> {
        let messages = vec![
            ChatMessage::system(routing_prompt()),
            ChatMessage::user(format!("Conversation so far:\n{}", session.transcript())),
        ];
        let response = self.llm.complete(messages).await?;
        let raw: RawDecision = parse_json_response(&response)?;

        let next = RouteTarget::parse(&raw.next)
            .ok_or(DispatchError::UnknownCapability(raw.next))?;

        Ok(RoutingDecision {
            next,
            reason: raw.reason,
        })
    }
}

enum Script {
    /// Replay a fixed sequence, then finish.
    Sequence(Mutex<Vec<RouteTarget>>),
    /// Never finish; always route to the same capability.
    Looping(CapabilityKind),
}

/// Deterministic oracle for tests.
pub struct ScriptedOracle {
    script: Script,
}

impl ScriptedOracle {
    /// Replays `targets` in order; once exhausted, every decision is FINISH.
    pub fn new(targets: Vec<RouteTarget>) -> Self {
        let mut targets = targets;
        targets.reverse();
        Self {
            script: Script::Sequence(Mutex::new(targets)),
        }
    }

    pub fn finishing() -> Self {
        Self::new(vec![])
    }

    pub fn looping(kind: CapabilityKind) -> Self {
        Self {
            script: Script::Looping(kind),
        }
    }
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(&self, _session: &Session) -> Result<RoutingDecision> {
        let next = match &self.script {
            Script::Sequence(targets) => targets
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(RouteTarget::Finish),
            Script::Looping(kind) => RouteTarget::Capability(*kind),
        };
        Ok(RoutingDecision { next, reason: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::MockLLMProvider;

    #[test]
    fn test_routing_prompt_lists_every_capability() {
        let prompt = routing_prompt();
        for kind in CapabilityKind::ALL {
            assert!(prompt.contains(kind.as_str()));
        }
        assert!(prompt.contains(FINISH));
    }

    #[tokio::test]
    async fn test_llm_oracle_parses_capability() {
        let llm = Arc::new(MockLLMProvider::with_response(
            r#"{"next": "weather_expert", "reason": "user asked about weather"}"#,
        ));
        let oracle = LlmDecisionOracle::new(llm);
        let decision = oracle.decide(&Session::new("weather in Paris")).await.unwrap();

        assert_eq!(
            decision.next,
            RouteTarget::Capability(CapabilityKind::Weather)
        );
        assert_eq!(decision.reason.as_deref(), Some("user asked about weather"));
    }

    #[tokio::test]
    async fn test_llm_oracle_parses_finish() {
        let llm = Arc::new(MockLLMProvider::with_response(r#"{"next": "FINISH"}"#));
        let oracle = LlmDecisionOracle::new(llm);
        let decision = oracle.decide(&Session::new("thanks")).await.unwrap();
        assert_eq!(decision.next, RouteTarget::Finish);
    }

    #[tokio::test]
    async fn test_llm_oracle_rejects_unknown_capability() {
        let llm = Arc::new(MockLLMProvider::with_response(r#"{"next": "visa_expert"}"#));
        let oracle = LlmDecisionOracle::new(llm);
        let err = oracle.decide(&Session::new("visa help")).await.unwrap_err();

        match err.downcast_ref::<DispatchError>() {
            Some(DispatchError::UnknownCapability(name)) => assert_eq!(name, "visa_expert"),
            other => panic!("expected UnknownCapability, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scripted_oracle_sequence_then_finish() {
        let oracle = ScriptedOracle::new(vec![
            RouteTarget::Capability(CapabilityKind::Weather),
            RouteTarget::Capability(CapabilityKind::Hotel),
        ]);
        let session = Session::new("hi");

        assert_eq!(
            oracle.decide(&session).await.unwrap().next,
            RouteTarget::Capability(CapabilityKind::Weather)
        );
        assert_eq!(
            oracle.decide(&session).await.unwrap().next,
            RouteTarget::Capability(CapabilityKind::Hotel)
        );
        assert_eq!(
            oracle.decide(&session).await.unwrap().next,
            RouteTarget::Finish
        );
    }
}
