use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{DecisionOracle, DispatchError};
use crate::capabilities::HandlerRegistry;
use crate::types::{DispatchStatus, Message, RouteTarget, Session};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on dispatch cycles per request, so a terminal decision the
    /// oracle never produces cannot hang the session.
    pub max_cycles: usize,
    pub decision_timeout: Duration,
    pub handler_timeout: Duration,
    /// Wall-clock budget for the whole request. Per-call timeouts bound each
    /// cycle; this bounds their sum.
    pub request_deadline: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_cycles: 12,
            decision_timeout: Duration::from_secs(30),
            handler_timeout: Duration::from_secs(60),
            request_deadline: Duration::from_secs(120),
        }
    }
}

/// Result of one full dispatch loop.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub status: DispatchStatus,
    /// Content of the last message in the history.
    pub answer: String,
    pub session: Session,
}

/// The routing state machine. Each cycle it asks the oracle for the next
/// step, hands control to the chosen handler, appends the handler's single
/// result message, and repeats until the oracle signals FINISH. The
/// dispatcher itself performs no business logic.
pub struct Dispatcher {
    oracle: Arc<dyn DecisionOracle>,
    handlers: HandlerRegistry,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(oracle: Arc<dyn DecisionOracle>, handlers: HandlerRegistry) -> Self {
        Self {
            oracle,
            handlers,
            config: DispatcherConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Drive one user request to completion.
    ///
    /// Handler failures (including timeouts) are appended as failure messages
    /// and the loop continues; only oracle failures and unknown-capability
    /// decisions abort the session. Hitting the cycle limit or the request
    /// deadline returns the partial result with `DispatchStatus::Inconclusive`.
    pub async fn run(&self, user_message: &str) -> Result<DispatchOutcome, DispatchError> {
        let mut session = Session::new(user_message);
        let started = Instant::now();
        log::info!("session {} started", session.id());

        for cycle in 0..self.config.max_cycles {
            if started.elapsed() >= self.config.request_deadline {
                log::warn!(
                    "session {} stopped at the {:?} request deadline after {} cycle(s)",
                    session.id(),
                    self.config.request_deadline,
                    cycle
                );
                return Ok(outcome(DispatchStatus::Inconclusive, session));
            }

            let decision = match tokio::time::timeout(
                self.config.decision_timeout,
                self.oracle.decide(&session),
            )
            .await
            {
                Err(_) => return Err(DispatchError::DecisionTimeout(self.config.decision_timeout)),
                Ok(Err(e)) => {
                    return Err(match e.downcast::<DispatchError>() {
                        Ok(dispatch_error) => dispatch_error,
                        Err(other) => DispatchError::Oracle(other),
                    })
                }
                Ok(Ok(decision)) => decision,
            };

            session.set_next(decision.next);

            let kind = match decision.next {
                RouteTarget::Finish => {
                    log::info!(
                        "session {} finished after {} cycle(s)",
                        session.id(),
                        cycle + 1
                    );
                    return Ok(outcome(DispatchStatus::Complete, session));
                }
                RouteTarget::Capability(kind) => kind,
            };

            let handler = self.handlers.get(&kind).ok_or_else(|| {
                DispatchError::UnknownCapability(kind.as_str().to_string())
            })?;

            let message = match tokio::time::timeout(
                self.config.handler_timeout,
                handler.handle(&session),
            )
            .await
            {
                Ok(message) => message,
                Err(_) => Message::failure(
                    kind,
                    format!(
                        "{} did not answer within {:?}",
                        kind.as_str(),
                        self.config.handler_timeout
                    ),
                ),
            };
            session.push(message);
        }

        log::warn!(
            "session {} stopped at the {}-cycle limit without a terminal decision",
            session.id(),
            self.config.max_cycles
        );
        Ok(outcome(DispatchStatus::Inconclusive, session))
    }
}

fn outcome(status: DispatchStatus, session: Session) -> DispatchOutcome {
    let answer = session
        .last()
        .map(|m| m.content.clone())
        .unwrap_or_default();
    DispatchOutcome {
        status,
        answer,
        session,
    }
}
