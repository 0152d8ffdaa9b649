//! Shared oracle-calling helpers for the use cases.
//!
//! [`OracleClient`] wraps the gateway with the response cache and the
//! conversation log. [`fan_out`] sends one prompt to several oracles at
//! once and only returns when every call has finished, in oracle order.

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::oracle_gateway::{OracleError, OracleGateway};
use crate::ports::progress::ProgressNotifier;
use crate::ports::response_cache::{Fingerprint, NoCache, ResponseCache};
use celltype_domain::{OracleFailure, OracleSpec, Phase};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Gateway plus cache and conversation log.
pub struct OracleClient<G: OracleGateway + 'static> {
    gateway: Arc<G>,
    cache: Arc<dyn ResponseCache>,
    logger: Arc<dyn ConversationLogger>,
    caching: bool,
}

impl<G: OracleGateway + 'static> Clone for OracleClient<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            cache: Arc::clone(&self.cache),
            logger: Arc::clone(&self.logger),
            caching: self.caching,
        }
    }
}

impl<G: OracleGateway + 'static> OracleClient<G> {
    pub fn new(
        gateway: Arc<G>,
        cache: Arc<dyn ResponseCache>,
        logger: Arc<dyn ConversationLogger>,
    ) -> Self {
        Self {
            gateway,
            cache,
            logger,
            caching: true,
        }
    }

    /// Bypass the cache entirely.
    pub fn without_cache(mut self) -> Self {
        self.cache = Arc::new(NoCache);
        self.caching = false;
        self
    }

    pub fn logger(&self) -> &dyn ConversationLogger {
        self.logger.as_ref()
    }

    /// Call one oracle, consulting the cache first.
    pub async fn call(
        &self,
        oracle: &OracleSpec,
        phase: Phase,
        prompt: &str,
    ) -> Result<Vec<String>, OracleError> {
        let fingerprint = Fingerprint::of(prompt, &oracle.model, oracle.kind.as_str());

        if let Some(lines) = self.cache.get(&fingerprint) {
            debug!("Cache hit for {} ({})", oracle.name, fingerprint);
            self.logger.log(ConversationEvent::oracle_response(
                &oracle.name,
                &phase,
                prompt,
                &lines,
                true,
            ));
            return Ok(lines);
        }

        match self.gateway.call(oracle, prompt).await {
            Ok(lines) => {
                self.cache.put(&fingerprint, &lines);
                self.logger.log(ConversationEvent::oracle_response(
                    &oracle.name,
                    &phase,
                    prompt,
                    &lines,
                    false,
                ));
                Ok(lines)
            }
            Err(e) => {
                self.logger.log(ConversationEvent::oracle_failure(
                    &oracle.name,
                    &phase,
                    &e.to_string(),
                ));
                Err(e)
            }
        }
    }
}

/// Result of one oracle's call in a fan-out.
pub struct FanOutResult {
    pub oracle: OracleSpec,
    pub response: Result<Vec<String>, OracleError>,
}

/// Send `prompt` to every oracle concurrently.
///
/// Returns one result per oracle in the order given, after all calls have
/// completed or failed. With caching on, oracles sharing a fingerprint
/// (same provider and model) share a single call.
pub async fn fan_out<G: OracleGateway + 'static>(
    client: &OracleClient<G>,
    oracles: &[OracleSpec],
    phase: Phase,
    prompt: &str,
    progress: &dyn ProgressNotifier,
) -> Vec<FanOutResult> {
    progress.on_phase_start(&phase, oracles.len());

    // Index of the oracle whose call answers for each oracle
    let mut leader: Vec<usize> = (0..oracles.len()).collect();
    if client.caching {
        let mut first_by_key: HashMap<(&str, &str), usize> = HashMap::new();
        for (i, oracle) in oracles.iter().enumerate() {
            leader[i] = *first_by_key
                .entry((oracle.kind.as_str(), oracle.model.as_str()))
                .or_insert(i);
        }
    }

    let prompt: Arc<str> = Arc::from(prompt);
    let mut join_set = JoinSet::new();
    for (i, oracle) in oracles.iter().enumerate().filter(|(i, _)| leader[*i] == *i) {
        let client = client.clone();
        let oracle = oracle.clone();
        let prompt = Arc::clone(&prompt);
        join_set.spawn(async move {
            let response = client.call(&oracle, phase, &prompt).await;
            (i, response)
        });
    }

    let mut responses: Vec<Option<Result<Vec<String>, OracleError>>> = vec![None; oracles.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((i, response)) => {
                match &response {
                    Ok(_) => debug!("{} answered ({})", oracles[i].name, phase),
                    Err(e) => warn!("{} failed during {}: {}", oracles[i].name, phase, e),
                }
                responses[i] = Some(response);
            }
            Err(e) => warn!("Task join error: {}", e),
        }
    }

    let results: Vec<FanOutResult> = oracles
        .iter()
        .enumerate()
        .map(|(i, oracle)| {
            let response = responses[leader[i]]
                .clone()
                .unwrap_or_else(|| Err(OracleError::Transient("oracle task aborted".to_string())));
            progress.on_task_complete(&phase, &oracle.name, response.is_ok());
            FanOutResult {
                oracle: oracle.clone(),
                response,
            }
        })
        .collect();

    progress.on_phase_complete(&phase);
    results
}

/// Failure record for the report, when the call failed.
pub(crate) fn failure_of(result: &FanOutResult, phase: &Phase) -> Option<OracleFailure> {
    result
        .response
        .as_ref()
        .err()
        .map(|e| {
            OracleFailure::new(result.oracle.name.clone(), phase.to_string(), e.to_string())
        })
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-memory gateway and cache shared by the use case tests.

    use super::*;
    use crate::ports::conversation_logger::NoConversationLogger;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Script = VecDeque<Result<Vec<String>, OracleError>>;

    /// Gateway answering from per-oracle scripts. An oracle whose script is
    /// exhausted repeats its last answer.
    #[derive(Default)]
    pub struct ScriptedGateway {
        scripts: Mutex<HashMap<String, Script>>,
        last: Mutex<HashMap<String, Result<Vec<String>, OracleError>>>,
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn script(self, oracle: &str, answers: Vec<Result<&str, OracleError>>) -> Self {
            let script = answers
                .into_iter()
                .map(|a| a.map(|text| text.lines().map(str::to_string).collect()))
                .collect();
            self.scripts.lock().unwrap().insert(oracle.to_string(), script);
            self
        }

        pub fn call_count(&self, oracle: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(o, _)| o == oracle)
                .count()
        }

        pub fn prompts(&self, oracle: &str) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(o, _)| o == oracle)
                .map(|(_, p)| p.clone())
                .collect()
        }
    }

    #[async_trait]
    impl OracleGateway for ScriptedGateway {
        async fn call(
            &self,
            oracle: &OracleSpec,
            prompt: &str,
        ) -> Result<Vec<String>, OracleError> {
            let name = oracle.name.to_string();
            self.calls.lock().unwrap().push((name.clone(), prompt.to_string()));

            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&name)
                .and_then(|s| s.pop_front());
            let mut last = self.last.lock().unwrap();
            match next {
                Some(answer) => {
                    last.insert(name, answer.clone());
                    answer
                }
                None => last
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(|| Err(OracleError::Auth(format!("no script for {}", name)))),
            }
        }
    }

    #[derive(Default)]
    pub struct MemoryCache {
        entries: Mutex<HashMap<Fingerprint, Vec<String>>>,
    }

    impl ResponseCache for MemoryCache {
        fn get(&self, fingerprint: &Fingerprint) -> Option<Vec<String>> {
            self.entries.lock().unwrap().get(fingerprint).cloned()
        }

        fn put(&self, fingerprint: &Fingerprint, lines: &[String]) {
            self.entries.lock().unwrap().insert(fingerprint.clone(), lines.to_vec());
        }
    }

    pub fn client(gateway: Arc<ScriptedGateway>) -> OracleClient<ScriptedGateway> {
        OracleClient::new(
            gateway,
            Arc::new(MemoryCache::default()),
            Arc::new(NoConversationLogger),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::ports::progress::NoProgress;
    use celltype_domain::{Credential, OracleKind};

    fn oracle(kind: OracleKind, model: &str) -> OracleSpec {
        OracleSpec::new(kind, model, Credential::new("key"))
    }

    #[tokio::test]
    async fn test_fan_out_preserves_oracle_order() {
        let gateway = Arc::new(
            ScriptedGateway::new()
                .script("a", vec![Ok("T cells")])
                .script("b", vec![Err(OracleError::Auth("401".into()))])
                .script("c", vec![Ok("B cells")]),
        );
        let oracles = vec![
            oracle(OracleKind::OpenAi, "a"),
            oracle(OracleKind::Anthropic, "b"),
            oracle(OracleKind::Gemini, "c"),
        ];

        let results =
            fan_out(&client(gateway), &oracles, Phase::Annotation, "p", &NoProgress).await;

        let names: Vec<_> = results.iter().map(|r| r.oracle.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(results[0].response.is_ok());
        assert!(results[1].response.is_err());
        assert_eq!(results[2].response.as_ref().unwrap(), &vec!["B cells".to_string()]);
    }

    #[tokio::test]
    async fn test_cache_prevents_repeat_calls() {
        let gateway = Arc::new(ScriptedGateway::new().script("a", vec![Ok("T cells")]));
        let client = client(Arc::clone(&gateway));
        let a = oracle(OracleKind::OpenAi, "a");

        client.call(&a, Phase::Annotation, "same prompt").await.unwrap();
        client.call(&a, Phase::Annotation, "same prompt").await.unwrap();
        assert_eq!(gateway.call_count("a"), 1);

        client.call(&a, Phase::Annotation, "other prompt").await.unwrap();
        assert_eq!(gateway.call_count("a"), 2);
    }

    #[tokio::test]
    async fn test_without_cache_always_calls() {
        let gateway = Arc::new(ScriptedGateway::new().script("a", vec![Ok("T cells")]));
        let client = client(Arc::clone(&gateway)).without_cache();
        let a = oracle(OracleKind::OpenAi, "a");

        client.call(&a, Phase::Annotation, "p").await.unwrap();
        client.call(&a, Phase::Annotation, "p").await.unwrap();
        assert_eq!(gateway.call_count("a"), 2);
    }

    #[tokio::test]
    async fn test_shared_fingerprint_called_once() {
        let gateway = Arc::new(ScriptedGateway::new().script("gpt-4.1", vec![Ok("NK cells")]));
        let oracles = vec![
            oracle(OracleKind::OpenAi, "gpt-4.1"),
            oracle(OracleKind::OpenAi, "gpt-4.1").with_name("gpt-4.1-again"),
        ];

        let client = client(Arc::clone(&gateway));
        let results = fan_out(&client, &oracles, Phase::Annotation, "p", &NoProgress).await;
        assert_eq!(gateway.calls.lock().unwrap().len(), 1);
        assert!(results.iter().all(|r| r.response.is_ok()));
    }
}
