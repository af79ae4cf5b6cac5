// Copyright 2025 Memophor Labs
// SPDX-License-Identifier: Apache-2.0

//! Pipeline stage agents.
//!
//! Every stage follows the same cache-then-attempt-then-fallback loop: check
//! the result cache, try the stage's real work, and on any failure serve a
//! deterministic local substitute instead of propagating the error. The
//! fallback is cached under the same key, so repeated failures within the
//! TTL window do not retry the provider.
//!
//! Identical inputs make at most one provider call per TTL window. That is a
//! dedup property, not mutual exclusion: two concurrent cold-cache runs for
//! the same key may both call the provider, and the last write wins.

pub mod classification;
pub mod cleaning;
pub mod extraction;
pub mod orchestrator;
pub mod report;
pub mod summary;

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{cache_key, ResultCache};
use crate::model::StageOutput;

#[async_trait]
pub trait StageAgent: Send + Sync {
    type Output: Clone + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Stage identifier; doubles as the cache key namespace.
    fn stage(&self) -> &'static str;

    /// The stage's real work: an external call for cleaning, classification
    /// and summary; local analysis for extraction.
    async fn attempt(&self, input: &str) -> Result<Self::Output>;

    /// Deterministic substitute served when `attempt` fails.
    fn fallback(&self, input: &str) -> Self::Output;

    async fn run(&self, cache: &ResultCache, input: &str) -> StageOutput<Self::Output> {
        let key = cache_key(self.stage(), &input);

        if let Some(cached) = cache.get::<StageOutput<Self::Output>>(&key).await {
            return cached;
        }

        let output = match self.attempt(input).await {
            Ok(value) => StageOutput::provider(value),
            Err(error) => {
                tracing::warn!(stage = self.stage(), %error, "stage failed; serving fallback");
                StageOutput::fallback(self.fallback(input))
            }
        };

        cache.set(&key, &output).await;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StageOrigin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct CountingAgent {
        fail: bool,
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StageAgent for CountingAgent {
        type Output = String;

        fn stage(&self) -> &'static str {
            "counting"
        }

        async fn attempt(&self, input: &str) -> Result<String> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("provider unreachable");
            }
            Ok(format!("real:{input}"))
        }

        fn fallback(&self, input: &str) -> String {
            format!("fallback:{input}")
        }
    }

    fn agent(fail: bool) -> (CountingAgent, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        (
            CountingAgent {
                fail,
                attempts: attempts.clone(),
            },
            attempts,
        )
    }

    #[tokio::test]
    async fn second_run_hits_cache_without_calling_provider() {
        let cache = ResultCache::new(Duration::from_secs(300));
        let (agent, attempts) = agent(false);

        let first = agent.run(&cache, "input").await;
        let second = agent.run(&cache, "input").await;

        assert_eq!(first, second);
        assert_eq!(first.origin, StageOrigin::Provider);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_serves_and_caches_fallback() {
        let cache = ResultCache::new(Duration::from_secs(300));
        let (agent, attempts) = agent(true);

        let first = agent.run(&cache, "input").await;
        let second = agent.run(&cache, "input").await;

        assert_eq!(first.value, "fallback:input");
        assert_eq!(first.origin, StageOrigin::Fallback);
        assert_eq!(second, first);
        assert_eq!(
            attempts.load(Ordering::SeqCst),
            1,
            "cached fallback must not retry the provider within the TTL window"
        );
    }

    #[tokio::test]
    async fn distinct_inputs_use_distinct_keys() {
        let cache = ResultCache::new(Duration::from_secs(300));
        let (agent, attempts) = agent(false);

        agent.run(&cache, "one").await;
        agent.run(&cache, "two").await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entry_triggers_fresh_work() {
        let cache = ResultCache::new(Duration::ZERO);
        let (agent, attempts) = agent(false);

        agent.run(&cache, "input").await;
        agent.run(&cache, "input").await;

        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
