//! Response and prefix caching.
//!
//! Call records are projected with an expected hit rate. Pattern records are
//! projected by how many of the repeated calls would still reach the model.

use std::sync::Arc;

use super::{call_only, input_cost, pattern_only, PREFILL_SHARE};
use crate::error::EngineError;
use crate::fixes::{
    ActionGenerator, Effort, FixAction, FixCategory, FixStrategy, FixTemplate, Metric,
    MetricGenerator, MetricsBuilder, TemplateMeta,
};
use crate::model::{CallRecord, FactorId, PatternRecord, Record, StoryId};

pub(super) fn templates() -> Vec<FixTemplate> {
    vec![
        FixTemplate::new(PREFIX, Arc::new(PrefixCaching)),
        FixTemplate::new(SIMPLE, Arc::new(ResponseCache::simple())),
        FixTemplate::new(LRU, Arc::new(ResponseCache::lru())),
        FixTemplate::new(SEMANTIC, Arc::new(SemanticCache)),
        FixTemplate::new(DISTRIBUTED, Arc::new(DistributedCache)),
        FixTemplate::new(DEDUP, Arc::new(RequestDeduplication)),
    ]
}

/// Whether a call has anything a cache could save.
fn cacheable_call(call: &CallRecord) -> bool {
    !call.is_cache_hit() && (call.total_cost() > 0.0 || call.latency_ms() > 0.0)
}

/// Project a call behind a cache with the given hit rate.
fn project_call(
    template: &'static str,
    call: &CallRecord,
    hit_rate: f64,
    overhead_ms: f64,
) -> Result<Vec<Metric>, EngineError> {
    let mut metrics = MetricsBuilder::new(template);
    if call.total_cost() > 0.0 {
        metrics = metrics.cost(
            "Cost per call",
            call.total_cost(),
            call.total_cost() * (1.0 - hit_rate),
        )?;
    }
    if call.latency_ms() > 0.0 {
        metrics = metrics.latency(
            "Average latency",
            call.latency_ms(),
            call.latency_ms() * (1.0 - hit_rate) + overhead_ms,
        )?;
    }
    metrics.build()
}

/// Project a pattern where only `served` of the repeats reach the model.
///
/// `overhead_ms` is the total added lookup time across all repeats.
fn project_pattern(
    template: &'static str,
    pattern: &PatternRecord,
    served: f64,
    overhead_ms: f64,
) -> Result<Vec<Metric>, EngineError> {
    let repeats = pattern.repeats();
    let mut metrics = MetricsBuilder::new(template).count("LLM Calls", repeats, served)?;
    let unit = pattern.unit_cost();
    if unit > 0.0 {
        metrics = metrics.cost("Total cost", unit * repeats, unit * served)?;
    }
    let latency = pattern.avg_latency_ms();
    if latency > 0.0 {
        metrics = metrics.latency(
            "Total latency",
            latency * repeats,
            latency * served + overhead_ms,
        )?;
    }
    metrics.build()
}

const PREFIX: TemplateMeta = TemplateMeta {
    id: "prompt_prefix_caching",
    title: "Prompt prefix caching",
    subtitle: "Let the provider cache the static system prompt",
    category: FixCategory::Caching,
    effort: Some(Effort::Low),
    stories: &[
        StoryId::Cost,
        StoryId::Cache,
        StoryId::SystemPrompt,
        StoryId::Latency,
    ],
    trigger_factors: &[
        FactorId::CacheablePrefix,
        FactorId::LargeSystemPrompt,
        FactorId::SlowResponse,
    ],
    tradeoffs: &[
        "Prefix must be byte-identical across calls",
        "Cache entries expire after a few minutes idle",
    ],
    benefits: &["No application cache to run", "Works for prompts that never repeat exactly"],
    best_for: "Calls that share a long, static system prompt",
};

/// Cached prefix tokens are billed at this fraction of the input price.
const PREFIX_BILLED: f64 = 0.10;
/// Prefill time saved on the cached share of the prompt.
const PREFIX_PREFILL_CUT: f64 = 0.30;
/// Providers only cache prefixes at least this long.
const PREFIX_MIN_TOKENS: f64 = 1_024.0;

struct PrefixCaching;

impl MetricGenerator for PrefixCaching {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let call = call_only(PREFIX.id, record)?;
        let prompt = call.prompt_tokens();
        if prompt <= 0.0 {
            return Err(EngineError::generator_failed(PREFIX.id, "prompt size unknown"));
        }
        let system = call.system_prompt_tokens().min(prompt);
        let share = system / prompt;
        let discount = 1.0 - PREFIX_BILLED;

        let mut metrics = MetricsBuilder::new(PREFIX.id).tokens(
            "Billed prompt tokens",
            prompt,
            prompt - system * discount,
        )?;
        if call.total_cost() > 0.0 {
            metrics = metrics.cost(
                "Cost per call",
                call.total_cost(),
                call.total_cost() - input_cost(call) * share * discount,
            )?;
        }
        if call.latency_ms() > 0.0 {
            metrics = metrics.latency(
                "Latency",
                call.latency_ms(),
                call.latency_ms() * (1.0 - PREFILL_SHARE * share * PREFIX_PREFILL_CUT),
            )?;
        }
        metrics.build()
    }
}

impl ActionGenerator for PrefixCaching {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "system = [{\"type\": \"text\", \"text\": SYSTEM_PROMPT}]",
            "system = [{\n    \"type\": \"text\",\n    \"text\": SYSTEM_PROMPT,\n    \"cache_control\": {\"type\": \"ephemeral\"},\n}]",
        ))
    }
}

impl FixStrategy for PrefixCaching {
    fn is_applicable(&self, record: &Record) -> bool {
        record.as_call().is_some_and(|c| {
            c.system_prompt_tokens() >= PREFIX_MIN_TOKENS
                && c.prompt_tokens() > 0.0
                && !c.is_cache_hit()
        })
    }
}

const SIMPLE: TemplateMeta = TemplateMeta {
    id: "simple_cache",
    title: "Exact-match response cache",
    subtitle: "Return stored answers for identical prompts",
    category: FixCategory::Caching,
    effort: Some(Effort::Low),
    stories: &[StoryId::Cache, StoryId::Cost, StoryId::Latency],
    trigger_factors: &[
        FactorId::NoCache,
        FactorId::HighWaste,
        FactorId::SlowResponse,
        FactorId::ExpensiveCall,
        FactorId::LatencyOutlier,
    ],
    tradeoffs: &["Stale answers until entries expire", "Unbounded memory without eviction"],
    benefits: &["Cache hits return in milliseconds", "A dictionary and a hash are enough"],
    best_for: "Deterministic prompts that repeat verbatim",
};

const LRU: TemplateMeta = TemplateMeta {
    id: "lru_cache",
    title: "LRU response cache",
    subtitle: "Bounded cache that evicts the least recently used answers",
    category: FixCategory::Caching,
    effort: Some(Effort::Medium),
    stories: &[StoryId::Cache, StoryId::Cost],
    trigger_factors: &[
        FactorId::NoCache,
        FactorId::HighWaste,
        FactorId::HighVolumeRepeats,
    ],
    tradeoffs: &[
        "Needs a size and TTL tuned to the workload",
        "Slightly lower hit rate than an unbounded cache",
    ],
    benefits: &["Memory stays bounded", "Hot prompts stay cached"],
    best_for: "Long-running services with a skewed prompt distribution",
};

/// Exact-match response cache, parameterised by expected hit rate.
struct ResponseCache {
    template: TemplateMeta,
    hit_rate: f64,
    before: &'static str,
    after: &'static str,
}

impl ResponseCache {
    const fn simple() -> Self {
        Self {
            template: SIMPLE,
            hit_rate: 0.65,
            before: "response = client.chat(messages=messages)",
            after: "key = hash_messages(messages)\nif key in cache:\n    return cache[key]\nresponse = client.chat(messages=messages)\ncache[key] = response",
        }
    }

    const fn lru() -> Self {
        Self {
            template: LRU,
            hit_rate: 0.60,
            before: "response = client.chat(messages=messages)",
            after: "cache = TTLCache(maxsize=10_000, ttl=3600)\n\n@cached(cache, key=hash_messages)\ndef complete(messages):\n    return client.chat(messages=messages)",
        }
    }
}

impl MetricGenerator for ResponseCache {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        match record {
            Record::Call(call) => project_call(self.template.id, call, self.hit_rate, 0.0),
            Record::Pattern(pattern) => project_pattern(self.template.id, pattern, 1.0, 0.0),
        }
    }
}

impl ActionGenerator for ResponseCache {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(self.before, self.after))
    }
}

impl FixStrategy for ResponseCache {
    fn is_applicable(&self, record: &Record) -> bool {
        match record {
            Record::Call(call) => cacheable_call(call),
            Record::Pattern(pattern) => pattern.repeat_count >= 2 && !pattern.is_semantic(),
        }
    }
}

const SEMANTIC: TemplateMeta = TemplateMeta {
    id: "semantic_cache",
    title: "Semantic cache",
    subtitle: "Match prompts by embedding similarity",
    category: FixCategory::Caching,
    effort: Some(Effort::High),
    stories: &[StoryId::Cache, StoryId::Cost],
    trigger_factors: &[
        FactorId::SemanticDuplicates,
        FactorId::NoCache,
        FactorId::HighWaste,
    ],
    tradeoffs: &[
        "Every lookup pays for an embedding",
        "A loose similarity threshold returns wrong answers",
    ],
    benefits: &["Catches paraphrased questions an exact cache misses"],
    best_for: "User-facing Q&A where the same question is asked many ways",
};

const SEMANTIC_HIT_RATE: f64 = 0.45;
const EMBEDDING_OVERHEAD_MS: f64 = 30.0;

struct SemanticCache;

impl MetricGenerator for SemanticCache {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        match record {
            Record::Call(call) => {
                project_call(SEMANTIC.id, call, SEMANTIC_HIT_RATE, EMBEDDING_OVERHEAD_MS)
            }
            Record::Pattern(pattern) => {
                let repeats = pattern.repeats();
                let served = (repeats * (1.0 - SEMANTIC_HIT_RATE)).ceil().max(1.0);
                project_pattern(
                    SEMANTIC.id,
                    pattern,
                    served,
                    repeats * EMBEDDING_OVERHEAD_MS,
                )
            }
        }
    }
}

impl ActionGenerator for SemanticCache {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "response = client.chat(messages=messages)",
            "vector = embed(last_user_message(messages))\nhit = store.nearest(vector, min_similarity=0.95)\nif hit:\n    return hit.response\nresponse = client.chat(messages=messages)\nstore.add(vector, response)",
        ))
    }
}

impl FixStrategy for SemanticCache {
    fn is_applicable(&self, record: &Record) -> bool {
        match record {
            Record::Call(call) => cacheable_call(call),
            Record::Pattern(pattern) => pattern.repeat_count >= 2,
        }
    }
}

const DISTRIBUTED: TemplateMeta = TemplateMeta {
    id: "distributed_cache",
    title: "Distributed cache",
    subtitle: "Share cached responses across instances",
    category: FixCategory::Caching,
    effort: Some(Effort::High),
    stories: &[StoryId::Cache, StoryId::Cost, StoryId::Latency],
    trigger_factors: &[FactorId::HighVolumeRepeats, FactorId::NoCache],
    tradeoffs: &["Another service to operate", "Network hop on every lookup"],
    benefits: &["Hits are shared by every replica", "Survives restarts and deploys"],
    best_for: "High-volume prompts served by many replicas",
};

const DISTRIBUTED_MIN_REPEATS: u64 = 20;
const NETWORK_LOOKUP_MS: f64 = 5.0;

struct DistributedCache;

impl MetricGenerator for DistributedCache {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let pattern = pattern_only(DISTRIBUTED.id, record)?;
        let lookups = (pattern.repeats() - 1.0).max(0.0);
        project_pattern(DISTRIBUTED.id, pattern, 1.0, lookups * NETWORK_LOOKUP_MS)
    }
}

impl ActionGenerator for DistributedCache {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "cache = {}  # per process",
            "cache = redis.Redis.from_url(REDIS_URL)\nkey = \"llm:\" + hash_messages(messages)\nif (hit := cache.get(key)) is not None:\n    return decode(hit)\nresponse = client.chat(messages=messages)\ncache.set(key, encode(response), ex=3600)",
        ))
    }
}

impl FixStrategy for DistributedCache {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_pattern()
            .is_some_and(|p| p.repeat_count >= DISTRIBUTED_MIN_REPEATS)
    }
}

const DEDUP: TemplateMeta = TemplateMeta {
    id: "request_deduplication",
    title: "Request deduplication",
    subtitle: "Coalesce identical requests that are in flight together",
    category: FixCategory::Caching,
    effort: Some(Effort::Medium),
    stories: &[StoryId::Cache, StoryId::Cost],
    trigger_factors: &[FactorId::NoCache, FactorId::HighWaste],
    tradeoffs: &["Only helps requests that overlap in time"],
    benefits: &["No stale answers", "Protects the provider from bursts"],
    best_for: "Bursty traffic where many users trigger the same prompt at once",
};

/// Share of repeats that overlap an identical in-flight request.
const IN_FLIGHT_SHARE: f64 = 0.30;
const DEDUP_MIN_REPEATS: u64 = 3;

struct RequestDeduplication;

impl MetricGenerator for RequestDeduplication {
    fn metrics(&self, record: &Record) -> Result<Vec<Metric>, EngineError> {
        let pattern = pattern_only(DEDUP.id, record)?;
        let repeats = pattern.repeats();
        let coalesced = (repeats * IN_FLIGHT_SHARE).round().min(repeats - 1.0).max(0.0);
        project_pattern(DEDUP.id, pattern, repeats - coalesced, 0.0)
    }
}

impl ActionGenerator for RequestDeduplication {
    fn action(&self, _record: &Record) -> Result<FixAction, EngineError> {
        Ok(FixAction::new(
            "response = await client.chat(messages=messages)",
            "key = hash_messages(messages)\nif key not in in_flight:\n    in_flight[key] = asyncio.ensure_future(client.chat(messages=messages))\ntry:\n    response = await in_flight[key]\nfinally:\n    in_flight.pop(key, None)",
        ))
    }
}

impl FixStrategy for RequestDeduplication {
    fn is_applicable(&self, record: &Record) -> bool {
        record
            .as_pattern()
            .is_some_and(|p| p.repeat_count >= DEDUP_MIN_REPEATS)
    }
}
