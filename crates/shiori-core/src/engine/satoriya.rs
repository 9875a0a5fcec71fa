//! SATORIYA family policy: phrase pools keyed by event name, editable at runtime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::pick;
use crate::error::ShioriResult;
use crate::host::RandomSource;
use crate::protocol::{Request, Response};

/// Number of phrases shown per event in [`PoolStats`].
const STATS_EXAMPLES: usize = 3;

fn default_pools() -> BTreeMap<String, Vec<String>> {
    let pools: [(&str, &[&str]); 4] = [
        ("OnBoot", &["おかえりなさい。", "今日もお疲れ様です。", "お帰りをお待ちしていました。"]),
        ("OnFirstBoot", &["はじめまして。私はナナイと申します。", "よろしくお願いいたします。"]),
        (
            "OnMouseClick",
            &["はい？", "どうされましたか？", "何かご用でしょうか？", "お疲れではありませんか？"],
        ),
        (
            "OnRandom",
            &[
                "...",
                "今日はいい天気ですね。",
                "何か飲み物はいかがですか？",
                "お仕事の調子はいかがですか？",
                "たまには休憩も大切ですよ。",
            ],
        ),
    ];
    pools
        .into_iter()
        .map(|(event, phrases)| (event.to_string(), phrases.iter().map(|p| p.to_string()).collect()))
        .collect()
}

/// Surface shown for an event; `0` when unlisted.
pub fn surface_for(event: &str) -> &'static str {
    match event {
        "OnFirstBoot" => "1",
        "OnMouseClick" => "2",
        "OnClose" => "3",
        _ => "0",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub count: usize,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SatoriyaPolicy {
    pools: BTreeMap<String, Vec<String>>,
}

impl Default for SatoriyaPolicy {
    fn default() -> Self {
        Self { pools: default_pools() }
    }
}

impl SatoriyaPolicy {
    /// Pool hit → random phrase; no pool (or an emptied one) → silent `...` acknowledgement.
    pub fn respond(&self, request: &Request, random: &dyn RandomSource) -> ShioriResult<Response> {
        let event = request.event.as_str();
        match self.pools.get(event).filter(|pool| !pool.is_empty()) {
            Some(pool) => Ok(Response::talk(pick(pool.as_slice(), random)?, surface_for(event), event)),
            None => Ok(Response::talk("...", "0", event)),
        }
    }

    pub fn add_response(&mut self, event: &str, phrase: &str) {
        self.pools.entry(event.to_string()).or_default().push(phrase.to_string());
    }

    /// Remove the first matching phrase. Returns whether one was removed.
    pub fn remove_response(&mut self, event: &str, phrase: &str) -> bool {
        let Some(pool) = self.pools.get_mut(event) else {
            return false;
        };
        match pool.iter().position(|p| p == phrase) {
            Some(index) => {
                pool.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn responses_for(&self, event: &str) -> Vec<String> {
        self.pools.get(event).cloned().unwrap_or_default()
    }

    pub fn all_responses(&self) -> BTreeMap<String, Vec<String>> {
        self.pools.clone()
    }

    pub fn stats(&self) -> BTreeMap<String, PoolStats> {
        self.pools
            .iter()
            .map(|(event, pool)| {
                let stats = PoolStats {
                    count: pool.len(),
                    examples: pool.iter().take(STATS_EXAMPLES).cloned().collect(),
                };
                (event.clone(), stats)
            })
            .collect()
    }

    pub fn pattern_count(&self) -> usize {
        self.pools.len()
    }

    pub fn clear(&mut self) {
        self.pools.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ScriptedRandom;

    fn request(event: &str) -> Request {
        Request::parse(&crate::protocol::build_request(event, &[])).unwrap()
    }

    #[test]
    fn test_pool_hit_uses_surface_table() {
        let policy = SatoriyaPolicy::default();
        let resp = policy.respond(&request("OnMouseClick"), &ScriptedRandom::constant(2)).unwrap();
        assert_eq!(resp.value(), Some("何かご用でしょうか？"));
        assert_eq!(resp.header("Surface"), Some("2"));
        assert_eq!(resp.header("Event"), Some("OnMouseClick"));
    }

    #[test]
    fn test_missing_pool_is_silent_ack() {
        let policy = SatoriyaPolicy::default();
        let resp = policy.respond(&request("OnKeyPress"), &ScriptedRandom::constant(0)).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.value(), Some("..."));
        assert_eq!(resp.header("Surface"), Some("0"));
        assert_eq!(resp.header("Event"), Some("OnKeyPress"));
    }

    #[test]
    fn test_add_and_remove_responses() {
        let mut policy = SatoriyaPolicy::default();
        policy.add_response("OnClose", "さようなら。");
        let resp = policy.respond(&request("OnClose"), &ScriptedRandom::constant(0)).unwrap();
        assert_eq!(resp.value(), Some("さようなら。"));
        assert_eq!(resp.header("Surface"), Some("3"));

        assert!(policy.remove_response("OnClose", "さようなら。"));
        assert!(!policy.remove_response("OnClose", "さようなら。"));
        assert!(!policy.remove_response("OnNothing", "x"));

        let resp = policy.respond(&request("OnClose"), &ScriptedRandom::constant(0)).unwrap();
        assert_eq!(resp.value(), Some("..."));
    }

    #[test]
    fn test_stats_show_at_most_three_examples() {
        let policy = SatoriyaPolicy::default();
        let stats = policy.stats();
        assert_eq!(stats["OnRandom"].count, 5);
        assert_eq!(stats["OnRandom"].examples.len(), 3);
        assert_eq!(stats["OnFirstBoot"].examples.len(), 2);
        assert_eq!(policy.pattern_count(), 4);
    }
}
