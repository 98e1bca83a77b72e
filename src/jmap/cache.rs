use super::envelope::MethodResponse;

#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Vec<MethodResponse>,
}

impl ResponseCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, response: MethodResponse) -> usize {
        self.entries.push(response);
        self.entries.len() - 1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent response for `call_id` recorded strictly before `before`.
    pub fn lookup(&self, call_id: &str, before: usize) -> Option<&MethodResponse> {
        let end = before.min(self.entries.len());
        self.entries[..end]
            .iter()
            .rev()
            .find(|response| response.call_id == call_id)
    }

    pub fn into_responses(self) -> Vec<MethodResponse> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ResponseCache;
    use crate::jmap::envelope::MethodResponse;

    #[test]
    fn lookup_only_sees_earlier_calls() {
        let mut cache = ResponseCache::default();
        assert_eq!(cache.record(MethodResponse::new("A/get", json!({}), "a")), 0);
        assert_eq!(cache.record(MethodResponse::new("B/get", json!({}), "b")), 1);

        assert!(cache.lookup("a", 0).is_none());
        assert_eq!(cache.lookup("a", 1).map(|r| r.name.as_str()), Some("A/get"));
        assert!(cache.lookup("b", 1).is_none());
        assert!(cache.lookup("missing", 2).is_none());
    }

    #[test]
    fn duplicate_call_ids_resolve_to_the_latest() {
        let mut cache = ResponseCache::with_capacity(3);
        cache.record(MethodResponse::new("A/get", json!({"n": 1}), "x"));
        cache.record(MethodResponse::new("A/get", json!({"n": 2}), "x"));
        cache.record(MethodResponse::new("A/get", json!({"n": 3}), "x"));

        assert_eq!(cache.lookup("x", 2).map(|r| r.payload["n"].clone()), Some(json!(2)));
        assert_eq!(cache.lookup("x", 10).map(|r| r.payload["n"].clone()), Some(json!(3)));
        assert_eq!(cache.into_responses().len(), 3);
    }
}
