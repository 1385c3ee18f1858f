//! Event types for the SPK-Track event system
//!
//! Serialized onto SSE streams so open screens can refetch instead of
//! polling.

use serde::{Deserialize, Serialize};

/// SPK-Track event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpkEvent {
    /// The merged status view was rebuilt
    StatusViewUpdated {
        row_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One persisted collection changed
    CollectionChanged {
        key: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl SpkEvent {
    /// SSE event name for this variant
    pub fn event_name(&self) -> &'static str {
        match self {
            SpkEvent::StatusViewUpdated { .. } => "StatusViewUpdated",
            SpkEvent::CollectionChanged { .. } => "CollectionChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = SpkEvent::StatusViewUpdated {
            row_count: 3,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StatusViewUpdated");
        assert_eq!(json["row_count"], 3);
    }
}
