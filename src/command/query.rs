//! Read-side queries
//!
//! Queries never carry idempotency keys or client state; their responses are
//! authoritative snapshots used to reconcile local projections.

use serde::{Deserialize, Serialize};

use crate::application::pagination::{ConferenceFilter, PageDescriptor, ParticipantFilter};
use crate::command::CommandSpec;
use crate::domain::shared::value_objects::{
    CallControlId, ConferenceId, ConnectionId, FaxId, QueueName, ResourceId,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Query {
    GetCallStatus {
        call_control_id: CallControlId,
    },
    ListCalls {
        connection_id: ConnectionId,
        page: PageDescriptor,
    },
    ListConferences {
        page: PageDescriptor,
        filter: ConferenceFilter,
    },
    ListConferenceParticipants {
        conference_id: ConferenceId,
        page: PageDescriptor,
        filter: ParticipantFilter,
    },
    GetQueue {
        queue_name: QueueName,
    },
    ListQueueCalls {
        queue_name: QueueName,
        page: PageDescriptor,
    },
    GetQueueCall {
        queue_name: QueueName,
        call_control_id: CallControlId,
    },
    GetFax {
        fax_id: FaxId,
    },
}

impl Query {
    pub fn name(&self) -> &'static str {
        match self {
            Query::GetCallStatus { .. } => "get_call_status",
            Query::ListCalls { .. } => "list_calls",
            Query::ListConferences { .. } => "list_conferences",
            Query::ListConferenceParticipants { .. } => "list_conference_participants",
            Query::GetQueue { .. } => "get_queue",
            Query::ListQueueCalls { .. } => "list_queue_calls",
            Query::GetQueueCall { .. } => "get_queue_call",
            Query::GetFax { .. } => "get_fax",
        }
    }

    /// The single resource a query addresses; `None` for cross-resource
    /// listings.
    pub fn target(&self) -> Option<ResourceId> {
        match self {
            Query::GetCallStatus { call_control_id } => {
                Some(ResourceId::Call(call_control_id.clone()))
            }
            Query::ListCalls { .. } | Query::ListConferences { .. } => None,
            Query::ListConferenceParticipants { conference_id, .. } => {
                Some(ResourceId::Conference(conference_id.clone()))
            }
            Query::GetQueue { queue_name }
            | Query::ListQueueCalls { queue_name, .. }
            | Query::GetQueueCall { queue_name, .. } => {
                Some(ResourceId::Queue(queue_name.clone()))
            }
            Query::GetFax { fax_id } => Some(ResourceId::Fax(fax_id.clone())),
        }
    }

    pub fn spec(&self) -> CommandSpec {
        match self {
            Query::GetCallStatus { call_control_id } => {
                CommandSpec::get(format!("/calls/{call_control_id}"))
            }
            Query::ListCalls {
                connection_id,
                page,
            } => CommandSpec::get(format!("/connections/{connection_id}/active_calls"))
                .with_query(page.query_params()),
            Query::ListConferences { page, filter } => {
                let mut params = filter.query_params();
                params.extend(page.query_params());
                CommandSpec::get("/conferences").with_query(params)
            }
            Query::ListConferenceParticipants {
                conference_id,
                page,
                filter,
            } => {
                let mut params = filter.query_params();
                params.extend(page.query_params());
                CommandSpec::get(format!("/conferences/{conference_id}/participants"))
                    .with_query(params)
            }
            Query::GetQueue { queue_name } => CommandSpec::get(format!("/queues/{queue_name}")),
            Query::ListQueueCalls { queue_name, page } => {
                CommandSpec::get(format!("/queues/{queue_name}/calls"))
                    .with_query(page.query_params())
            }
            Query::GetQueueCall {
                queue_name,
                call_control_id,
            } => CommandSpec::get(format!("/queues/{queue_name}/calls/{call_control_id}")),
            Query::GetFax { fax_id } => CommandSpec::get(format!("/faxes/{fax_id}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::domain::conference::ConferenceStatus;

    #[test]
    fn test_list_conferences_query_params() {
        let config = EngineConfig::default();
        let query = Query::ListConferences {
            page: PageDescriptor::new(Some(2), Some(50), &config).unwrap(),
            filter: ConferenceFilter {
                name: None,
                status: Some(ConferenceStatus::InProgress),
            },
        };
        let spec = query.spec();
        assert_eq!(spec.path, "/conferences");
        assert_eq!(
            spec.query,
            vec![
                ("filter[status]".to_string(), "in_progress".to_string()),
                ("page[number]".to_string(), "2".to_string()),
                ("page[size]".to_string(), "50".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_calls_paging() {
        let config = EngineConfig::default();
        let query = Query::ListCalls {
            connection_id: ConnectionId::new("c1"),
            page: PageDescriptor::first(&config),
        };
        let spec = query.spec();
        assert_eq!(spec.path, "/connections/c1/active_calls");
        assert_eq!(
            spec.query,
            vec![
                ("page[number]".to_string(), "1".to_string()),
                ("page[size]".to_string(), "20".to_string()),
            ]
        );
        assert_eq!(query.target(), None);
    }

    #[test]
    fn test_get_queue_call_path() {
        let query = Query::GetQueueCall {
            queue_name: QueueName::new("support"),
            call_control_id: CallControlId::new("v3:leg-a"),
        };
        assert_eq!(query.spec().path, "/queues/support/calls/v3:leg-a");
        assert_eq!(
            query.target(),
            Some(ResourceId::Queue(QueueName::new("support")))
        );
    }

    #[test]
    fn test_same_query_renders_same_url() {
        let config = EngineConfig::default();
        let build = || Query::ListQueueCalls {
            queue_name: QueueName::new("support"),
            page: PageDescriptor::new(None, None, &config).unwrap(),
        };
        assert_eq!(build().spec().query, build().spec().query);
    }
}
