//! Remoting API model
//!
//! The published description of every remotable operation, grouped by
//! handler. Rendering it into the client-side descriptor text is left to
//! the publishing endpoint; this model only serializes to JSON.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::runtime::{CallDescriptor, DescriptorCache, ParameterSummary};

/// One published operation of a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_handler: Option<bool>,
}

impl Action {
    pub fn positional(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len: Some(len),
            params: None,
            form_handler: None,
        }
    }

    pub fn named(name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            len: None,
            params: Some(params),
            form_handler: None,
        }
    }

    pub fn form_handler(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            len: Some(0),
            params: None,
            form_handler: Some(true),
        }
    }
}

/// A POLL operation, published separately from the actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollingProvider {
    pub action: String,
    pub method: String,
    pub event: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotingApi {
    actions: BTreeMap<String, Vec<Action>>,
    polling_providers: Vec<PollingProvider>,
}

impl RemotingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the API from every cached descriptor matching `group`.
    ///
    /// `group` is a comma-separated list; `None` includes everything.
    pub fn from_descriptors(cache: &DescriptorCache, group: Option<&str>) -> Self {
        let mut api = RemotingApi::new();
        for (_, descriptor) in cache.entries() {
            if descriptor.matches_group(group) {
                api.add(&descriptor);
            }
        }
        api
    }

    /// Adds the published form of `descriptor`.
    pub fn add(&mut self, descriptor: &CallDescriptor) {
        let name = descriptor.method().to_string();
        let action = match descriptor.summary() {
            ParameterSummary::Count(len) => Action::positional(name, *len),
            ParameterSummary::Names(params) => Action::named(name, params.clone()),
            ParameterSummary::FormHandler => Action::form_handler(name),
            ParameterSummary::Poll { event } => {
                self.polling_providers.push(PollingProvider {
                    action: descriptor.handler().to_string(),
                    method: name,
                    event: event.clone(),
                });
                return;
            }
        };
        self.add_action(descriptor.handler(), action);
    }

    pub fn add_action(&mut self, handler: &str, action: Action) {
        self.actions.entry(handler.to_string()).or_default().push(action);
    }

    pub fn actions(&self) -> &BTreeMap<String, Vec<Action>> {
        &self.actions
    }

    pub fn polling_providers(&self) -> &[PollingProvider] {
        &self.polling_providers
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.polling_providers.is_empty()
    }
}
