//! Resource interception policy.
//!
//! A policy is a set of immutable [`InterceptionRule`]s deciding, per
//! outgoing request, whether the browser may fetch it. Evaluation order:
//!
//! 1. domain `block` rules deny any URL they match, unconditionally
//! 2. domain `unblock` rules, when present, deny URLs outside their list
//! 3. resource-type `block` rules deny the listed types
//! 4. resource-type `unblock` rules allow the listed types and deny the rest
//! 5. with no resource-type allow-list declared, the request is allowed

use crate::error::{Result, ScrapeError};
use headless_chrome::browser::tab::RequestPausedDecision;
use headless_chrome::browser::transport::{SessionId, Transport};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::{FailRequest, RequestPattern, RequestStage};
use headless_chrome::protocol::cdp::Network::ErrorReason;
use headless_chrome::Tab;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMode {
    Block,
    Unblock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Domain,
    ResourceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptionRule {
    kind: MatchKind,
    mode: RuleMode,
    values: BTreeSet<String>,
}

impl InterceptionRule {
    pub fn new<I, S>(kind: MatchKind, mode: RuleMode, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values
            .into_iter()
            .map(Into::into)
            .map(|v: String| match kind {
                MatchKind::Domain => v.trim().to_string(),
                MatchKind::ResourceType => v.trim().to_ascii_lowercase(),
            })
            .filter(|v| !v.is_empty())
            .collect();
        Self { kind, mode, values }
    }

    pub fn block_domains<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MatchKind::Domain, RuleMode::Block, values)
    }

    pub fn allow_resources<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MatchKind::ResourceType, RuleMode::Unblock, values)
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    pub fn mode(&self) -> RuleMode {
        self.mode
    }

    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    fn matches(&self, url: &str, resource_type: &str) -> bool {
        match self.kind {
            MatchKind::Domain => self.values.iter().any(|v| domain_matches(url, v)),
            MatchKind::ResourceType => self.values.contains(resource_type),
        }
    }
}

/// An ordered, immutable rule set. Cheap to share across sessions behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterceptionPolicy {
    rules: Vec<InterceptionRule>,
}

impl InterceptionPolicy {
    /// A policy with no rules; every request is allowed.
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn new(rules: Vec<InterceptionRule>) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, rule: InterceptionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[InterceptionRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn evaluate(&self, url: &str, resource_type: &str) -> Decision {
        let resource_type = resource_type.to_ascii_lowercase();
        let of = |kind: MatchKind, mode: RuleMode| {
            self.rules
                .iter()
                .filter(move |r| r.kind == kind && r.mode == mode)
        };

        if of(MatchKind::Domain, RuleMode::Block).any(|r| r.matches(url, &resource_type)) {
            return Decision::Deny;
        }

        let mut domain_allow = of(MatchKind::Domain, RuleMode::Unblock).peekable();
        if domain_allow.peek().is_some() && !domain_allow.any(|r| r.matches(url, &resource_type)) {
            return Decision::Deny;
        }

        if of(MatchKind::ResourceType, RuleMode::Block).any(|r| r.matches(url, &resource_type)) {
            return Decision::Deny;
        }

        let mut resource_allow = of(MatchKind::ResourceType, RuleMode::Unblock).peekable();
        if resource_allow.peek().is_none() {
            return Decision::Allow;
        }
        if resource_allow.any(|r| r.matches(url, &resource_type)) {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    pub fn allows(&self, url: &str, resource_type: &str) -> bool {
        self.evaluate(url, resource_type) == Decision::Allow
    }
}

/// `value` matches when the URL starts with it, or when it names the URL's
/// host or a parent domain of it.
fn domain_matches(url: &str, value: &str) -> bool {
    if url.starts_with(value) {
        return true;
    }
    let value = value.trim_start_matches("*.").trim_start_matches('.');
    match url_host(url) {
        Some(host) => {
            host.eq_ignore_ascii_case(value)
                || host
                    .to_ascii_lowercase()
                    .ends_with(&format!(".{}", value.to_ascii_lowercase()))
        }
        None => false,
    }
}

fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map(|(_, r)| r)?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let authority = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = authority.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRuleConfig {
    pub method: RuleMode,
    #[serde(default)]
    pub value: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRuleConfig {
    pub method: RuleMode,
    #[serde(rename = "type", default)]
    pub types: Vec<String>,
}

/// Adapter-facing serialized form:
/// `{ domains?: {method, value: [..]}, resource?: {method, type: [..]} }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<DomainRuleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRuleConfig>,
}

impl From<PolicyConfig> for InterceptionPolicy {
    fn from(config: PolicyConfig) -> Self {
        let mut rules = Vec::new();
        if let Some(domains) = config.domains {
            rules.push(InterceptionRule::new(
                MatchKind::Domain,
                domains.method,
                domains.value,
            ));
        }
        if let Some(resource) = config.resource {
            rules.push(InterceptionRule::new(
                MatchKind::ResourceType,
                resource.method,
                resource.types,
            ));
        }
        Self { rules }
    }
}

/// CDP resource types serialize as `"Document"`, `"XHR"`, ...; the policy
/// compares lowercase names.
fn resource_type_name(event: &RequestPausedEvent) -> String {
    serde_json::to_value(&event.params.resource_Type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| "other".to_string())
}

/// Gate every request of `tab` through `policy`. Must be called before the
/// first navigation.
pub(crate) fn install(tab: &Tab, policy: Arc<InterceptionPolicy>, debug: bool) -> Result<()> {
    if policy.is_empty() {
        return Ok(());
    }

    let patterns = vec![RequestPattern {
        url_pattern: Some("*".to_string()),
        resource_Type: None,
        request_stage: Some(RequestStage::Request),
    }];
    tab.enable_fetch(Some(&patterns), None)
        .map_err(|e| ScrapeError::automation("Failed to enable request interception", e))?;

    tab.enable_request_interception(Arc::new(
        move |_transport: Arc<Transport>, _session_id: SessionId, event: RequestPausedEvent| {
            let url = event.params.request.url.clone();
            let resource_type = resource_type_name(&event);

            match policy.evaluate(&url, &resource_type) {
                Decision::Allow => {
                    if debug {
                        log::info!("allow [{}] {}", resource_type, url);
                    }
                    RequestPausedDecision::Continue(None)
                }
                Decision::Deny => {
                    if debug {
                        log::info!("block [{}] {}", resource_type, url);
                    } else {
                        log::debug!("Blocked {} request to {}", resource_type, url);
                    }
                    RequestPausedDecision::Fail(FailRequest {
                        request_id: event.params.request_id,
                        error_reason: ErrorReason::BlockedByClient,
                    })
                }
            }
        },
    ))
    .map_err(|e| ScrapeError::automation("Failed to install request interceptor", e))?;

    Ok(())
}
