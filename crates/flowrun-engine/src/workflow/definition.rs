//! Workflow and step definitions

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Informational retry cap for a step
///
/// Surfaced on the step execution record as `max_attempts`; the engine itself
/// does not loop retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    #[serde(alias = "maxRetries")]
    pub max_retries: u32,
}

/// One node in a workflow's ordered step sequence, bound to exactly one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step identifier, unique within its workflow
    ///
    /// Missing or empty ids are caught by validation, not deserialization.
    #[serde(default)]
    pub id: String,

    /// Identifier of the agent this step invokes
    ///
    /// Accepts `agent` or `agentId` on input for compatibility with older
    /// definition payloads.
    #[serde(default, alias = "agent", alias = "agentId")]
    pub agent_id: String,

    /// Static input payload, merged with mapped values before invocation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    /// Context key -> dotted context path, overlaid onto the static input
    #[serde(default, alias = "inputMapping", skip_serializing_if = "Option::is_none")]
    pub input_mapping: Option<BTreeMap<String, String>>,

    /// Context key -> dotted output path, written back after the agent returns
    #[serde(default, alias = "outputMapping", skip_serializing_if = "Option::is_none")]
    pub output_mapping: Option<BTreeMap<String, String>>,

    /// Let the workflow proceed past this step's failure
    #[serde(default, alias = "continueOnError")]
    pub continue_on_error: bool,

    /// Informational retry cap surfaced on the step record
    #[serde(default, alias = "retryPolicy", skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
}

impl WorkflowStep {
    /// Create a step binding `id` to `agent_id` with no input or mappings
    pub fn new(id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            input: None,
            input_mapping: None,
            output_mapping: None,
            continue_on_error: false,
            retry_policy: None,
        }
    }

    /// Set the static input payload
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Map a context path into the step input under `key`
    pub fn map_input(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.input_mapping
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), path.into());
        self
    }

    /// Map an output path back into the context under `key`
    pub fn map_output(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.output_mapping
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), path.into());
        self
    }

    /// Allow the workflow to continue past this step's failure
    pub fn continue_on_error(mut self) -> Self {
        self.continue_on_error = true;
        self
    }

    /// Attach an informational retry cap
    pub fn with_retry_policy(mut self, max_retries: u32) -> Self {
        self.retry_policy = Some(RetryPolicy { max_retries });
        self
    }

    fn collect_issues(&self, index: usize, issues: &mut Vec<String>) {
        if self.id.trim().is_empty() {
            issues.push(format!("step {index}: id is required"));
        }
        if self.agent_id.trim().is_empty() {
            issues.push(format!("step {index}: agent reference is required"));
        }
    }
}

/// An ordered sequence of steps with descriptive metadata
///
/// Definitions are immutable between updates; the runner snapshots the
/// definition when an execution starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Caller-supplied unique identifier
    ///
    /// Missing or empty ids are caught by validation, not deserialization.
    #[serde(default)]
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Execution order is definition order; must contain at least one step
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    /// Create a definition with the given id, name, and steps
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        steps: Vec<WorkflowStep>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            author: None,
            category: None,
            tags: vec![],
            steps,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Check the definition against the structural rules
    ///
    /// Rules: non-empty `id` and `name`, at least one step, per-step non-empty
    /// `id` and agent reference, and step ids unique within the workflow.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.id.trim().is_empty() {
            issues.push("id is required".to_string());
        }
        if self.name.trim().is_empty() {
            issues.push("name is required".to_string());
        }
        if self.steps.is_empty() {
            issues.push("workflow must have at least one step".to_string());
        }

        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            step.collect_issues(index, &mut issues);
            if !step.id.trim().is_empty() && !seen.insert(step.id.as_str()) {
                issues.push(format!("step {index}: duplicate step id '{}'", step.id));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }

    /// Merge a partial update into this definition, preserving `id`
    ///
    /// Unspecified fields are retained.
    pub fn apply(&mut self, patch: WorkflowPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(author) = patch.author {
            self.author = Some(author);
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(steps) = patch.steps {
            self.steps = steps;
        }
    }
}

/// Partial update for a workflow definition (merge semantics)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<WorkflowStep>>,
}
