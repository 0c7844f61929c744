//! Local functions the assistant may call while a run is in progress.
//!
//! The set of tools is closed: every tool is a [`ToolKind`] variant with a
//! typed argument struct, and the declaration sent to the API is generated
//! from that struct.

pub mod human_handoff;
pub mod reset_password;

use schemars::{gen::SchemaSettings, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    assistants::{
        runs::{Run, ToolCall, ToolOutput},
        FunctionDefinition, Tool,
    },
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    SwitchToHumanCustomerService,
    ResetPassword,
}

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::SwitchToHumanCustomerService, ToolKind::ResetPassword];

    /// Function name as declared to the API.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::SwitchToHumanCustomerService => human_handoff::NAME,
            ToolKind::ResetPassword => reset_password::NAME,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ToolKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn declaration(&self) -> Tool {
        let (description, parameters) = match self {
            ToolKind::SwitchToHumanCustomerService => (
                human_handoff::DESCRIPTION,
                parameters_schema::<human_handoff::HandoffArgs>(),
            ),
            ToolKind::ResetPassword => (
                reset_password::DESCRIPTION,
                parameters_schema::<reset_password::ResetPasswordArgs>(),
            ),
        };

        Tool::function(FunctionDefinition {
            name: self.name().to_string(),
            description: Some(description.to_string()),
            parameters: Some(parameters),
        })
    }

    pub async fn execute(&self, run: &Run, call: &ToolCall) -> Result<String> {
        match self {
            ToolKind::SwitchToHumanCustomerService => human_handoff::execute(run, call).await,
            ToolKind::ResetPassword => reset_password::execute(run, call).await,
        }
    }
}

/// The tools an assistant is created with and that tool calls dispatch to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRegistry {
    kinds: Vec<ToolKind>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        ToolRegistry::new(ToolKind::ALL)
    }
}

impl ToolRegistry {
    pub fn new(kinds: impl IntoIterator<Item = ToolKind>) -> Self {
        let mut enabled = Vec::new();
        for kind in kinds {
            if !enabled.contains(&kind) {
                enabled.push(kind);
            }
        }
        ToolRegistry { kinds: enabled }
    }

    pub fn kinds(&self) -> &[ToolKind] {
        &self.kinds
    }

    pub fn declarations(&self) -> Vec<Tool> {
        self.kinds.iter().map(ToolKind::declaration).collect()
    }

    /// Finds the enabled tool a call refers to.
    pub fn resolve(&self, name: &str) -> Result<ToolKind> {
        ToolKind::from_name(name)
            .filter(|kind| self.kinds.contains(kind))
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    pub async fn execute(&self, run: &Run, call: &ToolCall) -> Result<String> {
        let kind = self.resolve(&call.function.name)?;
        debug!(
            run_id = %run.id,
            tool_call_id = %call.id,
            tool = kind.name(),
            arguments = %call.function.arguments,
            "executing tool call"
        );
        kind.execute(run, call).await
    }

    /// Executes a call and pairs the result with the call's id.
    pub async fn answer(&self, run: &Run, call: &ToolCall) -> Result<ToolOutput> {
        let output = self.execute(run, call).await?;
        Ok(ToolOutput {
            tool_call_id: call.id.clone(),
            output,
        })
    }
}

/// Decodes a call's argument string into the tool's argument type.
pub(crate) fn parse_arguments<T: DeserializeOwned>(tool: &str, arguments: &str) -> Result<T> {
    serde_json::from_str(arguments).map_err(|source| Error::ToolArguments {
        tool: tool.to_string(),
        source,
    })
}

/// JSON Schema for a tool's arguments object. Every property is listed as
/// required so the model asks for missing values instead of guessing.
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|settings| {
        settings.inline_subschemas = true;
        settings.option_nullable = false;
        settings.option_add_null_type = false;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();
    let mut schema = serde_json::to_value(root.schema)
        .expect("schemars schemas have string keys and always serialize to JSON");

    if let Value::Object(obj) = &mut schema {
        obj.remove("title");
        obj.remove("description");
        let required: Vec<Value> = match obj.get("properties") {
            Some(Value::Object(properties)) => properties
                .keys()
                .map(|key| Value::String(key.clone()))
                .collect(),
            _ => Vec::new(),
        };
        obj.insert("required".to_string(), Value::Array(required));
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn call(name: &str, arguments: &str) -> ToolCall {
        serde_json::from_value(json!({
            "id": format!("call_{name}"),
            "type": "function",
            "function": { "name": name, "arguments": arguments }
        }))
        .unwrap()
    }

    pub(crate) fn run() -> Run {
        serde_json::from_value(json!({
            "id": "run_1",
            "object": "thread.run",
            "created_at": 1700000000,
            "assistant_id": "asst_1",
            "thread_id": "thread_1",
            "status": "requires_action"
        }))
        .unwrap()
    }

    #[test]
    fn names_round_trip_through_kinds() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("drop_database"), None);
    }

    #[test]
    fn handoff_declaration_requires_all_fields() {
        let Tool::Function { function } = ToolKind::SwitchToHumanCustomerService.declaration() else {
            panic!("expected a function tool");
        };
        assert_eq!(function.name, "switchToHumanCustomerService");
        let parameters = function.parameters.unwrap();
        assert_eq!(parameters["type"], "object");
        let mut required: Vec<_> = parameters["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        required.sort();
        assert_eq!(required, vec!["date", "details", "issue"]);
        assert_eq!(parameters["properties"]["issue"]["type"], "string");
        assert!(parameters["properties"]["issue"]["description"]
            .as_str()
            .unwrap()
            .contains("问题"));
    }

    #[test]
    fn every_declaration_has_an_object_schema() {
        for kind in ToolKind::ALL {
            let Tool::Function { function } = kind.declaration() else {
                panic!("expected a function tool");
            };
            let parameters = function.parameters.unwrap();
            assert_eq!(parameters["type"], "object", "{}", kind.name());
            assert!(parameters.get("title").is_none());
        }
    }

    #[test]
    fn reset_password_declares_client_id() {
        let Tool::Function { function } = ToolKind::ResetPassword.declaration() else {
            panic!("expected a function tool");
        };
        let parameters = function.parameters.unwrap();
        assert_eq!(parameters["required"], json!(["clientId"]));
        assert_eq!(parameters["properties"]["clientId"]["type"], "string");
    }

    #[test]
    fn registry_deduplicates_and_declares_in_order() {
        let registry = ToolRegistry::new([
            ToolKind::ResetPassword,
            ToolKind::ResetPassword,
            ToolKind::SwitchToHumanCustomerService,
        ]);
        assert_eq!(
            registry.kinds(),
            &[ToolKind::ResetPassword, ToolKind::SwitchToHumanCustomerService]
        );
        assert_eq!(registry.declarations().len(), 2);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let registry = ToolRegistry::default();
        let error = registry
            .execute(&run(), &call("drop_database", "{}"))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::UnknownTool(name) if name == "drop_database"));
    }

    #[tokio::test]
    async fn disabled_tool_is_unknown() {
        let registry = ToolRegistry::new([ToolKind::SwitchToHumanCustomerService]);
        let error = registry
            .execute(&run(), &call("reset_password", r#"{"clientId":"u1"}"#))
            .await
            .unwrap_err();
        assert!(matches!(error, Error::UnknownTool(_)));
    }

    #[tokio::test]
    async fn answer_keeps_the_call_id() {
        let registry = ToolRegistry::default();
        let output = registry
            .answer(&run(), &call("reset_password", r#"{"clientId":"u1"}"#))
            .await
            .unwrap();
        assert_eq!(output.tool_call_id, "call_reset_password");
        assert!(output.output.contains("clientId=u1"));
    }
}
