//! Conversion between parley messages and Chat Completions messages.
//!
//! Reference: <https://platform.openai.com/docs/api-reference/chat/create>

use parley::{
    ActionCall, ActionDefinition, ActionRegistry, ChatMessage, ConversionError, Message, Params,
    Role,
};

use crate::types::{ChatCompletionMessage, FunctionCall, FunctionSpec, ToolCall, ToolSpec};

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Map a message to the wire form.
///
/// Every turn carries a string except an assistant turn that only calls
/// tools, which carries `null`.
pub(crate) fn from_message(message: &Message) -> ChatCompletionMessage {
    match message {
        Message::Chat(ChatMessage {
            role,
            content,
            actions,
        }) => {
            let content = match role {
                Role::Assistant if !actions.is_empty() => content.clone(),
                _ => Some(content.clone().unwrap_or_default()),
            };
            let tool_calls = (!actions.is_empty()).then(|| actions.iter().map(to_tool_call).collect());
            ChatCompletionMessage {
                role: role_name(*role).to_string(),
                content,
                tool_calls,
                tool_call_id: None,
            }
        }
        Message::ActionResult(result) => ChatCompletionMessage {
            role: "tool".to_string(),
            content: Some(result.result.clone()),
            tool_calls: None,
            tool_call_id: Some(result.id.clone()),
        },
    }
}

fn to_tool_call(call: &ActionCall) -> ToolCall {
    ToolCall {
        id: call.id.clone(),
        kind: "function".to_string(),
        function: FunctionCall {
            name: call.name.clone(),
            arguments: serde_json::Value::Object(call.params.clone()).to_string(),
        },
    }
}

/// Map a wire message back to a parley message.
pub(crate) fn to_message(native: &ChatCompletionMessage) -> Result<Message, ConversionError> {
    let role = match native.role.as_str() {
        "tool" => {
            let id = native
                .tool_call_id
                .clone()
                .ok_or(ConversionError::MissingCorrelationId)?;
            return Ok(Message::action_result(
                id,
                native.content.clone().unwrap_or_default(),
            ));
        }
        "user" => Role::User,
        "assistant" => Role::Assistant,
        "system" => Role::System,
        other => return Err(ConversionError::UnknownRole(other.to_string())),
    };

    let actions = native
        .tool_calls
        .iter()
        .flatten()
        .map(from_tool_call)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Message::chat(role, native.content.clone(), actions))
}

fn from_tool_call(call: &ToolCall) -> Result<ActionCall, ConversionError> {
    let raw = call.function.arguments.trim();
    let params = if raw.is_empty() {
        Params::new()
    } else {
        match serde_json::from_str(raw) {
            Ok(serde_json::Value::Object(params)) => params,
            Ok(other) => {
                return Err(ConversionError::InvalidArguments {
                    id: call.id.clone(),
                    reason: format!("expected an object, got {other}"),
                });
            }
            Err(e) => {
                return Err(ConversionError::InvalidArguments {
                    id: call.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    };
    Ok(ActionCall::new(call.id.clone(), call.function.name.clone(), params))
}

/// The request's `tools` array, in registry order.
pub(crate) fn tool_specs(registry: &ActionRegistry) -> Vec<ToolSpec> {
    registry.definitions().into_iter().map(tool_spec).collect()
}

fn tool_spec(def: ActionDefinition) -> ToolSpec {
    ToolSpec {
        kind: "function",
        function: FunctionSpec {
            name: def.name,
            description: def.description,
            parameters: def.parameters,
        },
    }
}
