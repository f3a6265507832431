//! AI-assist dispatch
//!
//! Guard order for one request:
//! 1. `Authorization` header present (401)
//! 2. module and action known and matching (400), checked before any I/O
//! 3. token verified by the auth provider (401)
//! 4. Pro-only action for a non-Pro caller (403)
//! 5. free tier: monthly reset, then one action consumed or 429
//! 6. gateway call and tool-output parsing (429/402/500)
//!
//! A free action consumed in step 5 is handed back if step 6 fails, so a
//! failed call never counts against the allowance.

use lucid_common::activity::{self, NewActivity};
use lucid_common::auth::{bearer_token, AuthError};
use lucid_common::models::Module;
use lucid_common::usage::{self, UsageSummary};
use lucid_common::time;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::actions::{self, ActionSpec};
use crate::error::{AssistError, AssistResult};
use crate::gateway::{extract_tool_output, ChatMessage, ChatRequest};
use crate::AppState;

/// Body of `POST /ai-assist`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistRequest {
    pub module: String,
    pub action: String,
    #[serde(default)]
    pub case_context: Value,
    #[serde(default)]
    pub user_input: Value,
    #[serde(default)]
    pub case_id: Option<Uuid>,
    #[serde(default)]
    pub workspace_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistResponse {
    pub success: bool,
    pub output: Value,
    pub usage: UsageSummary,
}

/// Resolve module and action without touching any backend
pub fn resolve_action(module: &str, action: &str) -> AssistResult<(Module, &'static ActionSpec)> {
    let module: Module = module
        .parse()
        .map_err(|_| AssistError::BadRequest(format!("unknown module '{}'", module)))?;

    let spec = actions::find(action).ok_or_else(|| AssistError::UnknownAction(action.to_string()))?;

    if spec.module != module {
        return Err(AssistError::ActionModuleMismatch {
            action: spec.id.to_string(),
            module: module.to_string(),
        });
    }

    Ok((module, spec))
}

/// Messages sent to the gateway for one request
pub fn build_messages(spec: &ActionSpec, module: Module, request: &AssistRequest) -> Vec<ChatMessage> {
    let system = format!("{}\n\n{}", spec.system_prompt, actions::common_rules());
    let payload = json!({
        "module": module.as_str(),
        "action": spec.id,
        "case_context": request.case_context,
        "user_input": request.user_input,
    });

    vec![ChatMessage::system(system), ChatMessage::user(payload.to_string())]
}

/// Run one AI-assist request end to end
pub async fn dispatch(
    state: &AppState,
    authorization: Option<&str>,
    request: AssistRequest,
) -> AssistResult<AssistResponse> {
    let token = bearer_token(authorization).ok_or(AssistError::MissingToken)?;

    let (module, spec) = resolve_action(&request.module, &request.action)?;

    let user = state.auth.verify(token).await.map_err(|e| match e {
        AuthError::MissingToken | AuthError::InvalidToken => AssistError::Unauthorized,
        AuthError::Unavailable(msg) => AssistError::AuthUnavailable(msg),
    })?;

    let now = time::now();
    let mut subscription = usage::get_or_create_subscription(&state.db, user.id, now).await?;
    let is_pro = subscription.is_pro();

    if spec.is_pro && !is_pro {
        return Err(AssistError::ProRequired(spec.id.to_string()));
    }

    let reservation = if is_pro {
        None
    } else {
        usage::reset_if_new_month(&state.db, &mut subscription, now).await?;

        match usage::try_consume(&state.db, user.id, state.free_monthly_limit, now).await? {
            Some(reservation) => Some(reservation),
            None => {
                let used = usage::get_subscription(&state.db, user.id)
                    .await?
                    .map(|s| s.ai_usage_count)
                    .unwrap_or(subscription.ai_usage_count);
                return Err(AssistError::UsageLimitReached {
                    limit: state.free_monthly_limit,
                    used,
                });
            }
        }
    };

    info!(
        user_id = %user.id,
        module = %module,
        action = spec.id,
        pro = is_pro,
        "Dispatching AI action"
    );

    let output = match call_gateway(state, spec, module, &request).await {
        Ok(output) => output,
        Err(err) => {
            if let Some(reservation) = &reservation {
                if let Err(e) = usage::release(&state.db, reservation, time::now()).await {
                    warn!(user_id = %user.id, "Failed to release AI usage after error: {}", e);
                }
            }
            return Err(err);
        }
    };

    let activity = NewActivity {
        user_id: user.id,
        workspace_id: request.workspace_id,
        case_id: request.case_id,
        module,
        action: spec.id.to_string(),
        metadata: json!({
            "plan": subscription.effective_plan(),
            "model": state.model,
        }),
    };
    if let Err(e) = activity::record(&state.db, &activity, time::now()).await {
        warn!(user_id = %user.id, action = spec.id, "Activity log write failed: {}", e);
    }

    let usage = match usage::get_subscription(&state.db, user.id).await {
        Ok(Some(fresh)) => UsageSummary::for_subscription(&fresh, state.free_monthly_limit),
        Ok(None) | Err(_) => {
            let mut estimate = subscription.clone();
            if reservation.is_some() {
                estimate.ai_usage_count += 1;
            }
            UsageSummary::for_subscription(&estimate, state.free_monthly_limit)
        }
    };

    Ok(AssistResponse {
        success: true,
        output,
        usage,
    })
}

async fn call_gateway(
    state: &AppState,
    spec: &ActionSpec,
    module: Module,
    request: &AssistRequest,
) -> AssistResult<Value> {
    let chat = ChatRequest::for_action(&state.model, spec, build_messages(spec, module, request));
    let response = state.gateway.complete(&chat).await?;
    let output = extract_tool_output(&response, &spec.required_fields())?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(module: &str, action: &str) -> AssistRequest {
        AssistRequest {
            module: module.to_string(),
            action: action.to_string(),
            case_context: json!({ "title": "Quitter Lyon" }),
            user_input: json!("Je crois que c'est définitif."),
            case_id: None,
            workspace_id: None,
        }
    }

    #[test]
    fn test_resolve_known_action() {
        let (module, spec) = resolve_action("IRREVERSA", "clarify_threshold").unwrap();
        assert_eq!(module, Module::Irreversa);
        assert_eq!(spec.id, "clarify_threshold");
    }

    #[test]
    fn test_resolve_unknown_action() {
        let err = resolve_action("nulla", "predict_future").unwrap_err();
        assert!(matches!(err, AssistError::UnknownAction(ref a) if a == "predict_future"));
    }

    #[test]
    fn test_resolve_unknown_module() {
        assert!(matches!(
            resolve_action("astra", "clarify_threshold"),
            Err(AssistError::BadRequest(_))
        ));
    }

    #[test]
    fn test_resolve_module_mismatch() {
        assert!(matches!(
            resolve_action("silva", "clarify_threshold"),
            Err(AssistError::ActionModuleMismatch { .. })
        ));
    }

    #[test]
    fn test_user_message_is_json_payload() {
        let (module, spec) = resolve_action("irreversa", "clarify_threshold").unwrap();
        let messages = build_messages(spec, module, &request("irreversa", "clarify_threshold"));

        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.starts_with(spec.system_prompt));
        assert!(messages[0].content.contains(actions::common_rules()));

        let payload: Value = serde_json::from_str(&messages[1].content).unwrap();
        assert_eq!(payload["module"], "irreversa");
        assert_eq!(payload["action"], "clarify_threshold");
        assert_eq!(payload["case_context"]["title"], "Quitter Lyon");
        assert_eq!(payload["user_input"], "Je crois que c'est définitif.");
    }
}
