//! Hand the conversation over to a human agent, once the user has said what
//! went wrong, when, and on which order or game.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    assistants::runs::{Run, ToolCall},
    Result,
};

use super::parse_arguments;

pub const NAME: &str = "switchToHumanCustomerService";
pub const DESCRIPTION: &str = "转接人工客服，当任一参数未提供时必须请客户提供。";

/// Value the model fills in when it could not find an answer.
pub const PLACEHOLDER: &str = "未提供";

pub const CLARIFICATION: &str =
    "为了确保人工客服能高效解决您的问题，请先告诉我们您遇到的具体问题或您希望咨询的详细情况。";
pub const TRANSFERRING: &str = "将转接至人工客服";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct HandoffArgs {
    /// 使用者遇到的问题。如果无法明确的找到数值请询问使用者。
    pub issue: Option<String>,
    /// 交易或问题发生时间。如果无法明确的找到数值请询问使用者。
    pub date: Option<String>,
    /// 订单号、提款方式或游戏名称。如果无法明确的找到数值请询问使用者。
    pub details: Option<String>,
}

impl HandoffArgs {
    /// True when every field is present, non-empty and not the placeholder.
    pub fn is_complete(&self) -> bool {
        [&self.issue, &self.date, &self.details]
            .into_iter()
            .all(|field| matches!(field.as_deref(), Some(value) if !value.is_empty() && value != PLACEHOLDER))
    }
}

pub async fn execute(_run: &Run, call: &ToolCall) -> Result<String> {
    if call.function.arguments.trim().is_empty() {
        return Ok(CLARIFICATION.to_string());
    }

    let args: HandoffArgs = parse_arguments(NAME, &call.function.arguments)?;
    if !args.is_complete() {
        return Ok(CLARIFICATION.to_string());
    }

    Ok(TRANSFERRING.to_string())
}
