//! Send the user a password reset link for their member account.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    assistants::runs::{Run, ToolCall},
    Result,
};

use super::parse_arguments;

pub const NAME: &str = "reset_password";
pub const DESCRIPTION: &str = "Call api to reset the password of the user.";

const RESET_URL: &str = "https://google.com";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
pub struct ResetPasswordArgs {
    /// 会员帐号
    #[serde(rename = "clientId")]
    pub client_id: String,
}

pub async fn execute(_run: &Run, call: &ToolCall) -> Result<String> {
    let args: ResetPasswordArgs = parse_arguments(NAME, &call.function.arguments)?;

    Ok(format!(
        "請點擊 {RESET_URL}?clientId={} 重新設定密碼",
        args.client_id
    ))
}
