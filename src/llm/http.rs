//! 三种方言共用的 HTTP 收发：非 2xx 转为带 provider / 状态码 / 响应体的错误

use serde_json::Value;

use crate::core::GatewayError;

/// 发送请求并解析 JSON 响应体
pub(crate) async fn post_json(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<Value, GatewayError> {
    let resp = request.send().await.map_err(|e| GatewayError::Transport {
        provider: provider.to_string(),
        message: e.to_string(),
    })?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| GatewayError::Transport {
        provider: provider.to_string(),
        message: e.to_string(),
    })?;

    if !status.is_success() {
        tracing::warn!(provider, status = status.as_u16(), "backend returned non-success status");
        return Err(GatewayError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

/// 按 JSON pointer 取回复文本；缺失时返回 "{}"（解析后为空 Decision）
pub(crate) fn reply_text(data: &Value, pointer: &str) -> String {
    data.pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or("{}")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text_defaults_to_empty_object() {
        let data = serde_json::json!({"choices": []});
        assert_eq!(reply_text(&data, "/choices/0/message/content"), "{}");
        let data = serde_json::json!({"content": [{"type": "text", "text": "hello"}]});
        assert_eq!(reply_text(&data, "/content/0/text"), "hello");
    }
}
