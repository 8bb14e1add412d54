use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// 外部語言模型：單次文字補全
///
/// 實作必須把所有傳輸層錯誤轉成 `ModelUnavailable`、`ModelTimeout`
/// 或 `ModelParseError` 其中之一。
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str, timeout: Duration) -> Result<String>;

    fn model_name(&self) -> &str;
}
