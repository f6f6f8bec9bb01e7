use crate::context::FilterContext;
use async_trait::async_trait;
use vigil_core::Result;

/// 通知抑制过滤器
///
/// 返回 `true` 表示拦截，不再生成通知。过滤器只读取检查数据，不做修改。
#[async_trait]
pub trait Filter: Send + Sync {
    async fn block(&self, ctx: &FilterContext<'_>) -> Result<bool>;

    /// 过滤器名称，用于日志
    fn name(&self) -> &'static str;
}
