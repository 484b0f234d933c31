use serde::Deserialize;
use utoipa::ToSchema;

use crate::store::QueryResult;

/// 搜索请求参数
#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// 查询文本，描述想要找的图片
    pub query: String,
    /// 返回的结果数量，缺省时使用服务端配置
    pub count: Option<usize>,
}

/// 搜索响应
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct SearchResponse {
    /// 搜索耗时，单位为毫秒
    pub time: u32,
    /// 匹配的图片，按相似度降序排列
    pub result: Vec<QueryResult>,
}
