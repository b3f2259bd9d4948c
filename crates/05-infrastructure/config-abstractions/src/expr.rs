//! 占位符表达式

use infrastructure_common::{PropertyError, PropertyResult};

/// 占位符表达式 `${key}` 或 `${key:default}`
///
/// 只有整个字符串恰好是一个表达式时才会被识别，表达式在第一个 `:` 处切分。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyExpr {
    /// 引用的键
    pub key: String,
    /// 默认值（可以本身也是表达式）
    pub default_value: Option<String>,
}

impl PropertyExpr {
    /// 解析表达式
    ///
    /// 不是表达式时返回 `Ok(None)`；键为空时返回 [`PropertyError::InvalidExpression`]。
    pub fn parse(input: &str) -> PropertyResult<Option<Self>> {
        let Some(body) = input
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
        else {
            return Ok(None);
        };

        let (key, default_value) = match body.find(':') {
            Some(index) => (&body[..index], Some(body[index + 1..].to_string())),
            None => (body, None),
        };

        if key.is_empty() {
            return Err(PropertyError::InvalidExpression {
                expression: input.to_string(),
            });
        }

        Ok(Some(Self {
            key: key.to_string(),
            default_value,
        }))
    }

    /// 判断字符串是否为表达式（不校验键）
    pub fn is_expression(input: &str) -> bool {
        input.starts_with("${") && input.ends_with('}')
    }
}
