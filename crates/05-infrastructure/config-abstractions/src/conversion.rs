//! 属性值类型转换

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use infrastructure_common::{PropertyError, PropertyResult, TypeInfo};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 从属性字符串转换为具体类型
///
/// 转换失败时返回失败原因，由调用方补充键与值组成 [`PropertyError::ConversionFailed`]。
pub trait FromPropertyValue: Sized {
    /// 执行转换
    fn from_property_value(value: &str) -> Result<Self, String>;
}

impl FromPropertyValue for String {
    fn from_property_value(value: &str) -> Result<Self, String> {
        Ok(value.to_string())
    }
}

impl FromPropertyValue for bool {
    /// 不区分大小写的 `true` 为真，其余一律为假
    fn from_property_value(value: &str) -> Result<Self, String> {
        Ok(value.eq_ignore_ascii_case("true"))
    }
}

macro_rules! impl_from_str_conversion {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromPropertyValue for $ty {
                fn from_property_value(value: &str) -> Result<Self, String> {
                    value.trim().parse::<$ty>().map_err(|e| e.to_string())
                }
            }
        )*
    };
}

impl_from_str_conversion!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl FromPropertyValue for Duration {
    fn from_property_value(value: &str) -> Result<Self, String> {
        parse_duration(value)
    }
}

impl FromPropertyValue for Vec<String> {
    fn from_property_value(value: &str) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(value.split(',').map(|item| item.trim().to_string()).collect())
    }
}

impl FromPropertyValue for NaiveDate {
    fn from_property_value(value: &str) -> Result<Self, String> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| e.to_string())
    }
}

impl FromPropertyValue for NaiveTime {
    fn from_property_value(value: &str) -> Result<Self, String> {
        let value = value.trim();
        NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
            .map_err(|e| e.to_string())
    }
}

impl FromPropertyValue for NaiveDateTime {
    fn from_property_value(value: &str) -> Result<Self, String> {
        let value = value.trim();
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
            .map_err(|e| e.to_string())
    }
}

impl FromPropertyValue for DateTime<FixedOffset> {
    /// RFC 3339，如 `2023-03-29T21:45:01+08:00`
    fn from_property_value(value: &str) -> Result<Self, String> {
        DateTime::parse_from_rfc3339(value.trim()).map_err(|e| e.to_string())
    }
}

/// 解析时长
///
/// 支持 ISO-8601 形式 `PnDTnHnMnS`（秒可以带小数），其余交给 `humantime`，
/// 如 `500ms`、`1h 30m`。
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("时长不能为空".to_string());
    }

    let upper = value.to_ascii_uppercase();
    if let Some(iso) = upper.strip_prefix('P') {
        return parse_iso_duration(iso).ok_or_else(|| format!("无效的 ISO-8601 时长: {value}"));
    }

    humantime::parse_duration(value).map_err(|e| format!("无效的时长: {value}, {e}"))
}

fn parse_iso_duration(body: &str) -> Option<Duration> {
    if body.is_empty() {
        return None;
    }

    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                return None;
            }
            (date, Some(time))
        }
        None => (body, None),
    };

    let mut seconds = 0f64;
    for (amount, unit) in iso_components(date_part)? {
        seconds += match unit {
            'D' => amount * 86_400.0,
            _ => return None,
        };
    }
    if let Some(time_part) = time_part {
        for (amount, unit) in iso_components(time_part)? {
            seconds += match unit {
                'H' => amount * 3_600.0,
                'M' => amount * 60.0,
                'S' => amount,
                _ => return None,
            };
        }
    }

    Duration::try_from_secs_f64(seconds).ok()
}

fn iso_components(part: &str) -> Option<Vec<(f64, char)>> {
    let mut components = Vec::new();
    let mut number = String::new();
    for ch in part.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            number.push(ch);
        } else {
            if number.is_empty() {
                return None;
            }
            components.push((number.parse::<f64>().ok()?, ch));
            number.clear();
        }
    }
    if !number.is_empty() {
        return None;
    }
    Some(components)
}

/// 带键信息的类型化转换
pub fn convert_property<T: FromPropertyValue>(key: &str, value: &str) -> PropertyResult<T> {
    T::from_property_value(value).map_err(|reason| PropertyError::ConversionFailed {
        key: key.to_string(),
        value: value.to_string(),
        type_name: std::any::type_name::<T>().to_string(),
        reason,
    })
}

/// 擦除后的转换函数
pub type Converter = Arc<dyn Fn(&str) -> Result<Box<dyn Any + Send + Sync>, String> + Send + Sync>;

/// 运行时转换服务
///
/// 按目标类型的 [`TypeId`] 查找转换函数，支撑配置值注入。
#[derive(Clone)]
pub struct ConversionService {
    converters: HashMap<TypeId, Converter>,
}

impl ConversionService {
    /// 创建空的转换服务
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// 注册一个基于 [`FromPropertyValue`] 的转换
    pub fn register<T>(&mut self) -> &mut Self
    where
        T: FromPropertyValue + Send + Sync + 'static,
    {
        self.register_with::<T, _>(T::from_property_value)
    }

    /// 注册自定义转换函数
    pub fn register_with<T, F>(&mut self, converter: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&str) -> Result<T, String> + Send + Sync + 'static,
    {
        self.converters.insert(
            TypeId::of::<T>(),
            Arc::new(move |value: &str| {
                converter(value).map(|converted| Box::new(converted) as Box<dyn Any + Send + Sync>)
            }),
        );
        self
    }

    /// 是否支持目标类型
    pub fn supports(&self, target: &TypeInfo) -> bool {
        self.converters.contains_key(&target.id)
    }

    /// 转换为目标类型
    pub fn convert(
        &self,
        key: &str,
        value: &str,
        target: &TypeInfo,
    ) -> PropertyResult<Box<dyn Any + Send + Sync>> {
        let converter =
            self.converters
                .get(&target.id)
                .ok_or_else(|| PropertyError::UnsupportedConversion {
                    type_name: target.name.to_string(),
                })?;

        converter(value).map_err(|reason| PropertyError::ConversionFailed {
            key: key.to_string(),
            value: value.to_string(),
            type_name: target.name.to_string(),
            reason,
        })
    }
}

impl Default for ConversionService {
    /// 包含所有内置类型的转换
    fn default() -> Self {
        let mut service = Self::empty();
        service
            .register::<String>()
            .register::<bool>()
            .register::<i8>()
            .register::<i16>()
            .register::<i32>()
            .register::<i64>()
            .register::<i128>()
            .register::<isize>()
            .register::<u8>()
            .register::<u16>()
            .register::<u32>()
            .register::<u64>()
            .register::<u128>()
            .register::<usize>()
            .register::<f32>()
            .register::<f64>()
            .register::<Duration>()
            .register::<Vec<String>>()
            .register::<NaiveDate>()
            .register::<NaiveTime>()
            .register::<NaiveDateTime>()
            .register::<DateTime<FixedOffset>>();
        service
    }
}

impl std::fmt::Debug for ConversionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionService")
            .field("converters", &self.converters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_is_lenient() {
        assert!(bool::from_property_value("TRUE").unwrap());
        assert!(bool::from_property_value("true").unwrap());
        assert!(!bool::from_property_value("yes").unwrap());
        assert!(!bool::from_property_value("").unwrap());
    }

    #[test]
    fn test_iso_duration() {
        let cleanup = parse_duration("P2DT8H21M").unwrap();
        assert_eq!(cleanup, Duration::from_secs(((2 * 24 + 8) * 60 + 21) * 60));
        assert_eq!(parse_duration("PT0.5S").unwrap(), Duration::from_millis(500));
        assert!(parse_duration("P").is_err());
        assert!(parse_duration("PT").is_err());
        assert!(parse_duration("P1H").is_err());
    }

    #[test]
    fn test_shorthand_duration() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7_200));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5_400));
        assert_eq!(parse_duration("2min 5s").unwrap(), Duration::from_secs(125));
        assert!(parse_duration("10 parsecs").is_err());
        assert!(parse_duration("ms").is_err());
    }

    #[test]
    fn test_temporal_values() {
        let started = NaiveDateTime::from_property_value("2023-03-29T21:45:01").unwrap();
        assert_eq!(started.to_string(), "2023-03-29 21:45:01");

        let backup = NaiveTime::from_property_value("03:05:10").unwrap();
        assert_eq!(backup, NaiveTime::from_hms_opt(3, 5, 10).unwrap());

        let deployed = DateTime::<FixedOffset>::from_property_value("2023-03-29T21:45:01+08:00").unwrap();
        assert_eq!(deployed.offset().local_minus_utc(), 8 * 3_600);
        assert_eq!(deployed.naive_utc().to_string(), "2023-03-29 13:45:01");
        assert!(DateTime::<FixedOffset>::from_property_value("2023-03-29T21:45:01").is_err());
    }

    #[test]
    fn test_list_is_trimmed() {
        let hosts = Vec::<String>::from_property_value("a, b ,c").unwrap();
        assert_eq!(hosts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_convert_property_reports_key() {
        let error = convert_property::<i32>("jdbc.pool-size", "x").unwrap_err();
        match error {
            PropertyError::ConversionFailed { key, value, .. } => {
                assert_eq!(key, "jdbc.pool-size");
                assert_eq!(value, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_conversion_service() {
        let service = ConversionService::default();
        let converted = service
            .convert("jdbc.pool-size", "20", &TypeInfo::of::<i32>())
            .unwrap();
        assert_eq!(converted.downcast_ref::<i32>(), Some(&20));

        struct Unknown;
        assert!(matches!(
            service.convert("k", "v", &TypeInfo::of::<Unknown>()),
            Err(PropertyError::UnsupportedConversion { .. })
        ));
    }

    #[test]
    fn test_custom_converter() {
        #[derive(Debug, PartialEq)]
        struct Port(u16);

        let mut service = ConversionService::empty();
        service.register_with::<Port, _>(|value| {
            value.parse::<u16>().map(Port).map_err(|e| e.to_string())
        });

        let port = service
            .convert("server.port", "8080", &TypeInfo::of::<Port>())
            .unwrap();
        assert_eq!(port.downcast_ref::<Port>(), Some(&Port(8080)));
    }
}
