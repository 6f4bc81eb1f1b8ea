//! # Query 模块
//!
//! 行过滤与查询。
//!
//! 过滤条件写作类似 SQL `WHERE` 的表达式字符串，解析为 [`Expr`] 后
//! 对实现了 [`Row`] 的行逐行求值。

mod expr;
mod parser;

pub use expr::{CompareOp, EvalError, Expr, Row, Value, evaluate, evaluate_to_bool};
pub use parser::parse_expression;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{AdastraResult, FilterError};

/// 行过滤条件
///
/// 空字符串表示选中所有行。可直接从配置中的字符串反序列化。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Filter {
    source: String,
    expr: Option<Expr>,
}

impl Filter {
    /// 解析过滤条件
    pub fn parse(source: &str) -> Result<Self, FilterError> {
        let expr = if source.trim().is_empty() {
            None
        } else {
            Some(parse_expression(source)?)
        };
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// 选中所有行的过滤条件
    pub fn all() -> Self {
        Self::default()
    }

    /// 原始表达式字符串
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 是否选中所有行
    pub fn is_match_all(&self) -> bool {
        self.expr.is_none()
    }

    /// 判断一行是否被选中
    pub fn matches(&self, row: &impl Row) -> Result<bool, EvalError> {
        match &self.expr {
            Some(expr) => evaluate_to_bool(expr, row),
            None => Ok(true),
        }
    }
}

impl TryFrom<String> for Filter {
    type Error = FilterError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::parse(&source)
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        filter.source
    }
}

/// 过滤行，返回选中行的副本（可能为空）
pub fn filter_rows<R: Row + Clone>(rows: &[R], filter: &Filter) -> Result<Vec<R>, EvalError> {
    let mut selected = Vec::new();
    for row in rows {
        if filter.matches(row)? {
            selected.push(row.clone());
        }
    }
    Ok(selected)
}

/// 查询定义
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// 过滤条件
    #[serde(default, rename = "where")]
    pub filter: Filter,

    /// 输出列（为空时输出全部列）
    #[serde(default)]
    pub columns: Vec<String>,

    /// 分组列；非空时输出分组列加 `count`
    #[serde(default)]
    pub group_by: Vec<String>,

    /// 最多输出的行数
    #[serde(default)]
    pub limit: Option<usize>,
}

/// 分组计数列名
pub const COUNT_COLUMN: &str = "count";

/// 执行查询
///
/// 先过滤，再投影或分组计数（分组按首次出现顺序），最后截断到 `limit`。
pub fn run_query<R: Row>(rows: &[R], spec: &QuerySpec) -> AdastraResult<Vec<Map<String, JsonValue>>> {
    let mut selected = Vec::new();
    for row in rows {
        if spec.filter.matches(row)? {
            selected.push(row);
        }
    }

    let mut output = if spec.group_by.is_empty() {
        selected
            .into_iter()
            .map(|row| project(row, &spec.columns))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        group_count(&selected, &spec.group_by)?
    };

    if let Some(limit) = spec.limit {
        output.truncate(limit);
    }
    Ok(output)
}

fn column_value(row: &impl Row, name: &str) -> Result<Value, EvalError> {
    row.column(name).ok_or_else(|| EvalError::UnknownColumn {
        name: name.to_string(),
    })
}

fn project(row: &impl Row, columns: &[String]) -> Result<Map<String, JsonValue>, EvalError> {
    let mut object = Map::new();
    if columns.is_empty() {
        for name in row.column_names() {
            object.insert(name.to_string(), column_value(row, name)?.to_json());
        }
    } else {
        for name in columns {
            object.insert(name.clone(), column_value(row, name)?.to_json());
        }
    }
    Ok(object)
}

fn group_count<R: Row>(rows: &[&R], group_by: &[String]) -> Result<Vec<Map<String, JsonValue>>, EvalError> {
    let mut groups: Vec<(Vec<Value>, usize)> = Vec::new();
    for row in rows {
        let key = group_by
            .iter()
            .map(|name| column_value(*row, name))
            .collect::<Result<Vec<_>, _>>()?;
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, count)) => *count += 1,
            None => groups.push((key, 1)),
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, count)| {
            let mut object = Map::new();
            for (name, value) in group_by.iter().zip(key) {
                object.insert(name.clone(), value.to_json());
            }
            object.insert(COUNT_COLUMN.to_string(), JsonValue::from(count));
            object
        })
        .collect())
}
