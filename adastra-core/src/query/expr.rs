//! # 表达式模块
//!
//! 定义行过滤表达式的 AST 和求值器。
//!
//! ## 设计原则
//!
//! - 表达式是**无副作用**的纯函数，只读取行的列值
//! - 求值是**确定性**的
//! - 未知列直接报错，不静默当作空值
//!
//! ## 支持的操作
//!
//! - 比较: `=`, `!=`, `<`, `<=`, `>`, `>=`
//! - 集合/模式: `in (...)`, `like`, `is null`
//! - 逻辑: `and`, `or`, `not`

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// 列值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// 空值
    Null,
    /// 布尔值
    Bool(bool),
    /// 整数
    Int(i64),
    /// 浮点数
    Float(f64),
    /// 字符串
    String(String),
    /// 字符串列表（分词结果等）
    List(Vec<String>),
}

impl Value {
    /// 类型名（用于错误信息）
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::List(_) => "List",
        }
    }

    /// 数值视图（布尔按 0/1 处理）
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// 作为文档文本（列表以空格拼接，空值为空串）
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::String(s) => s.clone(),
            Self::List(items) => items.join(" "),
        }
    }

    /// 转为 JSON 值
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::from(*n),
            Self::Float(n) => serde_json::Value::from(*n),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::from(items.clone()),
        }
    }
}

/// 可被过滤的行
///
/// 提供按列名读取值的能力。
pub trait Row {
    /// 获取列值，列不存在时返回 `None`
    fn column(&self, name: &str) -> Option<Value>;

    /// 全部列名（按输出顺序）
    fn column_names(&self) -> Vec<&'static str>;
}

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// 表达式 AST 节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// 字面量值
    Literal(Value),

    /// 列引用
    Column(String),

    /// 比较
    Compare(CompareOp, Box<Expr>, Box<Expr>),

    /// 集合成员判断（`negated` 为 `not in`）
    In {
        expr: Box<Expr>,
        list: Vec<Value>,
        negated: bool,
    },

    /// 模式匹配（`%` 任意串，`_` 单字符）
    Like {
        expr: Box<Expr>,
        pattern: String,
        negated: bool,
    },

    /// 空值判断（`negated` 为 `is not null`）
    IsNull { expr: Box<Expr>, negated: bool },

    /// 逻辑与
    And(Box<Expr>, Box<Expr>),

    /// 逻辑或
    Or(Box<Expr>, Box<Expr>),

    /// 逻辑非
    Not(Box<Expr>),
}

impl Expr {
    /// 创建字符串字面量
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(Value::String(s.into()))
    }

    /// 创建布尔字面量
    pub fn bool(b: bool) -> Self {
        Self::Literal(Value::Bool(b))
    }

    /// 创建整数字面量
    pub fn int(n: i64) -> Self {
        Self::Literal(Value::Int(n))
    }

    /// 创建列引用
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// 创建比较
    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Self::Compare(op, Box::new(left), Box::new(right))
    }

    /// 创建相等比较
    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::compare(CompareOp::Eq, left, right)
    }

    /// 创建逻辑与
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    /// 创建逻辑或
    pub fn or(left: Expr, right: Expr) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// 创建逻辑非
    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Self::Not(Box::new(expr))
    }
}

/// 表达式求值错误
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// 列不存在
    UnknownColumn { name: String },

    /// 类型不匹配
    TypeMismatch {
        expected: &'static str,
        actual: String,
        context: String,
    },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::UnknownColumn { name } => {
                write!(f, "列 '{}' 不存在", name)
            }
            EvalError::TypeMismatch {
                expected,
                actual,
                context,
            } => {
                write!(
                    f,
                    "类型不匹配: 期望 {}，实际 {} ({})",
                    expected, actual, context
                )
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// 对表达式求值
pub fn evaluate(expr: &Expr, row: &impl Row) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Column(name) => row
            .column(name)
            .ok_or_else(|| EvalError::UnknownColumn { name: name.clone() }),

        Expr::Compare(op, left, right) => {
            let left_val = evaluate(left, row)?;
            let right_val = evaluate(right, row)?;
            Ok(Value::Bool(compare_values(*op, &left_val, &right_val)))
        }

        Expr::In {
            expr,
            list,
            negated,
        } => {
            let value = evaluate(expr, row)?;
            if value == Value::Null {
                return Ok(Value::Bool(false));
            }
            let found = list
                .iter()
                .any(|item| compare_values(CompareOp::Eq, &value, item));
            Ok(Value::Bool(found != *negated))
        }

        Expr::Like {
            expr,
            pattern,
            negated,
        } => match evaluate(expr, row)? {
            Value::Null => Ok(Value::Bool(false)),
            value => {
                let matched = like_match(&value.to_text(), pattern);
                Ok(Value::Bool(matched != *negated))
            }
        },

        Expr::IsNull { expr, negated } => {
            let is_null = evaluate(expr, row)? == Value::Null;
            Ok(Value::Bool(is_null != *negated))
        }

        Expr::And(left, right) => {
            let left_bool = to_bool(&evaluate(left, row)?, "and 左操作数")?;

            // 短路求值
            if !left_bool {
                return Ok(Value::Bool(false));
            }

            let right_bool = to_bool(&evaluate(right, row)?, "and 右操作数")?;
            Ok(Value::Bool(right_bool))
        }

        Expr::Or(left, right) => {
            let left_bool = to_bool(&evaluate(left, row)?, "or 左操作数")?;

            // 短路求值
            if left_bool {
                return Ok(Value::Bool(true));
            }

            let right_bool = to_bool(&evaluate(right, row)?, "or 右操作数")?;
            Ok(Value::Bool(right_bool))
        }

        Expr::Not(inner) => {
            let inner_bool = to_bool(&evaluate(inner, row)?, "not 操作数")?;
            Ok(Value::Bool(!inner_bool))
        }
    }
}

/// 比较两个值
///
/// 任一侧为空值时结果为 false；数值（含布尔 0/1）跨类型比较；
/// 其余不同类型之间只有 `!=` 成立。
fn compare_values(op: CompareOp, left: &Value, right: &Value) -> bool {
    if *left == Value::Null || *right == Value::Null {
        return false;
    }

    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => Some(a.cmp(b)),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    };

    match ordering {
        Some(ord) => match op {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::NotEq => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::LtEq => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::GtEq => ord != Ordering::Less,
        },
        None => op == CompareOp::NotEq,
    }
}

/// SQL `LIKE` 匹配（ASCII 大小写不敏感）
fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();

    // 回溯匹配：记录最近一个 `%` 的位置
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

/// 将值转换为布尔值（整数 0/1 按 SQL 习惯视为布尔）
fn to_bool(value: &Value, context: &str) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(0) => Ok(false),
        Value::Int(1) => Ok(true),
        other => Err(EvalError::TypeMismatch {
            expected: "Bool",
            actual: format!("{:?}", other),
            context: context.to_string(),
        }),
    }
}

/// 将表达式求值为布尔值
pub fn evaluate_to_bool(expr: &Expr, row: &impl Row) -> Result<bool, EvalError> {
    let value = evaluate(expr, row)?;
    to_bool(&value, "过滤条件")
}
