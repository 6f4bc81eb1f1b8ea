//! # Relplot 模块
//!
//! 从分析表提取关系图（散点/折线）的数据序列。绘图本身不在本库范围内。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AdastraResult, AnalysisError};
use crate::query::{EvalError, Filter, Row, Value};

/// 离群点阈值（|z| 不小于该值的点被去除）
pub const OUTLIER_SIGMA: f64 = 3.0;

/// 关系图定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelplotSpec {
    #[serde(default, rename = "where")]
    pub filter: Filter,
    /// 横轴列
    pub x: String,
    /// 纵轴列（必须为数值）
    pub y: String,
    /// 分组着色列
    #[serde(default)]
    pub hue: Option<String>,
    /// 去除 y 的离群点
    #[serde(default)]
    pub remove_outliers: bool,
}

/// 一个数据点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelPoint {
    pub x: Value,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<String>,
}

/// 提取数据序列
pub fn relplot_series<R: Row>(rows: &[R], spec: &RelplotSpec) -> AdastraResult<Vec<RelPoint>> {
    let mut points = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        if !spec.filter.matches(row)? {
            continue;
        }

        let x = column(row, &spec.x)?;
        let y = column(row, &spec.y)?
            .as_f64()
            .ok_or_else(|| AnalysisError::NonNumericColumn {
                column: spec.y.clone(),
                row: idx,
            })?;
        let hue = match &spec.hue {
            Some(name) => Some(column(row, name)?.to_text()),
            None => None,
        };
        points.push(RelPoint { x, y, hue });
    }

    if spec.remove_outliers {
        let before = points.len();
        points = remove_outliers(points, OUTLIER_SIGMA);
        debug!(removed = before - points.len(), "已去除离群点");
    }
    Ok(points)
}

fn column(row: &impl Row, name: &str) -> Result<Value, EvalError> {
    row.column(name).ok_or_else(|| EvalError::UnknownColumn {
        name: name.to_string(),
    })
}

/// 保留 |z| < sigma 的点（总体标准差；标准差为 0 时全部保留）
fn remove_outliers(points: Vec<RelPoint>, sigma: f64) -> Vec<RelPoint> {
    if points.is_empty() {
        return points;
    }
    let n = points.len() as f64;
    let mean = points.iter().map(|p| p.y).sum::<f64>() / n;
    let std = (points.iter().map(|p| (p.y - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std == 0.0 {
        return points;
    }
    points
        .into_iter()
        .filter(|p| ((p.y - mean) / std).abs() < sigma)
        .collect()
}
