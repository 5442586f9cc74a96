// ==========================================
// 库存补货调拨系统 - 表格边界
// ==========================================
// 职责: 承载"已类型化的行 + 声明的列集合"
// 说明: 数据源适配器负责声明实际提供了哪些列,
//       计算阶段只校验列是否存在,不做任何字符串解析
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 行类型声明自身的完整列集合
pub trait Tabular {
    const COLUMNS: &'static [&'static str];
}

/// 类型化数据表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame<R> {
    columns: BTreeSet<String>,
    rows: Vec<R>,
}

impl<R: Tabular> Frame<R> {
    /// 以行类型的完整列集合构造
    pub fn from_rows(rows: Vec<R>) -> Self {
        Self {
            columns: R::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// 空表 (列集合完整)
    pub fn empty() -> Self {
        Self::from_rows(Vec::new())
    }
}

impl<R> Frame<R> {
    /// 以显式列集合构造 (适配器按实际表头声明)
    pub fn with_columns<I, S>(columns: I, rows: Vec<R>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.as_str())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// 返回缺失的列 (按 required 顺序)
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|c| !self.columns.contains(**c))
            .map(|c| c.to_string())
            .collect()
    }

    /// 保留列声明,替换行 (过滤/派生时使用)
    pub fn map_rows<F>(&self, f: F) -> Frame<R>
    where
        F: FnOnce(&[R]) -> Vec<R>,
    {
        Frame {
            columns: self.columns.clone(),
            rows: f(&self.rows),
        }
    }
}
