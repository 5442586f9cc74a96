// ==========================================
// 库存补货调拨系统 - 导入层
// ==========================================
// 职责: 外部文件 → 类型化事实表 (计算核心不依赖本层)
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod error;
pub mod fact_source;
pub mod field_mapper;
pub mod file_parser;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use fact_source::{brand_slug, FactKind, FactSource, FileFactSource};
pub use field_mapper::{parse_date, FieldMapper};
pub use file_parser::{
    normalize_header, CsvParser, ExcelParser, FileParser, RawTable, UniversalFileParser,
};
