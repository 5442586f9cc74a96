// ==========================================
// 库存补货调拨系统 - 文件解析器
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: RawTable (表头已规范化, 单元格为去空白的字符串)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 表头规范化: 去首尾空白、小写、下划线视为空格、合并连续空白
pub fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ==========================================
// RawTable - 原始表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// 来源 (文件路径或调用方给定的名称),用于错误信息
    pub source: String,
    /// 规范化后的表头 (保持原顺序)
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl RawTable {
    /// 由原始表头与行值构造,完全空白的行被跳过
    pub fn from_parts<I>(source: &str, raw_headers: &[String], rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let headers: Vec<String> = raw_headers.iter().map(|h| normalize_header(h)).collect();
        let rows = rows
            .into_iter()
            .filter_map(|values| {
                let mut row_map = HashMap::new();
                for (col_idx, value) in values.into_iter().enumerate() {
                    if let Some(header) = headers.get(col_idx) {
                        if header.is_empty() {
                            continue;
                        }
                        row_map.insert(header.clone(), value.trim().to_string());
                    }
                }
                // 跳过完全空白的行
                if row_map.values().all(|v| v.is_empty()) {
                    None
                } else {
                    Some(row_map)
                }
            })
            .collect();

        Self {
            source: source.to_string(),
            headers,
            rows,
        }
    }

    pub fn has_header(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable>;
}

fn check_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 从任意 reader 解析 (测试与内存数据使用)
    pub fn parse_reader<R: Read>(&self, source: &str, reader: R) -> ImportResult<RawTable> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|v| v.to_string()).collect::<Vec<_>>());
        }

        Ok(RawTable::from_parts(source, &headers, rows))
    }
}

impl FileParser for CsvParser {
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        check_exists(file_path)?;
        let ext = extension(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        self.parse_reader(&file_path.display().to_string(), file)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        check_exists(file_path)?;
        let ext = extension(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?
            .iter()
            .map(|cell| cell.to_string())
            .collect();

        let data = rows.map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
        Ok(RawTable::from_parts(
            &file_path.display().to_string(),
            &headers,
            data,
        ))
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        match extension(file_path).as_str() {
            "csv" => CsvParser.parse_to_raw_table(file_path),
            "xlsx" | "xls" => ExcelParser.parse_to_raw_table(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Merchant   SKU "), "merchant sku");
        assert_eq!(normalize_header("units_sold"), "units sold");
        assert_eq!(normalize_header("\u{feff}Shipment Date"), "shipment date");
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "Merchant SKU,FC,Shipped Quantity").unwrap();
        writeln!(temp_file, " ab-1 ,DEL4,3").unwrap();
        writeln!(temp_file, ",,").unwrap();
        writeln!(temp_file, "AB-2,BLR7,5").unwrap();

        let table = CsvParser.parse_to_raw_table(temp_file.path()).unwrap();
        assert_eq!(table.headers, vec!["merchant sku", "fc", "shipped quantity"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].get("merchant sku").unwrap(), "ab-1");
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_raw_table(Path::new("/nonexistent/file.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse_to_raw_table(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
