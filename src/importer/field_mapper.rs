// ==========================================
// 库存补货调拨系统 - 字段映射器
// ==========================================
// 职责: 原始表 (规范化表头) → 类型化事实表
// 规则:
// - 列名别名兼容各平台导出格式
// - SKU / FC / 型号去空白并转大写
// - 必需列缺失 → ImportError::MissingColumns
// - SKU 为空的行跳过
// - Frame 只声明实际存在的列,可选列缺失交由计算阶段判定
// ==========================================

use crate::domain::facts::{
    BufferStock, CategoryRef, InventoryFact, LotSize, ModelInventory, ModelStockPosition,
    OutwardShipment, RegionShipment, SalesFact, SecondaryStockLot, ShipmentFact,
};
use crate::domain::frame::Frame;
use crate::domain::types::{Category, Disposition, InventoryKind};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{normalize_header, RawTable};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Weekday};
use std::collections::HashMap;
use tracing::debug;

/// 标准字段定义
struct FieldSpec {
    name: &'static str,
    aliases: &'static [&'static str],
    required: bool,
}

const fn required(name: &'static str, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        name,
        aliases,
        required: true,
    }
}

const fn optional(name: &'static str, aliases: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        name,
        aliases,
        required: false,
    }
}

// ===== 各事实表的字段映射表 =====

const SKU_ALIASES: &[&str] = &["sku", "merchant sku", "msku", "material code", "asin sku"];

const SALES_FIELDS: &[FieldSpec] = &[
    required("sku", SKU_ALIASES),
    optional("fc", &["fc", "fulfillment center", "fulfillment center id"]),
    optional("channel", &["channel", "sales channel"]),
    required("period", &["period", "week", "week start", "week start date"]),
    required("units_sold", &["units sold", "units", "quantity", "shipped quantity"]),
];

const SHIPMENT_FIELDS: &[FieldSpec] = &[
    required("sku", SKU_ALIASES),
    required("fc", &["fc", "fulfillment center id", "fulfillment center"]),
    optional("channel", &["sales channel", "channel"]),
    required("shipment_date", &["shipment date", "date", "ship date"]),
    required("quantity", &["shipped quantity", "quantity", "qty"]),
];

const REGION_SHIPMENT_FIELDS: &[FieldSpec] = &[
    required("sku", SKU_ALIASES),
    required("region", &["shipping state", "ship state", "state", "region"]),
    required("shipment_date", &["shipment date", "date", "ship date"]),
    required("quantity", &["shipped quantity", "quantity", "qty"]),
    optional("item_price", &["item price", "price", "revenue"]),
];

const INVENTORY_FIELDS: &[FieldSpec] = &[
    required("sku", SKU_ALIASES),
    required("fc", &["location", "fc", "fulfillment center"]),
    required("disposition", &["disposition"]),
    required(
        "quantity",
        &["ending warehouse balance", "quantity", "qty", "ending qty"],
    ),
    optional("aging_days", &["aging days", "age days", "age"]),
];

const SECONDARY_FIELDS: &[FieldSpec] = &[
    required("sku", SKU_ALIASES),
    required("quantity", &["quantity", "qty", "available qty", "b2b qty"]),
    optional("aging_days", &["aging days", "age days", "age"]),
];

const BUFFER_FIELDS: &[FieldSpec] = &[
    required("sku", SKU_ALIASES),
    required("quantity", &["quantity", "qty", "eb stock", "eb qty"]),
];

const LOT_SIZE_FIELDS: &[FieldSpec] = &[
    required("sku", SKU_ALIASES),
    required(
        "lot_size",
        &["lot size", "master carton", "mc qty", "carton qty", "case pack"],
    ),
];

const CATEGORY_FIELDS: &[FieldSpec] = &[
    required("sku", SKU_ALIASES),
    optional("model", &["model"]),
    optional("category", &["hazmat/non-hazmat", "category", "ixd type"]),
];

const OUTWARD_FIELDS: &[FieldSpec] = &[
    required("invoice_no", &["invoice no", "invoice number", "invoice"]),
    required("sku", SKU_ALIASES),
    required("fc", &["consignee place", "fc"]),
    optional("qty_sent", &["qty sent", "quantity", "qty"]),
    required("ship_date", &["dispatched date", "ship date", "dispatch date"]),
];

const MODEL_INVENTORY_FIELDS: &[FieldSpec] = &[
    required("model", &["model"]),
    required("channel", &["channel", "warehouse"]),
    optional("type", &["type", "kind", "inventory type"]),
    required("quantity", &["qty", "quantity"]),
];

const STOCK_POSITION_FIELDS: &[FieldSpec] = &[
    required("model", &["model"]),
    required(
        "marketplace_inventory",
        &["total am inventory", "marketplace inventory", "amazon inventory"],
    ),
    required(
        "warehouse_inventory",
        &["ampm", "warehouse inventory", "ampm inventory"],
    ),
];

// ==========================================
// 列解析结果: 标准字段 → 实际表头
// ==========================================
struct Columns {
    resolved: HashMap<&'static str, String>,
}

impl Columns {
    fn resolve(table: &RawTable, specs: &[FieldSpec]) -> ImportResult<Self> {
        let mut resolved = HashMap::new();
        let mut missing = Vec::new();

        for spec in specs {
            let found = spec
                .aliases
                .iter()
                .chain(std::iter::once(&spec.name))
                .map(|alias| normalize_header(alias))
                .find(|alias| table.has_header(alias));
            match found {
                Some(header) => {
                    resolved.insert(spec.name, header);
                }
                None if spec.required => missing.push(spec.name.to_string()),
                None => {}
            }
        }

        if !missing.is_empty() {
            return Err(ImportError::MissingColumns {
                source_name: table.source.clone(),
                columns: missing,
            });
        }
        Ok(Self { resolved })
    }

    fn has(&self, name: &str) -> bool {
        self.resolved.contains_key(name)
    }

    /// 已解析的标准字段名 (用于声明 Frame 列)
    fn declared(&self) -> Vec<&'static str> {
        self.resolved.keys().copied().collect()
    }

    fn text<'r>(&self, row: &'r HashMap<String, String>, name: &str) -> Option<&'r str> {
        self.resolved
            .get(name)
            .and_then(|header| row.get(header))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// 编码字段 (SKU/FC/型号): 去空白、转大写
    fn code(&self, row: &HashMap<String, String>, name: &str) -> Option<String> {
        self.text(row, name).map(|v| v.to_uppercase())
    }

    /// 整数字段,空值返回 None
    fn opt_int(
        &self,
        row: &HashMap<String, String>,
        name: &str,
        row_number: usize,
    ) -> ImportResult<Option<i64>> {
        match self.text(row, name) {
            None => Ok(None),
            Some(raw) => parse_int(raw)
                .map(Some)
                .ok_or_else(|| ImportError::TypeConversionError {
                    row: row_number,
                    field: name.to_string(),
                    message: format!("无法解析为整数: {}", raw),
                }),
        }
    }

    /// 整数字段,空值按 0 处理
    fn int(&self, row: &HashMap<String, String>, name: &str, row_number: usize) -> ImportResult<i64> {
        Ok(self.opt_int(row, name, row_number)?.unwrap_or(0))
    }

    /// 金额字段,空值按 0 处理
    fn amount(&self, row: &HashMap<String, String>, name: &str, row_number: usize) -> ImportResult<f64> {
        match self.text(row, name) {
            None => Ok(0.0),
            Some(raw) => parse_amount(raw).ok_or_else(|| ImportError::TypeConversionError {
                row: row_number,
                field: name.to_string(),
                message: format!("无法解析为金额: {}", raw),
            }),
        }
    }

    fn date(
        &self,
        row: &HashMap<String, String>,
        name: &str,
        row_number: usize,
    ) -> ImportResult<NaiveDate> {
        let raw = self.text(row, name).unwrap_or("");
        parse_date(raw).ok_or_else(|| ImportError::DateFormatError {
            row: row_number,
            field: name.to_string(),
            value: raw.to_string(),
        })
    }
}

/// 整数解析: 兼容千分位与 Excel 浮点 ("1,200" / "12.0")
fn parse_int(raw: &str) -> Option<i64> {
    let cleaned = raw.replace(',', "");
    if let Ok(v) = cleaned.parse::<i64>() {
        return Some(v);
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.round() as i64)
}

/// 金额解析: 兼容千分位与货币符号 ("₹1,299.00")
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 日期解析
///
/// 支持: YYYY-MM-DD / DD-MM-YYYY / DD/MM/YYYY / YYYYMMDD / 带时间的格式 /
/// ISO 周 "YYYY-WW" (取周一) / Excel 序列号
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d", "%Y%m%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d-%m-%Y %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }

    // ISO 周 "2024-05"
    if let Some((year, week)) = raw.split_once('-') {
        if year.len() == 4 && (1..=2).contains(&week.len()) {
            if let (Ok(y), Ok(w)) = (year.parse::<i32>(), week.parse::<u32>()) {
                return NaiveDate::from_isoywd_opt(y, w, Weekday::Mon);
            }
        }
    }

    // Excel 日期序列号
    if let Ok(serial) = raw.parse::<f64>() {
        if (1.0..200_000.0).contains(&serial) {
            let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
            return base.checked_add_signed(Duration::days(serial.trunc() as i64));
        }
    }
    None
}

/// 数据行号 (表头占第 1 行)
fn row_number(idx: usize) -> usize {
    idx + 2
}

// ==========================================
// FieldMapper - 原始表 → 事实表
// ==========================================
pub struct FieldMapper;

impl FieldMapper {
    /// 逐行映射的公共框架: 解析列 → 跳过无主键行 → 声明列
    fn map_table<R, F>(
        &self,
        table: &RawTable,
        specs: &[FieldSpec],
        key_field: &str,
        mut map_row: F,
    ) -> ImportResult<Frame<R>>
    where
        F: FnMut(&Columns, &HashMap<String, String>, usize) -> ImportResult<R>,
    {
        let cols = Columns::resolve(table, specs)?;
        let mut rows = Vec::with_capacity(table.len());
        let mut skipped = 0usize;

        for (idx, row) in table.rows.iter().enumerate() {
            if cols.text(row, key_field).is_none() {
                skipped += 1;
                continue;
            }
            rows.push(map_row(&cols, row, row_number(idx))?);
        }

        debug!(source = %table.source, rows = rows.len(), skipped, "raw table mapped");
        Ok(Frame::with_columns(cols.declared(), rows))
    }

    pub fn map_sales(&self, table: &RawTable) -> ImportResult<Frame<SalesFact>> {
        self.map_table(table, SALES_FIELDS, "sku", |cols, row, n| {
            Ok(SalesFact {
                sku: cols.code(row, "sku").unwrap_or_default(),
                fc: cols.code(row, "fc"),
                channel: cols.text(row, "channel").map(|c| c.to_lowercase()),
                period: cols.date(row, "period", n)?,
                units_sold: cols.int(row, "units_sold", n)?,
            })
        })
    }

    pub fn map_shipments(&self, table: &RawTable) -> ImportResult<Frame<ShipmentFact>> {
        self.map_table(table, SHIPMENT_FIELDS, "sku", |cols, row, n| {
            Ok(ShipmentFact {
                sku: cols.code(row, "sku").unwrap_or_default(),
                fc: cols.code(row, "fc").unwrap_or_default(),
                channel: cols.text(row, "channel").map(|c| c.to_lowercase()),
                shipment_date: cols.date(row, "shipment_date", n)?,
                quantity: cols.int(row, "quantity", n)?,
            })
        })
    }

    /// 地区发货明细 (与 FC 发货明细同源,按收货州汇总用)
    pub fn map_region_shipments(&self, table: &RawTable) -> ImportResult<Frame<RegionShipment>> {
        self.map_table(table, REGION_SHIPMENT_FIELDS, "sku", |cols, row, n| {
            Ok(RegionShipment {
                sku: cols.code(row, "sku").unwrap_or_default(),
                region: cols.text(row, "region").unwrap_or_default().to_string(),
                shipment_date: cols.date(row, "shipment_date", n)?,
                quantity: cols.int(row, "quantity", n)?,
                item_price: cols.amount(row, "item_price", n)?,
            })
        })
    }

    pub fn map_inventory(&self, table: &RawTable) -> ImportResult<Frame<InventoryFact>> {
        self.map_table(table, INVENTORY_FIELDS, "sku", |cols, row, n| {
            Ok(InventoryFact {
                sku: cols.code(row, "sku").unwrap_or_default(),
                fc: cols.code(row, "fc").unwrap_or_default(),
                disposition: Disposition::parse(cols.text(row, "disposition").unwrap_or("")),
                quantity: cols.int(row, "quantity", n)?,
                aging_days: cols.opt_int(row, "aging_days", n)?.map(|v| v as i32),
            })
        })
    }

    pub fn map_secondary(&self, table: &RawTable) -> ImportResult<Frame<SecondaryStockLot>> {
        self.map_table(table, SECONDARY_FIELDS, "sku", |cols, row, n| {
            Ok(SecondaryStockLot {
                sku: cols.code(row, "sku").unwrap_or_default(),
                quantity: cols.int(row, "quantity", n)?,
                aging_days: cols.opt_int(row, "aging_days", n)?.map(|v| v as i32),
            })
        })
    }

    pub fn map_buffer(&self, table: &RawTable) -> ImportResult<Frame<BufferStock>> {
        self.map_table(table, BUFFER_FIELDS, "sku", |cols, row, n| {
            Ok(BufferStock {
                sku: cols.code(row, "sku").unwrap_or_default(),
                quantity: cols.int(row, "quantity", n)?,
            })
        })
    }

    pub fn map_lot_sizes(&self, table: &RawTable) -> ImportResult<Frame<LotSize>> {
        self.map_table(table, LOT_SIZE_FIELDS, "sku", |cols, row, n| {
            Ok(LotSize {
                sku: cols.code(row, "sku").unwrap_or_default(),
                lot_size: cols.int(row, "lot_size", n)?,
            })
        })
    }

    pub fn map_categories(&self, table: &RawTable) -> ImportResult<Frame<CategoryRef>> {
        self.map_table(table, CATEGORY_FIELDS, "sku", |cols, row, _| {
            Ok(CategoryRef {
                sku: cols.code(row, "sku").unwrap_or_default(),
                model: cols.code(row, "model"),
                category: cols
                    .text(row, "category")
                    .and_then(Category::from_reference_flag),
            })
        })
    }

    /// 出库发票明细
    ///
    /// 无数量列时每行按 1 件计。
    pub fn map_outward_shipments(&self, table: &RawTable) -> ImportResult<Frame<OutwardShipment>> {
        let frame = self.map_table(table, OUTWARD_FIELDS, "invoice_no", |cols, row, n| {
            let qty_sent = if cols.has("qty_sent") {
                cols.int(row, "qty_sent", n)?
            } else {
                1
            };
            Ok(OutwardShipment {
                invoice_no: cols.text(row, "invoice_no").unwrap_or_default().to_string(),
                sku: cols.code(row, "sku").unwrap_or_default(),
                fc: cols.code(row, "fc").unwrap_or_default(),
                qty_sent,
                ship_date: cols.date(row, "ship_date", n)?,
            })
        })?;
        Ok(Frame::from_rows(frame.into_rows()))
    }

    pub fn map_model_inventory(&self, table: &RawTable) -> ImportResult<Frame<ModelInventory>> {
        let frame = self.map_table(table, MODEL_INVENTORY_FIELDS, "model", |cols, row, n| {
            let channel = cols.text(row, "channel").unwrap_or("").to_lowercase();
            Ok(ModelInventory {
                model: cols.code(row, "model").unwrap_or_default(),
                kind: InventoryKind::classify(&channel, cols.text(row, "type")),
                channel,
                quantity: cols.int(row, "quantity", n)?,
            })
        })?;
        // kind 由渠道/类型列推导,总是可用
        Ok(Frame::from_rows(frame.into_rows()))
    }

    pub fn map_stock_positions(&self, table: &RawTable) -> ImportResult<Frame<ModelStockPosition>> {
        self.map_table(table, STOCK_POSITION_FIELDS, "model", |cols, row, n| {
            Ok(ModelStockPosition {
                model: cols.code(row, "model").unwrap_or_default(),
                marketplace_inventory: cols.int(row, "marketplace_inventory", n)?,
                warehouse_inventory: cols.int(row, "warehouse_inventory", n)?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        RawTable::from_parts(
            "test",
            &headers,
            rows.iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect::<Vec<_>>()),
        )
    }

    #[test]
    fn test_map_shipments_with_export_headers() {
        let table = create_test_table(
            &["Merchant SKU", "FC", "Sales Channel", "Shipment Date", "Shipped Quantity"],
            &[
                &[" ab-1 ", "del4", "Amazon.in", "2024-03-01T10:00:00+05:30", "3"],
                &["", "DEL4", "Amazon.in", "2024-03-01", "9"],
            ],
        );
        let frame = FieldMapper.map_shipments(&table).unwrap();

        assert_eq!(frame.len(), 1);
        let row = &frame.rows()[0];
        assert_eq!(row.sku, "AB-1");
        assert_eq!(row.fc, "DEL4");
        assert_eq!(row.channel.as_deref(), Some("amazon.in"));
        assert_eq!(row.shipment_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(frame.has_column("channel"));
    }

    #[test]
    fn test_map_region_shipments() {
        let table = create_test_table(
            &["Merchant SKU", "Shipping State", "Shipment Date", "Shipped Quantity", "Item Price"],
            &[
                &["a-1", "Karnataka", "2024-03-01", "2", "₹1,299.50"],
                &["A-2", "Delhi", "2024-03-02", "1", ""],
            ],
        );
        let frame = FieldMapper.map_region_shipments(&table).unwrap();

        assert_eq!(frame.len(), 2);
        assert_eq!(frame.rows()[0].sku, "A-1");
        assert_eq!(frame.rows()[0].region, "Karnataka");
        assert_eq!(frame.rows()[0].item_price, 1299.5);
        assert_eq!(frame.rows()[1].item_price, 0.0);

        let no_state =
            create_test_table(&["SKU", "Shipment Date", "Qty"], &[&["A", "2024-03-01", "1"]]);
        assert!(matches!(
            FieldMapper.map_region_shipments(&no_state),
            Err(ImportError::MissingColumns { .. })
        ));
    }

    #[test]
    fn test_missing_required_column() {
        let table = create_test_table(&["MSKU", "Location"], &[&["A", "DEL4"]]);
        match FieldMapper.map_inventory(&table) {
            Err(ImportError::MissingColumns { columns, .. }) => {
                assert_eq!(columns, vec!["disposition".to_string(), "quantity".to_string()]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_column_not_declared() {
        let table = create_test_table(&["SKU", "Week", "Units Sold"], &[&["a", "2024-05", "7"]]);
        let frame = FieldMapper.map_sales(&table).unwrap();
        assert!(!frame.has_column("fc"));
        assert!(frame.has_column("units_sold"));
        assert_eq!(frame.rows()[0].period, NaiveDate::from_ymd_opt(2024, 1, 29).unwrap());
    }

    #[test]
    fn test_type_conversion_error_reports_row() {
        let table = create_test_table(&["SKU", "Lot Size"], &[&["A", "6"], &["B", "six"]]);
        match FieldMapper.map_lot_sizes(&table) {
            Err(ImportError::TypeConversionError { row, field, .. }) => {
                assert_eq!(row, 3);
                assert_eq!(field, "lot_size");
            }
            other => panic!("expected TypeConversionError, got {:?}", other),
        }
    }

    #[test]
    fn test_outward_defaults_qty_to_one() {
        let table = create_test_table(
            &["INVOICE NO", "MATERIAL CODE", "CONSIGNEE PLACE", "DISPATCHED DATE"],
            &[&["INV-1", "a", "del4", "05/02/2024"]],
        );
        let frame = FieldMapper.map_outward_shipments(&table).unwrap();
        assert_eq!(frame.rows()[0].qty_sent, 1);
        assert_eq!(frame.rows()[0].ship_date, NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
    }

    #[test]
    fn test_parse_int_and_date_variants() {
        assert_eq!(parse_int("1,200"), Some(1200));
        assert_eq!(parse_int("12.0"), Some(12));
        assert_eq!(parse_int("x"), None);
        assert_eq!(parse_date("20240105"), NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(parse_date("45292"), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(parse_date("not a date"), None);
    }
}
