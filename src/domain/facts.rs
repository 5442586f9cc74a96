// ==========================================
// 库存补货调拨系统 - 输入事实表
// ==========================================
// 职责: 数据源适配器输出的已类型化输入行
// 红线: 本模块不含解析逻辑
// ==========================================

use crate::domain::frame::Tabular;
use crate::domain::types::{Category, Disposition, InventoryKind};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// SalesFact - 周期销量
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesFact {
    pub sku: String,
    pub fc: Option<String>,
    pub channel: Option<String>,
    /// 周期起始日 (周销量为周一)
    pub period: NaiveDate,
    pub units_sold: i64,
}

impl Tabular for SalesFact {
    const COLUMNS: &'static [&'static str] = &["sku", "fc", "channel", "period", "units_sold"];
}

// ==========================================
// ShipmentFact - 日发货明细 (FC 维度)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentFact {
    pub sku: String,
    pub fc: String,
    pub channel: Option<String>,
    pub shipment_date: NaiveDate,
    pub quantity: i64,
}

impl Tabular for ShipmentFact {
    const COLUMNS: &'static [&'static str] = &["sku", "fc", "channel", "shipment_date", "quantity"];
}

// ==========================================
// RegionShipment - 日发货明细 (收货地区维度)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionShipment {
    pub sku: String,
    /// 收货州/地区 (原样保留大小写)
    pub region: String,
    pub shipment_date: NaiveDate,
    pub quantity: i64,
    /// 行金额 (导出中的 Item Price 已是整行金额)
    pub item_price: f64,
}

impl Tabular for RegionShipment {
    const COLUMNS: &'static [&'static str] =
        &["sku", "region", "shipment_date", "quantity", "item_price"];
}

// ==========================================
// InventoryFact - 库存台账
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryFact {
    pub sku: String,
    pub fc: String,
    pub disposition: Disposition,
    pub quantity: i64,
    pub aging_days: Option<i32>,
}

impl Tabular for InventoryFact {
    const COLUMNS: &'static [&'static str] = &["sku", "fc", "disposition", "quantity", "aging_days"];
}

// ==========================================
// SecondaryStockLot - 次级库存批次 (B2B 老化库存, SKU 维度)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryStockLot {
    pub sku: String,
    pub quantity: i64,
    pub aging_days: Option<i32>,
}

impl Tabular for SecondaryStockLot {
    const COLUMNS: &'static [&'static str] = &["sku", "quantity", "aging_days"];
}

// ==========================================
// BufferStock - 外部缓冲库存 (EB, SKU 维度)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferStock {
    pub sku: String,
    pub quantity: i64,
}

impl Tabular for BufferStock {
    const COLUMNS: &'static [&'static str] = &["sku", "quantity"];
}

// ==========================================
// LotSize - 箱规 (Master Carton)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotSize {
    pub sku: String,
    pub lot_size: i64,
}

impl Tabular for LotSize {
    const COLUMNS: &'static [&'static str] = &["sku", "lot_size"];
}

// ==========================================
// CategoryRef - 品类主数据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub sku: String,
    pub model: Option<String>,
    pub category: Option<Category>,
}

impl Tabular for CategoryRef {
    const COLUMNS: &'static [&'static str] = &["sku", "model", "category"];
}

// ==========================================
// OutwardShipment - 出库发票明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutwardShipment {
    pub invoice_no: String,
    pub sku: String,
    pub fc: String,
    pub qty_sent: i64,
    pub ship_date: NaiveDate,
}

impl Tabular for OutwardShipment {
    const COLUMNS: &'static [&'static str] = &["invoice_no", "sku", "fc", "qty_sent", "ship_date"];
}

// ==========================================
// StockMovement - 对账用库存数量 (期初/入/出/期末各一张表)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub sku: String,
    pub fc: String,
    pub quantity: i64,
}

impl StockMovement {
    pub fn new(sku: &str, fc: &str, quantity: i64) -> Self {
        Self {
            sku: sku.to_string(),
            fc: fc.to_string(),
            quantity,
        }
    }
}

impl Tabular for StockMovement {
    const COLUMNS: &'static [&'static str] = &["sku", "fc", "quantity"];
}

// ==========================================
// ModelInventory - 型号库存快照 (供应商补单用)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInventory {
    pub model: String,
    pub channel: String,
    pub kind: InventoryKind,
    pub quantity: i64,
}

impl Tabular for ModelInventory {
    const COLUMNS: &'static [&'static str] = &["model", "channel", "kind", "quantity"];
}

// ==========================================
// ModelStockPosition - 型号库存位置 (平台库存 + 仓库库存)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStockPosition {
    pub model: String,
    pub marketplace_inventory: i64,
    pub warehouse_inventory: i64,
}

impl Tabular for ModelStockPosition {
    const COLUMNS: &'static [&'static str] =
        &["model", "marketplace_inventory", "warehouse_inventory"];
}
