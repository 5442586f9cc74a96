// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================
// 按品牌生成输入目录下的 CSV 文件 (平台导出表头)
// ==========================================

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::path::Path;

pub fn week_start(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::weeks(n)
}

pub fn ship_day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Duration::days(n)
}

// ==========================================
// ScenarioBuilder - 品牌输入文件构建器
// ==========================================

pub struct ScenarioBuilder {
    brand_slug: String,
    sales: Vec<String>,
    shipments: Vec<String>,
    ledger: Vec<String>,
    lot_sizes: Vec<String>,
    categories: Vec<String>,
    outward: Vec<String>,
    secondary: Vec<String>,
}

impl ScenarioBuilder {
    pub fn new(brand: &str) -> Self {
        Self {
            brand_slug: fc_replenishment::importer::brand_slug(brand),
            sales: Vec::new(),
            shipments: Vec::new(),
            ledger: Vec::new(),
            lot_sizes: Vec::new(),
            categories: Vec::new(),
            outward: Vec::new(),
            secondary: Vec::new(),
        }
    }

    /// 默认场景: 单 SKU "A"
    /// - 8 周销量各 10
    /// - 30 天出库: DEL4 每天 2, BLR7 每天 1
    /// - 库存: DEL4 5, BLR7 200
    /// - 箱规 6, 型号 M1 (受管控)
    pub fn default_scenario(brand: &str) -> Self {
        let mut builder = Self::new(brand);
        for i in 0..8 {
            builder = builder.sales("A", week_start(i), 10);
        }
        for d in 0..30 {
            builder = builder
                .shipment("A", "DEL4", ship_day(d), 2)
                .shipment("A", "BLR7", ship_day(d), 1);
        }
        builder
            .stock("A", "DEL4", "SELLABLE", 5)
            .stock("A", "BLR7", "SELLABLE", 200)
            .lot_size("A", 6)
            .category("A", "M1", "IXD")
    }

    pub fn sales(mut self, sku: &str, period: NaiveDate, units: i64) -> Self {
        self.sales.push(format!("{},{},{}", sku, period, units));
        self
    }

    pub fn shipment(mut self, sku: &str, fc: &str, date: NaiveDate, qty: i64) -> Self {
        self.shipments.push(format!("{},{},{},{}", sku, fc, date, qty));
        self
    }

    pub fn stock(mut self, sku: &str, fc: &str, disposition: &str, qty: i64) -> Self {
        self.ledger.push(format!("{},{},{},{}", sku, fc, disposition, qty));
        self
    }

    pub fn clear_stock(mut self) -> Self {
        self.ledger.clear();
        self
    }

    pub fn lot_size(mut self, sku: &str, lot: i64) -> Self {
        self.lot_sizes.push(format!("{},{}", sku, lot));
        self
    }

    pub fn category(mut self, sku: &str, model: &str, flag: &str) -> Self {
        self.categories.push(format!("{},{},{}", sku, model, flag));
        self
    }

    pub fn invoice(mut self, invoice_no: &str, sku: &str, fc: &str, qty: i64, date: NaiveDate) -> Self {
        self.outward
            .push(format!("{},{},{},{},{}", invoice_no, sku, fc, qty, date));
        self
    }

    pub fn secondary(mut self, sku: &str, qty: i64, aging_days: Option<i32>) -> Self {
        let aging = aging_days.map(|d| d.to_string()).unwrap_or_default();
        self.secondary.push(format!("{},{},{}", sku, qty, aging));
        self
    }

    fn write_one(&self, dir: &Path, stem: &str, header: &str, rows: &[String]) {
        let mut content = String::from(header);
        content.push('\n');
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        std::fs::write(dir.join(format!("{}_{}.csv", stem, self.brand_slug)), content)
            .expect("Failed to write scenario file");
    }

    /// 写入目录 (必需表总是写出,可选表有行时才写出)
    pub fn write_to(&self, dir: &Path) {
        self.write_one(dir, "sales", "Merchant SKU,Week Start,Units Sold", &self.sales);
        self.write_one(
            dir,
            "fba_shipments",
            "Merchant SKU,Fulfillment Center Id,Shipment Date,Shipped Quantity",
            &self.shipments,
        );
        self.write_one(
            dir,
            "inventory_ledger",
            "MSKU,Location,Disposition,Ending Warehouse Balance",
            &self.ledger,
        );
        if !self.lot_sizes.is_empty() {
            self.write_one(dir, "master_carton", "SKU,Master Carton", &self.lot_sizes);
        }
        if !self.categories.is_empty() {
            self.write_one(dir, "sku_master", "SKU,Model,Hazmat/Non-Hazmat", &self.categories);
        }
        if !self.outward.is_empty() {
            self.write_one(
                dir,
                "outward_shipments",
                "Invoice No,SKU,Consignee Place,Qty Sent,Dispatched Date",
                &self.outward,
            );
        }
        if !self.secondary.is_empty() {
            self.write_one(dir, "b2b_inventory", "SKU,Quantity,Aging Days", &self.secondary);
        }
    }
}
