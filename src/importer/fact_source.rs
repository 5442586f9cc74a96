// ==========================================
// 库存补货调拨系统 - 事实数据源
// ==========================================
// 职责: 为一次运行加载全部输入事实表
// 实现: FileFactSource 从数据目录按账号解析文件名
// 文件命名: <kind>_<brand>.csv|xlsx|xls (brand 小写, 空格转下划线)
// ==========================================

use crate::domain::facts::{
    BufferStock, CategoryRef, InventoryFact, LotSize, ModelInventory, ModelStockPosition,
    OutwardShipment, RegionShipment, SalesFact, SecondaryStockLot, ShipmentFact,
};
use crate::domain::frame::Frame;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{FileParser, RawTable, UniversalFileParser};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

// ==========================================
// FactKind - 输入文件类别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactKind {
    Sales,
    Shipments,
    InventoryLedger,
    SecondaryStock,
    BufferStock,
    LotSizes,
    Categories,
    OutwardShipments,
    ModelInventory,
    StockPositions,
}

impl FactKind {
    pub fn file_stem(&self) -> &'static str {
        match self {
            FactKind::Sales => "sales",
            FactKind::Shipments => "fba_shipments",
            FactKind::InventoryLedger => "inventory_ledger",
            FactKind::SecondaryStock => "b2b_inventory",
            FactKind::BufferStock => "eb_stock",
            FactKind::LotSizes => "master_carton",
            FactKind::Categories => "sku_master",
            FactKind::OutwardShipments => "outward_shipments",
            FactKind::ModelInventory => "inventory_snapshot",
            FactKind::StockPositions => "stock_position",
        }
    }
}

/// 账号名 → 文件名片段
pub fn brand_slug(brand: &str) -> String {
    brand
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

// ==========================================
// FactSource Trait
// ==========================================
// 可选表返回 Ok(None) 表示该账号未提供
#[async_trait]
pub trait FactSource: Send + Sync {
    async fn load_sales(&self, brand: &str) -> ImportResult<Frame<SalesFact>>;

    async fn load_shipments(&self, brand: &str) -> ImportResult<Frame<ShipmentFact>>;

    /// 与 load_shipments 同一文件,按收货地区读取
    async fn load_region_shipments(&self, brand: &str) -> ImportResult<Frame<RegionShipment>>;

    async fn load_inventory(&self, brand: &str) -> ImportResult<Frame<InventoryFact>>;

    async fn load_secondary(&self, brand: &str) -> ImportResult<Option<Frame<SecondaryStockLot>>>;

    async fn load_buffer(&self, brand: &str) -> ImportResult<Option<Frame<BufferStock>>>;

    async fn load_lot_sizes(&self, brand: &str) -> ImportResult<Frame<LotSize>>;

    async fn load_categories(&self, brand: &str) -> ImportResult<Frame<CategoryRef>>;

    async fn load_outward_shipments(&self, brand: &str) -> ImportResult<Frame<OutwardShipment>>;

    async fn load_model_inventory(&self, brand: &str) -> ImportResult<Option<Frame<ModelInventory>>>;

    async fn load_stock_positions(
        &self,
        brand: &str,
    ) -> ImportResult<Option<Frame<ModelStockPosition>>>;
}

// ==========================================
// FileFactSource - 基于数据目录的实现
// ==========================================
pub struct FileFactSource {
    data_dir: PathBuf,
}

impl FileFactSource {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 按扩展名优先级查找文件
    pub fn resolve(&self, kind: FactKind, brand: &str) -> Option<PathBuf> {
        let stem = format!("{}_{}", kind.file_stem(), brand_slug(brand));
        ["csv", "xlsx", "xls"]
            .iter()
            .map(|ext| self.data_dir.join(format!("{}.{}", stem, ext)))
            .find(|p| p.exists())
    }

    /// 在阻塞线程中解析文件
    async fn read_table(path: PathBuf) -> ImportResult<RawTable> {
        tokio::task::spawn_blocking(move || UniversalFileParser.parse_to_raw_table(&path))
            .await
            .map_err(|e| ImportError::InternalError(format!("解析任务失败: {}", e)))?
    }

    #[instrument(skip(self))]
    async fn required_table(&self, kind: FactKind, brand: &str) -> ImportResult<RawTable> {
        let path = self.resolve(kind, brand).ok_or_else(|| {
            ImportError::FileNotFound(
                self.data_dir
                    .join(format!("{}_{}.csv", kind.file_stem(), brand_slug(brand)))
                    .display()
                    .to_string(),
            )
        })?;
        let table = Self::read_table(path).await?;
        debug!(rows = table.len(), "table loaded");
        Ok(table)
    }

    #[instrument(skip(self))]
    async fn optional_table(&self, kind: FactKind, brand: &str) -> ImportResult<Option<RawTable>> {
        match self.resolve(kind, brand) {
            Some(path) => Ok(Some(Self::read_table(path).await?)),
            None => {
                debug!("optional table absent");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl FactSource for FileFactSource {
    async fn load_sales(&self, brand: &str) -> ImportResult<Frame<SalesFact>> {
        let table = self.required_table(FactKind::Sales, brand).await?;
        FieldMapper.map_sales(&table)
    }

    async fn load_shipments(&self, brand: &str) -> ImportResult<Frame<ShipmentFact>> {
        let table = self.required_table(FactKind::Shipments, brand).await?;
        FieldMapper.map_shipments(&table)
    }

    async fn load_region_shipments(&self, brand: &str) -> ImportResult<Frame<RegionShipment>> {
        let table = self.required_table(FactKind::Shipments, brand).await?;
        FieldMapper.map_region_shipments(&table)
    }

    async fn load_inventory(&self, brand: &str) -> ImportResult<Frame<InventoryFact>> {
        let table = self.required_table(FactKind::InventoryLedger, brand).await?;
        FieldMapper.map_inventory(&table)
    }

    async fn load_secondary(&self, brand: &str) -> ImportResult<Option<Frame<SecondaryStockLot>>> {
        self.optional_table(FactKind::SecondaryStock, brand)
            .await?
            .map(|t| FieldMapper.map_secondary(&t))
            .transpose()
    }

    async fn load_buffer(&self, brand: &str) -> ImportResult<Option<Frame<BufferStock>>> {
        self.optional_table(FactKind::BufferStock, brand)
            .await?
            .map(|t| FieldMapper.map_buffer(&t))
            .transpose()
    }

    /// 箱规表缺失时返回空表 (不做箱规取整)
    async fn load_lot_sizes(&self, brand: &str) -> ImportResult<Frame<LotSize>> {
        Ok(self
            .optional_table(FactKind::LotSizes, brand)
            .await?
            .map(|t| FieldMapper.map_lot_sizes(&t))
            .transpose()?
            .unwrap_or_else(Frame::empty))
    }

    async fn load_categories(&self, brand: &str) -> ImportResult<Frame<CategoryRef>> {
        Ok(self
            .optional_table(FactKind::Categories, brand)
            .await?
            .map(|t| FieldMapper.map_categories(&t))
            .transpose()?
            .unwrap_or_else(Frame::empty))
    }

    async fn load_outward_shipments(&self, brand: &str) -> ImportResult<Frame<OutwardShipment>> {
        Ok(self
            .optional_table(FactKind::OutwardShipments, brand)
            .await?
            .map(|t| FieldMapper.map_outward_shipments(&t))
            .transpose()?
            .unwrap_or_else(Frame::empty))
    }

    async fn load_model_inventory(&self, brand: &str) -> ImportResult<Option<Frame<ModelInventory>>> {
        self.optional_table(FactKind::ModelInventory, brand)
            .await?
            .map(|t| FieldMapper.map_model_inventory(&t))
            .transpose()
    }

    async fn load_stock_positions(
        &self,
        brand: &str,
    ) -> ImportResult<Option<Frame<ModelStockPosition>>> {
        self.optional_table(FactKind::StockPositions, brand)
            .await?
            .map(|t| FieldMapper.map_stock_positions(&t))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_brand_slug() {
        assert_eq!(brand_slug("  White  Mulberry "), "white_mulberry");
        assert_eq!(brand_slug("Nexlev"), "nexlev");
    }

    #[tokio::test]
    async fn test_file_source_loads_csv_and_optional_tables() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("inventory_ledger_acme.csv"),
            "MSKU,Location,Disposition,Ending Warehouse Balance\nsku1,del4,SELLABLE,12\n",
        )
        .unwrap();

        let source = FileFactSource::new(dir.path());
        let inventory = source.load_inventory("ACME").await.unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.rows()[0].fc, "DEL4");

        assert!(source.load_secondary("ACME").await.unwrap().is_none());
        assert!(source.load_lot_sizes("ACME").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_required_file() {
        let dir = TempDir::new().unwrap();
        let source = FileFactSource::new(dir.path());
        let result = source.load_sales("ACME").await;
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }
}
