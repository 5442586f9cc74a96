// ==========================================
// 计算管线集成测试
// ==========================================
// 测试目标: 多 SKU / 多 FC 场景下三条管线的整体约束
// ==========================================

use chrono::{Duration, NaiveDate};
use fc_replenishment::config::PlanningParams;
use fc_replenishment::domain::facts::{
    CategoryRef, InventoryFact, LotSize, ModelInventory, ModelStockPosition, SalesFact,
    ShipmentFact,
};
use fc_replenishment::domain::types::{Category, Disposition, Granularity, InventoryKind};
use fc_replenishment::domain::Frame;
use fc_replenishment::engine::allocation::UNKNOWN_MODEL;
use fc_replenishment::engine::{AllocationGovernor, FcPlanner, PlanningInputs, PlanningOrchestrator};
use fc_replenishment::importer::{FieldMapper, RawTable};
use std::collections::HashMap;

fn week(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::weeks(n)
}

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + Duration::days(n)
}

fn sellable(sku: &str, fc: &str, quantity: i64) -> InventoryFact {
    InventoryFact {
        sku: sku.to_string(),
        fc: fc.to_string(),
        disposition: Disposition::Sellable,
        quantity,
        aging_days: None,
    }
}

/// 两个 SKU: A (受管控, 型号 M1), B (豁免, 型号 M2)
fn create_test_inputs() -> PlanningInputs {
    let mut sales = Vec::new();
    for i in 0..8 {
        for (sku, units) in [("A", 10), ("B", 4)] {
            sales.push(SalesFact {
                sku: sku.to_string(),
                fc: None,
                channel: None,
                period: week(i),
                units_sold: units,
            });
        }
    }

    let mut shipments = Vec::new();
    for d in 0..30 {
        for (sku, fc, qty) in [("A", "DEL4", 2), ("A", "BLR7", 1), ("B", "HYD8", 1)] {
            shipments.push(ShipmentFact {
                sku: sku.to_string(),
                fc: fc.to_string(),
                channel: None,
                shipment_date: day(d),
                quantity: qty,
            });
        }
    }

    let inventory = vec![
        sellable("A", "DEL4", 5),
        sellable("A", "BLR7", 200),
        sellable("B", "HYD8", 2),
        InventoryFact {
            sku: "B".to_string(),
            fc: "HYD8".to_string(),
            disposition: Disposition::Recalled,
            quantity: 1,
            aging_days: None,
        },
    ];

    PlanningInputs::new(
        Frame::from_rows(sales),
        Frame::from_rows(shipments),
        Frame::from_rows(inventory),
        Frame::from_rows(vec![
            LotSize {
                sku: "A".to_string(),
                lot_size: 6,
            },
            LotSize {
                sku: "B".to_string(),
                lot_size: 5,
            },
        ]),
        Frame::from_rows(vec![
            CategoryRef {
                sku: "A".to_string(),
                model: Some("M1".to_string()),
                category: Some(Category::Governed),
            },
            CategoryRef {
                sku: "B".to_string(),
                model: Some("M2".to_string()),
                category: Some(Category::Exempt),
            },
        ]),
    )
}

#[test]
fn test_sku_pipeline_multi_sku() {
    let out = PlanningOrchestrator::new()
        .run_sku_pipeline(&create_test_inputs(), &PlanningParams::for_account("ACME"))
        .unwrap();

    let by_sku: HashMap<&str, _> = out.shortfalls.iter().map(|r| (r.sku.as_str(), r)).collect();
    assert_eq!(by_sku.len(), 2);

    let a = by_sku["A"];
    assert_eq!(a.shortfall, 0);

    // B: 需求 8, 净库存 2 - 1 = 1, 缺口 7 → 箱规 5 取整为 10
    let b = by_sku["B"];
    assert_eq!(b.requirement, 8);
    assert_eq!(b.net_available, 1);
    assert_eq!(b.raw_shortfall, 7);
    assert_eq!(b.shortfall, 10);
    assert_eq!(b.shortfall % 5, 0);

    for row in &out.shortfalls {
        assert!(row.capped_shortfall <= row.safety_cap);
        assert!(row.capped_shortfall <= row.raw_shortfall);
        assert!(row.fc.is_none());
    }
}

#[test]
fn test_sku_pipeline_fc_granularity() {
    let out = PlanningOrchestrator::new()
        .with_granularity(Granularity::SkuFc)
        .run_sku_pipeline(&create_test_inputs(), &PlanningParams::for_account("ACME"))
        .unwrap();
    assert!(out.net_inventory.iter().all(|r| r.fc.is_some()));
}

#[test]
fn test_fc_pipeline_invariants() {
    let inputs = create_test_inputs();
    let out = PlanningOrchestrator::new()
        .run_fc_pipeline(&inputs, &PlanningParams::for_account("ACME"))
        .unwrap();

    // 调出量不超过调出仓库存
    let mut moved: HashMap<(String, String), i64> = HashMap::new();
    for t in &out.transfers {
        assert_ne!(t.from_fc, t.to_fc);
        assert!(t.transfer_qty >= 1);
        *moved.entry((t.sku.clone(), t.from_fc.clone())).or_default() += t.transfer_qty;
    }
    for ((sku, fc), qty) in moved {
        let stock: i64 = inputs
            .inventory
            .rows()
            .iter()
            .filter(|r| r.sku == sku && r.fc == fc && r.disposition == Disposition::Sellable)
            .map(|r| r.quantity)
            .sum();
        assert!(qty <= stock, "{}@{} moved {} of {}", sku, fc, qty, stock);
    }

    // 每个计划行恰有一条分配行
    assert_eq!(out.allocations.len(), out.plan.len());
    for a in &out.allocations {
        assert!(a.send_qty >= 0.0);
        assert!(a.send_qty <= a.original_required_units.max(0.0) + 1e-9);
    }
    let b = out.allocations.iter().find(|a| a.sku == "B").unwrap();
    assert_eq!(b.category, Some(Category::Exempt));
    assert_eq!(b.model, "M2");

    assert!(out.validation.overall_status.is_pass());
}

#[test]
fn test_model_pipeline_with_snapshots() {
    let mut inputs = create_test_inputs();
    inputs.model_inventory = Some(Frame::from_rows(vec![
        ModelInventory {
            model: "M1".to_string(),
            channel: "warehouse".to_string(),
            kind: InventoryKind::OnHand,
            quantity: 40,
        },
        ModelInventory {
            model: "M1".to_string(),
            channel: "open order".to_string(),
            kind: InventoryKind::OpenOrder,
            quantity: 25,
        },
    ]));
    inputs.stock_positions = Some(Frame::from_rows(vec![ModelStockPosition {
        model: "M1".to_string(),
        marketplace_inventory: 30,
        warehouse_inventory: 20,
    }]));

    let out = PlanningOrchestrator::new()
        .run_model_pipeline(&inputs, &PlanningParams::for_account("ACME"))
        .unwrap();

    let reorder = out
        .supplier_reorder
        .iter()
        .find(|r| r.model == "M1")
        .expect("M1 reorder row");
    assert_eq!(reorder.current_inventory, 40);
    assert_eq!(reorder.open_order_qty, 25);
    assert!(reorder.suggested_reorder >= 0.0);

    assert_eq!(out.warehouse_replenishment.len(), 1);
    let row = &out.warehouse_replenishment[0];
    // 周销 10 × 8 周 = 80; 平台 30 → 补 50; 仓库 20 → 缺口 30
    assert_eq!(row.required_units, 80);
    assert_eq!(row.replenishment_qty, 50);
    assert_eq!(row.warehouse_shortfall, 30);
    assert!(!row.is_risky);
    assert!(!row.is_overstock);
}

/// 只有 SKU 与品类列、没有型号列的主数据表
fn create_sku_master_without_model() -> Frame<CategoryRef> {
    let table = RawTable::from_parts(
        "sku_master",
        &["SKU".to_string(), "Hazmat/non-Hazmat".to_string()],
        vec![
            vec!["A".to_string(), "IXD".to_string()],
            vec!["B".to_string(), "Non-IXD".to_string()],
        ],
    );
    FieldMapper.map_categories(&table).unwrap()
}

#[test]
fn test_allocation_accepts_sku_master_without_model_column() {
    let categories = create_sku_master_without_model();
    assert!(!categories.has_column("model"));

    let plan = vec![FcPlanner::plan_row("A", "DEL4", 0, 12.5, 0.0, 8)];
    let out = AllocationGovernor::default()
        .allocate(&plan, &[], &categories, 8)
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].model, UNKNOWN_MODEL);
    assert_eq!(out[0].category, Some(Category::Governed));
    assert_eq!(out[0].send_qty, 35.0);
}

#[test]
fn test_fc_pipeline_with_partial_sku_master() {
    let mut inputs = create_test_inputs();
    inputs.categories = create_sku_master_without_model();

    let out = PlanningOrchestrator::new()
        .run_fc_pipeline(&inputs, &PlanningParams::for_account("ACME"))
        .unwrap();

    assert_eq!(out.allocations.len(), out.plan.len());
    assert!(out.allocations.iter().all(|a| a.model == UNKNOWN_MODEL));
    let b = out.allocations.iter().find(|a| a.sku == "B").unwrap();
    assert_eq!(b.category, Some(Category::Exempt));
}
