// ==========================================
// 库存补货调拨系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 库存处置状态 (Disposition)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与台账导出一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    Sellable, // 可售
    Damaged,  // 残损 (承运/客户/仓库/缺陷)
    Recalled, // 召回
    Other,    // 其他 (丢失等)
}

impl Disposition {
    /// 从台账原始值解析
    ///
    /// 台账中的残损类值 (CARRIER_DAMAGED / CUSTOMER_DAMAGED / WAREHOUSE_DAMAGED / DEFECTIVE)
    /// 统一归为 Damaged；无法识别的值归为 Other，不报错。
    pub fn parse(raw: &str) -> Self {
        let v = raw.trim().to_uppercase();
        match v.as_str() {
            "SELLABLE" => Disposition::Sellable,
            "RECALL" | "RECALLED" => Disposition::Recalled,
            "DEFECTIVE" => Disposition::Damaged,
            s if s.ends_with("DAMAGED") => Disposition::Damaged,
            _ => Disposition::Other,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Sellable => write!(f, "SELLABLE"),
            Disposition::Damaged => write!(f, "DAMAGED"),
            Disposition::Recalled => write!(f, "RECALLED"),
            Disposition::Other => write!(f, "OTHER"),
        }
    }
}

// ==========================================
// 治理品类 (Governance Category)
// ==========================================
// Governed: 受管控品类 (按治理比例限发)
// Exempt: 豁免品类 (按需全量发送)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Governed,
    Exempt,
}

impl Category {
    /// 从品类主数据的标记列解析
    ///
    /// 规则: 标记中包含 "non-ixd" 的为豁免，其余 (含 Hazmat / non-Hazmat) 均受管控。
    /// 空标记返回 None，由调用方按缺失处理。
    pub fn from_reference_flag(raw: &str) -> Option<Self> {
        let v = raw.trim().to_lowercase();
        if v.is_empty() || v == "-" {
            return None;
        }
        if v.contains("non-ixd") || v == "exempt" {
            Some(Category::Exempt)
        } else {
            Some(Category::Governed)
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Governed => write!(f, "GOVERNED"),
            Category::Exempt => write!(f, "EXEMPT"),
        }
    }
}

// ==========================================
// 分配标记 (Allocation Flag)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationFlag {
    NoRequirement, // 无需求
    Short,         // 满足率不足
    Ok,            // 正常
}

impl fmt::Display for AllocationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationFlag::NoRequirement => write!(f, "NO_REQUIREMENT"),
            AllocationFlag::Short => write!(f, "SHORT"),
            AllocationFlag::Ok => write!(f, "OK"),
        }
    }
}

// ==========================================
// 校验状态 (Check Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, CheckStatus::Pass)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "PASS"),
            CheckStatus::Fail => write!(f, "FAIL"),
        }
    }
}

// ==========================================
// 补货运行状态 (Run Status)
// ==========================================
// 状态流转: DRAFT -> LOCKED | BLOCKED (终态不可再变更)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Draft,   // 计算中
    Locked,  // 已锁定 (结果已落库)
    Blocked, // 已阻断 (校验/对账失败)
}

impl RunStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "DRAFT" => Some(RunStatus::Draft),
            "LOCKED" => Some(RunStatus::Locked),
            "BLOCKED" => Some(RunStatus::Blocked),
            _ => None,
        }
    }

    /// 是否允许从当前状态流转到目标状态
    pub fn can_transition_to(&self, target: RunStatus) -> bool {
        matches!(
            (self, target),
            (RunStatus::Draft, RunStatus::Locked) | (RunStatus::Draft, RunStatus::Blocked)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Draft => write!(f, "DRAFT"),
            RunStatus::Locked => write!(f, "LOCKED"),
            RunStatus::Blocked => write!(f, "BLOCKED"),
        }
    }
}

// ==========================================
// 型号库存类别 (Model Inventory Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryKind {
    OnHand,    // 在库
    OpenOrder, // 已下单未到货
    InTransit, // 在途
}

impl InventoryKind {
    /// 按快照中的渠道与类型列判定库存类别
    ///
    /// 渠道为 "open order" 或类型为 "in-transit inventory" 的行归为未到货。
    pub fn classify(channel: &str, kind: Option<&str>) -> Self {
        let channel = channel.trim().to_lowercase();
        let kind = kind.map(|k| k.trim().to_lowercase()).unwrap_or_default();
        if channel == "open order" {
            InventoryKind::OpenOrder
        } else if kind == "in-transit inventory" {
            InventoryKind::InTransit
        } else {
            InventoryKind::OnHand
        }
    }

    pub fn is_inbound(&self) -> bool {
        !matches!(self, InventoryKind::OnHand)
    }
}

// ==========================================
// 渠道过滤 (Channel Filter)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelFilter {
    All,
    Named(String),
}

impl ChannelFilter {
    /// "all" (大小写不敏感) 或空串视为不过滤
    pub fn parse(raw: &str) -> Self {
        let v = raw.trim().to_lowercase();
        if v.is_empty() || v == "all" {
            ChannelFilter::All
        } else {
            ChannelFilter::Named(v)
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, ChannelFilter::All)
    }

    pub fn matches(&self, channel: Option<&str>) -> bool {
        match self {
            ChannelFilter::All => true,
            ChannelFilter::Named(name) => channel
                .map(|c| c.trim().to_lowercase() == *name)
                .unwrap_or(false),
        }
    }
}

impl Default for ChannelFilter {
    fn default() -> Self {
        ChannelFilter::All
    }
}

impl fmt::Display for ChannelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelFilter::All => write!(f, "all"),
            ChannelFilter::Named(name) => write!(f, "{}", name),
        }
    }
}

// ==========================================
// 计算粒度 (Granularity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    Sku,   // 按 SKU 汇总
    SkuFc, // 按 (SKU, FC)
}
