// ==========================================
// 库存补货调拨系统 - 数值工具
// ==========================================
// 职责: 除零替换、四舍五入、箱规取整
// 说明: 所有近似处理集中在此,便于测试
// ==========================================

/// 安全除法
///
/// 分母为 0 或结果非有限值 (±inf / NaN) 时返回 `default`。
pub fn safe_divide(numerator: f64, denominator: f64, default: f64) -> f64 {
    if denominator == 0.0 {
        return default;
    }
    let v = numerator / denominator;
    if v.is_finite() {
        v
    } else {
        default
    }
}

/// 覆盖周数近似计算
///
/// 周销量为 0 时以 1 作为除数,结果仅用于排序展示,不具备业务含义。
///
/// # 返回
/// (coverage_weeks, 是否为近似值)
pub fn approximate_coverage(inventory: f64, weekly_velocity: f64) -> (f64, bool) {
    if weekly_velocity == 0.0 {
        (inventory, true)
    } else {
        (safe_divide(inventory, weekly_velocity, 0.0), false)
    }
}

/// 保留两位小数
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// 四舍五入到整数单位
pub fn round_units(v: f64) -> i64 {
    if v.is_finite() {
        v.round() as i64
    } else {
        0
    }
}

/// 向下取整到整数单位,下限 0
pub fn floor_units(v: f64) -> i64 {
    if v.is_finite() && v > 0.0 {
        v.floor() as i64
    } else {
        0
    }
}

/// 向上取整到箱规倍数
///
/// - quantity ≤ 0 → 0
/// - lot_size ≤ 0 → 不取整
pub fn round_up_to_lot(quantity: i64, lot_size: i64) -> i64 {
    if quantity <= 0 {
        return 0;
    }
    if lot_size <= 0 {
        return quantity;
    }
    ((quantity + lot_size - 1) / lot_size) * lot_size
}

/// 非有限值归零
pub fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_divide() {
        assert_eq!(safe_divide(10.0, 4.0, 0.0), 2.5);
        assert_eq!(safe_divide(10.0, 0.0, 0.0), 0.0);
        assert_eq!(safe_divide(f64::NAN, 1.0, 0.0), 0.0);
        assert_eq!(safe_divide(f64::INFINITY, 1.0, 7.0), 7.0);
    }

    #[test]
    fn test_approximate_coverage_zero_velocity() {
        assert_eq!(approximate_coverage(30.0, 0.0), (30.0, true));
        assert_eq!(approximate_coverage(30.0, 10.0), (3.0, false));
    }

    #[test]
    fn test_round_up_to_lot() {
        assert_eq!(round_up_to_lot(41, 20), 60);
        assert_eq!(round_up_to_lot(40, 20), 40);
        assert_eq!(round_up_to_lot(0, 20), 0);
        assert_eq!(round_up_to_lot(-5, 20), 0);
        assert_eq!(round_up_to_lot(13, 0), 13);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.0 / 4.285), 2.33);
        assert_eq!(round2(2.345678), 2.35);
    }
}
