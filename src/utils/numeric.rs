/// 依 f64 的精確二進位值捨入到指定小數位數，恰好一半時取偶數
pub fn round_to(value: f64, decimals: usize) -> f64 {
    // 固定小數格式化是正確捨入的，剛好落在中點時進位到偶數
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1688.8888, 1), 1688.9);
        assert_eq!(round_to(0.473_684_2, 4), 0.4737);
        assert_eq!(round_to(17.594, 2), 17.59);
        assert_eq!(round_to(-0.0, 2), 0.0);
    }

    #[test]
    fn test_round_to_ties_go_to_even() {
        assert_eq!(round_to(451.25, 1), 451.2);
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(0.375, 2), 0.38);
        assert_eq!(round_to(2.5, 0), 2.0);
    }

    #[test]
    fn test_round_to_uses_binary_value() {
        // 2.675 實際略小於 2.675
        assert_eq!(round_to(2.675, 2), 2.67);
        assert_eq!(round_to(1.005, 2), 1.0);
    }
}
