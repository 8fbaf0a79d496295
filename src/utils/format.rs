/// Number of decimal places of the ledger's base unit.
pub const SATOSHI_DECIMALS: u32 = 8;

/// Render an integer amount of base units with `decimals` decimal places.
///
/// Uses integer arithmetic so large amounts keep every digit.
pub fn format_amount(amount: u64, decimals: u32) -> String {
    if decimals == 0 {
        return amount.to_string();
    }

    let scale = 10u128.pow(decimals);
    let amount = u128::from(amount);
    format!(
        "{}.{:0width$}",
        amount / scale,
        amount % scale,
        width = decimals as usize
    )
}
