use super::{round_to, slot_duration, LocalDateTime, Price};

/// The cheapest contiguous charging window found before a deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingBlock {
    pub start: LocalDateTime,
    pub end: LocalDateTime,
    pub slot_count: usize,
    /// Sum of slot prices, rounded to 4 decimal places
    pub total_cost: f64,
    /// Mean slot price, rounded to 4 decimal places
    pub average_cost: f64,
}

impl ChargingBlock {
    /// Build from the first slot start and the unrounded sum of slot prices.
    pub fn from_window(
        start: LocalDateTime,
        last_slot_start: LocalDateTime,
        slot_count: usize,
        total: Price,
    ) -> Self {
        let total = total.as_pounds_per_kwh();
        Self {
            start,
            end: last_slot_start + slot_duration(),
            slot_count,
            total_cost: round_to(total, 4),
            average_cost: round_to(total / slot_count as f64, 4),
        }
    }

    /// True while `now` falls inside `[start, end)`
    pub fn is_active(&self, now: &LocalDateTime) -> bool {
        *now >= self.start && *now < self.end
    }
}
