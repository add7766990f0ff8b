//! PriceSeries: validated, strictly time-ordered bar history.
//!
//! The series never re-sorts its input. A timestamp that does not strictly
//! follow its predecessor is rejected with `OutOfOrderData`.

use serde::Serialize;

use super::PriceBar;
use crate::error::ScanError;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, ScanError> {
        for (index, bar) in bars.iter().enumerate() {
            check_bar(index, bar, index.checked_sub(1).map(|p| &bars[p]))?;
        }
        Ok(Self { bars })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Append one bar, enforcing the same invariants as `new`.
    pub fn push(&mut self, bar: PriceBar) -> Result<(), ScanError> {
        check_bar(self.bars.len(), &bar, self.bars.last())?;
        self.bars.push(bar);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<PriceBar> {
        self.bars.pop()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Index of the most recent bar.
    pub fn last_index(&self) -> Option<usize> {
        self.bars.len().checked_sub(1)
    }

    /// Series truncated to `bars[..=index]`. Used for point-in-time replay.
    pub fn truncated(&self, index: usize) -> Self {
        let end = (index + 1).min(self.bars.len());
        Self {
            bars: self.bars[..end].to_vec(),
        }
    }

    pub fn into_bars(self) -> Vec<PriceBar> {
        self.bars
    }
}

fn check_bar(index: usize, bar: &PriceBar, previous: Option<&PriceBar>) -> Result<(), ScanError> {
    if let Some(reason) = bar.sanity_violation() {
        return Err(ScanError::InvalidBar {
            index,
            reason: reason.to_string(),
        });
    }
    if let Some(prev) = previous {
        if bar.timestamp <= prev.timestamp {
            return Err(ScanError::OutOfOrderData {
                index,
                previous: prev.timestamp,
                current: bar.timestamp,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::bars_from_closes;

    #[test]
    fn accepts_increasing_timestamps() {
        let series = PriceSeries::new(bars_from_closes(&[10.0, 11.0, 12.0])).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.last_index(), Some(2));
    }

    #[test]
    fn rejects_out_of_order_without_resorting() {
        let mut bars = bars_from_closes(&[10.0, 11.0, 12.0]);
        bars.swap(1, 2);
        let err = PriceSeries::new(bars).unwrap_err();
        assert!(matches!(err, ScanError::OutOfOrderData { index: 1, .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let mut bars = bars_from_closes(&[10.0, 11.0]);
        bars[1].timestamp = bars[0].timestamp;
        assert!(matches!(
            PriceSeries::new(bars),
            Err(ScanError::OutOfOrderData { index: 1, .. })
        ));
    }

    #[test]
    fn push_enforces_order() {
        let bars = bars_from_closes(&[10.0, 11.0, 12.0]);
        let mut series = PriceSeries::new(bars[..2].to_vec()).unwrap();
        series.push(bars[2]).unwrap();
        assert!(matches!(
            series.push(bars[0]),
            Err(ScanError::OutOfOrderData { index: 3, .. })
        ));
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn rejects_insane_bar() {
        let mut bars = bars_from_closes(&[10.0, 11.0]);
        bars[1].high = bars[1].low - 1.0;
        assert!(matches!(
            PriceSeries::new(bars),
            Err(ScanError::InvalidBar { index: 1, .. })
        ));
    }

    #[test]
    fn truncated_keeps_prefix() {
        let series = PriceSeries::new(bars_from_closes(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        let head = series.truncated(1);
        assert_eq!(head.len(), 2);
        assert_eq!(head.last().unwrap().close, 2.0);
        assert_eq!(series.truncated(10).len(), 4);
    }
}
