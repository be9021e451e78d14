use crate::models::{CandleDirection, Indicators, Setup, StratNumber, StratPattern, TradeSignal};

const TWO_DOWN_TWO_DOWN: [StratNumber; 2] = [StratNumber::TwoDown, StratNumber::TwoDown];
const TWO_UP_TWO_UP: [StratNumber; 2] = [StratNumber::TwoUp, StratNumber::TwoUp];

/// Derive the trade signal from the 15m strat reading.
///
/// Two consecutive 2d bars closed by a green candle is a reversal buy; the mirror
/// image (two 2u bars closed by a red candle) is a sell.
pub fn identify_signal(indicators: &Indicators) -> TradeSignal {
    let pattern = &indicators.strat_15m;
    match indicators.strat_candle_15m_direction {
        CandleDirection::Green if pattern.ends_with(&TWO_DOWN_TWO_DOWN) => TradeSignal::Buy,
        CandleDirection::Red if pattern.ends_with(&TWO_UP_TWO_UP) => TradeSignal::Sell,
        _ => TradeSignal::NoSignal,
    }
}

/// Weekend scan label for one symbol
pub fn classify_setup(
    daily: &StratPattern,
    daily_direction: CandleDirection,
    weekly: &StratPattern,
) -> Setup {
    if daily_direction == CandleDirection::Green && daily.ends_with(&TWO_DOWN_TWO_DOWN) {
        Setup::BullishReversal
    } else if daily_direction == CandleDirection::Red && daily.ends_with(&TWO_UP_TWO_UP) {
        Setup::BearishReversal
    } else if weekly.latest() == Some(StratNumber::Inside) {
        Setup::InsideWeek
    } else {
        Setup::None
    }
}
