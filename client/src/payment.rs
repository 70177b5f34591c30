//! Payment data exchanged with the disperser, and the metering arithmetic
//! the [crate::accountant::Accountant] applies to it.

use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::types::{keccak256, AccountId, QuorumId};

/// Number of period records kept per quorum.
pub const MIN_NUM_BINS: u32 = 3;

/// Quorum whose configuration prices on-demand dispersal.
pub const ON_DEMAND_QUORUM_ID: QuorumId = 0;

/// Proof of payment attached to every blob header.
///
/// A zero `cumulative_payment` means the blob was paid for by a
/// reservation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentMetadata {
    pub account_id: AccountId,
    /// Nanoseconds since the unix epoch.
    pub timestamp: i64,
    pub cumulative_payment: BigUint,
}

impl PaymentMetadata {
    pub fn is_on_demand(&self) -> bool {
        !self.cumulative_payment.is_zero()
    }

    /// Keccak-256 over the account, the timestamp and the cumulative
    /// payment.
    pub fn hash(&self) -> [u8; 32] {
        let mut data = Vec::with_capacity(64);
        data.extend_from_slice(&self.account_id.0);
        data.extend_from_slice(&self.timestamp.to_be_bytes());
        let payment = self.cumulative_payment.to_bytes_be();
        data.extend_from_slice(&(payment.len() as u32).to_be_bytes());
        data.extend_from_slice(&payment);
        keccak256(&data)
    }
}

/// A reservation of bandwidth on one quorum, valid between two unix
/// timestamps in seconds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedPayment {
    pub symbols_per_second: u64,
    pub start_timestamp: u64,
    pub end_timestamp: u64,
}

impl ReservedPayment {
    pub fn is_active(&self, timestamp_seconds: u64) -> bool {
        self.start_timestamp <= timestamp_seconds && timestamp_seconds <= self.end_timestamp
    }

    pub fn is_active_by_nanosecond(&self, timestamp_ns: i64) -> bool {
        if timestamp_ns < 0 {
            return false;
        }
        self.is_active(timestamp_ns as u64 / 1_000_000_000)
    }
}

/// The deposit an account holds on chain for on-demand dispersal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OnDemandPayment {
    pub cumulative_payment: BigUint,
}

/// Usage of one reservation period.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// Start of the period, in seconds. Always a multiple of the
    /// reservation window.
    pub index: u64,
    pub usage: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentQuorumConfig {
    pub reservation_symbols_per_second: u64,
    pub on_demand_symbols_per_second: u64,
    pub on_demand_price_per_symbol: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentQuorumProtocolConfig {
    pub min_num_symbols: u64,
    pub reservation_advance_window: u64,
    /// Length of a reservation period, in seconds.
    pub reservation_rate_limit_window: u64,
    pub on_demand_rate_limit_window: u64,
    pub on_demand_enabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVaultParams {
    pub quorum_payment_configs: Option<HashMap<QuorumId, PaymentQuorumConfig>>,
    pub quorum_protocol_configs: Option<HashMap<QuorumId, PaymentQuorumProtocolConfig>>,
}

/// Snapshot of an account's payment state, as returned by the disperser.
///
/// Only the vault params are required. Everything else defaults to empty
/// or zero when absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaymentStateSnapshot {
    pub payment_vault_params: Option<PaymentVaultParams>,
    pub period_records: Option<HashMap<QuorumId, Vec<PeriodRecord>>>,
    pub reservations: Option<HashMap<QuorumId, ReservedPayment>>,
    pub cumulative_payment: Option<BigUint>,
    pub onchain_cumulative_payment: Option<BigUint>,
}

/// Start, in seconds, of the reservation period holding `timestamp`.
pub fn get_reservation_period(timestamp_seconds: u64, window: u64) -> u64 {
    if window == 0 {
        return 0;
    }
    timestamp_seconds / window * window
}

/// Same as [get_reservation_period] for a nanosecond timestamp. Negative
/// timestamps map to period 0.
pub fn get_reservation_period_by_nanosecond(timestamp_ns: i64, window: u64) -> u64 {
    if timestamp_ns < 0 {
        return 0;
    }
    get_reservation_period(timestamp_ns as u64 / 1_000_000_000, window)
}

/// The period that absorbs the excess of a request overflowing `period`.
pub fn get_overflow_period(period: u64, window: u64) -> u64 {
    period.saturating_add(window)
}

/// Maximum number of symbols a reservation allows per period. Saturates
/// at `u64::MAX`.
pub fn get_bin_limit(symbols_per_second: u64, window: u64) -> u64 {
    symbols_per_second.saturating_mul(window)
}

/// Ring slot of a period.
pub fn period_slot(period: u64, window: u64) -> usize {
    if window == 0 {
        return 0;
    }
    ((period / window) % MIN_NUM_BINS as u64) as usize
}

/// Number of symbols billed for a blob: never less than the quorum's
/// minimum.
pub fn symbols_charged(num_symbols: u64, min_num_symbols: u64) -> u64 {
    num_symbols.max(min_num_symbols)
}

pub fn payment_charged(num_symbols: u64, price_per_symbol: u64) -> BigUint {
    BigUint::from(num_symbols) * BigUint::from(price_per_symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_period() {
        assert_eq!(get_reservation_period(0, 5), 0);
        assert_eq!(get_reservation_period(4, 5), 0);
        assert_eq!(get_reservation_period(5, 5), 5);
        assert_eq!(get_reservation_period(12, 5), 10);
        assert_eq!(get_reservation_period(12, 0), 0);

        assert_eq!(get_reservation_period_by_nanosecond(-1, 5), 0);
        assert_eq!(
            get_reservation_period_by_nanosecond(12_500_000_000, 5),
            10
        );
    }

    #[test]
    fn test_period_slots_rotate() {
        let slots: Vec<usize> = (0..6).map(|i| period_slot(i * 5, 5)).collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(
            period_slot(get_overflow_period(10, 5), 5),
            (period_slot(10, 5) + 1) % 3
        );
    }

    #[test]
    fn test_charges() {
        assert_eq!(symbols_charged(50, 100), 100);
        assert_eq!(symbols_charged(150, 100), 150);
        assert_eq!(payment_charged(150, 3), BigUint::from(450u32));
        assert_eq!(get_bin_limit(200, 5), 1000);
        assert_eq!(get_bin_limit(u64::MAX / 2, 5), u64::MAX);
        assert_eq!(get_overflow_period(u64::MAX - 2, 5), u64::MAX);
    }

    #[test]
    fn test_reservation_activity() {
        let reservation = ReservedPayment {
            symbols_per_second: 10,
            start_timestamp: 100,
            end_timestamp: 200,
        };
        assert!(reservation.is_active(100));
        assert!(reservation.is_active(200));
        assert!(!reservation.is_active(201));
        assert!(reservation.is_active_by_nanosecond(150_000_000_000));
        assert!(!reservation.is_active_by_nanosecond(-5));
    }

    #[test]
    fn test_payment_metadata_hash() {
        let reservation = PaymentMetadata {
            timestamp: 7,
            ..Default::default()
        };
        let on_demand = PaymentMetadata {
            timestamp: 7,
            cumulative_payment: BigUint::from(1u8),
            ..Default::default()
        };
        assert!(!reservation.is_on_demand());
        assert!(on_demand.is_on_demand());
        assert_ne!(reservation.hash(), on_demand.hash());
        assert_eq!(reservation.hash(), reservation.clone().hash());
    }
}
