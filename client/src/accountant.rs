use std::collections::HashMap;

use num_bigint::BigUint;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    errors::PaymentError,
    payment::{
        get_bin_limit, get_overflow_period, get_reservation_period_by_nanosecond,
        payment_charged, period_slot, symbols_charged, OnDemandPayment, PaymentMetadata,
        PaymentQuorumConfig, PaymentQuorumProtocolConfig, PaymentStateSnapshot, PeriodRecord,
        ReservedPayment, MIN_NUM_BINS, ON_DEMAND_QUORUM_ID,
    },
    types::{AccountId, QuorumId},
};

type PeriodRing = [PeriodRecord; MIN_NUM_BINS as usize];

#[derive(Debug, Default)]
struct ReservationState {
    reservations: HashMap<QuorumId, ReservedPayment>,
    period_records: HashMap<QuorumId, PeriodRing>,
    payment_configs: HashMap<QuorumId, PaymentQuorumConfig>,
    protocol_configs: HashMap<QuorumId, PaymentQuorumProtocolConfig>,
}

#[derive(Debug, Default)]
struct OnDemandState {
    /// Total charged so far by this client.
    cumulative_payment: BigUint,
    /// Deposit held on chain, the ceiling for `cumulative_payment`.
    on_demand: OnDemandPayment,
    on_demand_quorums: Vec<QuorumId>,
    min_num_symbols: Option<u64>,
    price_per_symbol: Option<u64>,
}

/// A period record slot touched by the current call, and its value before
/// the call.
struct Touched {
    quorum: QuorumId,
    slot: usize,
    previous: PeriodRecord,
}

/// Tracks the payment state of one account and decides how each blob is
/// paid for.
///
/// Blobs are charged against the account's per quorum reservations when
/// they fit, and against the on-demand deposit otherwise. Reservation usage
/// lives in a ring of [MIN_NUM_BINS] period records per quorum, where a
/// slot that holds a stale period is reset the first time it is read.
///
/// Reservation state and on-demand state sit behind separate locks, and no
/// call ever holds both.
#[derive(Debug)]
pub struct Accountant {
    account_id: AccountId,
    reservation_state: Mutex<ReservationState>,
    on_demand_state: Mutex<OnDemandState>,
}

impl Accountant {
    /// An accountant with no payment state. Call
    /// [Accountant::set_payment_state] before accounting blobs.
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            reservation_state: Mutex::new(ReservationState::default()),
            on_demand_state: Mutex::new(OnDemandState::default()),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Decides how a blob of `num_symbols` dispersed at `timestamp_ns` to
    /// `quorums` is paid for, and records the usage.
    ///
    /// A reservation payment returns metadata with a zero cumulative
    /// payment. An on-demand payment returns the new cumulative total. A
    /// failed call leaves the state untouched.
    pub fn account_blob(
        &self,
        timestamp_ns: i64,
        num_symbols: u64,
        quorums: &[QuorumId],
    ) -> Result<PaymentMetadata, PaymentError> {
        if quorums.is_empty() {
            return Err(PaymentError::NoQuorums);
        }
        if num_symbols == 0 {
            return Err(PaymentError::ZeroSymbols);
        }

        let reservation_err = match self.reservation_usage(timestamp_ns, num_symbols, quorums) {
            Ok(()) => {
                return Ok(PaymentMetadata {
                    account_id: self.account_id,
                    timestamp: timestamp_ns,
                    cumulative_payment: BigUint::default(),
                })
            }
            Err(err) => err,
        };
        debug!(
            account = %self.account_id,
            error = %reservation_err,
            "reservation cannot cover blob, trying on-demand"
        );

        match self.on_demand_usage(num_symbols, quorums) {
            Ok(cumulative_payment) => Ok(PaymentMetadata {
                account_id: self.account_id,
                timestamp: timestamp_ns,
                cumulative_payment,
            }),
            Err(on_demand_err) => Err(PaymentError::NoPaymentAvailable {
                account: self.account_id.to_string(),
                reservation: Box::new(reservation_err),
                on_demand: Box::new(on_demand_err),
            }),
        }
    }

    fn reservation_usage(
        &self,
        timestamp_ns: i64,
        num_symbols: u64,
        quorums: &[QuorumId],
    ) -> Result<(), PaymentError> {
        let mut state = self.reservation_state.lock();
        let mut touched = Vec::with_capacity(quorums.len() * 2);

        for &quorum in quorums {
            if let Err(err) =
                state.reserve_for_quorum(timestamp_ns, num_symbols, quorum, &mut touched)
            {
                for entry in touched.into_iter().rev() {
                    if let Some(ring) = state.period_records.get_mut(&entry.quorum) {
                        ring[entry.slot] = entry.previous;
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn on_demand_usage(
        &self,
        num_symbols: u64,
        quorums: &[QuorumId],
    ) -> Result<BigUint, PaymentError> {
        let mut state = self.on_demand_state.lock();

        for quorum in quorums {
            if !state.on_demand_quorums.contains(quorum) {
                return Err(PaymentError::QuorumNumberMismatch(*quorum));
            }
        }

        let min_num_symbols = state
            .min_num_symbols
            .ok_or(PaymentError::MissingProtocolConfig(ON_DEMAND_QUORUM_ID))?;
        let price_per_symbol = state
            .price_per_symbol
            .ok_or(PaymentError::MissingPaymentConfig(ON_DEMAND_QUORUM_ID))?;

        let charged = payment_charged(
            symbols_charged(num_symbols, min_num_symbols),
            price_per_symbol,
        );
        let resulting = &state.cumulative_payment + charged;
        if resulting > state.on_demand.cumulative_payment {
            return Err(PaymentError::InsufficientOnDemandPayment {
                needed: resulting.to_string(),
                available: state.on_demand.cumulative_payment.to_string(),
            });
        }
        state.cumulative_payment = resulting.clone();
        Ok(resulting)
    }

    /// Replaces the whole payment state with a snapshot from the
    /// disperser.
    ///
    /// Both states are built before either lock is taken and are then
    /// swapped in back to back. A blob accounted concurrently may still be
    /// charged against the new reservations and the old on-demand state.
    pub fn set_payment_state(&self, snapshot: &PaymentStateSnapshot) -> Result<(), PaymentError> {
        let params = snapshot
            .payment_vault_params
            .as_ref()
            .ok_or(PaymentError::MissingVaultParams)?;
        let payment_configs = params
            .quorum_payment_configs
            .clone()
            .ok_or(PaymentError::MissingQuorumPaymentConfigs)?;
        let protocol_configs = params
            .quorum_protocol_configs
            .clone()
            .ok_or(PaymentError::MissingQuorumProtocolConfigs)?;

        let mut on_demand_quorums: Vec<QuorumId> = protocol_configs
            .iter()
            .filter(|(_, config)| config.on_demand_enabled)
            .map(|(quorum, _)| *quorum)
            .collect();
        on_demand_quorums.sort_unstable();
        let min_num_symbols = protocol_configs
            .get(&ON_DEMAND_QUORUM_ID)
            .map(|config| config.min_num_symbols);
        let price_per_symbol = payment_configs
            .get(&ON_DEMAND_QUORUM_ID)
            .map(|config| config.on_demand_price_per_symbol);

        let mut period_records = HashMap::new();
        if let Some(records) = &snapshot.period_records {
            for (quorum, records) in records {
                let window = protocol_configs
                    .get(quorum)
                    .map(|config| config.reservation_rate_limit_window)
                    .unwrap_or_default();
                let mut ring = PeriodRing::default();
                for (position, record) in records.iter().enumerate() {
                    let slot = if window == 0 {
                        position % MIN_NUM_BINS as usize
                    } else {
                        period_slot(record.index, window)
                    };
                    ring[slot] = record.clone();
                }
                period_records.insert(*quorum, ring);
            }
        }

        let reservation_state = ReservationState {
            reservations: snapshot.reservations.clone().unwrap_or_default(),
            period_records,
            payment_configs,
            protocol_configs,
        };
        let on_demand_state = OnDemandState {
            cumulative_payment: snapshot.cumulative_payment.clone().unwrap_or_default(),
            on_demand: OnDemandPayment {
                cumulative_payment: snapshot
                    .onchain_cumulative_payment
                    .clone()
                    .unwrap_or_default(),
            },
            on_demand_quorums,
            min_num_symbols,
            price_per_symbol,
        };

        *self.reservation_state.lock() = reservation_state;
        *self.on_demand_state.lock() = on_demand_state;
        Ok(())
    }

    /// The record of `period` for `quorum`. A slot holding another period
    /// reads as an empty record for `period`.
    pub fn get_relative_period_record(&self, period: u64, quorum: QuorumId) -> PeriodRecord {
        let state = self.reservation_state.lock();
        let window = state.window(quorum).unwrap_or_default();
        match state.period_records.get(&quorum) {
            Some(ring) if ring[period_slot(period, window)].index == period => {
                ring[period_slot(period, window)].clone()
            }
            _ => PeriodRecord {
                index: period,
                usage: 0,
            },
        }
    }

    /// The raw period ring of a quorum, empty if the quorum has none.
    pub fn period_records(&self, quorum: QuorumId) -> Vec<PeriodRecord> {
        self.reservation_state
            .lock()
            .period_records
            .get(&quorum)
            .map(|ring| ring.to_vec())
            .unwrap_or_default()
    }

    pub fn get_reservation_window(&self, quorum: QuorumId) -> Result<u64, PaymentError> {
        self.reservation_state.lock().window(quorum)
    }

    pub fn get_min_num_symbols(&self, quorum: QuorumId) -> Result<u64, PaymentError> {
        self.reservation_state
            .lock()
            .protocol_config(quorum)
            .map(|config| config.min_num_symbols)
    }

    pub fn get_price_per_symbol(&self, quorum: QuorumId) -> Result<u64, PaymentError> {
        self.reservation_state
            .lock()
            .payment_configs
            .get(&quorum)
            .map(|config| config.on_demand_price_per_symbol)
            .ok_or(PaymentError::MissingPaymentConfig(quorum))
    }

    /// Total on-demand payment charged so far.
    pub fn cumulative_payment(&self) -> BigUint {
        self.on_demand_state.lock().cumulative_payment.clone()
    }
}

impl ReservationState {
    fn protocol_config(&self, quorum: QuorumId) -> Result<&PaymentQuorumProtocolConfig, PaymentError> {
        self.protocol_configs
            .get(&quorum)
            .ok_or(PaymentError::MissingProtocolConfig(quorum))
    }

    fn window(&self, quorum: QuorumId) -> Result<u64, PaymentError> {
        let window = self.protocol_config(quorum)?.reservation_rate_limit_window;
        if window == 0 {
            return Err(PaymentError::InvalidWindow(quorum));
        }
        Ok(window)
    }

    /// Returns the slot of `period`, resetting it first when it holds a
    /// stale period. The slot's prior value is pushed to `touched`.
    fn claim_slot(
        &mut self,
        quorum: QuorumId,
        period: u64,
        window: u64,
        touched: &mut Vec<Touched>,
    ) -> usize {
        let slot = period_slot(period, window);
        let ring = self.period_records.entry(quorum).or_default();
        touched.push(Touched {
            quorum,
            slot,
            previous: ring[slot].clone(),
        });
        if ring[slot].index != period {
            ring[slot] = PeriodRecord {
                index: period,
                usage: 0,
            };
        }
        slot
    }

    fn reserve_for_quorum(
        &mut self,
        timestamp_ns: i64,
        num_symbols: u64,
        quorum: QuorumId,
        touched: &mut Vec<Touched>,
    ) -> Result<(), PaymentError> {
        let reservation = self
            .reservations
            .get(&quorum)
            .cloned()
            .ok_or(PaymentError::NoReservation(quorum))?;
        let protocol_config = self.protocol_config(quorum)?.clone();
        let window = self.window(quorum)?;
        if !reservation.is_active_by_nanosecond(timestamp_ns) {
            return Err(PaymentError::InactiveReservation(quorum));
        }

        let period = get_reservation_period_by_nanosecond(timestamp_ns, window);
        let usage = symbols_charged(num_symbols, protocol_config.min_num_symbols);
        let limit = get_bin_limit(reservation.symbols_per_second, window);

        let slot = self.claim_slot(quorum, period, window, touched);
        let ring = self.period_records.entry(quorum).or_default();
        let old_usage = ring[slot].usage;
        let new_usage = old_usage
            .checked_add(usage)
            .ok_or(PaymentError::ReservationLimitExceeded(quorum))?;
        ring[slot].usage = new_usage;
        if new_usage <= limit {
            return Ok(());
        }

        let overflow_period = get_overflow_period(period, window);
        let overflow_slot = self.claim_slot(quorum, overflow_period, window, touched);
        let ring = self.period_records.entry(quorum).or_default();
        if ring[overflow_slot].usage == 0 && old_usage < limit && usage <= limit {
            // new_usage > limit here
            ring[overflow_slot].usage = new_usage - limit;
            ring[slot].usage = limit;
            return Ok(());
        }
        Err(PaymentError::ReservationLimitExceeded(quorum))
    }
}
