#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use num_bigint::BigUint;
    use rayon::prelude::*;
    use rust_eigenda_client::{
        accountant::Accountant,
        errors::PaymentError,
        payment::{
            PaymentQuorumConfig, PaymentQuorumProtocolConfig, PaymentStateSnapshot,
            PaymentVaultParams, PeriodRecord, ReservedPayment,
        },
        types::{AccountId, QuorumId},
    };

    const WINDOW: u64 = 5;
    const PRICE_PER_SYMBOL: u64 = 2;
    // 1000s, the start of period 1000
    const NOW_NS: i64 = 1_000 * 1_000_000_000;
    const WINDOW_NS: i64 = WINDOW as i64 * 1_000_000_000;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn account_id() -> AccountId {
        AccountId([0x11; 20])
    }

    fn vault_params(quorums: &[QuorumId]) -> PaymentVaultParams {
        let mut payment_configs = HashMap::new();
        let mut protocol_configs = HashMap::new();
        for &quorum in quorums {
            payment_configs.insert(
                quorum,
                PaymentQuorumConfig {
                    reservation_symbols_per_second: 200,
                    on_demand_symbols_per_second: 200,
                    on_demand_price_per_symbol: PRICE_PER_SYMBOL,
                },
            );
            protocol_configs.insert(
                quorum,
                PaymentQuorumProtocolConfig {
                    min_num_symbols: 1,
                    reservation_advance_window: 0,
                    reservation_rate_limit_window: WINDOW,
                    on_demand_rate_limit_window: WINDOW,
                    on_demand_enabled: true,
                },
            );
        }
        PaymentVaultParams {
            quorum_payment_configs: Some(payment_configs),
            quorum_protocol_configs: Some(protocol_configs),
        }
    }

    fn reservation(symbols_per_second: u64) -> ReservedPayment {
        ReservedPayment {
            symbols_per_second,
            start_timestamp: 0,
            end_timestamp: 2_000_000_000,
        }
    }

    /// Reservations of `symbols_per_second` on `reserved`, on-demand on
    /// every quorum of `quorums`.
    fn snapshot(
        quorums: &[QuorumId],
        reserved: &[QuorumId],
        symbols_per_second: u64,
        deposit: u64,
    ) -> PaymentStateSnapshot {
        PaymentStateSnapshot {
            payment_vault_params: Some(vault_params(quorums)),
            period_records: None,
            reservations: Some(
                reserved
                    .iter()
                    .map(|&quorum| (quorum, reservation(symbols_per_second)))
                    .collect(),
            ),
            cumulative_payment: None,
            onchain_cumulative_payment: Some(BigUint::from(deposit)),
        }
    }

    fn accountant(snapshot: &PaymentStateSnapshot) -> Accountant {
        init_tracing();
        let accountant = Accountant::new(account_id());
        accountant.set_payment_state(snapshot).unwrap();
        accountant
    }

    #[test]
    fn test_reservation_overflows_then_falls_back_to_on_demand() {
        let accountant = accountant(&snapshot(&[0, 1], &[0], 200, 1_000_000));

        let metadata = accountant.account_blob(NOW_NS, 800, &[0]).unwrap();
        assert!(!metadata.is_on_demand());
        assert_eq!(accountant.get_relative_period_record(1000, 0).usage, 800);

        let metadata = accountant.account_blob(NOW_NS, 500, &[0]).unwrap();
        assert!(!metadata.is_on_demand());
        assert_eq!(accountant.get_relative_period_record(1000, 0).usage, 1000);
        assert_eq!(accountant.get_relative_period_record(1005, 0).usage, 300);

        let metadata = accountant.account_blob(NOW_NS, 500, &[0]).unwrap();
        assert!(metadata.is_on_demand());
        assert_eq!(
            metadata.cumulative_payment,
            BigUint::from(500 * PRICE_PER_SYMBOL)
        );
        assert_eq!(metadata.account_id, account_id());
        assert_eq!(metadata.timestamp, NOW_NS);

        // the failed reservation attempt left both bins alone
        assert_eq!(accountant.get_relative_period_record(1000, 0).usage, 1000);
        assert_eq!(accountant.get_relative_period_record(1005, 0).usage, 300);
        assert_eq!(
            accountant.cumulative_payment(),
            BigUint::from(500 * PRICE_PER_SYMBOL)
        );
    }

    #[test]
    fn test_failed_quorum_rolls_back_other_quorums() {
        let accountant = accountant(&snapshot(&[0, 1], &[0], 200, 0));
        accountant.account_blob(NOW_NS, 100, &[0]).unwrap();
        let before = accountant.period_records(0);

        // quorum 2 has neither a reservation nor on-demand enabled
        let err = accountant.account_blob(NOW_NS, 300, &[0, 2]).unwrap_err();
        match err {
            PaymentError::NoPaymentAvailable {
                reservation,
                on_demand,
                ..
            } => {
                assert_eq!(*reservation, PaymentError::NoReservation(2));
                assert_eq!(*on_demand, PaymentError::QuorumNumberMismatch(2));
            }
            other => panic!("unexpected error: {}", other),
        }

        assert_eq!(accountant.period_records(0), before);
        assert_eq!(accountant.get_relative_period_record(1000, 0).usage, 100);
    }

    #[test]
    fn test_overflow_rollback_restores_stale_slot() {
        let accountant = accountant(&snapshot(&[0, 1], &[0, 1], 200, 0));
        accountant.account_blob(NOW_NS, 900, &[0, 1]).unwrap();
        // fill the overflow bin of quorum 1 only
        accountant.account_blob(NOW_NS, 200, &[1]).unwrap();
        let quorum_0 = accountant.period_records(0);
        let quorum_1 = accountant.period_records(1);

        // quorum 0 could overflow, quorum 1 cannot
        accountant
            .account_blob(NOW_NS, 200, &[0, 1])
            .expect_err("no on-demand deposit");
        assert_eq!(accountant.period_records(0), quorum_0);
        assert_eq!(accountant.period_records(1), quorum_1);
    }

    #[test]
    fn test_oversized_request_never_overflows() {
        // the bin limit is 1000, the overflow bin is empty
        let accountant = accountant(&snapshot(&[0, 1], &[0], 200, 1_000_000));

        let metadata = accountant.account_blob(NOW_NS, 1200, &[0]).unwrap();
        assert!(metadata.is_on_demand());
        assert_eq!(
            metadata.cumulative_payment,
            BigUint::from(1200 * PRICE_PER_SYMBOL)
        );
        assert_eq!(accountant.get_relative_period_record(1000, 0).usage, 0);
        assert_eq!(accountant.get_relative_period_record(1005, 0).usage, 0);
    }

    #[test]
    fn test_full_bin_never_overflows() {
        let accountant = accountant(&snapshot(&[0, 1], &[0], 200, 1_000_000));
        let metadata = accountant.account_blob(NOW_NS, 1000, &[0]).unwrap();
        assert!(!metadata.is_on_demand());
        assert_eq!(accountant.get_relative_period_record(1000, 0).usage, 1000);

        // one more symbol would fit the empty overflow bin, but the bin is full
        let metadata = accountant.account_blob(NOW_NS, 1, &[0]).unwrap();
        assert!(metadata.is_on_demand());
        assert_eq!(accountant.get_relative_period_record(1000, 0).usage, 1000);
        assert_eq!(accountant.get_relative_period_record(1005, 0).usage, 0);
    }

    #[test]
    fn test_huge_request_does_not_wrap_usage() {
        let accountant = accountant(&snapshot(&[0, 1], &[0], 200, 0));
        accountant.account_blob(NOW_NS, 1, &[0]).unwrap();

        match accountant.account_blob(NOW_NS, u64::MAX, &[0]).unwrap_err() {
            PaymentError::NoPaymentAvailable {
                reservation,
                on_demand,
                ..
            } => {
                assert_eq!(*reservation, PaymentError::ReservationLimitExceeded(0));
                assert!(matches!(
                    *on_demand,
                    PaymentError::InsufficientOnDemandPayment { .. }
                ));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(
            accountant.get_relative_period_record(1000, 0),
            PeriodRecord {
                index: 1000,
                usage: 1
            }
        );
        assert_eq!(accountant.get_relative_period_record(1005, 0).usage, 0);

        // the same request on an empty bin is rejected too
        let fresh = Accountant::new(account_id());
        fresh
            .set_payment_state(&snapshot(&[0, 1], &[0], 200, 0))
            .unwrap();
        fresh
            .account_blob(NOW_NS, u64::MAX, &[0])
            .expect_err("no on-demand deposit");
        assert_eq!(fresh.get_relative_period_record(1000, 0).usage, 0);
    }

    #[test]
    fn test_set_payment_state_replaces_everything() {
        let accountant = accountant(&snapshot(&[0, 1], &[0], 200, 1_000_000));
        accountant.account_blob(NOW_NS, 800, &[0]).unwrap();
        accountant.account_blob(NOW_NS, 1200, &[0]).unwrap();

        let mut state = snapshot(&[0, 1], &[], 200, 100);
        state.cumulative_payment = Some(BigUint::from(40u32));
        accountant.set_payment_state(&state).unwrap();

        assert_eq!(accountant.cumulative_payment(), BigUint::from(40u32));
        assert_eq!(accountant.get_relative_period_record(1000, 0).usage, 0);
        // no reservation left, and the new ceiling of 100 is honoured
        let metadata = accountant.account_blob(NOW_NS, 30, &[0]).unwrap();
        assert_eq!(metadata.cumulative_payment, BigUint::from(100u32));
        accountant
            .account_blob(NOW_NS, 1, &[0])
            .expect_err("deposit exhausted");
    }

    #[test]
    fn test_concurrent_reservation_usage() {
        const THREADS: u64 = 32;
        const SYMBOLS: u64 = 10;
        // bin limit of exactly THREADS * SYMBOLS
        let symbols_per_second = THREADS * SYMBOLS / WINDOW;
        let accountant = accountant(&snapshot(&[0], &[0], symbols_per_second, 0));

        let results: Vec<_> = (0..THREADS)
            .into_par_iter()
            .map(|_| accountant.account_blob(NOW_NS, SYMBOLS, &[0]))
            .collect();
        for result in results {
            assert!(!result.unwrap().is_on_demand());
        }
        assert_eq!(
            accountant.get_relative_period_record(1000, 0).usage,
            THREADS * SYMBOLS
        );
        assert_eq!(accountant.get_relative_period_record(1005, 0).usage, 0);
    }

    #[test]
    fn test_concurrent_on_demand_never_overdraws() {
        const THREADS: u64 = 64;
        let deposit = 40 * 10 * PRICE_PER_SYMBOL;
        let accountant = accountant(&snapshot(&[0], &[], 0, deposit));

        let successes = (0..THREADS)
            .into_par_iter()
            .filter(|_| accountant.account_blob(NOW_NS, 10, &[0]).is_ok())
            .count();
        assert_eq!(successes, 40);
        assert_eq!(accountant.cumulative_payment(), BigUint::from(deposit));
    }

    #[test]
    fn test_bin_rotation() {
        let accountant = accountant(&snapshot(&[0], &[0], 200, 0));

        accountant.account_blob(NOW_NS, 100, &[0]).unwrap();
        accountant
            .account_blob(NOW_NS + WINDOW_NS, 200, &[0])
            .unwrap();
        assert_eq!(accountant.get_relative_period_record(1000, 0).usage, 100);
        assert_eq!(accountant.get_relative_period_record(1005, 0).usage, 200);

        // three windows later the first slot is reused
        accountant
            .account_blob(NOW_NS + 3 * WINDOW_NS, 50, &[0])
            .unwrap();
        assert_eq!(accountant.get_relative_period_record(1015, 0).usage, 50);
        assert_eq!(
            accountant.get_relative_period_record(1000, 0),
            PeriodRecord {
                index: 1000,
                usage: 0
            }
        );
        assert_eq!(accountant.get_relative_period_record(1005, 0).usage, 200);
    }

    #[test]
    fn test_snapshot_period_records_are_honoured() {
        let mut state = snapshot(&[0], &[0], 200, 0);
        state.period_records = Some(HashMap::from([(
            0,
            vec![PeriodRecord {
                index: 1000,
                usage: 900,
            }],
        )]));
        let accountant = accountant(&state);

        accountant.account_blob(NOW_NS, 200, &[0]).unwrap();
        assert_eq!(accountant.get_relative_period_record(1000, 0).usage, 1000);
        assert_eq!(accountant.get_relative_period_record(1005, 0).usage, 100);
    }

    #[test]
    fn test_insufficient_on_demand_payment() {
        let mut state = snapshot(&[0], &[], 0, 100);
        state.cumulative_payment = Some(BigUint::from(10u32));
        let accountant = accountant(&state);

        let err = accountant.account_blob(NOW_NS, 50, &[0]).unwrap_err();
        match err {
            PaymentError::NoPaymentAvailable { on_demand, .. } => assert_eq!(
                *on_demand,
                PaymentError::InsufficientOnDemandPayment {
                    needed: "110".to_string(),
                    available: "100".to_string(),
                }
            ),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(accountant.cumulative_payment(), BigUint::from(10u32));

        let metadata = accountant.account_blob(NOW_NS, 45, &[0]).unwrap();
        assert_eq!(metadata.cumulative_payment, BigUint::from(100u32));
    }

    #[test]
    fn test_minimum_symbols_are_charged() {
        let mut state = snapshot(&[0], &[], 0, 1_000);
        if let Some(configs) = state
            .payment_vault_params
            .as_mut()
            .and_then(|params| params.quorum_protocol_configs.as_mut())
        {
            configs.entry(0).or_default().min_num_symbols = 64;
        }
        let accountant = accountant(&state);

        let metadata = accountant.account_blob(NOW_NS, 1, &[0]).unwrap();
        assert_eq!(
            metadata.cumulative_payment,
            BigUint::from(64 * PRICE_PER_SYMBOL)
        );
        assert_eq!(accountant.get_min_num_symbols(0), Ok(64));
        assert_eq!(accountant.get_price_per_symbol(0), Ok(PRICE_PER_SYMBOL));
        assert_eq!(accountant.get_reservation_window(0), Ok(WINDOW));
    }

    #[test]
    fn test_invalid_requests() {
        let accountant = accountant(&snapshot(&[0], &[0], 200, 0));
        assert_eq!(
            accountant.account_blob(NOW_NS, 10, &[]),
            Err(PaymentError::NoQuorums)
        );
        assert_eq!(
            accountant.account_blob(NOW_NS, 0, &[0]),
            Err(PaymentError::ZeroSymbols)
        );
        assert_eq!(
            accountant.get_reservation_window(7),
            Err(PaymentError::MissingProtocolConfig(7))
        );
    }

    #[test]
    fn test_inactive_reservation() {
        let accountant = accountant(&snapshot(&[0], &[0], 200, 0));
        let after_end = 2_000_000_001 * 1_000_000_000;
        match accountant.account_blob(after_end, 10, &[0]).unwrap_err() {
            PaymentError::NoPaymentAvailable { reservation, .. } => {
                assert_eq!(*reservation, PaymentError::InactiveReservation(0))
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_set_payment_state_requires_vault_params() {
        let accountant = Accountant::new(account_id());
        assert_eq!(
            accountant.set_payment_state(&PaymentStateSnapshot::default()),
            Err(PaymentError::MissingVaultParams)
        );

        let mut state = snapshot(&[0], &[0], 200, 0);
        if let Some(params) = state.payment_vault_params.as_mut() {
            params.quorum_payment_configs = None;
        }
        assert_eq!(
            accountant.set_payment_state(&state),
            Err(PaymentError::MissingQuorumPaymentConfigs)
        );

        let mut state = snapshot(&[0], &[0], 200, 0);
        if let Some(params) = state.payment_vault_params.as_mut() {
            params.quorum_protocol_configs = None;
        }
        assert_eq!(
            accountant.set_payment_state(&state),
            Err(PaymentError::MissingQuorumProtocolConfigs)
        );
    }
}
