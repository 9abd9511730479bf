//! End-to-end tests: normalized feed in, report out.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use taxlot::{
    compute_report, EngineConfig, EngineError, EventKind, FailurePolicy, HoldingTerm, IncomeType,
    LotId, LotSelection, Method, NormalizedEvent, Qty, Usd, Warning,
};

fn event(
    id: &str,
    kind: EventKind,
    ts: &str,
    block: u64,
    qty: Decimal,
    value: Decimal,
) -> NormalizedEvent {
    NormalizedEvent {
        id: id.to_string(),
        wallet: "0xwallet".to_string(),
        network: "ethereum".to_string(),
        protocol: "uniswap".to_string(),
        asset: "ETH".to_string(),
        kind,
        timestamp: ts.parse().unwrap(),
        block_number: block,
        log_index: 0,
        quantity: Qty::new(qty),
        fiat_value: Usd::new(value),
        counter_asset: None,
        income_type: None,
        lots: None,
        description: None,
    }
}

fn acq(id: &str, ts: &str, block: u64, qty: Decimal, value: Decimal) -> NormalizedEvent {
    event(id, EventKind::Acquisition, ts, block, qty, value)
}

fn disp(id: &str, ts: &str, block: u64, qty: Decimal, value: Decimal) -> NormalizedEvent {
    event(id, EventKind::Disposal, ts, block, qty, value)
}

fn income(
    id: &str,
    ts: &str,
    block: u64,
    ty: IncomeType,
    qty: Decimal,
    value: Decimal,
) -> NormalizedEvent {
    let mut e = event(id, EventKind::Income, ts, block, qty, value);
    e.income_type = Some(ty);
    e.protocol = "aave".to_string();
    e
}

/// Lots A (10 units, day 1, cost 1/unit) and B (10 units, day 5, cost 2/unit)
/// followed by a disposal of 10 units.
fn ordering_law_feed() -> Vec<NormalizedEvent> {
    vec![
        acq("a", "2024-01-01T00:00:00Z", 1, dec!(10), dec!(10)),
        acq("b", "2024-01-05T00:00:00Z", 2, dec!(10), dec!(20)),
        disp("d", "2024-02-01T00:00:00Z", 3, dec!(10), dec!(30)),
    ]
}

#[test]
fn fifo_consumes_lot_a_entirely() {
    let report = compute_report(
        &ordering_law_feed(),
        &EngineConfig::with_method(Method::Fifo),
    )
    .unwrap();
    assert_eq!(report.form_8949_rows.len(), 1);
    let row = &report.form_8949_rows[0];
    assert_eq!(row.lot_id, Some(LotId::new("a")));
    assert_eq!(row.cost_basis, Usd::new(dec!(10)));
    assert_eq!(row.gain_loss, Usd::new(dec!(20)));
}

#[test]
fn lifo_consumes_lot_b_entirely() {
    let report = compute_report(
        &ordering_law_feed(),
        &EngineConfig::with_method(Method::Lifo),
    )
    .unwrap();
    let row = &report.form_8949_rows[0];
    assert_eq!(row.lot_id, Some(LotId::new("b")));
    assert_eq!(row.cost_basis, Usd::new(dec!(20)));
}

#[test]
fn hifo_consumes_higher_unit_cost_lot_b() {
    let report = compute_report(
        &ordering_law_feed(),
        &EngineConfig::with_method(Method::Hifo),
    )
    .unwrap();
    let row = &report.form_8949_rows[0];
    assert_eq!(row.lot_id, Some(LotId::new("b")));
}

#[test]
fn partial_lot_split_preserves_unit_cost() {
    // Dispose 5 of a 10-unit lot twice; both halves carry the same basis
    let feed = vec![
        acq("a", "2024-01-01T00:00:00Z", 1, dec!(10), dec!(40)),
        disp("d1", "2024-02-01T00:00:00Z", 2, dec!(5), dec!(30)),
        disp("d2", "2024-03-01T00:00:00Z", 3, dec!(5), dec!(35)),
    ];
    let report = compute_report(&feed, &EngineConfig::default()).unwrap();
    assert_eq!(report.form_8949_rows.len(), 2);
    assert_eq!(report.form_8949_rows[0].cost_basis, Usd::new(dec!(20)));
    assert_eq!(report.form_8949_rows[1].cost_basis, Usd::new(dec!(20)));
    assert!(report.warnings.is_empty());
}

#[test]
fn term_boundary_365_short_366_long() {
    let feed = vec![
        acq("a", "2023-01-01T00:00:00Z", 1, dec!(2), dec!(200)),
        // exactly 365 days held
        disp("d1", "2024-01-01T00:00:00Z", 2, dec!(1), dec!(150)),
        // 366 days held
        disp("d2", "2024-01-02T00:00:00Z", 3, dec!(1), dec!(150)),
    ];
    let report = compute_report(&feed, &EngineConfig::default()).unwrap();
    assert_eq!(report.form_8949_rows[0].term, HoldingTerm::ShortTerm);
    assert_eq!(report.form_8949_rows[0].holding_days, 365);
    assert_eq!(report.form_8949_rows[1].term, HoldingTerm::LongTerm);
    assert_eq!(report.form_8949_rows[1].holding_days, 366);
}

#[test]
fn insufficient_basis_warns_and_zeroes_shortfall() {
    let feed = vec![
        acq("a", "2024-01-01T00:00:00Z", 1, dec!(10), dec!(40)),
        disp("d", "2024-02-01T00:00:00Z", 2, dec!(15), dec!(90)),
    ];
    let report = compute_report(&feed, &EngineConfig::default()).unwrap();

    assert_eq!(
        report.warnings,
        vec![Warning::InsufficientBasis {
            event_id: "d".to_string(),
            asset: "ETH".to_string(),
            requested: Qty::new(dec!(15)),
            available: Qty::new(dec!(10)),
            shortfall: Qty::new(dec!(5)),
        }]
    );

    assert_eq!(report.form_8949_rows.len(), 2);
    let covered = &report.form_8949_rows[0];
    assert_eq!(covered.quantity, Qty::new(dec!(10)));
    assert_eq!(covered.cost_basis, Usd::new(dec!(40)));
    // 10/15 of 90 proceeds
    assert_eq!(covered.proceeds, Usd::new(dec!(60)));

    let shortfall = &report.form_8949_rows[1];
    assert_eq!(shortfall.lot_id, None);
    assert_eq!(shortfall.quantity, Qty::new(dec!(5)));
    assert_eq!(shortfall.cost_basis, Usd::ZERO);
    assert_eq!(shortfall.proceeds, Usd::new(dec!(30)));
    assert_eq!(shortfall.gain_loss, Usd::new(dec!(30)));
}

#[test]
fn income_round_trip() {
    // 100 USD of income for 50 units -> lot at 2/unit; disposing all 50 at
    // 300 USD yields a 200 USD gain, while income stays 100.
    let feed = vec![
        income(
            "i",
            "2024-01-01T00:00:00Z",
            1,
            IncomeType::StakingReward,
            dec!(50),
            dec!(100),
        ),
        disp("d", "2024-03-01T00:00:00Z", 2, dec!(50), dec!(300)),
    ];
    let report = compute_report(&feed, &EngineConfig::default()).unwrap();

    assert_eq!(report.income.total, Usd::new(dec!(100)));
    assert_eq!(report.income.events, 1);
    assert_eq!(
        report.income.by_type.get(&IncomeType::StakingReward),
        Some(&Usd::new(dec!(100)))
    );

    assert_eq!(report.form_8949_rows.len(), 1);
    let row = &report.form_8949_rows[0];
    assert_eq!(row.lot_id, Some(LotId::new("i")));
    assert_eq!(row.cost_basis, Usd::new(dec!(100)));
    assert_eq!(row.gain_loss, Usd::new(dec!(200)));
}

#[test]
fn aggregation_identity_holds() {
    let feed = vec![
        acq("a", "2022-01-01T00:00:00Z", 1, dec!(10), dec!(100)),
        acq("b", "2024-01-05T00:00:00Z", 2, dec!(10), dec!(500)),
        income(
            "i",
            "2024-01-10T00:00:00Z",
            3,
            IncomeType::Interest,
            dec!(5),
            dec!(50),
        ),
        disp("d1", "2024-02-01T00:00:00Z", 4, dec!(12), dec!(700)),
        disp("d2", "2024-03-01T00:00:00Z", 5, dec!(8), dec!(100)),
    ];
    let report = compute_report(&feed, &EngineConfig::default()).unwrap();

    assert_eq!(
        report.capital_gains.net_total,
        report.capital_gains.short_term.total + report.capital_gains.long_term.total
    );
    let row_sum: Usd = report.form_8949_rows.iter().map(|r| r.gain_loss).sum();
    assert_eq!(row_sum, report.capital_gains.net_total);

    // Every disposed unit is accounted for across the rows
    let disposed: Qty = report.form_8949_rows.iter().map(|r| r.quantity).sum();
    assert_eq!(disposed, Qty::new(dec!(20)));
}

#[test]
fn reports_are_byte_identical_across_runs() {
    let feed = vec![
        acq("a", "2022-01-01T00:00:00Z", 1, dec!(3), dec!(100)),
        income(
            "i",
            "2023-06-01T00:00:00Z",
            2,
            IncomeType::LiquidityMining,
            dec!(7),
            dec!(33.33),
        ),
        disp("d", "2024-02-01T00:00:00Z", 3, dec!(10), dec!(400)),
    ];
    for method in [Method::Fifo, Method::Lifo, Method::Hifo] {
        let config = EngineConfig::with_method(method);
        let one = serde_json::to_vec(&compute_report(&feed, &config).unwrap()).unwrap();
        let two = serde_json::to_vec(&compute_report(&feed, &config).unwrap()).unwrap();
        assert_eq!(one, two);
    }
}

#[test]
fn out_of_order_feed_aborts() {
    let feed = vec![
        acq("a", "2024-02-01T00:00:00Z", 2, dec!(1), dec!(10)),
        acq("b", "2024-01-01T00:00:00Z", 1, dec!(1), dec!(10)),
    ];
    let err = compute_report(&feed, &EngineConfig::default()).unwrap_err();
    assert_eq!(
        err,
        EngineError::OutOfOrderEvent {
            id: "b".to_string()
        }
    );
}

#[test]
fn specific_id_selects_named_lot() {
    let mut d = disp("d", "2024-02-01T00:00:00Z", 3, dec!(10), dec!(30));
    d.lots = Some(vec![LotSelection {
        lot_id: LotId::new("a"),
        quantity: Qty::new(dec!(10)),
    }]);
    let feed = vec![
        acq("a", "2024-01-01T00:00:00Z", 1, dec!(10), dec!(10)),
        acq("b", "2024-01-05T00:00:00Z", 2, dec!(10), dec!(20)),
        d,
    ];
    let report = compute_report(&feed, &EngineConfig::with_method(Method::SpecificId)).unwrap();
    assert_eq!(report.form_8949_rows[0].lot_id, Some(LotId::new("a")));
    assert_eq!(report.form_8949_rows[0].cost_basis, Usd::new(dec!(10)));
}

#[test]
fn specific_id_without_selection_aborts_by_default() {
    let feed = vec![
        acq("a", "2024-01-01T00:00:00Z", 1, dec!(10), dec!(10)),
        disp("d", "2024-02-01T00:00:00Z", 2, dec!(5), dec!(15)),
    ];
    let err = compute_report(&feed, &EngineConfig::with_method(Method::SpecificId)).unwrap_err();
    assert_eq!(
        err,
        EngineError::MissingLotSelection {
            id: "d".to_string()
        }
    );
}

#[test]
fn specific_id_skip_and_warn_keeps_the_rest_of_the_report() {
    let mut bad = disp("bad", "2024-02-01T00:00:00Z", 3, dec!(5), dec!(15));
    bad.lots = Some(vec![LotSelection {
        lot_id: LotId::new("nope"),
        quantity: Qty::new(dec!(5)),
    }]);
    let mut good = disp("good", "2024-03-01T00:00:00Z", 4, dec!(5), dec!(25));
    good.lots = Some(vec![LotSelection {
        lot_id: LotId::new("a"),
        quantity: Qty::new(dec!(5)),
    }]);
    let feed = vec![
        acq("a", "2024-01-01T00:00:00Z", 1, dec!(10), dec!(10)),
        bad,
        good,
    ];

    let mut config = EngineConfig::with_method(Method::SpecificId);
    config.specific_id_failures = FailurePolicy::SkipAndWarn;
    let report = compute_report(&feed, &config).unwrap();

    assert_eq!(report.form_8949_rows.len(), 1);
    assert_eq!(report.form_8949_rows[0].disposal_event_id, "good");
    assert!(matches!(
        report.warnings.as_slice(),
        [Warning::SkippedDisposal { event_id, .. }] if event_id == "bad"
    ));
}

#[test]
fn wallets_and_assets_do_not_share_lots() {
    let mut other_wallet = acq("w2", "2024-01-02T00:00:00Z", 2, dec!(100), dec!(100));
    other_wallet.wallet = "0xother".to_string();
    let mut other_asset = acq("u", "2024-01-03T00:00:00Z", 3, dec!(100), dec!(100));
    other_asset.asset = "USDC".to_string();
    let feed = vec![
        acq("a", "2024-01-01T00:00:00Z", 1, dec!(1), dec!(10)),
        other_wallet,
        other_asset,
        // Needs 5 ETH in 0xwallet; only 1 is there despite 200 units elsewhere
        disp("d", "2024-02-01T00:00:00Z", 4, dec!(5), dec!(50)),
    ];
    let report = compute_report(&feed, &EngineConfig::default()).unwrap();
    assert!(matches!(
        report.warnings.as_slice(),
        [Warning::InsufficientBasis { shortfall, .. }] if *shortfall == Qty::new(dec!(4))
    ));
}

#[test]
fn year_filter_keeps_basis_from_prior_years() {
    let feed = vec![
        acq("a", "2022-01-01T00:00:00Z", 1, dec!(10), dec!(100)),
        disp("d1", "2023-06-01T00:00:00Z", 2, dec!(5), dec!(80)),
        disp("d2", "2024-06-01T00:00:00Z", 3, dec!(5), dec!(90)),
    ];
    let mut config = EngineConfig::default();
    config.tax_year = Some(2024);
    let report = compute_report(&feed, &config).unwrap();

    // Only the 2024 disposal is reported, but its basis still comes from the
    // 2022 lot consumed partly by the 2023 disposal.
    assert_eq!(report.form_8949_rows.len(), 1);
    assert_eq!(report.form_8949_rows[0].disposal_event_id, "d2");
    assert_eq!(report.form_8949_rows[0].cost_basis, Usd::new(dec!(50)));
}
