use alloy_primitives::U256;

use amm_quoter::domain::error::DomainError;
use amm_quoter::domain::{parse_amount, quote, quote_request, Reserves, SwapQuoteRequest, TokenId};

fn u(n: u64) -> U256 {
    U256::from(n)
}

#[test]
fn reference_scenario() {
    let out = quote(u(1_000_000), u(2_000_000), u(10_000)).unwrap();
    assert_eq!(out, u(19_802));
}

#[test]
fn pool_value_never_decreases_and_output_stays_below_reserve() {
    let reserves = [1u64, 7, 1_000, 999_983, 2_000_000, 10u64.pow(12), u64::MAX];
    let amounts = [1u64, 3, 10_000, 10u64.pow(9), u64::MAX];

    for &reserve_in in &reserves {
        for &reserve_out in &reserves {
            for &amount_in in &amounts {
                let (ri, ro, ai) = (u(reserve_in), u(reserve_out), u(amount_in));
                let Ok(out) = quote(ri, ro, ai) else {
                    // Only a pool drained to zero is refused for these inputs.
                    continue;
                };
                assert!(out < ro, "{reserve_in}/{reserve_out}/{amount_in}");
                assert!((ri + ai) * (ro - out) <= ri * ro);
            }
        }
    }
}

#[test]
fn zero_and_negative_amounts_are_illegal() {
    assert!(matches!(
        quote(u(100), u(100), U256::ZERO),
        Err(DomainError::IllegalAmount { .. })
    ));
    assert!(matches!(
        parse_amount("-1"),
        Err(DomainError::IllegalAmount { .. })
    ));
}

#[test]
fn quote_is_deterministic() {
    let a = quote(u(123_456_789), u(987_654_321), u(55_555)).unwrap();
    let b = quote(u(123_456_789), u(987_654_321), u(55_555)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn empty_pool_is_illegal() {
    assert!(matches!(
        quote(U256::ZERO, u(2_000_000), u(10_000)),
        Err(DomainError::IllegalAmount { .. })
    ));
    assert!(matches!(
        quote(u(1_000_000), U256::ZERO, u(10_000)),
        Err(DomainError::IllegalAmount { .. })
    ));
}

#[test]
fn reserves_beyond_u64_are_supported() {
    // 1e30 and 2e30 base units: product is far above 2^128.
    let reserve_in = parse_amount("1000000000000000000000000000000").unwrap();
    let reserve_out = parse_amount("2000000000000000000000000000000").unwrap();
    let amount_in = parse_amount("10000000000000000000000000").unwrap();

    let out = quote(reserve_in, reserve_out, amount_in).unwrap();
    assert!(out < reserve_out);
    assert_eq!(out, parse_amount("19999800001999980000199999").unwrap());
}

#[test]
fn overflowing_product_is_reported() {
    let huge = U256::MAX / u(2);
    assert!(matches!(
        quote(huge, huge, u(1)),
        Err(DomainError::ArithmeticOverflow { .. })
    ));
}

#[test]
fn quote_request_carries_the_pair() {
    let reserves = Reserves {
        token_in: TokenId::new("wrap.near"),
        token_out: TokenId::new("usdt.tether-token.near"),
        reserve_in: u(1_000_000),
        reserve_out: u(2_000_000),
    };
    let request = SwapQuoteRequest {
        token_in: TokenId::new("wrap.near"),
        token_out: TokenId::new("usdt.tether-token.near"),
        amount_in: u(10_000),
    };
    let result = quote_request(&reserves, &request).unwrap();
    assert_eq!(result.amount_out, u(19_802));
    assert_eq!(result.token_out.as_str(), "usdt.tether-token.near");
}
