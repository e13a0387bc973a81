use super::rolling::*;

// Helper: wrap plain prices as a fully-populated close column
fn closes(prices: &[f64]) -> Vec<Option<f64>> {
    prices.iter().copied().map(Some).collect()
}

fn sample_prices() -> Vec<Option<f64>> {
    closes(&[
        44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
        45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
    ])
}

#[test]
fn test_sma_basic() {
    let data = closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let result = sma(&data, 3).unwrap();

    assert_eq!(result.len(), data.len());
    assert_eq!(result[0], None);
    assert_eq!(result[1], None);
    assert!((result[2].unwrap() - 2.0).abs() < 0.001); // (1+2+3)/3 = 2
    assert!((result[3].unwrap() - 3.0).abs() < 0.001); // (2+3+4)/3 = 3
    assert!((result[4].unwrap() - 4.0).abs() < 0.001); // (3+4+5)/3 = 4
}

#[test]
fn test_sma_defined_exactly_from_window() {
    let data = sample_prices();
    let window = 5;
    let result = sma(&data, window).unwrap();

    for (i, value) in result.iter().enumerate() {
        assert_eq!(value.is_some(), i >= window - 1, "position {}", i);
    }
    // Each defined value is the mean of its trailing window
    for i in (window - 1)..data.len() {
        let expected: f64 = data[i + 1 - window..=i].iter().flatten().sum::<f64>() / window as f64;
        assert!((result[i].unwrap() - expected).abs() < 1e-9);
    }
}

#[test]
fn test_sma_insufficient_data() {
    let data = closes(&[1.0, 2.0]);
    let result = sma(&data, 5).unwrap();

    assert!(result.iter().all(|v| v.is_none()));
}

#[test]
fn test_sma_gap_poisons_its_windows() {
    let mut data = closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    data[2] = None;
    let result = sma(&data, 2).unwrap();

    assert_eq!(result[1], Some(1.5));
    assert_eq!(result[2], None); // window (2,3) has a hole
    assert_eq!(result[3], None); // window (3,4) has a hole
    assert_eq!(result[4], Some(4.5));
}

#[test]
fn test_sma_without_closes_is_invalid_input() {
    let data: Vec<Option<f64>> = vec![None, None, None];
    assert!(sma(&data, 2).is_err());
}

#[test]
fn test_rsi_bounds() {
    let data = sample_prices();
    let result = rsi(&data, 14).unwrap();

    assert!(result.iter().any(|v| v.is_some()));
    for value in result.iter().flatten() {
        assert!(*value >= 0.0 && *value <= 100.0);
    }
}

#[test]
fn test_rsi_defined_after_window_deltas() {
    let data = sample_prices();
    let window = 14;
    let result = rsi(&data, window).unwrap();

    // The first delta lands at index 1, so index `window` is the first
    // position with `window` observed deltas.
    for (i, value) in result.iter().enumerate() {
        assert_eq!(value.is_some(), i >= window, "position {}", i);
    }
}

#[test]
fn test_rsi_saturates_at_100_on_pure_uptrend() {
    let data = closes(&(0..20).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
    let result = rsi(&data, 14).unwrap();

    assert_eq!(result.last().copied().flatten(), Some(100.0));
}

#[test]
fn test_rsi_flat_series_stays_undefined() {
    let data = closes(&[50.0; 20]);
    let result = rsi(&data, 14).unwrap();

    // 0/0: no gains, no losses, nothing to rank
    assert!(result.iter().all(|v| v.is_none()));
}

#[test]
fn test_rsi_small_case_matches_hand_computation() {
    // closes 1,2,3,2,4 with window 2: deltas +1,+1,-1,+2, alpha = 0.5
    let data = closes(&[1.0, 2.0, 3.0, 2.0, 4.0]);
    let result = rsi(&data, 2).unwrap();

    assert_eq!(result[0], None);
    assert_eq!(result[1], None);
    assert_eq!(result[2], Some(100.0)); // only gains so far
    assert!((result[3].unwrap() - 42.857).abs() < 0.001);
    assert!((result[4].unwrap() - 82.609).abs() < 0.001);
}

#[test]
fn test_rsi_insufficient_data() {
    let data = closes(&[1.0, 2.0, 3.0]);
    let result = rsi(&data, 14).unwrap();

    assert!(result.iter().all(|v| v.is_none()));
}

#[test]
fn test_rsi_without_closes_is_invalid_input() {
    let data: Vec<Option<f64>> = vec![None; 30];
    assert!(rsi(&data, 14).is_err());
}
