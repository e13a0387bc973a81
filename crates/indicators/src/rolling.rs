use pipeline_core::PipelineError;

/// Simple Moving Average over a close-price column.
///
/// Output is index-aligned with the input: element i is the mean of the
/// window ending at i, `None` for i < window-1 and for any window that
/// contains a missing close.
pub fn sma(closes: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>, PipelineError> {
    ensure_has_closes(closes)?;
    if window == 0 {
        return Err(PipelineError::InvalidInput(
            "SMA window must be at least 1".to_string(),
        ));
    }

    let mut result = vec![None; closes.len()];
    for i in (window - 1)..closes.len() {
        let slice = &closes[i + 1 - window..=i];
        let values: Vec<f64> = slice.iter().flatten().copied().collect();
        if values.len() == window {
            result[i] = Some(values.iter().sum::<f64>() / window as f64);
        }
    }
    Ok(result)
}

/// Relative Strength Index over a close-price column.
///
/// Gains and losses are smoothed with an exponentially weighted mean using
/// center-of-mass = window-1 (alpha = 1/window). Weights decay once per
/// period, so a gap of missing closes ages the older observations just the
/// same. Values are `None` until `window` deltas have been observed.
pub fn rsi(closes: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>, PipelineError> {
    ensure_has_closes(closes)?;
    if window == 0 {
        return Err(PipelineError::InvalidInput(
            "RSI window must be at least 1".to_string(),
        ));
    }

    let alpha = 1.0 / window as f64;
    let decay = 1.0 - alpha;

    let mut result = vec![None; closes.len()];
    let mut gain_num = 0.0;
    let mut loss_num = 0.0;
    let mut weight = 0.0;
    let mut observed = 0usize;

    for i in 1..closes.len() {
        gain_num *= decay;
        loss_num *= decay;
        weight *= decay;

        let delta = match (closes[i - 1], closes[i]) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        };
        if let Some(delta) = delta {
            gain_num += delta.max(0.0);
            loss_num += (-delta).max(0.0);
            weight += 1.0;
            observed += 1;
        }

        if observed < window || weight == 0.0 {
            continue;
        }

        let avg_gain = gain_num / weight;
        let avg_loss = loss_num / weight;

        result[i] = if avg_loss > 0.0 {
            let rs = avg_gain / avg_loss;
            Some(100.0 - (100.0 / (1.0 + rs)))
        } else if avg_gain > 0.0 {
            // All gains: RS diverges, RSI saturates at the top
            Some(100.0)
        } else {
            // Flat series: 0/0 stays undefined
            None
        };
    }
    Ok(result)
}

/// The series must carry closing prices at all; a column where every row is
/// missing means the source never sent one.
fn ensure_has_closes(closes: &[Option<f64>]) -> Result<(), PipelineError> {
    if closes.iter().all(|close| close.is_none()) {
        return Err(PipelineError::InvalidInput(
            "price series has no closing prices".to_string(),
        ));
    }
    Ok(())
}
