use pipeline_core::{FundamentalsScore, FundamentalsSummary, StoragePort};
use std::collections::BTreeMap;

/// Composite financial health scorer: four factors, 25 points each,
/// bucketed on fixed thresholds.
pub struct HealthScorer;

impl HealthScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score a fundamentals snapshot. Each factor contributes 0-25; the
    /// total lands in [0, 100].
    pub fn score(&self, symbol: &str, summary: &FundamentalsSummary) -> FundamentalsScore {
        let mut breakdown = BTreeMap::new();

        // Profitability: return on equity, in percent
        let profitability = match summary.roe {
            Some(roe) if roe > 20.0 => 25.0,
            Some(roe) if roe > 15.0 => 20.0,
            Some(roe) if roe > 10.0 => 15.0,
            Some(roe) if roe > 5.0 => 10.0,
            Some(roe) if roe > 0.0 => 5.0,
            _ => 0.0,
        };
        breakdown.insert("profitability".to_string(), profitability);

        // Valuation: price/earnings, only meaningful when positive
        let valuation = match summary.pe_ratio {
            Some(pe) if pe > 0.0 && pe < 15.0 => 25.0,
            Some(pe) if pe > 0.0 && pe < 20.0 => 20.0,
            Some(pe) if pe > 0.0 && pe < 25.0 => 15.0,
            Some(pe) if pe > 0.0 && pe < 35.0 => 10.0,
            Some(pe) if pe > 0.0 => 5.0,
            _ => 0.0,
        };
        breakdown.insert("valuation".to_string(), valuation);

        // Leverage: debt/equity, scored whenever present (0 counts as low debt)
        let debt = match summary.debt_to_equity {
            Some(dte) if dte < 0.3 => 25.0,
            Some(dte) if dte < 0.5 => 20.0,
            Some(dte) if dte < 1.0 => 15.0,
            Some(dte) if dte < 2.0 => 10.0,
            Some(_) => 5.0,
            None => 0.0,
        };
        breakdown.insert("debt".to_string(), debt);

        // Scale: absolute revenue
        let growth = match summary.revenue {
            Some(rev) if rev > 50_000_000_000.0 => 25.0,
            Some(rev) if rev > 10_000_000_000.0 => 20.0,
            Some(rev) if rev > 1_000_000_000.0 => 15.0,
            Some(rev) if rev > 100_000_000.0 => 10.0,
            Some(rev) if rev > 0.0 => 5.0,
            _ => 0.0,
        };
        breakdown.insert("growth".to_string(), growth);

        FundamentalsScore {
            symbol: symbol.to_string(),
            total: breakdown.values().sum(),
            breakdown,
        }
    }

    /// Look up the latest snapshot and score it. A missing snapshot or a
    /// lookup failure both report a zero score instead of propagating.
    pub async fn score_symbol(&self, store: &dyn StoragePort, symbol: &str) -> FundamentalsScore {
        match store.get_fundamentals_summary(symbol).await {
            Ok(Some(summary)) => {
                let score = self.score(symbol, &summary);
                tracing::info!("Financial health score for {}: {}/100", symbol, score.total);
                score
            }
            Ok(None) => {
                tracing::warn!("No fundamentals found for {}", symbol);
                FundamentalsScore::zero(symbol)
            }
            Err(err) => {
                tracing::error!("Failed to score {}: {}", symbol, err);
                FundamentalsScore::zero(symbol)
            }
        }
    }

    /// Rank symbols by health score, best first. Exchange-suffixed tickers
    /// and symbols that score zero are left out.
    pub async fn rank(&self, store: &dyn StoragePort, symbols: &[String]) -> Vec<FundamentalsScore> {
        let mut ranked = Vec::new();
        for symbol in symbols {
            if symbol.contains('.') {
                continue;
            }
            let score = self.score_symbol(store, symbol).await;
            if score.total > 0.0 {
                ranked.push(score);
            }
        }
        ranked.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }
}

impl Default for HealthScorer {
    fn default() -> Self {
        Self::new()
    }
}
