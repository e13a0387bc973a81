use pipeline_core::SentimentLabel;
use std::collections::HashSet;

const POSITIVE_WORDS: &[&str] = &[
    "bullish", "rally", "surge", "gain", "gains", "profit", "growth", "beat", "beats",
    "upgrade", "upgraded", "outperform", "strong", "positive", "rise", "rises", "increase",
    "breakthrough", "innovation", "success", "exceed", "exceeds", "momentum", "buy",
    "recommend", "optimistic", "record", "advance", "recovery", "rebound", "expansion",
    "robust", "accelerating", "dividend", "buyback", "upside", "tailwind", "raised",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bearish", "decline", "declines", "loss", "losses", "fall", "falls", "plunge", "crash",
    "miss", "misses", "downgrade", "downgraded", "underperform", "weak", "negative", "drop",
    "drops", "decrease", "concern", "concerns", "risk", "fail", "fails", "disappoint",
    "disappointing", "slump", "sell", "warning", "pessimistic", "retreat", "fear", "trouble",
    "lawsuit", "litigation", "recall", "investigation", "probe", "default", "bankruptcy",
    "layoff", "layoffs", "downside", "headwind", "overvalued",
];

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't", "wasn't",
    "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly", "barely", "neither",
    "nor", "without",
];

/// A negation word flips any sentiment hit within this many following tokens.
const NEGATION_WINDOW: usize = 3;

/// Polarity band treated as neutral.
const NEUTRAL_BAND: f64 = 0.1;

/// Word-list polarity scorer for news text. Pure: no I/O, no state beyond
/// the lexicon sets.
pub struct SentimentScorer {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negation: HashSet<&'static str>,
}

impl SentimentScorer {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negation: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    /// Score a text as (label, polarity). Polarity is the net sentiment-word
    /// balance normalized into [-1, 1] and rounded to 3 decimals; the label
    /// is positive above 0.1, negative below -0.1, neutral otherwise.
    /// Empty or whitespace-only text is neutral at 0.0.
    pub fn analyze(&self, text: &str) -> (SentimentLabel, f64) {
        if text.trim().is_empty() {
            return (SentimentLabel::Neutral, 0.0);
        }

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| {
                c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '"' | '(' | ')')
            })
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut net: i32 = 0;
        let mut matched: u32 = 0;

        for (i, word) in words.iter().enumerate() {
            let is_positive = self.positive.contains(*word);
            let is_negative = self.negative.contains(*word);
            if !is_positive && !is_negative {
                continue;
            }

            matched += 1;
            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

            if is_positive {
                net += if negated { -1 } else { 1 };
            } else {
                net += if negated { 1 } else { -1 };
            }
        }

        if matched == 0 {
            return (SentimentLabel::Neutral, 0.0);
        }

        let polarity = (net as f64 / matched as f64).clamp(-1.0, 1.0);
        let score = (polarity * 1000.0).round() / 1000.0;

        let label = if score > NEUTRAL_BAND {
            SentimentLabel::Positive
        } else if score < -NEUTRAL_BAND {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };

        (label, score)
    }
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}
