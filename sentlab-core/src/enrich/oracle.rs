//! Per-text sentiment scoring.

use vader_sentiment::SentimentIntensityAnalyzer;

/// VADER-style intensity scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intensity {
    pub compound: f64,
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
}

impl Intensity {
    /// Scores of a text with no sentiment at all.
    pub const NEUTRAL: Intensity = Intensity {
        compound: 0.0,
        neg: 0.0,
        neu: 1.0,
        pos: 0.0,
    };
}

/// Every score the sentiment enricher stores for one text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentScore {
    pub subjectivity: f64,
    pub polarity: f64,
    pub intensity: Intensity,
}

impl SentimentScore {
    pub const NEUTRAL: SentimentScore = SentimentScore {
        subjectivity: 0.0,
        polarity: 0.0,
        intensity: Intensity::NEUTRAL,
    };
}

/// Source of sentiment scores for free text.
pub trait SentimentOracle {
    /// 0 (objective) to 1 (subjective).
    fn subjectivity(&self, text: &str) -> f64;

    /// -1 (negative) to 1 (positive).
    fn polarity(&self, text: &str) -> f64;

    fn intensity(&self, text: &str) -> Intensity;

    /// All scores for `text`. Override when the three share work.
    fn score(&self, text: &str) -> SentimentScore {
        SentimentScore {
            subjectivity: self.subjectivity(text),
            polarity: self.polarity(text),
            intensity: self.intensity(text),
        }
    }
}

/// Lexicon-based oracle on top of VADER.
///
/// Polarity is the positive share minus the negative share (`pos - neg`),
/// a linear measure kept apart from the normalized `compound` sum.
/// Subjectivity is the share of the text that is not neutral (`1 - neu`).
pub struct VaderOracle {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderOracle {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentOracle for VaderOracle {
    fn subjectivity(&self, text: &str) -> f64 {
        self.score(text).subjectivity
    }

    fn polarity(&self, text: &str) -> f64 {
        self.score(text).polarity
    }

    fn intensity(&self, text: &str) -> Intensity {
        let scores = self.analyzer.polarity_scores(text);
        let get = |k: &str| scores.get(k).copied().unwrap_or(0.0);
        Intensity {
            compound: get("compound"),
            neg: get("neg"),
            neu: get("neu"),
            pos: get("pos"),
        }
    }

    fn score(&self, text: &str) -> SentimentScore {
        let intensity = self.intensity(text);
        SentimentScore {
            subjectivity: (1.0 - intensity.neu).clamp(0.0, 1.0),
            polarity: (intensity.pos - intensity.neg).clamp(-1.0, 1.0),
            intensity,
        }
    }
}
