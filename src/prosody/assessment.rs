use crate::prosody::{PronunciationAssessment, StressAnalysis};

const STRESS_WEIGHT: f32 = 0.3;
const INTONATION_WEIGHT: f32 = 0.3;
const RHYTHM_WEIGHT: f32 = 0.2;
const CLARITY_WEIGHT: f32 = 0.2;

const NO_SYLLABLES: f32 = 0.4;
const UNDER_STRESSED_RATIO: f32 = 0.12;
const UNDER_STRESSED_SCORE: f32 = 0.35;
const OVER_STRESSED_RATIO: f32 = 0.6;
const OVER_STRESSED_SCORE: f32 = 0.45;
const NATURAL_RATIO_BAND: (f32, f32) = (0.18, 0.4);
const NATURAL_RATIO_TARGET: f32 = 0.35;
const BORDERLINE_SCORE: f32 = 0.6;

/// Combines the prosodic scores into a single weighted assessment.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssessmentAggregator;

impl AssessmentAggregator {
    pub fn assess(&self, stress: &StressAnalysis, clarity: f32) -> PronunciationAssessment {
        let stress_accuracy = stress_accuracy(stress.stressed.len(), stress.syllable_count());
        let intonation_naturalness = stress.intonation_variation.clamp(0.0, 1.0);
        let rhythm_fluency = stress.rhythm_score.clamp(0.0, 1.0);
        let pronunciation_clarity = clarity.clamp(0.0, 1.0);
        PronunciationAssessment {
            stress_accuracy,
            intonation_naturalness,
            rhythm_fluency,
            pronunciation_clarity,
            overall: overall_score(
                stress_accuracy,
                intonation_naturalness,
                rhythm_fluency,
                pronunciation_clarity,
            ),
        }
    }
}

/// Stress-density heuristic: roughly a fifth to two fifths of syllables stressed reads as natural.
pub fn stress_accuracy(stressed: usize, total: usize) -> f32 {
    if total == 0 {
        return NO_SYLLABLES;
    }
    let ratio = stressed as f32 / total as f32;
    if ratio < UNDER_STRESSED_RATIO {
        UNDER_STRESSED_SCORE
    } else if ratio > OVER_STRESSED_RATIO {
        OVER_STRESSED_SCORE
    } else if (NATURAL_RATIO_BAND.0..=NATURAL_RATIO_BAND.1).contains(&ratio) {
        (ratio / NATURAL_RATIO_TARGET).min(1.0)
    } else {
        BORDERLINE_SCORE
    }
}

fn overall_score(stress: f32, intonation: f32, rhythm: f32, clarity: f32) -> f32 {
    let composite = stress * STRESS_WEIGHT
        + intonation * INTONATION_WEIGHT
        + rhythm * RHYTHM_WEIGHT
        + clarity * CLARITY_WEIGHT;
    composite.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prosody::StressLabel;
    use approx::assert_relative_eq;

    fn analysis(stressed: usize, total: usize) -> StressAnalysis {
        let pattern = (0..total)
            .map(|index| {
                if index < stressed {
                    StressLabel::Stressed
                } else {
                    StressLabel::Unstressed
                }
            })
            .collect();
        let stressed = (0..stressed)
            .map(|index| crate::prosody::StressedSyllable {
                index,
                stress: 0.9,
                duration: 0.15,
                pitch: 0.0,
                intensity: 0.05,
            })
            .collect();
        StressAnalysis {
            pattern,
            stressed,
            rhythm_score: 0.5,
            intonation_variation: 0.35,
        }
    }

    #[test]
    fn stress_accuracy_bands() {
        assert_eq!(stress_accuracy(0, 0), 0.4);
        assert_eq!(stress_accuracy(1, 10), 0.35);
        assert_eq!(stress_accuracy(7, 10), 0.45);
        assert_eq!(stress_accuracy(3, 20), 0.6);
        assert_eq!(stress_accuracy(5, 10), 0.6);
        assert_relative_eq!(stress_accuracy(1, 4), 0.25 / 0.35, epsilon = 1e-6);
        assert_eq!(stress_accuracy(2, 5), 1.0);
    }

    #[test]
    fn empty_analysis_uses_defaults() {
        let assessment = AssessmentAggregator.assess(&analysis(0, 0), 0.5);
        assert_eq!(assessment.stress_accuracy, 0.4);
        assert_eq!(assessment.rhythm_fluency, 0.5);
        assert_eq!(assessment.intonation_naturalness, 0.35);
        assert_eq!(assessment.pronunciation_clarity, 0.5);
        assert_relative_eq!(
            assessment.overall,
            0.4 * 0.3 + 0.35 * 0.3 + 0.5 * 0.2 + 0.5 * 0.2,
            epsilon = 1e-6
        );
    }

    #[test]
    fn overall_is_weighted_and_bounded() {
        let mut stress = analysis(1, 3);
        stress.rhythm_score = 1.0;
        stress.intonation_variation = 1.0;
        let assessment = AssessmentAggregator.assess(&stress, 0.85);
        let expected = (1.0f32 / 3.0 / 0.35) * 0.3 + 0.3 + 0.2 + 0.85 * 0.2;
        assert_relative_eq!(assessment.overall, expected, epsilon = 1e-5);
        assert!(assessment.overall <= 1.0);
    }
}
