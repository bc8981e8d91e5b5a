// THEORY:
// The `Color` module is the most fundamental unit of the detector. A `Color` is a
// "dumb" data container for one HSV sample, usually the mean of a region, plus the
// single comparison the whole system is built on: `distance`.
//
// Key principles:
// 1.  **OpenCV HSV convention**: hue lives on a circle of 180 units (0..180), while
//     saturation and value are linear on 0..=255. Samples are means, so channels
//     are fractional.
// 2.  **L1 distance with hue wraparound**: the distance is the sum of the per-channel
//     absolute differences, except that the hue difference is first folded into
//     (-90, 90] so it measures the short arc. Hue 2 and hue 178 are 4 apart, not 176.
// 3.  **Bounded**: the wrapped hue term never exceeds 90, so no pair of in-range
//     colors is further apart than 90 + 255 + 255 = 600. The tunable threshold is
//     capped at 690 (a full hue period plus both linear channels), which every
//     distance stays below.

pub mod color {
    pub type Channel = f64;
    pub type Distance = f64;

    /// Period of the hue channel in OpenCV's 8-bit HSV representation.
    pub const HUE_PERIOD: Channel = 180.0;
    /// Half of the hue period; differences beyond this wrap around.
    pub const HUE_HALF_PERIOD: Channel = HUE_PERIOD / 2.0;
    /// Upper bound of the saturation and value channels.
    pub const LINEAR_CHANNEL_MAX: Channel = 255.0;
    /// Upper bound on the distance scale; the threshold is clamped to it.
    pub const MAX_DISTANCE: Distance = HUE_PERIOD + LINEAR_CHANNEL_MAX * 2.0;
    /// Farthest apart two in-range colors can actually be, since hue wraps at 90.
    pub const MAX_REACHABLE_DISTANCE: Distance = HUE_HALF_PERIOD + LINEAR_CHANNEL_MAX * 2.0;

    /// A single HSV sample.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct Color {
        /// Hue, circular on [0, 180).
        pub hue: Channel,
        /// Saturation on [0, 255].
        pub saturation: Channel,
        /// Value on [0, 255].
        pub value: Channel,
    }

    impl Color {
        pub fn new(hue: Channel, saturation: Channel, value: Channel) -> Self {
            Self {
                hue,
                saturation,
                value,
            }
        }
    }

    /// Folds a raw hue difference into (-90, 90] and returns its magnitude.
    pub fn hue_delta(a: Channel, b: Channel) -> Channel {
        let mut diff = a - b;
        if diff < -HUE_HALF_PERIOD {
            diff += HUE_PERIOD;
        } else if diff > HUE_HALF_PERIOD {
            diff -= HUE_PERIOD;
        }
        diff.abs()
    }

    /// L1 distance between two HSV colors, with the hue channel wrapped.
    pub fn distance(a: &Color, b: &Color) -> Distance {
        hue_delta(a.hue, b.hue) + (a.saturation - b.saturation).abs() + (a.value - b.value).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::color::*;

    #[test]
    fn identical_colors_have_zero_distance() {
        let c = Color::new(42.0, 17.0, 230.0);
        assert_eq!(distance(&c, &c), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let samples = [
            Color::new(0.0, 0.0, 0.0),
            Color::new(5.0, 100.0, 20.0),
            Color::new(175.0, 3.0, 255.0),
            Color::new(90.0, 255.0, 128.5),
            Color::new(179.0, 64.0, 0.0),
        ];
        for a in &samples {
            for b in &samples {
                assert_eq!(distance(a, b), distance(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn hue_takes_the_short_arc() {
        // Linear difference 170 wraps to 10.
        assert_eq!(hue_delta(5.0, 175.0), 10.0);
        assert_eq!(hue_delta(175.0, 5.0), 10.0);
        assert_eq!(hue_delta(2.0, 178.0), 4.0);
    }

    #[test]
    fn hue_within_half_period_is_linear() {
        assert_eq!(hue_delta(100.0, 10.0), 90.0);
        assert_eq!(hue_delta(10.0, 100.0), 90.0);
        assert_eq!(hue_delta(60.0, 20.0), 40.0);
    }

    #[test]
    fn hue_wrap_rules_match_both_directions() {
        for h1 in (0..180).step_by(7) {
            for h2 in (0..180).step_by(11) {
                let d = h1 as f64 - h2 as f64;
                let expected = if d > 90.0 {
                    180.0 - d
                } else if d < -90.0 {
                    180.0 + d
                } else {
                    d.abs()
                };
                assert_eq!(hue_delta(h1 as f64, h2 as f64), expected);
            }
        }
    }

    #[test]
    fn distance_sums_all_channels() {
        let a = Color::new(10.0, 50.0, 200.0);
        let b = Color::new(170.0, 80.0, 190.0);
        // hue: 10 - 170 = -160 -> +180 = 20
        assert_eq!(distance(&a, &b), 20.0 + 30.0 + 10.0);
    }

    #[test]
    fn distance_stays_within_bounds() {
        let far_a = Color::new(0.0, 0.0, 0.0);
        let far_b = Color::new(90.0, 255.0, 255.0);
        assert_eq!(distance(&far_a, &far_b), MAX_REACHABLE_DISTANCE);
        assert_eq!(MAX_REACHABLE_DISTANCE, 600.0);
        assert_eq!(MAX_DISTANCE, 690.0);

        for h in (0..180).step_by(13) {
            for s in (0..=255).step_by(51) {
                let a = Color::new(h as f64, s as f64, 255.0 - s as f64);
                let b = Color::new(((h + 97) % 180) as f64, 255.0 - s as f64, s as f64);
                let d = distance(&a, &b);
                assert!((0.0..=MAX_REACHABLE_DISTANCE).contains(&d), "{d}");
            }
        }
    }
}
