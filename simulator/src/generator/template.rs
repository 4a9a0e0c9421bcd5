use std::f32::consts::PI;

const SYSTOLIC_FRACTION: f32 = 0.3;
const NOTCH_CENTRE: f32 = 0.35;
const NOTCH_WIDTH: f32 = 0.07;
const NOTCH_HEIGHT: f32 = 0.05;

/// One cardiac cycle of blood-volume change, `phase` in `[0, 1)`.
///
/// Zero at the onset (the waveform's valley), a half-cosine systolic rise to 1, then a
/// diastolic decay back to zero with a small dicrotic bump.
pub fn pulse_shape(phase: f32) -> f32 {
    let phase = phase.rem_euclid(1.0);
    if phase < SYSTOLIC_FRACTION {
        return 0.5 * (1.0 - (PI * phase / SYSTOLIC_FRACTION).cos());
    }
    let d = (phase - SYSTOLIC_FRACTION) / (1.0 - SYSTOLIC_FRACTION);
    let decay = 1.0 - d.powf(0.8);
    let notch = NOTCH_HEIGHT * (-((d - NOTCH_CENTRE) / NOTCH_WIDTH).powi(2)).exp();
    (decay + notch).max(0.0)
}
