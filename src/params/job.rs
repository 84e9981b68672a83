//! Per-job look parameters: distortion variant and trail tint.

use crate::compositor::DistortionType;

use super::ParamsError;

/// Trail tint as hue/saturation/lightness
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TintColor {
    /// Hue (degrees, 0-360)
    pub hue_deg: f32,

    /// Saturation (percent, 0-100)
    pub saturation_pct: f32,

    /// Lightness (percent, 0-100)
    pub lightness_pct: f32,
}

impl Default for TintColor {
    fn default() -> Self {
        // Hot pink
        Self {
            hue_deg: 330.0,
            saturation_pct: 100.0,
            lightness_pct: 65.0,
        }
    }
}

impl TintColor {
    pub fn new(hue_deg: f32, saturation_pct: f32, lightness_pct: f32) -> Result<Self, ParamsError> {
        let tint = Self {
            hue_deg,
            saturation_pct,
            lightness_pct,
        };
        tint.validate()?;
        Ok(tint)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        let in_range = |v: f32, max: f32| v.is_finite() && (0.0..=max).contains(&v);

        if !in_range(self.hue_deg, 360.0)
            || !in_range(self.saturation_pct, 100.0)
            || !in_range(self.lightness_pct, 100.0)
        {
            return Err(ParamsError::Tint(format!(
                "hsl({}, {}%, {}%)",
                self.hue_deg, self.saturation_pct, self.lightness_pct
            )));
        }
        Ok(())
    }

    /// Linear RGB in [0, 1]
    pub fn to_rgb(&self) -> [f32; 3] {
        crate::compositor::hsl_to_rgb(
            self.hue_deg,
            self.saturation_pct / 100.0,
            self.lightness_pct / 100.0,
        )
    }
}

/// Look parameters supplied with a render job
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JobParams {
    pub distortion: DistortionType,
    pub tint: TintColor,
}

impl JobParams {
    /// Build from the raw job fields (distortion index + HSL tint)
    pub fn from_raw(
        distortion_type: u8,
        hue_deg: f32,
        saturation_pct: f32,
        lightness_pct: f32,
    ) -> Result<Self, ParamsError> {
        Ok(Self {
            distortion: DistortionType::try_from(distortion_type)?,
            tint: TintColor::new(hue_deg, saturation_pct, lightness_pct)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_job_fields() {
        let job = JobParams::from_raw(4, 330.0, 100.0, 65.0).unwrap();
        assert_eq!(job.distortion, DistortionType::Glitch);
        assert_eq!(job.tint, TintColor::default());
    }

    #[test]
    fn test_rejects_unknown_distortion_and_bad_tint() {
        assert!(matches!(
            JobParams::from_raw(42, 330.0, 100.0, 65.0),
            Err(ParamsError::UnknownDistortion(42))
        ));
        assert!(JobParams::from_raw(1, 400.0, 100.0, 65.0).is_err());
        assert!(JobParams::from_raw(1, 30.0, -5.0, 65.0).is_err());
        assert!(JobParams::from_raw(1, 30.0, 50.0, f32::NAN).is_err());
    }

    #[test]
    fn test_tint_to_rgb() {
        let red = TintColor::new(0.0, 100.0, 50.0).unwrap().to_rgb();
        assert!((red[0] - 1.0).abs() < 1e-6);
        assert!(red[1].abs() < 1e-6);
        assert!(red[2].abs() < 1e-6);

        let pink = TintColor::default().to_rgb();
        assert!(pink[0] > pink[2] && pink[2] > pink[1]);
    }
}
