use std::fmt;

use strum_macros::EnumIter;

/// hc [eV m]
pub const HC: f64 = 1.2398418743309972e-06;
/// Minimum energy step considered as zero [eV]
const ED0: f64 = 1e-4;
/// Minimum Z step considered as zero [mm]
const AZ0: f64 = 1e-4;

#[derive(thiserror::Error, Debug)]
pub enum RowlandError {
    #[error("chord {chord:.3} mm exceeds the diameter of a circle of radius {radius:.3} mm")]
    ChordTooLong { chord: f64, radius: f64 },
    #[error("analyzer offset {ax_off:.3} mm outside the sagittal circle of radius {radius:.3} mm")]
    OffsetOutsideCircle { ax_off: f64, radius: f64 },
    #[error("bender arm position is defined for analyzers 3 and up, got {0}")]
    BenderAnalyzer(usize),
    #[error("bender arm of length {arm:.3} mm cannot reach across {reach:.3} mm")]
    BenderUnreachable { arm: f64, reach: f64 },
    #[error("actuator arm of length {arm:.3} mm cannot reach the bender point at {ax_off:.3} mm")]
    ActuatorUnreachable { arm: f64, ax_off: f64 },
    #[error("crystal d-spacing not set")]
    MissingDSpacing,
    #[error("no Bragg reflection for wavelength {wavelength:.4} A at d-spacing {d:.4} A")]
    BraggDomain { wavelength: f64, d: f64 },
}

/// d-spacing of a cubic lattice with cell parameter `a` [Å] at the given
/// Miller indices
pub fn d_cubic(a: f64, (h, k, l): (i32, i32, i32)) -> f64 {
    a / ((h * h + k * k + l * l) as f64).sqrt()
}

/// Height of the circular segment of radius `r` subtended by a chord of
/// length `c`
pub fn segment_height(c: f64, r: f64) -> Result<f64, RowlandError> {
    if c >= 2. * r {
        return Err(RowlandError::ChordTooLong {
            chord: c,
            radius: r,
        });
    }
    Ok(r - (r * r - c * c / 4.).sqrt())
}

/// Centre of the n-th analyzer along X, given the analyzer size `asx` and
/// the gap `agx` between two [mm]
pub fn analyzer_center_x(n: usize, asx: f64, agx: f64) -> f64 {
    (asx + agx) * n as f64
}

/// The rig angular positions and their nominal Bragg angles
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum RigAngle {
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
}
impl RigAngle {
    pub fn from_index(index: usize) -> Option<Self> {
        use RigAngle::*;
        [T0, T1, T2, T3, T4, T5].get(index).copied()
    }
    /// Approximate Bragg angle of this rig position [deg]
    pub fn theta(self) -> f64 {
        self.into()
    }
}
impl From<RigAngle> for f64 {
    fn from(angle: RigAngle) -> Self {
        use RigAngle::*;
        match angle {
            T0 => 90.,
            T1 => 79.,
            T2 => 68.,
            T3 => 57.,
            T4 => 46.,
            T5 => 35.,
        }
    }
}
impl fmt::Display for RigAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RigAngle::*;
        match self {
            T0 => write!(f, "T0"),
            T1 => write!(f, "T1"),
            T2 => write!(f, "T2"),
            T3 => write!(f, "T3"),
            T4 => write!(f, "T4"),
            T5 => write!(f, "T5"),
        }
    }
}

/// Sagittal offset of an analyzer pivot point, with the `aL = 0` surface
/// reference values
#[derive(Debug, Clone, Copy)]
pub struct SagittalOffset {
    pub chi: f64,
    pub ax_off: f64,
    pub sag_off: f64,
    pub chi0: f64,
    pub ax_off0: f64,
    pub sag_off0: f64,
}

/// Rowland circle geometry, horizontal frame: sample-analyzer on the XY
/// plane along Y
///
/// Angular quantities in degrees, spatial in mm, energies in eV.
#[derive(Debug, Clone)]
pub struct RowlandCircle {
    /// Meridional (Rowland circle) radius [mm]
    pub rm: f64,
    /// Bragg angle at the centre analyzer [deg]
    pub theta0: f64,
    /// Miscut angle [deg]
    pub alpha: f64,
    /// Crystal d-spacing [Å]
    pub d: Option<f64>,
    /// Analyzer optical width [mm]
    pub a_w: f64,
    /// Analyzer extended width, at which adjacent analyzers touch [mm]
    pub a_wext: f64,
    /// Sagittal radius offset the extended width refers to [mm]
    pub r_sext: f64,
    /// Distance of the analyzer centre from the chi rotation [mm]
    pub a_l: f64,
    /// Bender arm lengths and inter-arm angle (mm, mm, deg)
    pub bender: (f64, f64, f64),
    /// Actuator X offset and arm length (mm, mm)
    pub actuator: (f64, f64),
    /// Sample-detector distance [mm]
    pub sd: f64,
    /// Sample-analyzer distance [mm]
    pub p: f64,
    /// Analyzer-detector distance [mm]
    pub q: f64,
    /// Sagittal radius [mm]
    pub rs: f64,
}
impl Default for RowlandCircle {
    fn default() -> Self {
        let mut this = Self {
            rm: 500.,
            theta0: 0.,
            alpha: 0.,
            d: None,
            a_w: 0.,
            a_wext: 0.,
            r_sext: 0.,
            a_l: 0.,
            bender: (0., 0., 0.),
            actuator: (0., 0.),
            sd: 0.,
            p: 0.,
            q: 0.,
            rs: 0.,
        };
        this.update();
        this
    }
}
impl RowlandCircle {
    pub fn meridional_radius(mut self, rm: f64) -> Self {
        self.rm = rm;
        self.update();
        self
    }
    pub fn bragg_angle(mut self, theta0: f64) -> Self {
        self.theta0 = theta0;
        self.update();
        self
    }
    pub fn miscut(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self.update();
        self
    }
    pub fn d_spacing(mut self, d: f64) -> Self {
        self.d = Some(d);
        self
    }
    pub fn analyzer(mut self, a_w: f64, a_wext: f64, r_sext: f64, a_l: f64) -> Self {
        self.a_w = a_w;
        self.a_wext = a_wext;
        self.r_sext = r_sext;
        self.a_l = a_l;
        self
    }
    pub fn bender_arms(mut self, arm0: f64, arm1: f64, angle: f64) -> Self {
        self.bender = (arm0, arm1, angle);
        self
    }
    pub fn actuator_arm(mut self, ax_off: f64, length: f64) -> Self {
        self.actuator = (ax_off, length);
        self
    }

    fn rtheta0(&self) -> f64 {
        self.theta0.to_radians()
    }

    /// Refresh the positions derived from `rm`, `theta0` and `alpha`
    fn update(&mut self) {
        let rtheta = self.rtheta0();
        let ralpha = self.alpha.to_radians();
        self.sd = 2. * self.rm * (2. * rtheta).sin();
        self.p = 2. * self.rm * (rtheta - ralpha / 2.).sin();
        self.q = 2. * self.rm * (rtheta + ralpha / 2.).sin();
        // reduces to 2 Rm sin^2(theta0) in the symmetric (alpha = 0) case
        self.rs = if self.p + self.q > 0. {
            2. * rtheta.sin() * self.p * self.q / (self.p + self.q)
        } else {
            0.
        };
    }

    /// The idealized sagittal radius the measurements are verified against [mm]
    pub fn predicted_radius(&self) -> f64 {
        self.rs
    }

    fn chi_rad_at(&self, ax_off: f64, rs: f64) -> Result<f64, RowlandError> {
        let disc = rs * rs - ax_off * ax_off;
        if disc <= 0. {
            return Err(RowlandError::OffsetOutsideCircle { ax_off, radius: rs });
        }
        Ok((ax_off / disc.sqrt()).atan())
    }

    /// Chi angle of an analyzer pivot at the given X offset [deg]
    pub fn chi(&self, ax_off: f64) -> Result<f64, RowlandError> {
        self.chi_rad_at(ax_off, self.rs + self.a_l)
            .map(f64::to_degrees)
    }

    fn chi_touching_at(&self, n: f64, rs: f64) -> f64 {
        (2. * (self.a_wext / (2. * rs)).atan() * n).to_degrees()
    }

    /// Chi angle of the n-th analyzer with touching analyzers
    /// (Thales condition) [deg]
    pub fn chi_touching(&self, n: f64) -> f64 {
        self.chi_touching_at(n, self.rs)
    }

    fn ax_off_at(&self, chi: f64, rs: f64) -> f64 {
        (rs + self.a_l) * chi.to_radians().sin()
    }

    /// Pivot point X offset for a known chi angle [deg -> mm]
    pub fn ax_off(&self, chi: f64) -> f64 {
        self.ax_off_at(chi, self.rs)
    }

    /// Edge-to-edge distance between analyzer `n` and `n - 1` at the
    /// sagittal radius [mm]
    pub fn analyzer_distance(&self, chi: f64, n: f64) -> f64 {
        let chi = if n == 0. { chi } else { chi / n };
        let chi_half = (chi / 2.).to_radians();
        2. * self.rs * chi_half.sin() - self.a_w * chi_half.cos()
    }

    /// Sagittal offset of an analyzer pivot at the given X offset
    pub fn sag_off(&self, ax_off: f64) -> Result<SagittalOffset, RowlandError> {
        let rchi = self.chi_rad_at(ax_off, self.rs + self.a_l)?;
        let ax_off0 = ax_off - self.a_l * rchi.sin();
        let rchi0 = self.chi_rad_at(ax_off0, self.rs)?;
        let sag_off0 = segment_height(ax_off0 * 2., self.rs)?;
        let sag_off = sag_off0 - self.a_l * rchi.cos() + self.a_l;
        Ok(SagittalOffset {
            chi: rchi.to_degrees(),
            ax_off,
            sag_off,
            chi0: rchi0.to_degrees(),
            ax_off0,
            sag_off0,
        })
    }

    /// Position (ax_off, sag_off) of the bender point driving analyzer `n`
    pub fn bender_position(&self, n: usize) -> Result<(f64, f64), RowlandError> {
        if n < 3 {
            return Err(RowlandError::BenderAnalyzer(n));
        }
        let (arm0, arm1, arm_angle) = self.bender;
        // chi of the last three pivot points at the extended sagittal radius
        let rc2 = self.rs + self.r_sext;
        let chis: Vec<f64> = (n - 2..=n)
            .map(|i| self.chi_touching_at(i as f64, rc2))
            .collect();
        let dchi = chis[2] - chis[0];
        let pivots: Vec<SagittalOffset> = chis
            .iter()
            .map(|&chi| self.sag_off(self.ax_off(chi)))
            .collect::<Result<_, _>>()?;
        let r = self.rs + self.a_l;
        let rdch = (dchi / 2.).to_radians();
        let h = r * (1. - rdch.cos());
        let chalf = r * rdch.sin();
        if (chalf / arm1).abs() > 1. {
            return Err(RowlandError::BenderUnreachable {
                arm: arm1,
                reach: chalf,
            });
        }
        let ra = (chalf / arm1).acos();
        let dc = arm1 * ra.sin() - h;
        let sc = self.ax_off_at(chis[1], self.rs + dc);
        let pc = self.sag_off(sc)?;
        let reach = pivots[2].ax_off - pc.ax_off;
        if (reach / arm1).abs() > 1. {
            return Err(RowlandError::BenderUnreachable { arm: arm1, reach });
        }
        let rb = (reach / arm1).acos();
        let rc = std::f64::consts::PI - arm_angle.to_radians() - rb;
        Ok((
            pivots[2].ax_off + arm0 * rc.cos(),
            pivots[2].sag_off - arm0 * rc.sin(),
        ))
    }

    /// Actuator motor position for a given bender point position
    pub fn bender_motor(&self, bender_pos: (f64, f64)) -> Result<f64, RowlandError> {
        let (ax_off, length) = self.actuator;
        let x = (ax_off - bender_pos.0) / length;
        if x.abs() > 1. {
            return Err(RowlandError::ActuatorUnreachable {
                arm: length,
                ax_off: bender_pos.0,
            });
        }
        Ok(length * x.asin().cos() + bender_pos.1)
    }

    /// Energy for a given Bragg angle [deg] and the configured d-spacing [eV]
    pub fn energy_at(&self, theta: f64) -> Result<f64, RowlandError> {
        let d = self.d.ok_or(RowlandError::MissingDSpacing)?;
        let wlen = 2. * d * theta.to_radians().sin();
        if wlen <= 0. {
            return Err(RowlandError::BraggDomain { wavelength: wlen, d });
        }
        Ok(HC / wlen * 1e10)
    }

    /// Energy at the centre Bragg angle [eV]
    pub fn energy(&self) -> Result<f64, RowlandError> {
        self.energy_at(self.theta0)
    }

    /// Bragg angle for a given energy [eV -> deg]
    pub fn theta_at(&self, energy: f64) -> Result<f64, RowlandError> {
        let d = self.d.ok_or(RowlandError::MissingDSpacing)?;
        let wlen = HC / energy * 1e10;
        let sin_theta = wlen / (2. * d);
        if !(0.0..=1.0).contains(&sin_theta) {
            return Err(RowlandError::BraggDomain {
                wavelength: wlen,
                d,
            });
        }
        Ok(sin_theta.asin().to_degrees())
    }

    /// Delta theta for an energy offset, from the differential Bragg law [rad]
    pub fn delta_theta(&self, e_delta: f64) -> Result<f64, RowlandError> {
        if e_delta.abs() <= ED0 {
            return Ok(0.);
        }
        let energy = self.energy()?;
        Ok(-(e_delta / energy) * self.rtheta0().tan())
    }

    /// Analyzer Z offset correcting a given energy offset [eV -> mm]
    pub fn z_offset(&self, e_delta: f64) -> Result<f64, RowlandError> {
        let dth = self.delta_theta(e_delta)?;
        Ok(2. * self.rm * self.rtheta0().sin() * dth.tan())
    }

    /// Analyzer Y offset correcting a given energy offset [eV -> mm]
    pub fn y_offset(&self, e_delta: f64) -> Result<f64, RowlandError> {
        let dth = self.delta_theta(e_delta)?;
        Ok(2. * self.rm * self.rtheta0().tan() * dth.tan())
    }

    /// Energy offset implied by an analyzer Z offset [mm -> eV]
    pub fn energy_offset(&self, z_off: f64) -> Result<f64, RowlandError> {
        if z_off.abs() <= AZ0 {
            return Ok(0.);
        }
        let dth = (z_off / (2. * self.rm * self.rtheta0().sin())).atan();
        Ok(self.energy()? * dth / self.rtheta0().tan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    /// Si cell parameter at 25C [Å]
    const SI_ALAT: f64 = 5.431065;

    fn rc() -> RowlandCircle {
        RowlandCircle::default()
            .meridional_radius(500.)
            .bragg_angle(35.)
            .analyzer(25., 32., 10., 97.)
            .bender_arms(40., 60., 100.)
            .actuator_arm(269., 135.)
            .d_spacing(d_cubic(SI_ALAT, (1, 1, 1)))
    }

    #[test]
    fn sagittal_radius_symmetric_formula() {
        for theta in [35., 46., 57., 68., 79., 90.] {
            let rc = RowlandCircle::default().bragg_angle(theta);
            let expected = 2. * 500. * theta.to_radians().sin().powi(2);
            assert!((rc.predicted_radius() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn sample_detector_distance() {
        let rc = RowlandCircle::default().bragg_angle(35.);
        assert!((rc.sd - 2. * 500. * (70f64).to_radians().sin()).abs() < 1e-9);
        assert!((rc.p - rc.q).abs() < 1e-12);
    }

    #[test]
    fn chi_and_ax_off_round_trip() {
        let rc = rc();
        let chi = rc.chi_touching(3.);
        let ax = rc.ax_off(chi);
        // chi() refers the offset to Rs + aL, as ax_off() does
        assert!((rc.chi(ax).unwrap() - chi).abs() < 1e-9);
    }

    #[test]
    fn offset_outside_circle_is_rejected() {
        let rc = rc();
        assert!(matches!(
            rc.chi(2. * (rc.rs + rc.a_l)),
            Err(RowlandError::OffsetOutsideCircle { .. })
        ));
    }

    #[test]
    fn segment_height_of_half_circle_chord() {
        // c = R sqrt(2) subtends a quarter circle: h = R (1 - sqrt(2)/2)
        let r = 100.;
        let h = segment_height(r * 2f64.sqrt(), r).unwrap();
        assert!((h - r * (1. - 0.5f64.sqrt())).abs() < 1e-9);
        assert!(matches!(
            segment_height(2. * r, r),
            Err(RowlandError::ChordTooLong { .. })
        ));
    }

    #[test]
    fn si111_d_spacing() {
        let d = d_cubic(SI_ALAT, (1, 1, 1));
        assert!((d - 3.1356).abs() < 1e-3);
    }

    #[test]
    fn energy_theta_round_trip() {
        let rc = rc();
        let energy = rc.energy().unwrap();
        assert!((rc.theta_at(energy).unwrap() - 35.).abs() < 1e-9);
    }

    #[test]
    fn missing_d_spacing_is_reported() {
        let rc = RowlandCircle::default().bragg_angle(35.);
        assert!(matches!(rc.energy(), Err(RowlandError::MissingDSpacing)));
    }

    #[test]
    fn bender_position_and_motor() {
        let rc = rc();
        let pos = rc.bender_position(5).unwrap();
        assert!(pos.0 > 0.);
        let motor = rc.bender_motor(pos).unwrap();
        assert!(motor.is_finite());
        assert!(matches!(
            rc.bender_position(2),
            Err(RowlandError::BenderAnalyzer(2))
        ));
    }

    #[test]
    fn small_energy_offsets_are_zero() {
        let rc = rc();
        assert_eq!(rc.z_offset(1e-5).unwrap(), 0.);
        assert_eq!(rc.energy_offset(1e-5).unwrap(), 0.);
    }

    #[test]
    fn rig_angles_span_the_prototype_range() {
        let thetas: Vec<f64> = RigAngle::iter().map(RigAngle::theta).collect();
        assert_eq!(thetas, vec![90., 79., 68., 57., 46., 35.]);
        assert_eq!(RigAngle::from_index(5), Some(RigAngle::T5));
        assert_eq!(RigAngle::from_index(6), None);
        assert_eq!(format!("{}", RigAngle::T3), "T3");
    }
}
