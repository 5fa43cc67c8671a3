use crate::models::{HeartRateZones, PowerZones, ZoneRange};

/// Zone calculation utilities and algorithms
pub struct ZoneCalculator;

impl ZoneCalculator {
    /// Calculate heart rate zones based on LTHR (Lactate Threshold Heart Rate)
    ///
    /// Zone boundaries:
    /// - Z1: 1.5 x resting HR to 80% LTHR (Recovery)
    /// - Z2: 80-90% LTHR (Endurance)
    /// - Z3: 90-95% LTHR (Tempo)
    /// - Z4: 95-102% LTHR (Threshold)
    /// - Z5: 102-106% LTHR (VO2 Max)
    /// - Z6: 106% LTHR to max HR (Anaerobic)
    pub fn hr_zones_from_lthr(lthr: f64, resting_hr: f64, max_hr: f64) -> HeartRateZones {
        HeartRateZones {
            zone1: ZoneRange::new(resting_hr * 1.5, lthr * 0.80),
            zone2: ZoneRange::new(lthr * 0.80, lthr * 0.90),
            zone3: ZoneRange::new(lthr * 0.90, lthr * 0.95),
            zone4: ZoneRange::new(lthr * 0.95, lthr * 1.02),
            zone5: ZoneRange::new(lthr * 1.02, lthr * 1.06),
            zone6: ZoneRange::new(lthr * 1.06, max_hr.max(lthr * 1.06)),
        }
    }

    /// Calculate power zones based on FTP (Coggan 7-zone model)
    ///
    /// - Z1: < 55% FTP (Active Recovery)
    /// - Z2: 56-75% FTP (Endurance)
    /// - Z3: 76-90% FTP (Tempo)
    /// - Z4: 91-105% FTP (Lactate Threshold)
    /// - Z5: 106-120% FTP (VO2 Max)
    /// - Z6: 121-150% FTP (Anaerobic Capacity)
    /// - Z7: > 150% FTP (Neuromuscular Power)
    pub fn power_zones_from_ftp(ftp: f64) -> PowerZones {
        PowerZones {
            zone1: ZoneRange::new(0.0, ftp * 0.55),
            zone2: ZoneRange::new(ftp * 0.56, ftp * 0.75),
            zone3: ZoneRange::new(ftp * 0.76, ftp * 0.90),
            zone4: ZoneRange::new(ftp * 0.91, ftp * 1.05),
            zone5: ZoneRange::new(ftp * 1.06, ftp * 1.20),
            zone6: ZoneRange::new(ftp * 1.21, ftp * 1.50),
            zone7: ZoneRange::new(ftp * 1.51, ftp * 3.0),
        }
    }

    /// Determine which heart rate zone a given HR falls into
    pub fn heart_rate_zone(hr: f64, zones: &HeartRateZones) -> u8 {
        if hr <= zones.zone1.high {
            1
        } else if hr <= zones.zone2.high {
            2
        } else if hr <= zones.zone3.high {
            3
        } else if hr <= zones.zone4.high {
            4
        } else if hr <= zones.zone5.high {
            5
        } else {
            6
        }
    }

    /// Determine which power zone a given power falls into
    pub fn power_zone(power: f64, zones: &PowerZones) -> u8 {
        if power <= zones.zone1.high {
            1
        } else if power <= zones.zone2.high {
            2
        } else if power <= zones.zone3.high {
            3
        } else if power <= zones.zone4.high {
            4
        } else if power <= zones.zone5.high {
            5
        } else if power <= zones.zone6.high {
            6
        } else {
            7
        }
    }
}
