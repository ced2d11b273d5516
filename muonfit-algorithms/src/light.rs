//! Main tank-cluster selection and per-sensor light aggregation.

use std::collections::BTreeMap;

use log::debug;
use muonfit_core::{
    ChargeUnits, ClusterSelectionConfig, GeometryProvider, SensorLightRecord, TankCluster,
};

/// The cluster chosen as the muon's tank light.
#[derive(Debug, Clone, Copy)]
pub struct SelectedCluster<'a> {
    /// The selected cluster.
    pub cluster: &'a TankCluster,
    /// Mean hit time (ns).
    pub mean_time: f64,
    /// Summed raw charge.
    pub total_charge: f64,
}

/// Picks the highest-charge cluster whose mean time is inside the window.
///
/// Clusters with no positive charge are never selected.
#[must_use]
pub fn select_main_cluster<'a>(
    clusters: &'a [TankCluster],
    config: &ClusterSelectionConfig,
) -> Option<SelectedCluster<'a>> {
    let mut best: Option<SelectedCluster<'a>> = None;
    for cluster in clusters {
        let Some(mean_time) = cluster.mean_time() else {
            continue;
        };
        if mean_time < config.min_mean_time || mean_time > config.max_mean_time {
            continue;
        }
        let total_charge = cluster.total_charge();
        let best_charge = best.map_or(0.0, |b| b.total_charge);
        if total_charge > best_charge {
            best = Some(SelectedCluster {
                cluster,
                mean_time,
                total_charge,
            });
        }
    }
    best
}

/// Returns true if the track start and cluster time agree within the window.
#[must_use]
pub fn is_coincident(track_start_time: f64, cluster_time: f64, config: &ClusterSelectionConfig) -> bool {
    let diff = track_start_time - cluster_time;
    diff > config.coincidence_offset - config.coincidence_half_width
        && diff < config.coincidence_offset + config.coincidence_half_width
}

/// Sums photoelectrons per channel and keeps sensors above threshold.
///
/// Hits on channels without a gain calibration are ignored, as are channels
/// without geometry. Records come out in channel order.
#[must_use]
pub fn aggregate_light(
    cluster: &TankCluster,
    geometry: &dyn GeometryProvider,
    config: &ClusterSelectionConfig,
) -> Vec<SensorLightRecord> {
    let mut per_channel: BTreeMap<u32, (f64, f64)> = BTreeMap::new();
    for hit in &cluster.hits {
        let Some(gain) = geometry.spe_gain(hit.channel_id) else {
            continue;
        };
        let pe = match config.charge_units {
            ChargeUnits::Calibrated if gain > 0.0 => hit.charge / gain,
            ChargeUnits::Calibrated => continue,
            ChargeUnits::PhotoElectrons => hit.charge,
        };
        let entry = per_channel
            .entry(hit.channel_id)
            .or_insert((0.0, f64::INFINITY));
        entry.0 += pe;
        entry.1 = entry.1.min(hit.time);
    }

    per_channel
        .into_iter()
        .filter(|(_, (pe, _))| *pe >= config.charge_threshold_pe)
        .filter_map(|(channel_id, (total_pe, earliest_time))| {
            let Some(sensor) = geometry.sensor(channel_id) else {
                debug!("channel {channel_id} has light but no geometry, skipped");
                return None;
            };
            Some(SensorLightRecord {
                channel_id,
                position: sensor.position,
                orientation: sensor.orientation,
                area: sensor.kind.photocathode_area(),
                total_pe,
                earliest_time,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use muonfit_core::{SensorGeometry, SensorHit, SensorKind, Vector3};
    use std::collections::HashMap;

    struct Fixture {
        sensors: HashMap<u32, SensorGeometry>,
        gains: HashMap<u32, f64>,
    }

    impl GeometryProvider for Fixture {
        fn sensor(&self, channel_id: u32) -> Option<&SensorGeometry> {
            self.sensors.get(&channel_id)
        }

        fn spe_gain(&self, channel_id: u32) -> Option<f64> {
            self.gains.get(&channel_id).copied()
        }
    }

    fn fixture() -> Fixture {
        let mut sensors = HashMap::new();
        let mut gains = HashMap::new();
        for (id, kind) in [(332, SensorKind::Lux), (333, SensorKind::Etel), (334, SensorKind::Hamamatsu)] {
            sensors.insert(
                id,
                SensorGeometry {
                    channel_id: id,
                    kind,
                    position: Vector3::new(f64::from(id), 0.0, 0.0),
                    orientation: Vector3::new(-1.0, 0.0, 0.0),
                },
            );
            gains.insert(id, 2.0);
        }
        // Calibrated but not in the geometry.
        gains.insert(999, 2.0);
        Fixture { sensors, gains }
    }

    #[test]
    fn test_select_main_cluster() {
        let clusters = vec![
            TankCluster::new(10.0, vec![SensorHit::new(332, 50.0, 10.0)]),
            TankCluster::new(100.0, vec![SensorHit::new(332, 80.0, 100.0)]),
            // Larger, but outside the time window.
            TankCluster::new(2500.0, vec![SensorHit::new(332, 500.0, 2500.0)]),
            TankCluster::default(),
        ];
        let selected = select_main_cluster(&clusters, &ClusterSelectionConfig::default()).unwrap();
        assert_relative_eq!(selected.cluster.time, 100.0);
        assert_relative_eq!(selected.total_charge, 80.0);
        assert_relative_eq!(selected.mean_time, 100.0);
    }

    #[test]
    fn test_no_cluster_selected() {
        let clusters = vec![TankCluster::new(-5.0, vec![SensorHit::new(332, 50.0, -5.0)])];
        assert!(select_main_cluster(&clusters, &ClusterSelectionConfig::default()).is_none());
        assert!(select_main_cluster(&[], &ClusterSelectionConfig::default()).is_none());
    }

    #[test]
    fn test_coincidence_window_is_open() {
        let config = ClusterSelectionConfig::default();
        assert!(is_coincident(845.0, 100.0, &config));
        assert!(is_coincident(894.0, 100.0, &config));
        assert!(!is_coincident(895.0, 100.0, &config));
        assert!(!is_coincident(795.0, 100.0, &config));
        assert!(is_coincident(10.0, 5.0, &ClusterSelectionConfig::simulation()));
    }

    #[test]
    fn test_aggregate_light_calibrated() {
        let cluster = TankCluster::new(
            0.0,
            vec![
                SensorHit::new(333, 4.0, 12.0),
                SensorHit::new(333, 6.0, 9.0),
                // 2 PE, below threshold.
                SensorHit::new(334, 4.0, 5.0),
                // No gain.
                SensorHit::new(400, 100.0, 1.0),
                // No geometry.
                SensorHit::new(999, 100.0, 1.0),
            ],
        );
        let records = aggregate_light(&cluster, &fixture(), &ClusterSelectionConfig::default());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.channel_id, 333);
        assert_relative_eq!(record.total_pe, 5.0);
        assert_relative_eq!(record.earliest_time, 9.0);
        assert_relative_eq!(record.area, 613.0);
    }

    #[test]
    fn test_aggregate_light_photoelectrons() {
        let cluster = TankCluster::new(0.0, vec![SensorHit::new(332, 4.0, 3.0)]);
        let records = aggregate_light(&cluster, &fixture(), &ClusterSelectionConfig::simulation());
        assert_eq!(records.len(), 1);
        assert_relative_eq!(records[0].total_pe, 4.0);
    }
}
